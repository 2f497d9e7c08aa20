//! # Chain Validation
//!
//! Stateless rules deciding whether a block extends another, and whether a
//! whole sequence is a chain this node could adopt.
//!
//! A link `(predecessor, candidate)` is valid iff:
//!
//! 1. `candidate.index == predecessor.index + 1`
//! 2. `candidate.prevHash == predecessor.hash`
//! 3. `candidate.hash` equals the hash recomputed from its fields
//!
//! A chain is valid iff it starts with exactly the known genesis block and
//! every adjacent pair is a valid link. Length is not a validity concern;
//! the store's fork-choice rule decides between valid chains.

use crate::error::{ChainValidationError, LinkError};
use crate::storage::block::Block;
use crate::storage::payload::Payload;

/// Check that `candidate` correctly extends `predecessor`, reporting the
/// first rule that fails.
pub fn check_link<P: Payload>(candidate: &Block<P>, predecessor: &Block<P>) -> Result<(), LinkError> {
    let expected = predecessor.index + 1;
    if candidate.index != expected {
        return Err(LinkError::IndexMismatch {
            expected,
            got: candidate.index,
        });
    }

    if candidate.prev_hash != predecessor.hash {
        return Err(LinkError::PrevHashMismatch {
            index: candidate.index,
            expected: predecessor.hash.clone(),
            got: candidate.prev_hash.clone(),
        });
    }

    candidate.verify()
}

/// `true` iff `candidate` correctly extends `predecessor`.
pub fn is_link_valid<P: Payload>(candidate: &Block<P>, predecessor: &Block<P>) -> bool {
    check_link(candidate, predecessor).is_ok()
}

/// Check a whole chain against the known genesis block.
pub fn check_chain<P: Payload>(chain: &[Block<P>], genesis: &Block<P>) -> Result<(), ChainValidationError> {
    let first = chain.first().ok_or(ChainValidationError::Empty)?;
    if first != genesis {
        return Err(ChainValidationError::GenesisMismatch {
            expected: genesis.hash.clone(),
            got: first.hash.clone(),
        });
    }

    for (position, pair) in chain.windows(2).enumerate() {
        check_link(&pair[1], &pair[0]).map_err(|source| ChainValidationError::BrokenLink {
            position: position + 1,
            source,
        })?;
    }

    Ok(())
}

/// `true` iff `chain` starts at `genesis` and every link is valid.
pub fn is_chain_valid<P: Payload>(chain: &[Block<P>], genesis: &Block<P>) -> bool {
    check_chain(chain, genesis).is_ok()
}
