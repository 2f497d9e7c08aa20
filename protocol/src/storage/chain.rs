//! In-memory chain store with the longest-chain fork-choice rule.
//!
//! The store owns the canonical chain. Nobody outside mutates it: readers
//! get an immutable [`ChainSnapshot`], writers hand over a complete
//! candidate sequence and the store decides whether to adopt it.
//!
//! ## Fork choice
//!
//! A candidate replaces the current chain iff it is strictly longer. Equal
//! length loses to the incumbent. There is no cumulative-work weighting;
//! this is a known limitation of the policy, not an oversight.
//!
//! `try_replace` does not validate. Callers that accept chains from the
//! outside go through the arbitrator, which checks the candidate first.

use std::ops::Deref;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use tracing::debug;

use super::block::Block;
use super::payload::{Bpm, Payload};

// ---------------------------------------------------------------------------
// ChainSnapshot
// ---------------------------------------------------------------------------

/// Read-only view of the chain at one point in time.
///
/// Cloning is an `Arc` bump. A snapshot never changes after it is taken,
/// even if the store adopts a new chain in the meantime.
#[derive(Debug)]
pub struct ChainSnapshot<P = Bpm> {
    blocks: Arc<Vec<Block<P>>>,
}

impl<P> Clone for ChainSnapshot<P> {
    fn clone(&self) -> Self {
        Self {
            blocks: Arc::clone(&self.blocks),
        }
    }
}

impl<P: Clone> ChainSnapshot<P> {
    /// The last block. A snapshot always holds at least genesis.
    pub fn tip(&self) -> &Block<P> {
        &self.blocks[self.blocks.len() - 1]
    }

    /// Copy the blocks out, e.g. to build a candidate chain on top.
    pub fn to_vec(&self) -> Vec<Block<P>> {
        self.blocks.as_ref().clone()
    }
}

impl<P> Deref for ChainSnapshot<P> {
    type Target = [Block<P>];

    fn deref(&self) -> &Self::Target {
        self.blocks.as_slice()
    }
}

impl<P: Serialize> Serialize for ChainSnapshot<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.blocks.as_slice().serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// ChainStore
// ---------------------------------------------------------------------------

/// Owner of the canonical chain.
#[derive(Debug)]
pub struct ChainStore<P = Bpm> {
    genesis: Block<P>,
    current: RwLock<Arc<Vec<Block<P>>>>,
}

impl<P: Payload> ChainStore<P> {
    /// Start a chain from a fresh genesis block stamped with the current time.
    pub fn new() -> Self {
        Self::with_genesis(Block::genesis())
    }

    /// Start a chain from the given genesis block.
    pub fn with_genesis(genesis: Block<P>) -> Self {
        let current = RwLock::new(Arc::new(vec![genesis.clone()]));
        Self { genesis, current }
    }

    /// The genesis block every adoptable chain must start with.
    pub fn genesis(&self) -> &Block<P> {
        &self.genesis
    }

    /// The most recently accepted block.
    pub fn tip(&self) -> Block<P> {
        self.snapshot().tip().clone()
    }

    /// Number of blocks, genesis included. Never zero.
    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    /// Block at `index`, if the chain is that long.
    pub fn get(&self, index: u64) -> Option<Block<P>> {
        let index = usize::try_from(index).ok()?;
        self.current.read().get(index).cloned()
    }

    pub fn snapshot(&self) -> ChainSnapshot<P> {
        ChainSnapshot {
            blocks: Arc::clone(&self.current.read()),
        }
    }

    /// Adopt `candidate` iff it is strictly longer than the current chain.
    ///
    /// Returns whether the replacement happened. The swap is a single
    /// pointer store under the write lock, so readers see either the old
    /// chain or the new one, never a mix.
    pub fn try_replace(&self, candidate: Vec<Block<P>>) -> bool {
        let mut current = self.current.write();
        let (current_len, candidate_len) = (current.len(), candidate.len());
        if candidate_len > current_len {
            *current = Arc::new(candidate);
            debug!(from = current_len, to = candidate_len, "chain replaced");
            true
        } else {
            debug!(
                current = current_len,
                candidate = candidate_len,
                "candidate chain not longer, keeping incumbent"
            );
            false
        }
    }
}

impl<P: Payload> Default for ChainStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
