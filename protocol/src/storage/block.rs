//! # Block Structure
//!
//! A block is one immutable, hash-linked entry in the PULSE chain.
//!
//! ## Block Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Block                                      │
//! │  ├── index: u64          (genesis = 0)      │
//! │  ├── timestamp: String   (RFC 3339, UTC)    │
//! │  ├── payload: P          (BPM by default)   │
//! │  ├── hash: String        (SHA-256, hex)     │
//! │  └── prevHash: String    ("" for genesis)   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Hash Computation
//!
//! The preimage is the plain concatenation, without separators, of:
//!
//! ```text
//! decimal(index) || timestamp || payload.encode() || prevHash
//! ```
//!
//! hashed with SHA-256 and rendered as 64 lowercase hex characters. The
//! `hash` field itself is obviously not part of the preimage.
//!
//! The timestamp is informational. No rule ever looks at it beyond feeding
//! it into the hash.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{GENESIS_INDEX, GENESIS_PREV_HASH};
use crate::crypto::sha256_hex_parts;
use crate::error::LinkError;

use super::payload::{Bpm, Payload};

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A single PULSE block.
///
/// Blocks cannot be edited once constructed: the fields are readable through
/// accessors only. The only ways to get a `Block` are [`Block::genesis`],
/// the producer, or deserializing one. A deserialized block is trusted no
/// further than the validator says.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block<P = Bpm> {
    pub(crate) index: u64,
    pub(crate) timestamp: String,
    pub(crate) payload: P,
    pub(crate) hash: String,
    pub(crate) prev_hash: String,
}

impl<P: Payload> Block<P> {
    /// Construct the genesis block, stamped with the current time.
    pub fn genesis() -> Self {
        Self::genesis_at(now_timestamp())
    }

    /// Construct the genesis block with a fixed timestamp.
    ///
    /// Two nodes only agree on genesis if they agree on this timestamp.
    pub fn genesis_at(timestamp: impl Into<String>) -> Self {
        Self::from_parts(
            GENESIS_INDEX,
            timestamp.into(),
            P::default(),
            GENESIS_PREV_HASH.to_string(),
        )
    }

    /// Assemble a block from its content fields and compute its hash.
    pub(crate) fn from_parts(index: u64, timestamp: String, payload: P, prev_hash: String) -> Self {
        let hash = compute_block_hash(index, &timestamp, &payload, &prev_hash);
        Block {
            index,
            timestamp,
            payload,
            hash,
            prev_hash,
        }
    }

    /// Recompute the hash from the content fields.
    pub fn compute_hash(&self) -> String {
        compute_block_hash(self.index, &self.timestamp, &self.payload, &self.prev_hash)
    }

    /// Check that the stored hash matches the content.
    ///
    /// This says nothing about whether the block belongs where it sits in a
    /// chain; that is the validator's job.
    pub fn verify(&self) -> Result<(), LinkError> {
        let computed = self.compute_hash();
        if computed != self.hash {
            return Err(LinkError::HashMismatch {
                index: self.index,
                stored: self.hash.clone(),
                computed,
            });
        }
        Ok(())
    }

    pub fn is_genesis(&self) -> bool {
        self.index == GENESIS_INDEX && self.prev_hash == GENESIS_PREV_HASH
    }
}

impl<P> Block<P> {
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Hex-encoded SHA-256 of this block's content.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Hash of the predecessor. Empty for genesis.
    pub fn prev_hash(&self) -> &str {
        &self.prev_hash
    }
}

// ---------------------------------------------------------------------------
// Hash Computation
// ---------------------------------------------------------------------------

/// Compute the block hash from its content fields.
pub fn compute_block_hash<P: Payload>(
    index: u64,
    timestamp: &str,
    payload: &P,
    prev_hash: &str,
) -> String {
    let index = index.to_string();
    let payload = payload.encode();
    sha256_hex_parts(&[
        index.as_bytes(),
        timestamp.as_bytes(),
        payload.as_bytes(),
        prev_hash.as_bytes(),
    ])
}

/// Current wall-clock time in the block timestamp format.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
