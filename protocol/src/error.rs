//! Error types for the chain-integrity core.
//!
//! Every failure here is a per-submission outcome. Nothing in this module
//! describes a condition that should take the process down: the caller
//! reports the error to whoever submitted the data and keeps serving.

use thiserror::Error;

/// Raw submitter input could not be turned into a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid payload {input:?}: {reason}")]
pub struct PayloadParseError {
    /// The offending input, as received.
    pub input: String,
    /// Why it was rejected.
    pub reason: String,
}

impl PayloadParseError {
    pub fn new(input: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            input: input.into(),
            reason: reason.to_string(),
        }
    }
}

/// A candidate block does not correctly extend its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// `candidate.index != predecessor.index + 1`.
    #[error("index mismatch: expected {expected}, got {got}")]
    IndexMismatch { expected: u64, got: u64 },

    /// `candidate.prev_hash != predecessor.hash`.
    #[error("block {index} prevHash mismatch: expected {expected}, got {got}")]
    PrevHashMismatch {
        index: u64,
        expected: String,
        got: String,
    },

    /// The stored hash does not match the hash recomputed from the fields.
    #[error("block {index} hash mismatch: stored={stored}, computed={computed}")]
    HashMismatch {
        index: u64,
        stored: String,
        computed: String,
    },
}

/// A full candidate chain is not a valid extension of the known genesis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainValidationError {
    /// A chain must contain at least the genesis block.
    #[error("chain is empty")]
    Empty,

    /// The first block differs from the genesis this node started with.
    #[error("genesis mismatch: expected {expected}, got {got}")]
    GenesisMismatch { expected: String, got: String },

    /// The block at `position` does not extend the one before it.
    #[error("broken link at position {position}: {source}")]
    BrokenLink {
        position: usize,
        #[source]
        source: LinkError,
    },
}

/// Outcome of a rejected submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Malformed submitter input. Nothing was built.
    #[error(transparent)]
    PayloadParse(#[from] PayloadParseError),

    /// The candidate failed validation against the current chain.
    #[error("validation failed: {0}")]
    ValidationFailed(#[from] ChainValidationError),

    /// The candidate is valid but not strictly longer than the current chain.
    #[error("chain not extended: candidate length {candidate} does not exceed current length {current}")]
    ChainNotExtended { candidate: usize, current: usize },
}

impl SubmitError {
    /// Short machine-friendly label, used for metrics and log fields.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::PayloadParse(_) => "payload_parse",
            Self::ValidationFailed(_) => "validation_failed",
            Self::ChainNotExtended { .. } => "chain_not_extended",
        }
    }
}
