//! # Block Producer
//!
//! Builds the next block on top of a given tip. Construction is pure and
//! infallible: there is no I/O, no signing, no validation. Whatever can go
//! wrong with raw input goes wrong in [`parse_payload`], before a block is
//! ever attempted.

use crate::error::PayloadParseError;
use crate::storage::block::{now_timestamp, Block};
use crate::storage::payload::Payload;

/// Build a block extending `tip`, stamped with the current time.
pub fn propose<P: Payload>(tip: &Block<P>, payload: P) -> Block<P> {
    propose_at(tip, payload, now_timestamp())
}

/// Build a block extending `tip` with an explicit timestamp.
pub fn propose_at<P: Payload>(tip: &Block<P>, payload: P, timestamp: impl Into<String>) -> Block<P> {
    Block::from_parts(tip.index() + 1, timestamp.into(), payload, tip.hash().to_string())
}

/// Turn one raw text token from a submitter into a payload.
pub fn parse_payload<P: Payload>(raw: &str) -> Result<P, PayloadParseError> {
    P::parse(raw)
}
