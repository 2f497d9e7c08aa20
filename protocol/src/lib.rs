// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # PULSE Protocol — Core Library
//!
//! PULSE keeps one append-only, hash-linked log of measurements that many
//! clients write to at once. This crate is the part that has to be right:
//! how a block is built, when it counts as a valid extension, and which of
//! two competing chains wins.
//!
//! ## Architecture
//!
//! - **crypto** — SHA-256, rendered as hex.
//! - **storage** — Block model, payloads, and the in-memory chain store.
//! - **validation** — Link and whole-chain validity rules.
//! - **submission** — Block production and the arbitrator that serializes
//!   concurrent submissions.
//! - **error** — Per-submission failure types.
//! - **config** — Protocol constants and transport defaults.
//!
//! Transports (raw TCP, HTTP) live in the node binary. This crate does no
//! I/O.
//!
//! ## Example
//!
//! ```
//! use pulse_protocol::storage::ChainStore;
//! use pulse_protocol::submission::Arbitrator;
//!
//! let arbitrator: Arbitrator = Arbitrator::new(ChainStore::new());
//! let block = arbitrator.append_raw("64").unwrap();
//! assert_eq!(block.index(), 1);
//! assert!(arbitrator.append_raw("sixty-four").is_err());
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod storage;
pub mod submission;
pub mod validation;

pub use error::{ChainValidationError, LinkError, PayloadParseError, SubmitError};
pub use storage::{Block, Bpm, ChainSnapshot, ChainStore, Payload};
pub use submission::{Arbitrator, ChainEvent};
pub use validation::{check_chain, check_link, is_chain_valid, is_link_valid};
