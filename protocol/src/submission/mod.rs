//! # Submission Module
//!
//! How new blocks get onto the chain.
//!
//! ## Architecture
//!
//! ```text
//! producer.rs   — Builds a candidate block on top of a tip
//! arbitrator.rs — Serializes concurrent read-validate-replace sequences
//! events.rs     — Chain events published to transports after acceptance
//! ```
//!
//! The module is transport-agnostic. The node binary owns the sockets and
//! the HTTP router; all they do is call into the [`Arbitrator`] and listen
//! on its event channel.

pub mod arbitrator;
pub mod events;
pub mod producer;

pub use arbitrator::Arbitrator;
pub use events::ChainEvent;
pub use producer::{parse_payload, propose, propose_at};
