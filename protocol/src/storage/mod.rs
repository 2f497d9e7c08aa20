//! # Storage Module
//!
//! The data structures that make PULSE a chain: the block, its payload,
//! and the in-memory store that owns the canonical sequence.
//!
//! ## Architecture
//!
//! ```text
//! payload.rs — The Payload trait and the stock BPM payload
//! block.rs   — Block structure, genesis block, hash/verify operations
//! chain.rs   — Canonical chain ownership, snapshots, fork choice
//! ```
//!
//! ## Design Decisions
//!
//! 1. **SHA-256, hex-encoded.** Hashes are strings end to end. They are
//!    what clients see on the wire and what they compare.
//!
//! 2. **Memory only.** Nothing is persisted. A restart begins a new chain
//!    from a new genesis.
//!
//! 3. **Whole-chain replacement.** The store never appends in place. Every
//!    change is a swap to a strictly longer sequence, so a snapshot handed
//!    out earlier stays valid forever.

pub mod block;
pub mod chain;
pub mod payload;

pub use block::Block;
pub use chain::{ChainSnapshot, ChainStore};
pub use payload::{Bpm, Payload};
