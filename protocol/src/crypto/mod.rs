//! # Cryptographic Primitives for PULSE
//!
//! Just hashing. Blocks are neither signed nor mined, so the only primitive
//! the chain needs is a collision-resistant digest to link each block to
//! its predecessor and to detect tampering.
//!
//! Everything here is a thin wrapper around the audited `sha2` crate.

pub mod hash;

pub use hash::{is_hex_digest, sha256_hex, sha256_hex_parts};
