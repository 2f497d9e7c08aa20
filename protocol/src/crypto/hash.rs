//! # Hashing Utilities
//!
//! PULSE uses exactly one hash function: SHA-256. Block hashes are rendered
//! as lowercase hex strings because that is what travels over the wire and
//! what clients compare against. There is no binary digest type in the
//! public API.
//!
//! Incremental hashing (`sha256_hex_parts`) exists so the block hash can be
//! computed over its fields without first allocating the concatenated
//! preimage. Feeding parts one by one is equivalent to hashing their
//! concatenation.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data` and return it as lowercase hex.
///
/// # Example
///
/// ```
/// use pulse_protocol::crypto::sha256_hex;
///
/// let hash = sha256_hex(b"abc");
/// assert_eq!(
///     hash,
///     "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
/// );
/// ```
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hash the concatenation of `parts` and return the digest as lowercase hex.
///
/// No separators are inserted between parts.
pub fn sha256_hex_parts(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

/// Returns `true` if `s` looks like a rendered SHA-256 digest: exactly 64
/// lowercase hex characters.
pub fn is_hex_digest(s: &str) -> bool {
    s.len() == crate::config::HASH_OUTPUT_LENGTH * 2
        && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
