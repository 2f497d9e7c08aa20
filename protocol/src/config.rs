//! # Protocol Configuration & Constants
//!
//! Every magic number in PULSE lives here. The node binary reads its
//! runtime knobs from the CLI, but the defaults those knobs fall back to
//! are defined once, in this file.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Protocol version string. Bump the major component whenever the hash
/// preimage or the wire format of a block changes. Old chains stop
/// validating the moment either one does.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Chain Parameters
// ---------------------------------------------------------------------------

/// Index of the genesis block. Everything else counts up from here.
pub const GENESIS_INDEX: u64 = 0;

/// `prevHash` of the genesis block. There is no predecessor, so the link
/// is the empty string rather than a zeroed digest.
pub const GENESIS_PREV_HASH: &str = "";

/// Name of the hash function over the block preimage.
pub const HASH_FUNCTION: &str = "SHA-256";

/// Digest length in bytes. Rendered as 64 lowercase hex characters.
pub const HASH_OUTPUT_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Event Channel
// ---------------------------------------------------------------------------

/// Capacity of the chain event broadcast channel.
///
/// The channel is drop-oldest: a subscriber that falls more than this many
/// events behind loses the oldest ones and sees `RecvError::Lagged`. Every
/// event carries a full chain snapshot, so a lagged subscriber recovers on
/// the very next event it receives.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Transport Defaults
// ---------------------------------------------------------------------------

/// Default port for the raw line-oriented TCP interface.
pub const DEFAULT_TCP_PORT: u16 = 9000;

/// Default port for the HTTP/WebSocket API.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default port for the Prometheus metrics endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 9090;

/// Prompt written to raw TCP clients when they connect and after each line.
pub const TCP_PROMPT: &str = "Enter a new BPM:";

/// How often every raw TCP client receives the full chain as JSON.
pub const BROADCAST_INTERVAL: Duration = Duration::from_secs(30);

/// Longest line a raw TCP client may send. Anything longer is a client bug
/// or abuse, and the connection is dropped.
pub const MAX_LINE_LENGTH: usize = 1024;
