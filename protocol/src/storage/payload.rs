//! Block payloads.
//!
//! A payload is whatever a producer attaches to a block: in the stock node
//! it is a single heart-rate reading in beats per minute. The chain does not
//! care what the value means, only that it has a fixed textual encoding for
//! the hash preimage and can be parsed from a raw text token.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::PayloadParseError;

/// Heart rate in beats per minute. The payload type the node runs with.
pub type Bpm = i64;

/// A value that can ride inside a [`Block`](super::block::Block).
///
/// `Default` is the genesis payload. `encode` is part of the hash preimage:
/// changing it for an existing type invalidates every chain built with it.
pub trait Payload:
    Clone + Debug + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Canonical text encoding fed to the block hash.
    fn encode(&self) -> String;

    /// Parse a raw text token (one line from a socket, say). Surrounding
    /// whitespace is ignored.
    fn parse(raw: &str) -> Result<Self, PayloadParseError>;
}

macro_rules! integer_payload {
    ($($t:ty),* $(,)?) => {$(
        impl Payload for $t {
            /// Base-10, no padding, `-` prefix for negatives.
            fn encode(&self) -> String {
                self.to_string()
            }

            fn parse(raw: &str) -> Result<Self, PayloadParseError> {
                raw.trim()
                    .parse::<$t>()
                    .map_err(|e| PayloadParseError::new(raw, e))
            }
        }
    )*};
}

integer_payload!(i32, i64, u32, u64);

impl Payload for String {
    fn encode(&self) -> String {
        self.clone()
    }

    fn parse(raw: &str) -> Result<Self, PayloadParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PayloadParseError::new(raw, "empty payload"));
        }
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_encoding_is_plain_decimal() {
        assert_eq!(64i64.encode(), "64");
        assert_eq!((-7i64).encode(), "-7");
        assert_eq!(0u64.encode(), "0");
    }

    #[test]
    fn integer_parse_trims_whitespace() {
        assert_eq!(<Bpm as Payload>::parse(" 72\r\n").unwrap(), 72);
    }

    #[test]
    fn integer_parse_rejects_garbage() {
        let err = <Bpm as Payload>::parse("seventy").unwrap_err();
        assert_eq!(err.input, "seventy");

        assert!(<u32 as Payload>::parse("-1").is_err());
        assert!(<i64 as Payload>::parse("").is_err());
        assert!(<i64 as Payload>::parse("7.5").is_err());
    }

    #[test]
    fn string_payload_rejects_blank() {
        assert!(<String as Payload>::parse("   ").is_err());
        assert_eq!(<String as Payload>::parse(" resting ").unwrap(), "resting");
    }

    #[test]
    fn default_is_zero() {
        assert_eq!(Bpm::default(), 0);
    }
}
