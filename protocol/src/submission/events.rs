//! Chain events published after every accepted submission.

use serde::Serialize;

use crate::storage::block::Block;
use crate::storage::chain::ChainSnapshot;
use crate::storage::payload::Bpm;

/// Something changed in the canonical chain.
///
/// Events go out on a bounded `tokio::sync::broadcast` channel. Slow
/// subscribers lose the oldest events rather than stall the arbitrator;
/// since every event carries the full chain, the next one they do receive
/// brings them fully up to date.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChainEvent<P = Bpm> {
    /// The store adopted a longer chain.
    Extended {
        /// New tip.
        tip: Block<P>,
        /// Chain length after the replacement.
        length: usize,
        /// How many blocks the new chain added over the old one.
        added: usize,
        /// The adopted chain.
        chain: ChainSnapshot<P>,
    },
}

impl<P> ChainEvent<P> {
    /// Length of the chain this event announces.
    pub fn length(&self) -> usize {
        match self {
            Self::Extended { length, .. } => *length,
        }
    }

    pub fn tip(&self) -> &Block<P> {
        match self {
            Self::Extended { tip, .. } => tip,
        }
    }
}
