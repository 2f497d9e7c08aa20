//! # Concurrent Submission Arbitrator
//!
//! Every producer (one task per TCP connection, one per HTTP request)
//! funnels its submissions through a single [`Arbitrator`]. Each attempt
//! runs the same stages:
//!
//! ```text
//! ReadTip → BuildCandidate → Validate → Accepted  (store replaced, event published)
//!                                     ↘ Rejected  (store untouched, error returned)
//! ```
//!
//! The whole sequence runs under one mutex. Guarding only the final write
//! is not enough: two producers could read the same tip, both build a
//! valid-looking block 1, and both "win". With the lock held from the tip
//! read to the replace, accepted submissions are linearizable and no two
//! accepted blocks ever share an index.
//!
//! Readers never take the submission lock. They go straight to the store
//! and get a consistent snapshot.
//!
//! Parsing raw input happens before the lock is taken; a malformed line
//! costs nothing but the parse attempt.

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::EVENT_CHANNEL_CAPACITY;
use crate::error::{ChainValidationError, SubmitError};
use crate::storage::block::Block;
use crate::storage::chain::{ChainSnapshot, ChainStore};
use crate::storage::payload::{Bpm, Payload};
use crate::validation::{check_chain, check_link};

use super::events::ChainEvent;
use super::producer::{parse_payload, propose};

/// Serializes read-validate-replace sequences against one [`ChainStore`].
pub struct Arbitrator<P: Payload = Bpm> {
    store: ChainStore<P>,
    submit_lock: Mutex<()>,
    events: broadcast::Sender<ChainEvent<P>>,
}

impl<P: Payload> Arbitrator<P> {
    /// Wrap `store` with the default event channel capacity.
    pub fn new(store: ChainStore<P>) -> Self {
        Self::with_event_capacity(store, EVENT_CHANNEL_CAPACITY)
    }

    /// Wrap `store`, keeping at most `capacity` undelivered events per
    /// subscriber.
    pub fn with_event_capacity(store: ChainStore<P>, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            store,
            submit_lock: Mutex::new(()),
            events,
        }
    }

    /// Read-only access to the underlying store.
    pub fn store(&self) -> &ChainStore<P> {
        &self.store
    }

    pub fn snapshot(&self) -> ChainSnapshot<P> {
        self.store.snapshot()
    }

    /// Receive a [`ChainEvent`] for every accepted submission from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChainEvent<P>> {
        self.events.subscribe()
    }

    /// Parse `raw` and append it on top of the current tip.
    pub fn append_raw(&self, raw: &str) -> Result<Block<P>, SubmitError> {
        let payload = parse_payload::<P>(raw)?;
        self.append(payload)
    }

    /// Append `payload` on top of the current tip, atomically.
    ///
    /// Returns the accepted block.
    pub fn append(&self, payload: P) -> Result<Block<P>, SubmitError> {
        let _guard = self.submit_lock.lock();

        let base = self.store.snapshot();
        let block = propose(base.tip(), payload);
        debug!(index = block.index(), hash = %block.hash(), "candidate built");

        self.extend_locked(&base, block.clone())?;
        Ok(block)
    }

    /// Submit a block that was built outside the arbitrator, possibly from
    /// a stale snapshot. It is validated against the tip at the time the
    /// lock is acquired.
    pub fn submit_block(&self, block: Block<P>) -> Result<(), SubmitError> {
        let _guard = self.submit_lock.lock();
        let base = self.store.snapshot();
        self.extend_locked(&base, block)
    }

    /// Offer a complete alternative chain.
    ///
    /// The candidate must start at this store's genesis and be internally
    /// consistent; it is then adopted iff it is strictly longer than the
    /// current chain.
    pub fn propose_chain(&self, candidate: Vec<Block<P>>) -> Result<(), SubmitError> {
        let _guard = self.submit_lock.lock();
        check_chain(&candidate, self.store.genesis())?;
        self.replace_locked(candidate)
    }

    /// Validate `block` against `base`'s tip and offer `base + block`.
    /// Caller holds the submission lock.
    fn extend_locked(&self, base: &ChainSnapshot<P>, block: Block<P>) -> Result<(), SubmitError> {
        check_link(&block, base.tip()).map_err(|source| ChainValidationError::BrokenLink {
            position: base.len(),
            source,
        })?;

        let mut candidate = Vec::with_capacity(base.len() + 1);
        candidate.extend_from_slice(base);
        candidate.push(block);
        self.replace_locked(candidate)
    }

    /// Apply the fork-choice rule and publish on success. Caller holds the
    /// submission lock, so the length read here cannot go stale.
    fn replace_locked(&self, candidate: Vec<Block<P>>) -> Result<(), SubmitError> {
        let current = self.store.len();
        let length = candidate.len();
        if !self.store.try_replace(candidate) {
            return Err(SubmitError::ChainNotExtended {
                candidate: length,
                current,
            });
        }

        let chain = self.store.snapshot();
        let tip = chain.tip().clone();
        info!(index = tip.index(), hash = %tip.hash(), length, "chain extended");

        // No subscribers is fine.
        let _ = self.events.send(ChainEvent::Extended {
            tip,
            length,
            added: length - current,
            chain,
        });
        Ok(())
    }
}

impl<P: Payload> Default for Arbitrator<P> {
    fn default() -> Self {
        Self::new(ChainStore::new())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinkError;
    use crate::submission::producer::propose_at;
    use crate::validation::is_chain_valid;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn arbitrator() -> Arbitrator {
        Arbitrator::new(ChainStore::with_genesis(Block::genesis_at("t0")))
    }

    #[test]
    fn append_extends_tip() {
        let arb = arbitrator();
        let genesis = arb.store().genesis().clone();

        let block = arb.append(64).expect("accepted");
        assert_eq!(block.index(), 1);
        assert_eq!(block.prev_hash(), genesis.hash());
        assert_eq!(arb.store().len(), 2);
        assert_eq!(arb.store().tip(), block);
    }

    #[test]
    fn append_raw_rejects_garbage_without_touching_store() {
        let arb = arbitrator();
        let err = arb.append_raw("not a number").unwrap_err();
        assert!(matches!(err, SubmitError::PayloadParse(_)));
        assert_eq!(arb.store().len(), 1);

        let block = arb.append_raw(" 72 \n").expect("accepted");
        assert_eq!(*block.payload(), 72);
    }

    #[test]
    fn stale_block_fails_validation() {
        let arb = arbitrator();
        let stale_tip = arb.store().tip();
        arb.append(64).unwrap();

        let stale = propose(&stale_tip, 70);
        let err = arb.submit_block(stale).unwrap_err();
        match err {
            SubmitError::ValidationFailed(ChainValidationError::BrokenLink { position, source }) => {
                assert_eq!(position, 2);
                assert!(matches!(source, LinkError::IndexMismatch { expected: 2, got: 1 }));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(arb.store().len(), 2);
    }

    #[test]
    fn fresh_block_from_outside_is_accepted() {
        let arb = arbitrator();
        let block = propose(&arb.store().tip(), 64);
        arb.submit_block(block.clone()).unwrap();
        assert_eq!(arb.store().tip(), block);
    }

    #[test]
    fn stale_candidate_chain_loses_fork_choice() {
        let arb = arbitrator();
        let base = arb.snapshot();

        let mut first = base.to_vec();
        first.push(propose(base.tip(), 64));
        let mut second = base.to_vec();
        second.push(propose(base.tip(), 70));

        arb.propose_chain(first).expect("first wins");
        let err = arb.propose_chain(second).unwrap_err();
        assert_eq!(
            err,
            SubmitError::ChainNotExtended {
                candidate: 2,
                current: 2
            }
        );
        assert_eq!(*arb.store().tip().payload(), 64);
    }

    #[test]
    fn longer_fork_replaces_shorter_chain() {
        let arb = arbitrator();
        arb.append(1).unwrap();

        let genesis = arb.store().genesis().clone();
        let b1 = propose_at(&genesis, 90, "f1");
        let b2 = propose_at(&b1, 91, "f2");
        let fork = vec![genesis, b1, b2.clone()];

        arb.propose_chain(fork).unwrap();
        assert_eq!(arb.store().len(), 3);
        assert_eq!(arb.store().tip(), b2);
    }

    #[test]
    fn invalid_longer_chain_is_rejected() {
        let arb = arbitrator();
        let mut chain = arb.snapshot().to_vec();
        for p in [1, 2, 3] {
            let next = propose(chain.last().unwrap(), p);
            chain.push(next);
        }
        chain[2].payload = 99;

        let err = arb.propose_chain(chain).unwrap_err();
        assert!(matches!(err, SubmitError::ValidationFailed(_)));
        assert_eq!(arb.store().len(), 1);
    }

    #[test]
    fn foreign_genesis_chain_is_rejected() {
        let arb = arbitrator();
        let other: Block = Block::genesis_at("elsewhere");
        let b1 = propose(&other, 1);
        let b2 = propose(&b1, 2);
        let err = arb.propose_chain(vec![other, b1, b2]).unwrap_err();
        assert!(matches!(
            err,
            SubmitError::ValidationFailed(ChainValidationError::GenesisMismatch { .. })
        ));
    }

    #[test]
    fn accepted_submission_publishes_event() {
        let arb = arbitrator();
        let mut rx = arb.subscribe();

        let block = arb.append(64).unwrap();
        let event = rx.try_recv().expect("event published");
        assert_eq!(event.length(), 2);
        assert_eq!(event.tip(), &block);
        let ChainEvent::Extended { added, chain, .. } = event;
        assert_eq!(added, 1);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn rejected_submission_publishes_nothing() {
        let arb = arbitrator();
        let mut rx = arb.subscribe();
        let _ = arb.append_raw("x");
        let _ = arb.propose_chain(Vec::new());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn lagging_subscriber_drops_oldest() {
        let arb: Arbitrator =
            Arbitrator::with_event_capacity(ChainStore::with_genesis(Block::genesis_at("t0")), 2);
        let mut rx = arb.subscribe();
        for p in 0..5 {
            arb.append(p).unwrap();
        }
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(3))
        ));
        assert_eq!(rx.try_recv().unwrap().length(), 5);
        assert_eq!(rx.try_recv().unwrap().length(), 6);
    }

    #[test]
    fn concurrent_appends_are_serialized() {
        let arb = Arc::new(arbitrator());
        let workers = 8;
        let per_worker = 25;

        std::thread::scope(|s| {
            for w in 0..workers {
                let arb = Arc::clone(&arb);
                s.spawn(move || {
                    for i in 0..per_worker {
                        arb.append((w * 1000 + i) as Bpm).expect("append never loses");
                    }
                });
            }
        });

        let chain = arb.snapshot();
        assert_eq!(chain.len(), 1 + workers * per_worker);
        assert!(is_chain_valid(&chain, arb.store().genesis()));
        let indices: HashSet<u64> = chain.iter().map(Block::index).collect();
        assert_eq!(indices.len(), chain.len());
    }

    #[test]
    fn concurrent_stale_proposals_never_share_an_index() {
        let arb = Arc::new(arbitrator());
        let base = arb.snapshot();
        let contenders = 16;

        let accepted: Vec<bool> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..contenders)
                .map(|i| {
                    let arb = Arc::clone(&arb);
                    let base = base.clone();
                    s.spawn(move || {
                        let mut candidate = base.to_vec();
                        candidate.push(propose(base.tip(), i as Bpm));
                        arb.propose_chain(candidate).is_ok()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(accepted.iter().filter(|a| **a).count(), 1);
        assert_eq!(arb.store().len(), 2);
    }
}
