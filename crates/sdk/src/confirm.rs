//! Inclusion tracking: from injected hash to confirmed (or lost)
//! operation.
//!
//! The tracker is a small state machine:
//!
//! ```text
//! SEARCHING_HISTORY --found, enough depth--> validate ancestry --> CONFIRMED | DROPPED
//!        |                \--found, shallow--> PENDING
//!        \--not found--> WAITING
//! WAITING  --head contains op--> PENDING (or directly CONFIRMED)
//!          --max heads seen----> TIMED_OUT
//! PENDING  --depth reached--> validate ancestry --> CONFIRMED | DROPPED
//! ```
//!
//! History is searched *first* so an operation included between
//! injection and stream subscription is never missed. The scan is an
//! explicit bounded loop with a blocks-remaining accumulator; the
//! cancellation and budget boundaries are visible, not buried in
//! recursion depth.
//!
//! Confirmation never trusts a remembered block: reaching the depth
//! threshold re-validates that the found block is still the ancestor of
//! the newest head at exactly that depth. A mismatch means the chain
//! reorganized past the operation -- a terminal [`TrackOutcome::Dropped`],
//! reported distinctly from a timeout because the operation was seen
//! and then vanished.
//!
//! Only broken streams are retried (bounded, with the search restarted
//! from scratch); nothing chain-state-dependent is ever auto-retried.

use tokio_util::sync::CancellationToken;

use config::constants::MAX_STREAM_RECONNECTS;
use tezos_core::{BlockHash, OperationHash};

use crate::chain::{ChainRpc, HeadFeed};
use crate::error::SdkError;

// ---------------------------------------------------------------------------
// Configuration and outcome
// ---------------------------------------------------------------------------

/// Budgets for one tracking run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Blocks of history scanned before subscribing to new heads.
    pub search_depth: u32,
    /// New heads observed without finding the operation before giving up.
    pub max_heads: u32,
    /// Confirmations required on top of the inclusion block.
    pub confirmations: u32,
}

impl From<&config::GatewayConfig> for TrackerConfig {
    fn from(config: &config::GatewayConfig) -> Self {
        Self {
            search_depth: config.search_depth,
            max_heads: config.max_heads,
            confirmations: config.confirmations,
        }
    }
}

/// Terminal result of a tracking run.
///
/// Timeout and reorg loss are ordinary outcomes the caller must handle,
/// not errors: a timed-out operation may still land later, a dropped
/// one will not reappear without resubmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// The operation is included and confirmed at the required depth,
    /// and its block is still on the canonical chain.
    Confirmed {
        block: BlockHash,
        level: u32,
        confirmations: u32,
    },

    /// The operation was not observed within the head budget.
    TimedOut { heads_seen: u32 },

    /// The operation was found, but a reorg replaced its block before
    /// the confirmation threshold was reached.
    Dropped { block: BlockHash, level: u32 },
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Track an operation hash to a terminal outcome.
///
/// # Errors
///
/// - [`SdkError::Cancelled`] when the token fires mid-search
/// - [`SdkError::Rpc`] when the node is unreachable beyond the bounded
///   stream-reconnect budget
pub async fn track<C: ChainRpc>(
    chain: &C,
    operation: &OperationHash,
    config: &TrackerConfig,
    cancel: &CancellationToken,
) -> Result<TrackOutcome, SdkError> {
    let mut reconnects = 0;
    loop {
        match run_once(chain, operation, config, cancel).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) if e.is_transient() && reconnects < MAX_STREAM_RECONNECTS => {
                reconnects += 1;
                tracing::warn!(
                    %operation,
                    reconnects,
                    error = %e,
                    "head stream lost, restarting inclusion search"
                );
                // Restart from the history scan: heads may have arrived
                // while the stream was down.
            }
            Err(e) => return Err(e),
        }
    }
}

/// Internal phase of the streaming half of the search.
#[derive(Debug, Clone, Copy)]
enum Phase {
    /// Operation not yet located; counting heads toward the budget.
    Waiting { heads_seen: u32 },
    /// Operation located; counting depth toward the threshold.
    Pending { block: BlockHash, level: u32 },
}

async fn run_once<C: ChainRpc>(
    chain: &C,
    operation: &OperationHash,
    config: &TrackerConfig,
    cancel: &CancellationToken,
) -> Result<TrackOutcome, SdkError> {
    if cancel.is_cancelled() {
        return Err(SdkError::Cancelled);
    }

    let head = chain.head_header().await?;

    // -- SEARCHING_HISTORY --------------------------------------------------

    let mut phase = Phase::Waiting { heads_seen: 0 };
    let mut cursor = head.clone();
    let mut remaining = config.search_depth;

    while remaining > 0 {
        if cancel.is_cancelled() {
            return Err(SdkError::Cancelled);
        }

        if chain.operation_hashes(&cursor.hash).await?.contains(operation) {
            tracing::debug!(
                %operation,
                block = %cursor.hash,
                level = cursor.level,
                "operation found in recent history"
            );
            phase = Phase::Pending {
                block: cursor.hash,
                level: cursor.level,
            };
            break;
        }

        remaining -= 1;
        if remaining == 0 || cursor.level == 0 {
            break;
        }
        cursor = chain.block_header(&cursor.predecessor).await?;
    }

    // Already deep enough? Validate and finish without a stream.
    if let Phase::Pending { block, level } = phase {
        if head.level.saturating_sub(level) >= config.confirmations {
            return validate_ancestry(chain, &head.hash, head.level, block, level).await;
        }
    }

    // -- WAITING_NEW_HEADS / FOUND_PENDING_CONFIRMATIONS --------------------

    let mut heads = chain.monitor_heads().await?;

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return Err(SdkError::Cancelled),
            next = heads.next_head() => next?,
        };

        let Some(new_head) = next else {
            // The node closed the stream; surface as transient so the
            // outer loop restarts from the history scan.
            return Err(SdkError::Rpc {
                message: "head stream closed by node".into(),
                transient: true,
            });
        };

        match phase {
            Phase::Waiting { heads_seen } => {
                let heads_seen = heads_seen + 1;

                if chain
                    .operation_hashes(&new_head.hash)
                    .await?
                    .contains(operation)
                {
                    if config.confirmations == 0 {
                        // The inclusion block is the head we just saw.
                        return Ok(TrackOutcome::Confirmed {
                            block: new_head.hash,
                            level: new_head.level,
                            confirmations: 0,
                        });
                    }
                    phase = Phase::Pending {
                        block: new_head.hash,
                        level: new_head.level,
                    };
                } else if heads_seen >= config.max_heads {
                    return Ok(TrackOutcome::TimedOut { heads_seen });
                } else {
                    phase = Phase::Waiting { heads_seen };
                }
            }

            Phase::Pending { block, level } => {
                if new_head.level >= level
                    && new_head.level - level >= config.confirmations
                {
                    return validate_ancestry(chain, &new_head.hash, new_head.level, block, level)
                        .await;
                }
            }
        }
    }
}

/// Re-check that `block` is still the canonical ancestor of `from` at
/// exactly the confirmation depth.
async fn validate_ancestry<C: ChainRpc>(
    chain: &C,
    from: &BlockHash,
    from_level: u32,
    block: BlockHash,
    level: u32,
) -> Result<TrackOutcome, SdkError> {
    let depth = from_level - level;
    let ancestor = chain.block_hash_at_offset(from, depth).await?;

    if ancestor == block {
        Ok(TrackOutcome::Confirmed {
            block,
            level,
            confirmations: depth,
        })
    } else {
        tracing::warn!(
            expected = %block,
            actual = %ancestor,
            depth,
            "inclusion block no longer on the canonical chain"
        );
        Ok(TrackOutcome::Dropped { block, level })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockChain, StreamEvent};
    use rpc::NewHead;

    fn op() -> OperationHash {
        OperationHash([0xAA; 32])
    }

    fn config(confirmations: u32) -> TrackerConfig {
        TrackerConfig {
            search_depth: 10,
            max_heads: 10,
            confirmations,
        }
    }

    #[tokio::test]
    async fn finds_operation_in_history_without_stream() {
        let chain = MockChain::new();
        // Block at the head contains the operation; head level == found level.
        let included = chain.push_block(vec![op()]);

        let outcome = track(&chain, &op(), &config(0), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TrackOutcome::Confirmed {
                block: included.hash,
                level: included.level,
                confirmations: 0,
            }
        );
        // The stream was never needed: the history scan won the race.
        assert_eq!(chain.stream_opens(), 0);
    }

    #[tokio::test]
    async fn finds_operation_deeper_in_history() {
        let chain = MockChain::new();
        let included = chain.push_block(vec![op()]);
        for _ in 0..3 {
            chain.push_block(vec![]);
        }

        let outcome = track(&chain, &op(), &config(2), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TrackOutcome::Confirmed {
                block: included.hash,
                level: included.level,
                confirmations: 3,
            }
        );
    }

    #[tokio::test]
    async fn times_out_after_exactly_max_heads() {
        let chain = MockChain::new();
        chain.push_block(vec![]); // head without the operation

        // Script more heads than the budget; none carry the operation.
        for _ in 0..25 {
            let block = chain.add_detached_block(vec![]);
            chain.script(StreamEvent::Head(NewHead {
                hash: block.hash,
                level: block.level,
            }));
        }

        let outcome = track(&chain, &op(), &config(0), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, TrackOutcome::TimedOut { heads_seen: 10 });
        // Exactly max_heads heads were consumed, not one more.
        assert_eq!(chain.heads_consumed(), 10);
    }

    #[tokio::test]
    async fn operation_in_streamed_head_confirms() {
        let chain = MockChain::new();
        chain.push_block(vec![]);

        let empty = chain.add_detached_block(vec![]);
        chain.script(StreamEvent::Head(NewHead {
            hash: empty.hash,
            level: empty.level,
        }));
        let included = chain.add_detached_block(vec![op()]);
        chain.script(StreamEvent::Head(NewHead {
            hash: included.hash,
            level: included.level,
        }));

        let outcome = track(&chain, &op(), &config(0), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TrackOutcome::Confirmed {
                block: included.hash,
                level: included.level,
                confirmations: 0,
            }
        );
    }

    #[tokio::test]
    async fn pending_confirmations_accumulate_from_stream() {
        let chain = MockChain::new();
        let included = chain.push_block(vec![op()]); // head == inclusion block

        let a = chain.add_detached_block(vec![]);
        chain.script(StreamEvent::Head(NewHead {
            hash: a.hash,
            level: a.level,
        }));
        let b = chain.add_detached_block(vec![]);
        chain.script(StreamEvent::Head(NewHead {
            hash: b.hash,
            level: b.level,
        }));

        let outcome = track(&chain, &op(), &config(2), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TrackOutcome::Confirmed {
                block: included.hash,
                level: included.level,
                confirmations: 2,
            }
        );
    }

    #[tokio::test]
    async fn reorg_yields_dropped_not_confirmed() {
        let chain = MockChain::new();
        let fork_base = chain.push_block(vec![]);
        let included = chain.push_block(vec![op()]); // level L on branch 1

        // Competing branch from the same base, without the operation.
        let rival = chain.add_block_on(&fork_base.hash, vec![]);
        let rival2 = chain.add_block_on(&rival.hash, vec![]);
        let rival3 = chain.add_block_on(&rival2.hash, vec![]);

        // New head at level L + 2 whose ancestry excludes the found block.
        chain.script(StreamEvent::Head(NewHead {
            hash: rival3.hash,
            level: rival3.level,
        }));

        let outcome = track(&chain, &op(), &config(2), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TrackOutcome::Dropped {
                block: included.hash,
                level: included.level,
            }
        );
    }

    #[tokio::test]
    async fn search_follows_canonical_chain_after_reorg() {
        let chain = MockChain::new();
        let fork_base = chain.push_block(vec![]);
        let included = chain.push_block(vec![op()]);

        // Head moves to a rival branch deep enough to satisfy the
        // confirmation threshold, but the scan still sees the stale
        // branch first (it is reachable from the rival head's history
        // via predecessor links only on the canonical side).
        let rival = chain.add_block_on(&fork_base.hash, vec![]);
        let rival2 = chain.add_block_on(&rival.hash, vec![op()]);
        chain.set_head(&rival2.hash);

        let outcome = track(&chain, &op(), &config(0), &CancellationToken::new())
            .await
            .unwrap();

        // Found on the rival branch (now canonical), confirmed there.
        assert_eq!(
            outcome,
            TrackOutcome::Confirmed {
                block: rival2.hash,
                level: rival2.level,
                confirmations: 0,
            }
        );
        let _ = included;
    }

    #[tokio::test]
    async fn stream_break_restarts_from_history_scan() {
        let chain = MockChain::new();
        chain.push_block(vec![]);

        // The inclusion block exists but is only announced via the
        // stream (it is not reachable from the current head).
        let included = chain.add_detached_block(vec![op()]);

        // First subscription breaks immediately; the retry must run a
        // fresh history scan and then open a second stream, which
        // delivers the inclusion block.
        chain.script(StreamEvent::TransportError);
        chain.script(StreamEvent::Head(NewHead {
            hash: included.hash,
            level: included.level,
        }));

        let outcome = track(&chain, &op(), &config(0), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TrackOutcome::Confirmed {
                block: included.hash,
                level: included.level,
                confirmations: 0,
            }
        );
        assert_eq!(chain.stream_opens(), 2);
    }

    #[tokio::test]
    async fn reconnect_budget_is_bounded() {
        let chain = MockChain::new();
        chain.push_block(vec![]);

        // Every subscription breaks; the budget must not loop forever.
        for _ in 0..=MAX_STREAM_RECONNECTS {
            chain.script(StreamEvent::TransportError);
        }

        let err = track(&chain, &op(), &config(0), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert_eq!(chain.stream_opens(), MAX_STREAM_RECONNECTS + 1);
    }

    #[tokio::test]
    async fn cancellation_is_honored() {
        let chain = MockChain::new();
        chain.push_block(vec![]);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = track(&chain, &op(), &config(0), &cancel).await.unwrap_err();
        assert_eq!(err, SdkError::Cancelled);
    }
}
