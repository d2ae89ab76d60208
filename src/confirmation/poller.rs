//! Bounded block scan for a submitted transaction.
//!
//! # Responsibilities
//! - Fetch sequential blocks from a start height
//! - Stop when a block lists the transaction id, or after `max_blocks` fetches
//!
//! Every fetch counts toward the bound, failed ones included. A failed fetch
//! retries the same height. An optional deadline ends the scan early as a
//! timeout; otherwise the wait is cancelled only by dropping the future.

use std::time::Duration;

use thiserror::Error;
use tokio::time::{self, Instant};

use crate::chain::client::SharedChainRpc;
use crate::config::schema::ConfirmationConfig;
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_blocks: u32,
    pub delay: Duration,
}

impl PollPolicy {
    /// Single-purpose flows such as account creation.
    pub fn single(config: &ConfirmationConfig) -> Self {
        Self {
            max_blocks: config.single_max_blocks,
            delay: Duration::from_millis(config.single_delay_ms),
        }
    }

    /// Multi-action flows.
    pub fn composite(config: &ConfirmationConfig) -> Self {
        Self {
            max_blocks: config.composite_max_blocks,
            delay: Duration::from_millis(config.composite_delay_ms),
        }
    }
}

/// Where the transaction was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub block_num: u32,
    pub attempts: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfirmationError {
    #[error("Check block for transaction timeout! ({attempts} blocks scanned from {start_height})")]
    Timeout { start_height: u32, attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Scanning { cursor: u32, attempts: u32 },
    Found(Confirmation),
    TimedOut { attempts: u32 },
}

pub struct ConfirmationPoller {
    client: SharedChainRpc,
    policy: PollPolicy,
    deadline: Option<Instant>,
}

impl ConfirmationPoller {
    pub fn new(client: SharedChainRpc, policy: PollPolicy) -> Self {
        Self { client, policy, deadline: None }
    }

    /// Give up at `deadline` even if blocks remain in the budget. A fetch cut
    /// short by the deadline still counts as an attempt.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// One fetch from `Scanning`. Never sleeps.
    async fn step(&self, cursor: u32, attempts: u32, transaction_id: &str) -> ScanState {
        let attempts = attempts + 1;
        let next_cursor = match self.client.get_block(cursor).await {
            Ok(block) if block.contains(transaction_id) => {
                return ScanState::Found(Confirmation { block_num: block.block_num, attempts });
            }
            Ok(_) => cursor.saturating_add(1),
            Err(e) => {
                tracing::debug!(block_num = cursor, attempts, error = %e, "Block fetch failed, retrying height");
                cursor
            }
        };

        if attempts >= self.policy.max_blocks {
            ScanState::TimedOut { attempts }
        } else {
            ScanState::Scanning { cursor: next_cursor, attempts }
        }
    }

    /// Scan from `start_height` until `transaction_id` appears in a block.
    pub async fn wait(&self, start_height: u32, transaction_id: &str) -> Result<Confirmation, ConfirmationError> {
        let mut state = if self.policy.max_blocks == 0 {
            ScanState::TimedOut { attempts: 0 }
        } else {
            ScanState::Scanning { cursor: start_height, attempts: 0 }
        };

        loop {
            match state {
                ScanState::Scanning { cursor, attempts } => {
                    if attempts > 0 {
                        let wake = Instant::now() + self.policy.delay;
                        time::sleep_until(self.deadline.map_or(wake, |d| wake.min(d))).await;
                    }
                    state = match self.deadline {
                        None => self.step(cursor, attempts, transaction_id).await,
                        Some(deadline) if Instant::now() >= deadline => ScanState::TimedOut { attempts },
                        Some(deadline) => {
                            match time::timeout_at(deadline, self.step(cursor, attempts, transaction_id)).await {
                                Ok(next) => next,
                                Err(_) => {
                                    tracing::debug!(block_num = cursor, attempts, "Confirmation deadline reached mid-fetch");
                                    ScanState::TimedOut { attempts: attempts + 1 }
                                }
                            }
                        }
                    };
                }
                ScanState::Found(confirmation) => {
                    metrics::record_confirmation(confirmation.attempts, true);
                    tracing::info!(
                        transaction_id,
                        block_num = confirmation.block_num,
                        attempts = confirmation.attempts,
                        "Transaction confirmed"
                    );
                    return Ok(confirmation);
                }
                ScanState::TimedOut { attempts } => {
                    metrics::record_confirmation(attempts, false);
                    tracing::warn!(transaction_id, start_height, attempts, "Transaction not found in scanned blocks");
                    return Err(ConfirmationError::Timeout { start_height, attempts });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::client::ChainRpc;
    use crate::chain::transaction::PackedTransaction;
    use crate::chain::types::{
        Block, ChainError, ChainInfo, ChainResult, ReceiptTrx, SubmittedTransaction, TableRows,
        TableRowsRequest, TransactionReceipt,
    };
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// Serves blocks; `target` lands in `found_at`, heights in `failing` error out once.
    struct ScriptedNode {
        found_at: Option<u32>,
        failing: Mutex<HashSet<u32>>,
        fetched: Mutex<Vec<u32>>,
        fetch_delay: Duration,
    }

    impl ScriptedNode {
        fn new(found_at: Option<u32>, failing: &[u32]) -> Arc<Self> {
            Arc::new(Self {
                found_at,
                failing: Mutex::new(failing.iter().copied().collect()),
                fetched: Mutex::new(Vec::new()),
                fetch_delay: Duration::ZERO,
            })
        }

        fn with_fetch_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
            let mut node = Arc::try_unwrap(self).ok().unwrap();
            node.fetch_delay = delay;
            Arc::new(node)
        }

        fn fetched(&self) -> Vec<u32> {
            self.fetched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChainRpc for ScriptedNode {
        async fn get_info(&self) -> ChainResult<ChainInfo> {
            Err(ChainError::Rpc("unused".to_string()))
        }

        async fn get_block(&self, block_num: u32) -> ChainResult<Block> {
            self.fetched.lock().unwrap().push(block_num);
            if !self.fetch_delay.is_zero() {
                tokio::time::sleep(self.fetch_delay).await;
            }
            if self.failing.lock().unwrap().remove(&block_num) {
                return Err(ChainError::Rpc("block not yet produced".to_string()));
            }
            let transactions = if self.found_at == Some(block_num) {
                vec![TransactionReceipt {
                    status: Some("executed".to_string()),
                    trx: ReceiptTrx::Id("abcdef".to_string()),
                }]
            } else {
                vec![]
            };
            Ok(Block {
                block_num,
                timestamp: "2024-01-01T00:00:00.000".to_string(),
                ref_block_prefix: 0,
                transactions,
            })
        }

        async fn get_table_rows(&self, _request: &TableRowsRequest) -> ChainResult<TableRows> {
            Ok(TableRows::default())
        }

        async fn push_transaction(&self, _trx: &PackedTransaction) -> ChainResult<SubmittedTransaction> {
            Err(ChainError::Rpc("unused".to_string()))
        }
    }

    fn policy(max_blocks: u32) -> PollPolicy {
        PollPolicy { max_blocks, delay: Duration::from_millis(1) }
    }

    #[tokio::test]
    async fn test_found_after_six_fetches() {
        let node = ScriptedNode::new(Some(105), &[]);
        let poller = ConfirmationPoller::new(node.clone(), policy(20));

        let confirmation = poller.wait(100, "abcdef").await.unwrap();
        assert_eq!(confirmation, Confirmation { block_num: 105, attempts: 6 });
        assert_eq!(node.fetched(), vec![100, 101, 102, 103, 104, 105]);
    }

    #[tokio::test]
    async fn test_never_found_stops_at_bound() {
        let node = ScriptedNode::new(None, &[]);
        let poller = ConfirmationPoller::new(node.clone(), policy(20));

        let err = poller.wait(100, "abcdef").await.unwrap_err();
        assert_eq!(err, ConfirmationError::Timeout { start_height: 100, attempts: 20 });
        assert_eq!(node.fetched().len(), 20);
        assert_eq!(*node.fetched().last().unwrap(), 119);
    }

    #[tokio::test]
    async fn test_failed_fetch_retries_height_and_counts() {
        let node = ScriptedNode::new(Some(102), &[101]);
        let poller = ConfirmationPoller::new(node.clone(), policy(20));

        let confirmation = poller.wait(100, "abcdef").await.unwrap();
        assert_eq!(confirmation.attempts, 4);
        assert_eq!(node.fetched(), vec![100, 101, 101, 102]);
    }

    #[tokio::test]
    async fn test_failures_exhaust_bound() {
        let node = ScriptedNode::new(Some(100), &[100]);
        let poller = ConfirmationPoller::new(node.clone(), policy(1));

        assert!(poller.wait(100, "abcdef").await.is_err());
        assert_eq!(node.fetched(), vec![100]);
    }

    #[tokio::test]
    async fn test_zero_budget_fetches_nothing() {
        let node = ScriptedNode::new(Some(100), &[]);
        let poller = ConfirmationPoller::new(node.clone(), policy(0));

        let err = poller.wait(100, "abcdef").await.unwrap_err();
        assert_eq!(err, ConfirmationError::Timeout { start_height: 100, attempts: 0 });
        assert!(node.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_id_must_match_exactly() {
        let node = ScriptedNode::new(Some(100), &[]);
        let poller = ConfirmationPoller::new(node.clone(), policy(3));

        let err = poller.wait(100, "ABCDEF").await.unwrap_err();
        assert_eq!(err, ConfirmationError::Timeout { start_height: 100, attempts: 3 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cuts_slow_scan() {
        let node = ScriptedNode::new(None, &[]).with_fetch_delay(Duration::from_secs(10));
        let poller = ConfirmationPoller::new(node.clone(), policy(20))
            .with_deadline(Instant::now() + Duration::from_secs(15));

        let err = poller.wait(100, "abcdef").await.unwrap_err();
        // first fetch done at 10s, second cut off at 15s
        assert_eq!(err, ConfirmationError::Timeout { start_height: 100, attempts: 2 });
        assert_eq!(node.fetched(), vec![100, 101]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_unused_when_scan_is_fast() {
        let node = ScriptedNode::new(Some(103), &[]);
        let poller = ConfirmationPoller::new(node.clone(), policy(20))
            .with_deadline(Instant::now() + Duration::from_secs(60));

        let confirmation = poller.wait(100, "abcdef").await.unwrap();
        assert_eq!(confirmation, Confirmation { block_num: 103, attempts: 4 });
    }

    #[test]
    fn test_presets_from_config() {
        let config = ConfirmationConfig::default();
        assert_eq!(PollPolicy::single(&config).max_blocks, 20);
        assert_eq!(PollPolicy::single(&config).delay, Duration::from_millis(500));
        assert_eq!(PollPolicy::composite(&config).max_blocks, 40);
        assert_eq!(PollPolicy::composite(&config).delay, Duration::from_millis(100));
    }
}
