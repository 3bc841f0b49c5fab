// src/scan/coordinator.rs
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

use super::task::{CancelHandle, ScanContext, ScanTask, deadline_after};
use super::worker::{ShardReport, run_shard};
use crate::error::ScanError;
use crate::probe::Prober;
use crate::ranges::{RangeSource, partition};
use crate::results::ResultSet;
use crate::stats::ScanStats;
use crate::types::{ScanOutcome, ScanState, ShardFailure};

pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub keyword: String,
    /// Wall-clock budget for the whole scan, counted from the end of fetching
    pub timeout: Duration,
    pub workers: usize,
    pub max_hosts_per_block: Option<usize>,
}

impl ScanConfig {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            timeout: DEFAULT_SCAN_TIMEOUT,
            workers: 1,
            max_hosts_per_block: None,
        }
    }
}

/// Drives one scan: fetch, partition, fan out one worker per shard, join.
///
/// A coordinator is consumed by [`ScanCoordinator::run`]; build a new one
/// for every scan.
pub struct ScanCoordinator {
    config: ScanConfig,
    prober: Arc<dyn Prober>,
    results: ResultSet,
    stats: ScanStats,
    cancel_tx: Arc<watch::Sender<bool>>,
    state_tx: watch::Sender<ScanState>,
}

impl ScanCoordinator {
    pub fn new(config: ScanConfig, prober: Arc<dyn Prober>) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        let (state_tx, _) = watch::channel(ScanState::Idle);

        Self {
            config,
            prober,
            results: ResultSet::new(),
            stats: ScanStats::new(),
            cancel_tx: Arc::new(cancel_tx),
            state_tx,
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::new(Arc::clone(&self.cancel_tx))
    }

    pub fn stats(&self) -> ScanStats {
        self.stats.clone()
    }

    pub fn state(&self) -> ScanState {
        *self.state_tx.borrow()
    }

    /// Observe state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<ScanState> {
        self.state_tx.subscribe()
    }

    fn transition(&self, to: ScanState) {
        let from = self.state_tx.send_replace(to);
        info!("Scan state: {} -> {}", from, to);
    }

    /// Run the scan to a terminal state.
    ///
    /// Returns `Err` only when the range list is unavailable. Every other
    /// outcome, including shard failures and cancellation, is an `Ok`
    /// carrying all matches found.
    pub async fn run(self, source: &dyn RangeSource) -> Result<ScanOutcome, ScanError> {
        self.transition(ScanState::Fetching);
        let blocks = match source.fetch().await {
            Ok(blocks) => blocks,
            Err(e) => {
                self.transition(ScanState::Failed);
                return Err(ScanError::SourceUnavailable(e));
            }
        };

        self.transition(ScanState::Partitioning);
        let block_count = blocks.len();
        let shards = partition(blocks, self.config.workers);

        self.transition(ScanState::Scanning);
        let deadline = deadline_after(self.config.timeout);
        let context = ScanContext::new(
            self.config.keyword.as_str(),
            deadline,
            self.config.max_hosts_per_block,
            self.cancel_tx.subscribe(),
        );

        info!(
            "Scanning {} blocks with {} workers (timeout {:?})",
            block_count,
            shards.len(),
            self.config.timeout
        );

        let handles: Vec<_> = shards
            .into_iter()
            .map(|shard| {
                let index = shard.index;
                let task = ScanTask {
                    shard,
                    context: context.clone(),
                };
                let handle = tokio::spawn(run_shard(
                    task,
                    Arc::clone(&self.prober),
                    self.results.clone(),
                    self.stats.clone(),
                ));
                async move { (index, handle.await) }
            })
            .collect();
        drop(context);

        let mut failures: Vec<ShardFailure> = Vec::new();
        let mut interrupted = false;

        for (index, joined) in join_all(handles).await {
            match joined {
                Ok(ShardReport {
                    interrupted: shard_interrupted,
                    failures: shard_failures,
                    ..
                }) => {
                    interrupted |= shard_interrupted;
                    failures.extend(shard_failures);
                }
                Err(e) => {
                    error!("Worker for shard {} did not complete: {}", index, e);
                    failures.push(ShardFailure {
                        shard: index,
                        block: None,
                        error: ScanError::WorkerPanicked { shard: index },
                    });
                }
            }
        }

        let state = if !failures.is_empty() {
            ScanState::Failed
        } else if interrupted {
            ScanState::Cancelled
        } else {
            ScanState::Completed
        };
        self.transition(state);

        let matches = self.results.snapshot().await;
        info!(
            "Scan {}: {} matches, {} failures ({})",
            state,
            matches.len(),
            failures.len(),
            self.stats.format_stats()
        );

        Ok(ScanOutcome {
            state,
            matches,
            failures,
        })
    }
}
