// src/scan/worker.rs
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

use super::task::ScanTask;
use crate::probe::Prober;
use crate::ranges::enumerate_hosts;
use crate::results::ResultSet;
use crate::stats::ScanStats;
use crate::types::{ProbeOutcome, ShardFailure};

/// What one worker did with its shard
#[derive(Debug)]
pub struct ShardReport {
    pub shard: usize,
    pub probed: u64,
    /// Stopped by the deadline or a cancel before finishing the shard
    pub interrupted: bool,
    pub failures: Vec<ShardFailure>,
}

/// Probe every address of every block in the shard, one at a time.
///
/// An unparseable block is recorded and skipped. A fatal probe error is
/// recorded and ends the shard; nothing else does.
pub async fn run_shard(
    task: ScanTask,
    prober: Arc<dyn Prober>,
    results: ResultSet,
    stats: ScanStats,
) -> ShardReport {
    let ScanTask { shard, mut context } = task;
    let index = shard.index;
    let keyword = Arc::clone(&context.keyword);
    let deadline = context.deadline;

    let mut report = ShardReport {
        shard: index,
        probed: 0,
        interrupted: false,
        failures: Vec::new(),
    };

    debug!("Shard {}: starting with {} blocks", index, shard.len());

    for block in shard.blocks {
        let net = match block.network() {
            Ok(net) => net,
            Err(error) => {
                warn!("Shard {}: {}", index, error);
                report.failures.push(ShardFailure {
                    shard: index,
                    block: Some(block),
                    error,
                });
                continue;
            }
        };

        debug!("Shard {}: scanning {}", index, net);

        for address in enumerate_hosts(&net, context.max_hosts_per_block) {
            if context.is_stopped() {
                report.interrupted = true;
                return report;
            }

            let outcome = tokio::select! {
                biased;
                _ = context.stopped() => {
                    report.interrupted = true;
                    return report;
                }
                outcome = prober.probe(address, &keyword, deadline) => outcome,
            };

            stats.record(&outcome);
            report.probed += 1;

            match outcome {
                ProbeOutcome::Matched(found) => {
                    let name = found.matched_name.clone();
                    if results.insert(found).await {
                        info!("{}: certificate name {} contains keyword", address, name);
                    }
                }
                ProbeOutcome::NoMatch => trace!("{}: no match", address),
                ProbeOutcome::Skipped(reason) => trace!("{}: skipped ({})", address, reason),
                ProbeOutcome::Failed(error) => {
                    error!("Shard {}: {}; abandoning shard", index, error);
                    report.failures.push(ShardFailure {
                        shard: index,
                        block: Some(block),
                        error,
                    });
                    return report;
                }
            }
        }

        stats.increment_blocks();
    }

    debug!("Shard {}: finished after {} probes", index, report.probed);
    report
}
