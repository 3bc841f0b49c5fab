// src/stats.rs
//! Live counters for a running scan

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::types::ProbeOutcome;

/// Thread-safe scan counters
#[derive(Clone)]
pub struct ScanStats {
    probed: Arc<AtomicU64>,
    matched: Arc<AtomicU64>,
    skipped: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
    blocks_done: Arc<AtomicU64>,
    start_time: Instant,
}

/// Snapshot of statistics at a point in time
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub probed: u64,
    pub matched: u64,
    pub skipped: u64,
    pub failed: u64,
    pub blocks_done: u64,
    pub probes_per_second: f64,
    pub elapsed_secs: u64,
}

impl ScanStats {
    pub fn new() -> Self {
        Self {
            probed: Arc::new(AtomicU64::new(0)),
            matched: Arc::new(AtomicU64::new(0)),
            skipped: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
            blocks_done: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Count one finished probe by its outcome
    pub fn record(&self, outcome: &ProbeOutcome) {
        self.probed.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            ProbeOutcome::Matched(_) => &self.matched,
            ProbeOutcome::NoMatch => return,
            ProbeOutcome::Skipped(_) => &self.skipped,
            ProbeOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_blocks(&self) {
        self.blocks_done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let elapsed = self.start_time.elapsed();
        let probed = self.probed.load(Ordering::Relaxed);

        let rate = if elapsed.as_secs_f64() > 0.0 {
            probed as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        StatsSnapshot {
            probed,
            matched: self.matched.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            blocks_done: self.blocks_done.load(Ordering::Relaxed),
            probes_per_second: rate,
            elapsed_secs: elapsed.as_secs(),
        }
    }

    /// Format statistics as a human-readable string
    pub fn format_stats(&self) -> String {
        let s = self.snapshot();
        format!(
            "{} probed | {} matched | {} skipped | {} failed | {} blocks | {:.1} probes/s | elapsed: {}",
            s.probed,
            s.matched,
            s.skipped,
            s.failed,
            s.blocks_done,
            s.probes_per_second,
            Self::format_elapsed(s.elapsed_secs)
        )
    }

    pub fn format_elapsed(secs: u64) -> String {
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

impl Default for ScanStats {
    fn default() -> Self {
        Self::new()
    }
}
