// src/scan/mod.rs
pub mod coordinator;
pub mod task;
pub mod worker;

pub use coordinator::{DEFAULT_SCAN_TIMEOUT, ScanConfig, ScanCoordinator};
pub use task::{CancelHandle, ScanContext, ScanTask, deadline_after};
pub use worker::{ShardReport, run_shard};
