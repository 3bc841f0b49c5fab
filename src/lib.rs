// src/lib.rs
// Library interface for cert-sweep
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod probe;
pub mod progress;
pub mod ranges;
pub mod results;
pub mod scan;
pub mod stats;
pub mod types;

pub use error::ScanError;
pub use scan::{ScanConfig, ScanCoordinator};
pub use types::{CertMatch, CidrBlock, ProbeOutcome, ScanOutcome, ScanState};
