// src/error.rs
//! Error taxonomy for a scan.
//!
//! Skipped and timed-out probes are not errors; they are reported as
//! [`ProbeOutcome::Skipped`](crate::types::ProbeOutcome::Skipped) and never
//! leave the prober.

use std::io;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    /// The range list could not be fetched or parsed. Nothing was scanned.
    #[error("IP range source unavailable: {0:#}")]
    SourceUnavailable(anyhow::Error),

    /// A CIDR string in the range list could not be parsed.
    #[error("invalid CIDR block {block:?}: {reason}")]
    InvalidBlock { block: String, reason: String },

    /// An unexpected local error while probing (e.g. file descriptor exhaustion).
    #[error("fatal error probing {address}: {source}")]
    ProbeFatal {
        address: IpAddr,
        #[source]
        source: io::Error,
    },

    #[error("worker for shard {shard} panicked")]
    WorkerPanicked { shard: usize },
}

impl ScanError {
    /// Whether an I/O error means the local machine is out of resources,
    /// as opposed to the remote host simply not speaking TLS.
    pub fn is_resource_exhaustion(err: &io::Error) -> bool {
        if err.kind() == io::ErrorKind::OutOfMemory {
            return true;
        }
        matches!(err.raw_os_error(), Some(code) if EXHAUSTION_CODES.contains(&code))
    }
}

/// Too many open files in the system
#[cfg(any(target_os = "linux", target_os = "macos"))]
const ENFILE: i32 = 23;
/// Too many open files in this process
#[cfg(any(target_os = "linux", target_os = "macos"))]
const EMFILE: i32 = 24;
/// No buffer space available
#[cfg(target_os = "linux")]
const ENOBUFS: i32 = 105;
#[cfg(target_os = "macos")]
const ENOBUFS: i32 = 55;

#[cfg(any(target_os = "linux", target_os = "macos"))]
const EXHAUSTION_CODES: &[i32] = &[ENFILE, EMFILE, ENOBUFS];
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
const EXHAUSTION_CODES: &[i32] = &[];
