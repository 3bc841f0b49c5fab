// src/probe/mod.rs
//! Per-address certificate probing.

use crate::types::ProbeOutcome;
use async_trait::async_trait;
use std::net::IpAddr;
use tokio::time::Instant;

pub mod matcher;
pub mod tls;

pub use matcher::CertificateFields;
pub use tls::TlsProber;

/// Probes a single address for a certificate containing a keyword.
///
/// Implementations must return by `deadline`; running out of time is
/// [`ProbeOutcome::Skipped`], not a failure.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, address: IpAddr, keyword: &str, deadline: Instant) -> ProbeOutcome;
}
