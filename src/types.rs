// src/types.rs
use crate::error::ScanError;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// A network prefix exactly as the range source published it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CidrBlock(String);

impl CidrBlock {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the prefix. A bare address is accepted as a single-host block.
    pub fn network(&self) -> Result<IpNet, ScanError> {
        let text = self.0.trim();
        if let Ok(net) = text.parse::<IpNet>() {
            return Ok(net);
        }
        text.parse::<IpAddr>()
            .map(IpNet::from)
            .map_err(|e| ScanError::InvalidBlock {
                block: self.0.clone(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CidrBlock {
    fn from(prefix: &str) -> Self {
        Self::new(prefix)
    }
}

/// Contiguous run of blocks owned by a single worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    pub index: usize,
    pub blocks: Vec<CidrBlock>,
}

impl Shard {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }
}

/// Why a probe produced no verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// TCP connect failed (refused, reset, unreachable, ...)
    Unreachable,
    /// TCP connected but the TLS handshake failed
    HandshakeFailed,
    /// Per-address budget or scan deadline ran out
    TimedOut,
    /// Handshake completed without a peer certificate
    NoCertificate,
    /// Peer certificate could not be decoded as X.509
    UnparseableCertificate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::Unreachable => "unreachable",
            SkipReason::HandshakeFailed => "handshake failed",
            SkipReason::TimedOut => "timed out",
            SkipReason::NoCertificate => "no certificate",
            SkipReason::UnparseableCertificate => "unparseable certificate",
        };
        f.write_str(s)
    }
}

/// A certificate presented by `address` that contains the keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertMatch {
    pub address: IpAddr,
    pub port: u16,
    /// The CN or SAN value the keyword was found in
    pub matched_name: String,
    pub common_names: Vec<String>,
    pub alt_names: Vec<String>,
    /// SHA-256 of the leaf certificate DER, hex encoded
    pub fingerprint: String,
}

/// Result of probing one address.
#[derive(Debug)]
pub enum ProbeOutcome {
    Matched(CertMatch),
    NoMatch,
    Skipped(SkipReason),
    Failed(ScanError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Fetching,
    Partitioning,
    Scanning,
    Completed,
    Cancelled,
    Failed,
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanState::Completed | ScanState::Cancelled | ScanState::Failed
        )
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanState::Idle => "idle",
            ScanState::Fetching => "fetching",
            ScanState::Partitioning => "partitioning",
            ScanState::Scanning => "scanning",
            ScanState::Completed => "completed",
            ScanState::Cancelled => "cancelled",
            ScanState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A failure recorded against one shard.
#[derive(Debug)]
pub struct ShardFailure {
    pub shard: usize,
    /// Block being processed when the failure happened, if any
    pub block: Option<CidrBlock>,
    pub error: ScanError,
}

impl fmt::Display for ShardFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.block {
            Some(block) => write!(f, "shard {} ({}): {}", self.shard, block, self.error),
            None => write!(f, "shard {}: {}", self.shard, self.error),
        }
    }
}

/// Final result of a scan that got past fetching the range list.
///
/// Matches found before a cancellation or a shard failure are always kept.
#[derive(Debug)]
pub struct ScanOutcome {
    pub state: ScanState,
    pub matches: Vec<CertMatch>,
    pub failures: Vec<ShardFailure>,
}

impl ScanOutcome {
    /// Completed and cancelled scans are successes; failed ones are not.
    pub fn is_success(&self) -> bool {
        self.state != ScanState::Failed
    }

    pub fn addresses(&self) -> Vec<IpAddr> {
        self.matches.iter().map(|m| m.address).collect()
    }
}

/// Represents a match for output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Timestamp when the record was emitted (Unix timestamp)
    pub timestamp: u64,

    pub address: IpAddr,
    pub port: u16,
    pub keyword: String,
    pub matched_name: String,
    pub common_names: Vec<String>,
    pub alt_names: Vec<String>,
    pub fingerprint: String,
}

impl MatchRecord {
    pub fn from_match(keyword: &str, m: &CertMatch) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp().max(0) as u64,
            address: m.address,
            port: m.port,
            keyword: keyword.to_string(),
            matched_name: m.matched_name.clone(),
            common_names: m.common_names.clone(),
            alt_names: m.alt_names.clone(),
            fingerprint: m.fingerprint.clone(),
        }
    }
}
