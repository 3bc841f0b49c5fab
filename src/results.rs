// src/results.rs
use crate::types::CertMatch;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Matched addresses shared by every worker of one scan.
///
/// Cloning shares the underlying set. The first match recorded for an
/// address wins; later inserts for it are no-ops.
#[derive(Clone, Default)]
pub struct ResultSet {
    inner: Arc<Mutex<HashMap<IpAddr, CertMatch>>>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the address was not already present (and records it)
    pub async fn insert(&self, found: CertMatch) -> bool {
        let mut guard = self.inner.lock().await;
        if guard.contains_key(&found.address) {
            false
        } else {
            guard.insert(found.address, found);
            true
        }
    }

    pub async fn contains(&self, address: &IpAddr) -> bool {
        self.inner.lock().await.contains_key(address)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All matches so far, ordered by address
    pub async fn snapshot(&self) -> Vec<CertMatch> {
        let guard = self.inner.lock().await;
        let mut matches: Vec<CertMatch> = guard.values().cloned().collect();
        matches.sort_by_key(|m| m.address);
        matches
    }
}
