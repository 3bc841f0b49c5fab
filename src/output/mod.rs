// src/output/mod.rs
//! Output handling for scan results
//!
//! Matches are emitted once the scan has reached a terminal state, to every
//! registered handler.

use crate::types::MatchRecord;
use async_trait::async_trait;
use std::sync::Arc;

pub mod human;
pub mod json;

/// Trait for output handlers that process matched hosts
#[async_trait]
pub trait OutputHandler: Send + Sync {
    /// Emit a matched host
    async fn emit_match(&self, record: &MatchRecord) -> anyhow::Result<()>;

    /// Flush any buffered output
    async fn flush(&self) -> anyhow::Result<()>;
}

/// Manager that dispatches output to multiple handlers
pub struct OutputManager {
    handlers: Vec<Arc<dyn OutputHandler>>,
}

impl OutputManager {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Arc<dyn OutputHandler>) {
        self.handlers.push(handler);
    }

    /// Emit a record to all handlers
    ///
    /// Errors from individual handlers are logged but don't stop processing.
    pub async fn emit(&self, record: &MatchRecord) -> anyhow::Result<()> {
        let mut last_error = None;

        for handler in &self.handlers {
            if let Err(e) = handler.emit_match(record).await {
                tracing::warn!("Output handler error: {}", e);
                last_error = Some(e);
            }
        }

        // Return error only if the sole handler failed
        if let Some(err) = last_error {
            if self.handlers.len() == 1 {
                return Err(err);
            }
        }

        Ok(())
    }

    pub async fn flush(&self) -> anyhow::Result<()> {
        for handler in &self.handlers {
            handler.flush().await?;
        }
        Ok(())
    }
}

impl Default for OutputManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) fn sample_record() -> MatchRecord {
    use crate::types::CertMatch;

    let found = CertMatch {
        address: "203.0.113.2".parse().unwrap(),
        port: 443,
        matched_name: "shop.keyword-example.com".to_string(),
        common_names: vec!["shop.keyword-example.com".to_string()],
        alt_names: vec![
            "shop.keyword-example.com".to_string(),
            "www.keyword-example.com".to_string(),
        ],
        fingerprint: "0f".repeat(32),
    };
    MatchRecord::from_match("keyword", &found)
}
