// src/ranges/source.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use super::types::IpRangeDocument;
use crate::types::CidrBlock;

pub const DEFAULT_RANGES_URL: &str = "https://ip-ranges.amazonaws.com/ip-ranges.json";

/// Supplies the ordered list of CIDR blocks to scan
#[async_trait]
pub trait RangeSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<CidrBlock>>;
}

/// Region/service selection over a range document. Empty lists select everything.
#[derive(Debug, Clone, Default)]
pub struct PrefixFilter {
    pub regions: Vec<String>,
    pub services: Vec<String>,
}

impl PrefixFilter {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.services.is_empty()
    }

    fn accepts(&self, region: &str, service: &str) -> bool {
        let region_ok = self.regions.is_empty()
            || self.regions.iter().any(|r| r.eq_ignore_ascii_case(region));
        let service_ok = self.services.is_empty()
            || self.services.iter().any(|s| s.eq_ignore_ascii_case(service));
        region_ok && service_ok
    }

    /// Flatten a document into blocks, in document order, dropping repeats.
    ///
    /// The same prefix is commonly listed once per service (e.g. `AMAZON` and `EC2`).
    pub fn apply(&self, doc: &IpRangeDocument) -> Vec<CidrBlock> {
        let mut seen = HashSet::new();
        let mut blocks = Vec::new();

        for prefix in &doc.prefixes {
            if !self.accepts(&prefix.region, &prefix.service) {
                continue;
            }
            if seen.insert(prefix.ip_prefix.as_str()) {
                blocks.push(CidrBlock::new(prefix.ip_prefix.clone()));
            }
        }

        debug!(
            "Selected {} unique prefixes out of {} listed",
            blocks.len(),
            doc.prefixes.len()
        );
        blocks
    }
}

/// Fetches the published range document over HTTP(S)
pub struct AwsRangeFetcher {
    http_client: reqwest::Client,
    url: String,
    filter: PrefixFilter,
}

impl AwsRangeFetcher {
    pub fn new(url: impl Into<String>, filter: PrefixFilter) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            url: url.into(),
            filter,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RangeSource for AwsRangeFetcher {
    async fn fetch(&self) -> Result<Vec<CidrBlock>> {
        info!("Fetching IP ranges from {}", self.url);

        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .context("Failed to fetch IP ranges")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch IP ranges: HTTP {}", response.status());
        }

        let doc: IpRangeDocument = response
            .json()
            .await
            .context("Failed to parse IP ranges JSON")?;

        if let Some(token) = &doc.sync_token {
            debug!("IP ranges syncToken={}", token);
        }

        let blocks = self.filter.apply(&doc);
        info!("Loaded {} CIDR blocks", blocks.len());
        Ok(blocks)
    }
}

/// Reads a saved copy of the range document from disk
pub struct FileRangeSource {
    path: PathBuf,
    filter: PrefixFilter,
}

impl FileRangeSource {
    pub fn new(path: impl Into<PathBuf>, filter: PrefixFilter) -> Self {
        Self {
            path: path.into(),
            filter,
        }
    }
}

#[async_trait]
impl RangeSource for FileRangeSource {
    async fn fetch(&self) -> Result<Vec<CidrBlock>> {
        info!("Reading IP ranges from {}", self.path.display());

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let doc: IpRangeDocument =
            serde_json::from_str(&contents).context("Failed to parse IP ranges JSON")?;

        Ok(self.filter.apply(&doc))
    }
}

/// An explicit, already known block list
#[derive(Debug, Clone, Default)]
pub struct StaticRanges {
    blocks: Vec<CidrBlock>,
}

impl StaticRanges {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blocks: prefixes.into_iter().map(CidrBlock::new).collect(),
        }
    }
}

#[async_trait]
impl RangeSource for StaticRanges {
    async fn fetch(&self) -> Result<Vec<CidrBlock>> {
        Ok(self.blocks.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranges::types::IpRangePrefix;

    fn prefix(ip_prefix: &str, region: &str, service: &str) -> IpRangePrefix {
        IpRangePrefix {
            ip_prefix: ip_prefix.to_string(),
            region: region.to_string(),
            service: service.to_string(),
            network_border_group: None,
        }
    }

    fn sample_document() -> IpRangeDocument {
        IpRangeDocument {
            sync_token: None,
            create_date: None,
            prefixes: vec![
                prefix("3.5.140.0/22", "ap-northeast-2", "AMAZON"),
                prefix("13.34.37.64/27", "ap-southeast-4", "AMAZON"),
                prefix("3.5.140.0/22", "ap-northeast-2", "S3"),
                prefix("52.93.178.234/32", "us-west-1", "EC2"),
            ],
        }
    }

    #[test]
    fn test_empty_filter_keeps_order_and_dedupes() {
        let blocks = PrefixFilter::default().apply(&sample_document());
        let strs: Vec<&str> = blocks.iter().map(|b| b.as_str()).collect();
        assert_eq!(strs, vec!["3.5.140.0/22", "13.34.37.64/27", "52.93.178.234/32"]);
    }

    #[test]
    fn test_region_filter_case_insensitive() {
        let filter = PrefixFilter {
            regions: vec!["US-WEST-1".to_string()],
            services: vec![],
        };
        let blocks = filter.apply(&sample_document());
        assert_eq!(blocks, vec![CidrBlock::new("52.93.178.234/32")]);
    }

    #[test]
    fn test_service_filter() {
        let filter = PrefixFilter {
            regions: vec![],
            services: vec!["s3".to_string()],
        };
        let blocks = filter.apply(&sample_document());
        assert_eq!(blocks, vec![CidrBlock::new("3.5.140.0/22")]);
    }

    #[tokio::test]
    async fn test_static_ranges() {
        let source = StaticRanges::new(["203.0.113.0/30", "198.51.100.0/31"]);
        let blocks = source.fetch().await.unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].as_str(), "203.0.113.0/30");
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let source = FileRangeSource::new("/nonexistent/ip-ranges.json", PrefixFilter::default());
        assert!(source.fetch().await.is_err());
    }

    #[tokio::test]
    #[ignore] // Requires internet connection
    async fn test_fetch_published_ranges() {
        let fetcher = AwsRangeFetcher::new(DEFAULT_RANGES_URL, PrefixFilter::default()).unwrap();
        let blocks = fetcher.fetch().await.unwrap();
        assert!(!blocks.is_empty(), "Should find at least some prefixes");
    }
}
