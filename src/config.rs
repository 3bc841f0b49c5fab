// src/config.rs

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::Cli;
use crate::probe::tls::{DEFAULT_PROBE_TIMEOUT, DEFAULT_TLS_PORT};
use crate::ranges::partition::normalize_workers;
use crate::ranges::source::DEFAULT_RANGES_URL;
use crate::ranges::{AwsRangeFetcher, FileRangeSource, PrefixFilter, RangeSource, StaticRanges};
use crate::scan::{DEFAULT_SCAN_TIMEOUT, ScanConfig};

#[derive(Debug, Deserialize, Clone)]
pub struct ScanSection {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_threads")]
    pub threads: i64,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default)]
    pub max_hosts_per_block: Option<usize>,
}

fn default_timeout_secs() -> u64 { DEFAULT_SCAN_TIMEOUT.as_secs() }
fn default_threads() -> i64 { 1 }
fn default_port() -> u16 { DEFAULT_TLS_PORT }
fn default_probe_timeout_ms() -> u64 { DEFAULT_PROBE_TIMEOUT.as_millis() as u64 }

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            threads: default_threads(),
            port: default_port(),
            probe_timeout_ms: default_probe_timeout_ms(),
            max_hosts_per_block: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceSection {
    #[serde(default = "default_ranges_url")]
    pub url: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub cidrs: Vec<String>,  // Replaces the published document
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub services: Vec<String>,
}

fn default_ranges_url() -> String {
    DEFAULT_RANGES_URL.to_string()
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            url: default_ranges_url(),
            file: None,
            cidrs: Vec::new(),
            regions: Vec::new(),
            services: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&contents)?;
        Ok(cfg)
    }

    /// Apply CLI overrides. Precedence: CLI > config file > defaults.
    ///
    /// The merged values are validated, so a config file cannot set what
    /// the command line would reject.
    pub fn resolve(&self, cli: &Cli) -> anyhow::Result<Settings> {
        let timeout = cli
            .timeout
            .unwrap_or(Duration::from_secs(self.scan.timeout_secs));
        let workers = normalize_workers(cli.threads.unwrap_or(self.scan.threads));

        let filter = PrefixFilter {
            regions: if cli.regions.is_empty() {
                self.source.regions.clone()
            } else {
                cli.regions.clone()
            },
            services: if cli.services.is_empty() {
                self.source.services.clone()
            } else {
                cli.services.clone()
            },
        };

        let cli_source = if !cli.cidrs.is_empty() {
            Some(SourceSelection::Static(cli.cidrs.clone()))
        } else if let Some(file) = &cli.ranges_file {
            Some(SourceSelection::File(file.clone()))
        } else {
            cli.ranges_url.clone().map(SourceSelection::Url)
        };

        let source = cli_source.unwrap_or_else(|| {
            if !self.source.cidrs.is_empty() {
                SourceSelection::Static(self.source.cidrs.clone())
            } else if let Some(file) = &self.source.file {
                SourceSelection::File(file.clone())
            } else {
                SourceSelection::Url(self.source.url.clone())
            }
        });

        let settings = Settings {
            scan: ScanConfig {
                keyword: cli.keyword.clone(),
                timeout,
                workers,
                max_hosts_per_block: cli.max_hosts_per_block.or(self.scan.max_hosts_per_block),
            },
            port: cli.port.unwrap_or(self.scan.port),
            probe_timeout: cli
                .probe_timeout
                .unwrap_or(Duration::from_millis(self.scan.probe_timeout_ms)),
            source,
            filter,
            log_level: cli
                .log_level()
                .map(str::to_string)
                .unwrap_or_else(|| self.logging.level.clone()),
        };

        settings.validate()?;
        Ok(settings)
    }
}

/// Where the CIDR list comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelection {
    Url(String),
    File(String),
    Static(Vec<String>),
}

/// Fully resolved run settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub scan: ScanConfig,
    pub port: u16,
    pub probe_timeout: Duration,
    pub source: SourceSelection,
    pub filter: PrefixFilter,
    pub log_level: String,
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scan.keyword.is_empty() {
            anyhow::bail!("keyword must not be empty");
        }

        if self.scan.timeout.is_zero() {
            anyhow::bail!("scan timeout must be greater than 0");
        }

        if self.probe_timeout.is_zero() {
            anyhow::bail!("probe timeout must be greater than 0");
        }

        if self.scan.max_hosts_per_block == Some(0) {
            anyhow::bail!("max_hosts_per_block must be greater than 0");
        }

        Ok(())
    }

    pub fn range_source(&self) -> anyhow::Result<Arc<dyn RangeSource>> {
        let source: Arc<dyn RangeSource> = match &self.source {
            SourceSelection::Url(url) => {
                Arc::new(AwsRangeFetcher::new(url.clone(), self.filter.clone())?)
            }
            SourceSelection::File(path) => {
                Arc::new(FileRangeSource::new(path.clone(), self.filter.clone()))
            }
            SourceSelection::Static(cidrs) => Arc::new(StaticRanges::new(cidrs.iter().cloned())),
        };
        Ok(source)
    }
}
