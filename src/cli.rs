// src/cli.rs
use clap::Parser;
use std::time::Duration;

/// cert-sweep: find hosts in published cloud IP ranges by TLS certificate
///
/// Enumerates every address of every published prefix, completes a TLS
/// handshake (without trusting the chain) and reports addresses whose
/// certificate CN or SAN contains the keyword.
#[derive(Parser, Debug, Clone)]
#[command(name = "cert-sweep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    // ===== Matching =====
    /// Keyword to search for in certificate subject CN and SAN entries (case-sensitive)
    #[arg(short = 'k', long = "keyword")]
    pub keyword: String,

    // ===== Performance =====
    /// Timeout for the whole scan (e.g. 10s, 500ms, 5m; bare numbers are seconds) [default: 10s]
    #[arg(short = 't', long = "timeout", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Number of concurrent workers; values <= 0 mean 1 [default: 1]
    #[arg(short = 'n', long = "threads", allow_negative_numbers = true)]
    pub threads: Option<i64>,

    /// TLS port to probe [default: 443]
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Time budget for a single address, capped by the scan timeout [default: 3s]
    #[arg(long = "probe-timeout", value_parser = parse_duration)]
    pub probe_timeout: Option<Duration>,

    /// Probe at most this many addresses from each block
    #[arg(long = "max-hosts-per-block")]
    pub max_hosts_per_block: Option<usize>,

    // ===== Ranges =====
    /// URL of the published IP range document
    #[arg(long = "ranges-url")]
    pub ranges_url: Option<String>,

    /// Read the IP range document from a local file instead of fetching it
    #[arg(long = "ranges-file", conflicts_with = "ranges_url")]
    pub ranges_file: Option<String>,

    /// Scan these CIDR blocks instead of the published document (repeatable)
    #[arg(long = "cidr")]
    pub cidrs: Vec<String>,

    /// Only scan prefixes in this region (repeatable)
    #[arg(long = "region")]
    pub regions: Vec<String>,

    /// Only scan prefixes of this service (repeatable)
    #[arg(long = "service")]
    pub services: Vec<String>,

    // ===== Input & Configuration =====
    /// Path to TOML config file
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    // ===== Output =====
    /// Output matches in JSONL format
    #[arg(short = 'j', long = "json")]
    pub json: bool,

    /// Write output to file instead of stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<String>,

    // ===== Display & Statistics =====
    /// Print scan statistics when finished
    #[arg(long = "stats")]
    pub stats: bool,

    /// Disable progress indicator
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    // ===== Logging =====
    /// Verbose logging (set log level to debug)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Quiet logging (set log level to warn)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl Cli {
    /// Validate flag combinations and return errors for invalid usage
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.keyword.is_empty() {
            anyhow::bail!("--keyword must not be empty");
        }

        if self.verbose && self.quiet {
            anyhow::bail!("Cannot specify both --verbose and --quiet");
        }

        if self.timeout.is_some_and(|t| t.is_zero()) {
            anyhow::bail!("--timeout must be greater than 0");
        }

        if self.probe_timeout.is_some_and(|t| t.is_zero()) {
            anyhow::bail!("--probe-timeout must be greater than 0");
        }

        if self.max_hosts_per_block == Some(0) {
            anyhow::bail!("--max-hosts-per-block must be greater than 0");
        }

        if !self.cidrs.is_empty() && (self.ranges_url.is_some() || self.ranges_file.is_some()) {
            anyhow::bail!("--cidr cannot be combined with --ranges-url or --ranges-file");
        }

        Ok(())
    }

    /// Check if progress indicator should be enabled
    pub fn should_show_progress(&self) -> bool {
        !self.no_progress && !self.json && !self.quiet
    }

    /// Log level forced by flags, if any
    pub fn log_level(&self) -> Option<&str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("warn")
        } else {
            None
        }
    }
}

/// Parse `250ms`, `10s`, `5m`, `1h` or a bare number of seconds
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid duration {:?}", input))?;

    let secs = match unit.trim() {
        "ms" => value / 1000.0,
        "" | "s" => value,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        other => return Err(format!("unknown duration unit {:?} in {:?}", other, input)),
    };

    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration {:?}: {}", input, e))
}
