// src/main.rs
use anyhow::Context;
use cert_sweep::cli::Cli;
use cert_sweep::config::Config;
use cert_sweep::output::{OutputManager, human, json};
use cert_sweep::probe::TlsProber;
use cert_sweep::progress::ProgressIndicator;
use cert_sweep::scan::ScanCoordinator;
use cert_sweep::stats::ScanStats;
use cert_sweep::types::{MatchRecord, ScanState};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.validate()?;

    let config = match cli.config {
        Some(ref path) => Config::from_file(Path::new(path))
            .with_context(|| format!("Failed to load config file {}", path))?,
        None => Config::default(),
    };
    let settings = config.resolve(&cli)?;

    // Initialize logging; stdout is reserved for matches
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        "Starting cert-sweep: keyword={:?}, workers={}, port={}",
        settings.scan.keyword,
        settings.scan.workers,
        settings.port
    );

    let prober = Arc::new(TlsProber::new(settings.port, settings.probe_timeout)?);
    let source = settings.range_source()?;

    // Create output manager
    let mut output_manager = OutputManager::new();
    match (cli.json, cli.output.as_ref()) {
        (true, Some(path)) => {
            let file = std::fs::File::create(path)?;
            output_manager.add_handler(Arc::new(json::JsonOutput::to_file(file)));
            tracing::info!("Writing JSON output to: {}", path);
        }
        (true, None) => output_manager.add_handler(Arc::new(json::JsonOutput::new())),
        (false, Some(path)) => {
            let file = std::fs::File::create(path)?;
            output_manager.add_handler(Arc::new(human::HumanOutput::to_file(file)));
            tracing::info!("Writing human-readable output to: {}", path);
        }
        (false, None) => output_manager.add_handler(Arc::new(human::HumanOutput::new())),
    }

    let coordinator = ScanCoordinator::new(settings.scan.clone(), prober);
    let stats = coordinator.stats();

    let cancel = coordinator.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping scan...");
            cancel.cancel();
        }
    });

    let progress = ProgressIndicator::new(cli.should_show_progress());
    progress.set_message(format!("Fetching IP ranges for {:?}...", settings.scan.keyword));
    let ticker = progress.follow(stats.clone(), Duration::from_millis(250));

    let result = coordinator.run(source.as_ref()).await;

    if let Some(handle) = ticker {
        handle.abort();
    }
    progress.finish();

    let outcome = result?;

    for found in &outcome.matches {
        let record = MatchRecord::from_match(&settings.scan.keyword, found);
        if let Err(e) = output_manager.emit(&record).await {
            tracing::warn!("Output error: {:?}", e);
        }
    }
    output_manager.flush().await?;

    if outcome.state == ScanState::Cancelled {
        tracing::warn!("Scan stopped before every address was probed; results may be incomplete");
    }

    for failure in &outcome.failures {
        tracing::error!("{}", failure);
    }

    if cli.stats {
        let snapshot = stats.snapshot();
        eprintln!("\nFinal Statistics:");
        eprintln!("  Probed: {}", snapshot.probed);
        eprintln!("  Matched: {}", snapshot.matched);
        eprintln!("  Skipped: {}", snapshot.skipped);
        eprintln!("  Failed: {}", snapshot.failed);
        eprintln!("  Blocks completed: {}", snapshot.blocks_done);
        eprintln!("  Rate: {:.1} probes/s", snapshot.probes_per_second);
        eprintln!("  Elapsed: {}", ScanStats::format_elapsed(snapshot.elapsed_secs));
    }

    if !outcome.is_success() {
        anyhow::bail!(
            "scan failed: {} shard failure(s), {} match(es) reported",
            outcome.failures.len(),
            outcome.matches.len()
        );
    }

    Ok(())
}
