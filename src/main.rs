use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use m3u_checker::{
    config::Config,
    models::{StreamEntry, StreamEntryData, VerificationReport},
    services::{HttpProber, Prober, RetryingProber, StreamVerifier},
};

#[derive(Parser)]
#[command(name = "m3u-checker")]
#[command(version)]
#[command(about = "Check which streams of an IPTV playlist are reachable")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// JSON file holding the stream entries to verify
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Maximum number of concurrent probes (overrides config file)
    #[arg(short = 'j', long, value_name = "N")]
    concurrency: Option<usize>,

    /// Per-probe timeout, e.g. "5s" (overrides config file)
    #[arg(short, long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    timeout: Option<std::time::Duration>,

    /// Write the reachable entries to this playlist file
    #[arg(short, long, value_name = "FILE")]
    output_playlist: Option<PathBuf>,

    /// Include logo and group attributes in the written playlist
    #[arg(long)]
    public: bool,

    /// Normalize stream URLs before probing
    #[arg(long)]
    normalize: bool,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only the report
    let log_filter = format!("m3u_checker={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting M3U Checker v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(concurrency) = cli.concurrency {
        config.verifier.concurrency = concurrency;
    }
    if let Some(timeout) = cli.timeout {
        config.verifier.probe_timeout = timeout;
    }

    let mut entries = load_entries(&cli.input)?;
    info!("Loaded {} stream entries from {}", entries.len(), cli.input.display());

    if cli.normalize {
        for entry in &mut entries {
            // Unparsable URLs are probed as-is and classified by the prober
            if let Err(e) = entry.normalize() {
                warn!("{}:{} {}", entry.source_file, entry.source_line, e);
            }
        }
    }

    let http_prober = HttpProber::new(config.prober.clone())?;
    let prober: Arc<dyn Prober> = match config.prober.retry.clone() {
        Some(retry) => Arc::new(RetryingProber::new(http_prober, retry)),
        None => Arc::new(http_prober),
    };
    let verifier = StreamVerifier::new(prober, config.verifier.clone())?;

    let cancellation = CancellationToken::new();
    let ctrl_c_token = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl-C, cancelling verification run");
            ctrl_c_token.cancel();
        }
    });

    let report = verifier
        .run_with_cancellation(&entries, cancellation)
        .await;

    if let Some(path) = &cli.output_playlist {
        let count = write_playlist(path, &entries, &report, cli.public)?;
        info!("Wrote {} reachable streams to {}", count, path.display());
    }

    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.is_aborted() {
        warn!("Verification run did not complete; unverified streams were marked TIMEOUT");
    }

    Ok(())
}

fn load_entries(path: &Path) -> Result<Vec<StreamEntry>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let data: Vec<StreamEntryData> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse stream entries from {}", path.display()))?;
    Ok(data.into_iter().map(StreamEntry::from).collect())
}

fn write_playlist(
    path: &Path,
    entries: &[StreamEntry],
    report: &VerificationReport,
    public_view: bool,
) -> Result<usize> {
    let mut playlist = String::from("#EXTM3U\n");
    let mut count = 0;

    for outcome in report.outcomes.iter().filter(|o| o.status.is_ok()) {
        playlist.push_str(&entries[outcome.entry_index].to_playlist_record(public_view));
        playlist.push('\n');
        count += 1;
    }

    std::fs::write(path, playlist)
        .with_context(|| format!("Failed to write playlist {}", path.display()))?;
    Ok(count)
}
