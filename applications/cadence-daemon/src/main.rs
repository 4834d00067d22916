/// Cadence Daemon - headless playback host
use cadence_daemon::{parse_track, Command, Daemon, DaemonConfig, Flow};
use cadence_storage::SqliteLibrary;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence-daemon")]
#[command(about = "Headless Cadence playback daemon", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    /// Database URL, overriding the configuration
    #[arg(long)]
    database_url: Option<String>,

    /// Tracks to queue, as MEDIA_ID[@seconds] (e.g. ALBUMS/42|7@215)
    tracks: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cadence_daemon=info,cadence_playback=info,cadence_storage=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = DaemonConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.database_url {
        config.storage.database_url = url;
    }
    config.validate()?;

    let queue = cli
        .tracks
        .iter()
        .map(|arg| parse_track(arg, config.player.default_track_seconds))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!("Starting Cadence daemon");
    tracing::info!("Database: {}", config.storage.database_url);
    tracing::info!("Queued tracks: {}", queue.len());

    let library =
        Arc::new(SqliteLibrary::open(&config.storage.database_url, config.library.clone()).await?);
    let mut daemon = Daemon::start(&config, library, queue).await?;

    run(&mut daemon, Duration::from_millis(config.player.tick_ms)).await?;

    daemon.shutdown().await;
    Ok(())
}

/// Read commands until `quit`, end of input or Ctrl-C
async fn run(daemon: &mut Daemon, tick: Duration) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let command = match line.parse::<Command>() {
                    Ok(command) => command,
                    Err(e) => {
                        eprintln!("{e}");
                        continue;
                    }
                };
                match daemon.handle(command).await {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => eprintln!("{e}"),
                }
            }
            _ = ticker.tick() => {
                if let Err(e) = daemon.tick() {
                    tracing::error!(error = %e, "Advancing the queue failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }
    Ok(())
}
