use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use band_power_daemon::config::{load_config, SourceConfig};
use band_power_daemon::server;
use band_power_daemon::websocket_broker::{WebSocketBroker, WEBSOCKET_BUFFER_SIZE};
use clap::Parser;
use pipeline::{AcquisitionLoop, SnapshotEmitter, SystemClock};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "eeg_daemon", about = "Streams EEG band power to WebSocket clients")]
struct Args {
    /// JSON configuration file. Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use mock EEG data instead of the configured source
    #[arg(long)]
    mock: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "band_power_daemon=info,pipeline=info,sensors=info,brain_waves_fft_plugin=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("EEG band power daemon starting...");

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if args.mock {
        tracing::info!("Using mock EEG source");
        config.source = SourceConfig::default();
    }
    config.validate().context("Invalid configuration")?;
    let resolver = config.resolver()?;
    let acquisition_config = config.acquisition_config()?;

    let broker = Arc::new(WebSocketBroker::new(WEBSOCKET_BUFFER_SIZE));
    let (listener, _) = server::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Could not bind {}", config.listen_addr))?;
    let shutdown = CancellationToken::new();
    let server_handle = tokio::spawn(server::run(listener, broker.clone(), shutdown.clone()));

    // Pulls block, so the loop gets its own thread.
    let stop_flag = Arc::new(AtomicBool::new(false));
    let loop_stop_flag = stop_flag.clone();
    let mut session = tokio::task::spawn_blocking(move || {
        AcquisitionLoop::connect(
            resolver.as_ref(),
            &config.signal_type,
            acquisition_config,
            SnapshotEmitter::new(broker),
            SystemClock::new(),
        )
        .map(|acquisition| acquisition.with_stop_flag(loop_stop_flag).run())
    });

    let outcome = tokio::select! {
        finished = &mut session => finished,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Could not listen for ctrl-c")?;
            tracing::info!("Shutdown signal received. Draining acquisition...");
            stop_flag.store(true, Ordering::SeqCst);
            session.await
        }
    };

    shutdown.cancel();
    match server_handle.await {
        Ok(Err(e)) => tracing::error!("WebSocket server failed: {:#}", e),
        Err(e) => tracing::error!("WebSocket server task panicked: {}", e),
        Ok(Ok(())) => {}
    }

    let report = outcome
        .context("Acquisition task did not complete")?
        .context("Could not start acquisition")?;
    tracing::info!(
        end = ?report.end,
        samples = report.samples_admitted,
        snapshots = report.snapshots_emitted,
        "EEG band power daemon stopped."
    );
    Ok(())
}
