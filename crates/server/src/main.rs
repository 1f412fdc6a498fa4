use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mediaq_core::{
    load_config, validate_config, Config, ConfigError, Downloader, JobService, LogFormat,
    YtDlpDownloader,
};
use mediaq_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn run() -> Result<()> {
    // Determine config path
    let config_path = std::env::var("MEDIAQ_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration; logging depends on it, so report afterwards
    let (config, missing) = match load_config(&config_path) {
        Ok(config) => (config, false),
        Err(ConfigError::FileNotFound(_)) => (Config::default(), true),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to load config from {:?}", config_path))
        }
    };

    init_logging(config.logging.format);
    if missing {
        warn!("Config file {:?} not found, using defaults", config_path);
    } else {
        info!("Loaded configuration from {:?}", config_path);
    }

    validate_config(&config).context("Configuration validation failed")?;
    info!("Downloader: {:?}", config.downloader.path);
    info!("Download directory: {:?}", config.downloader.download_path);

    let downloader: Arc<dyn Downloader> =
        Arc::new(YtDlpDownloader::new(config.downloader.clone()));
    match downloader.version().await {
        Ok(version) => info!("Using {} {}", downloader.name(), version),
        Err(e) => warn!("Could not query downloader version: {}", e),
    }

    let service = Arc::new(JobService::new(&config, downloader));

    // Restore the previous session before accepting work
    match service.restore().await {
        Ok(report) => info!(
            "Restored {} jobs ({} requeued) and {} livestream watchers",
            report.session.restored, report.session.republished, report.livestreams
        ),
        Err(e) => warn!("Failed to restore previous session: {}", e),
    }

    service.start().await;

    // Periodic persistence
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let ticker = tokio::spawn(persistence_loop(
        Arc::clone(&service),
        Duration::from_secs(config.persistence.interval_secs),
        shutdown_tx.subscribe(),
    ));

    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&service)));
    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");

    info!("Server shutting down...");
    let _ = shutdown_tx.send(());
    if let Err(e) = ticker.await {
        warn!("Persistence ticker ended abnormally: {}", e);
    }

    match service.persist().await {
        Ok(()) => info!("Session persisted"),
        Err(e) => error!("Final persist failed: {}", e),
    }

    served
}

/// Write both snapshots every `interval` until shutdown.
async fn persistence_loop(
    service: Arc<JobService>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match service.persist().await {
                    Ok(()) => debug!("Periodic persist complete"),
                    Err(e) => warn!("Periodic persist failed: {}", e),
                }
            }
            _ = shutdown.recv() => break,
        }
    }
    debug!("Persistence ticker stopped");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
