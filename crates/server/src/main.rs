mod api;
mod bot;
mod metrics;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tubecast_core::{
    load_config, load_config_from_env, validate_config, ArchiveUploader, Collaborators, Config,
    FfmpegConverter, MediaPaths, PipelineDispatcher, TelegramClient, Uploader, YtDlpDownloader,
};

use api::create_router;
use bot::BotFrontend;
use state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tubecast {}", VERSION);

    let config = resolve_config()?;
    validate_config(&config).context("Configuration validation failed")?;
    info!("Configuration loaded successfully");

    let pipeline_config = config.pipeline_config();
    let paths = MediaPaths::new(&pipeline_config.temp_dir);
    paths
        .ensure_dir()
        .await
        .with_context(|| format!("Failed to create temp dir {:?}", paths.dir()))?;
    info!("Temp directory: {:?}", paths.dir());

    // Collaborators
    let telegram = Arc::new(
        TelegramClient::new(config.telegram.clone()).context("Failed to create Telegram client")?,
    );

    let uploader: Option<Arc<dyn Uploader>> = if config.archive.is_enabled() {
        info!("Archival enabled (item prefix {:?})", config.archive.item_prefix);
        Some(Arc::new(
            ArchiveUploader::new(config.archive.clone(), paths.clone())
                .context("Failed to create archive uploader")?,
        ))
    } else {
        info!("Archival disabled (no archive auth string configured)");
        None
    };

    let collaborators = Collaborators {
        downloader: Arc::new(YtDlpDownloader::new(
            config.downloader.clone(),
            paths.clone(),
        )),
        converter: Arc::new(FfmpegConverter::new(config.converter.clone(), paths.clone())),
        uploader,
        messaging: telegram.clone(),
    };

    // Pipeline
    let dispatcher = Arc::new(PipelineDispatcher::new(
        pipeline_config.clone(),
        collaborators,
    ));
    dispatcher
        .start(
            pipeline_config.fetch_workers,
            pipeline_config.transcode_workers,
            pipeline_config.publish_workers,
        )
        .await
        .context("Failed to start pipeline")?;

    // Bot front-end
    let (bot_shutdown_tx, bot_shutdown_rx) = broadcast::channel(1);
    let bot = BotFrontend::new(Arc::clone(&dispatcher), telegram.clone(), paths.clone());
    let bot_handle = tokio::spawn(bot.run(telegram, bot_shutdown_rx));

    // Ops API
    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&dispatcher)));
    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    let _ = bot_shutdown_tx.send(());
    if let Err(e) = bot_handle.await {
        error!("Bot poller ended abnormally: {}", e);
    }

    dispatcher.stop().await;
    info!("Shutdown complete");

    Ok(())
}

/// Loads the config file when present, otherwise defaults plus environment.
fn resolve_config() -> Result<Config> {
    let config_path = std::env::var("TUBECAST_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    if config_path.exists() {
        info!("Loading configuration from {:?}", config_path);
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))
    } else {
        info!(
            "No config file at {:?}, using environment only",
            config_path
        );
        load_config_from_env().context("Failed to load config from environment")
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
