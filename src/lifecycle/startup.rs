//! Startup orchestration.
//!
//! # Responsibilities
//! - Load configuration and apply command-line overrides
//! - Initialize logging and metrics
//! - Build the server, bind the listener and serve until a stop signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The listener binds last (traffic only when ready)

use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

use crate::config::{load_config, validate_config, ConfigError, ServerConfig};
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::signals::spawn_signal_handler;
use crate::lifecycle::Shutdown;
use crate::observability::logging::{init_logging, LoggingError};
use crate::observability::metrics;

/// Error type for startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("invalid metrics address: {0}")]
    MetricsAddress(#[from] AddrParseError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Values taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    pub config_path: PathBuf,
    pub port: Option<u16>,
    pub root: Option<PathBuf>,
}

/// Load the configuration file and apply overrides on top of it.
pub fn prepare_config(options: &StartupOptions) -> Result<ServerConfig, ConfigError> {
    let mut config = load_config(&options.config_path)?;

    if let Some(port) = options.port {
        config.port = port;
    }
    if let Some(root) = &options.root {
        config.root = root.clone();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Start the server and run it until SIGINT/SIGTERM.
pub async fn run(options: StartupOptions) -> Result<(), StartupError> {
    // 1. Configuration
    let config = prepare_config(&options)?;

    // 2. Logging
    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "lab-http-server starting");
    if !options.config_path.exists() {
        tracing::warn!(
            path = %options.config_path.display(),
            "Could not load config file, using default settings"
        );
    }
    tracing::info!(
        bind_address = %config.bind_address(),
        root = %config.root.display(),
        max_threads = config.max_threads,
        read_timeout_secs = ?config.read_timeout_secs,
        "Configuration loaded"
    );

    // 3. Metrics
    if let Some(address) = &config.observability.metrics_address {
        let addr: SocketAddr = address.parse()?;
        metrics::init_metrics(addr)?;
    }

    // 4. Server and listener
    let server = HttpServer::new(config)?;
    let listener = server.bind().await?;

    // 5. Serve until a stop signal
    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let signals = spawn_signal_handler(shutdown);

    server.run(listener, receiver).await?;
    signals.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}
