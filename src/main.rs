//! Minimal HTTP/1.1 file server.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                    FILE SERVER                   │
//!                         │                                                  │
//!     Client Request      │  ┌─────────┐    ┌─────────┐    ┌─────────────┐  │
//!     ────────────────────┼─▶│   net   │───▶│  http   │───▶│   routing   │──┼──▶ Document
//!                         │  │listener │    │ request │    │  resolver   │  │     Root
//!                         │  └─────────┘    └────┬────┘    └─────────────┘  │
//!                         │                      │                          │
//!                         │                      ▼                          │
//!                         │                ┌──────────┐    ┌───────────┐    │
//!                         │                │ handler  │───▶│  params   │    │
//!                         │                │ dispatch │    │store/page │    │
//!                         │                └────┬─────┘    └───────────┘    │
//!     Client Response     │                     ▼                           │
//!     ◀───────────────────┼────────────── response writer                   │
//!                         │                                                  │
//!                         │  config · observability · resilience · lifecycle │
//!                         └──────────────────────────────────────────────────┘
//! ```
//!
//! Serves static files from a document root over HTTP/1.1 with GET, HEAD,
//! POST and TRACE, one request per connection, on a bounded worker pool.

use std::path::PathBuf;

use clap::Parser;

use lab_http_server::lifecycle::{self, StartupOptions};

#[derive(Parser)]
#[command(name = "lab-http-server")]
#[command(about = "Minimal HTTP/1.1 file server", long_about = None)]
struct Cli {
    /// Configuration file (key=value, or TOML when ending in .toml)
    #[arg(short, long, default_value = "config.ini")]
    config: PathBuf,

    /// Override the configured port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the configured document root
    #[arg(short, long)]
    root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let options = StartupOptions {
        config_path: cli.config,
        port: cli.port,
        root: cli.root,
    };

    if let Err(e) = lifecycle::run(options).await {
        tracing::error!(error = %e, "Fatal startup error");
        return Err(e.into());
    }
    Ok(())
}
