//! HTTP server setup and accept loop.
//!
//! # Responsibilities
//! - Build the shared request handler from configuration
//! - Accept connections while a worker permit is available
//! - Run each connection on its own task, inside a connection span
//! - Record per-request metrics and completion logs
//! - Stop accepting on shutdown and drain in-flight connections

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::config::ServerConfig;
use crate::http::handler::RequestHandler;
use crate::http::request::RequestParser;
use crate::net::{ConnectionPermit, ConnectionTracker, Listener, ListenerError};
use crate::observability::{metrics, spans};
use crate::params::ParameterStore;
use crate::routing::PathResolver;

/// First pause after a failed accept; doubles per consecutive failure.
const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);

/// Longest pause between accept attempts.
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Pause before the next accept after `failures` consecutive errors.
fn accept_backoff(failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_BASE
        .saturating_mul(1 << exponent)
        .min(ACCEPT_BACKOFF_MAX)
}

/// Error type for server setup and operation.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The document root is missing or not a directory.
    #[error("document root {} is not usable: {source}", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// The file server: one handler shared by every connection.
#[derive(Debug)]
pub struct HttpServer {
    config: ServerConfig,
    handler: RequestHandler,
    tracker: ConnectionTracker,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails when the document root cannot be canonicalized.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let root = config.expanded_root();
        let resolver = PathResolver::new(&root, config.default_page.clone())
            .map_err(|source| ServerError::Root { path: root, source })?;

        let parser = RequestParser::new(config.limits).with_read_timeout(config.read_timeout());
        let handler = RequestHandler::new(
            parser,
            Arc::new(resolver),
            Arc::new(ParameterStore::new()),
        );

        tracing::info!(
            root = %handler.resolver().root().display(),
            default_page = %config.default_page,
            "Document root ready"
        );

        Ok(Self {
            config,
            handler,
            tracker: ConnectionTracker::new(),
        })
    }

    /// Bind a listener on the configured address, one permit per worker.
    pub async fn bind(&self) -> Result<Listener, ServerError> {
        Ok(Listener::bind(&self.config.bind_address(), self.config.max_threads).await?)
    }

    /// Run the server until `shutdown` fires, then drain connections.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(
            address = %addr,
            max_threads = listener.max_connections(),
            "HTTP server listening"
        );

        let mut failures = 0u32;
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr, permit)) => {
                        failures = 0;
                        self.spawn_connection(stream, peer_addr, permit);
                    }
                    Err(ListenerError::Closed) => break,
                    Err(e) => {
                        failures = failures.saturating_add(1);
                        let delay = accept_backoff(failures);
                        tracing::error!(
                            error = %e,
                            failures,
                            retry_in_ms = delay.as_millis() as u64,
                            "Error accepting connection"
                        );
                        tokio::select! {
                            _ = shutdown.recv() => {
                                tracing::info!("Shutdown signal received, no longer accepting connections");
                                break;
                            }
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                },
            }
        }

        drop(listener);
        let in_flight = self.tracker.active_count();
        if in_flight > 0 {
            tracing::info!(connections = in_flight, "Draining connections");
        }
        self.tracker.wait_for_shutdown().await;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, peer_addr: SocketAddr, permit: ConnectionPermit) {
        let guard = self.tracker.track();
        let span = spans::connection_span(guard.id(), peer_addr);
        let handler = self.handler.clone();

        tokio::spawn(
            async move {
                // Both are released when the connection closes
                let _permit = permit;
                let _guard = guard;
                serve_connection(&handler, stream).await;
            }
            .instrument(span),
        );
    }

    /// The process-wide parameter store.
    pub fn params(&self) -> &Arc<ParameterStore> {
        self.handler.params()
    }

    /// Canonical document root.
    pub fn root(&self) -> &Path {
        self.handler.resolver().root()
    }
}

/// Handle the single request carried by `stream`, then close it.
async fn serve_connection(handler: &RequestHandler, stream: TcpStream) {
    let start = Instant::now();
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    match handler.handle(&mut reader, write_half).await {
        Ok(Some(outcome)) => {
            let method = outcome.method.as_ref().map_or("-", |m| m.as_str());
            let status = outcome.status.map(|s| s.code());
            metrics::record_request(method, status, start);
            tracing::info!(
                method,
                target = outcome.target.as_deref().unwrap_or("-"),
                status = status.unwrap_or(0),
                bytes = outcome.body_bytes,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Request completed"
            );
        }
        Ok(None) => {}
        Err(e) => {
            metrics::record_request("-", None, start);
            tracing::warn!(error = %e, "Connection closed without a response");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_backoff_grows_and_caps() {
        assert_eq!(accept_backoff(1), Duration::from_millis(10));
        assert_eq!(accept_backoff(2), Duration::from_millis(20));
        assert_eq!(accept_backoff(4), Duration::from_millis(80));
        assert_eq!(accept_backoff(8), Duration::from_secs(1));
        assert_eq!(accept_backoff(u32::MAX), Duration::from_secs(1));
        for failures in 1..64 {
            assert!(accept_backoff(failures) > Duration::ZERO);
            assert!(accept_backoff(failures) <= accept_backoff(failures + 1));
        }
    }
}
