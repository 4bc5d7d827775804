//! Per-connection spans.
//!
//! Every event logged while a connection is handled is nested under a
//! `connection` span, so the pretty and JSON outputs both carry the
//! connection ID, the peer and a request ID that correlates them.

use std::net::SocketAddr;

use tracing::Span;
use uuid::Uuid;

use crate::net::connection::ConnectionId;

/// A fresh request ID.
pub fn request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span wrapping the whole lifetime of one connection.
pub fn connection_span(connection_id: ConnectionId, peer_addr: SocketAddr) -> Span {
    tracing::info_span!(
        "connection",
        connection_id = %connection_id,
        peer_addr = %peer_addr,
        request_id = %request_id(),
    )
}
