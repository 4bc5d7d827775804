//! Response framing and emission.
//!
//! # Responsibilities
//! - Build status line and headers for a response
//! - Emit the body as one block (`Content-Length`) or as chunks
//! - Suppress the body for HEAD while keeping the headers
//! - Track whether headers already reached the client
//!
//! # Design Decisions
//! - Headers are flushed before the first body byte
//! - Chunks carry at most `CHUNK_SIZE` bytes, sizes in lowercase hex
//! - Bodiless status responses always use `Content-Length: 0`

use std::fmt;

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Largest payload of a single chunk.
pub const CHUNK_SIZE: usize = 4096;

/// Media type for anything that is not recognized.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Response statuses produced by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    InternalServerError,
    NotImplemented,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::InternalServerError => 500,
            Status::NotImplemented => 501,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::InternalServerError => "Internal Server Error",
            Status::NotImplemented => "Not Implemented",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// How the body is delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `Content-Length` followed by the whole body.
    Fixed,
    /// `Transfer-Encoding: chunked`.
    Chunked,
}

/// Status line and headers of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: Status,
    pub framing: Framing,
    /// Body length in bytes. Only written for `Framing::Fixed`.
    pub content_length: usize,
    pub content_type: Option<String>,
}

impl ResponseHead {
    /// Head of a response without a body.
    pub fn status_only(status: Status) -> Self {
        Self {
            status,
            framing: Framing::Fixed,
            content_length: 0,
            content_type: None,
        }
    }

    /// Header lines without the status line, as `(name, value)` pairs.
    pub fn header_lines(&self) -> Vec<(&'static str, String)> {
        let mut lines = Vec::with_capacity(2);
        match self.framing {
            Framing::Fixed => lines.push(("Content-Length", self.content_length.to_string())),
            Framing::Chunked => lines.push(("Transfer-Encoding", "chunked".to_string())),
        }
        if let Some(content_type) = &self.content_type {
            lines.push(("Content-Type", content_type.clone()));
        }
        lines
    }

    /// Serialize status line, headers and the terminating blank line.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = format!("HTTP/1.1 {}\r\n", self.status);
        for (name, value) in self.header_lines() {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(&value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out.into_bytes()
    }
}

/// Append the chunked encoding of `body`, terminator included, to `out`.
pub fn encode_chunked(body: &[u8], out: &mut Vec<u8>) {
    for chunk in body.chunks(CHUNK_SIZE) {
        out.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        out.extend_from_slice(chunk);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"0\r\n\r\n");
}

/// Writes exactly one response to a connection.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    inner: W,
    framing: Framing,
    head_only: bool,
    headers_sent: bool,
    body_bytes: usize,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    /// Create a writer. `head_only` suppresses body bytes (HEAD requests).
    pub fn new(inner: W, framing: Framing, head_only: bool) -> Self {
        Self {
            inner,
            framing,
            head_only,
            headers_sent: false,
            body_bytes: 0,
        }
    }

    /// Whether status line and headers were already flushed.
    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    /// Body bytes written so far.
    pub fn body_bytes(&self) -> usize {
        self.body_bytes
    }

    /// Send a complete response with `body`.
    pub async fn send(
        &mut self,
        status: Status,
        content_type: &str,
        body: &[u8],
    ) -> std::io::Result<()> {
        let head = ResponseHead {
            status,
            framing: self.framing,
            content_length: body.len(),
            content_type: Some(content_type.to_string()),
        };
        self.write_head(&head).await?;

        if self.head_only {
            return Ok(());
        }

        match self.framing {
            Framing::Fixed => {
                self.inner.write_all(body).await?;
            }
            Framing::Chunked => {
                let mut framed = Vec::with_capacity(body.len() + 16 * (body.len() / CHUNK_SIZE + 2));
                encode_chunked(body, &mut framed);
                self.inner.write_all(&framed).await?;
            }
        }
        self.body_bytes += body.len();
        self.inner.flush().await
    }

    /// Send a response consisting of the status line only.
    pub async fn send_status(&mut self, status: Status) -> std::io::Result<()> {
        self.write_head(&ResponseHead::status_only(status)).await
    }

    async fn write_head(&mut self, head: &ResponseHead) -> std::io::Result<()> {
        if self.headers_sent {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "response headers already sent",
            ));
        }
        // Mark before writing: a partial header write cannot be followed by another response
        self.headers_sent = true;
        self.inner.write_all(&head.encode()).await?;
        self.inner.flush().await?;

        tracing::info!(status = %head.status, "Response status");
        for (name, value) in head.header_lines() {
            tracing::debug!(header = name, value = %value, "Response header");
        }
        Ok(())
    }

    /// Shut down the write side after the response.
    pub async fn finish(mut self) -> std::io::Result<W> {
        self.inner.shutdown().await?;
        Ok(self.inner)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
