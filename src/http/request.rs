//! Request parsing.
//!
//! # Responsibilities
//! - Read the request line and split it into method, target and protocol
//! - Collect header lines until the blank line
//! - Require a `Host` header
//! - Read exactly `Content-Length` bytes of body when present
//!
//! # Design Decisions
//! - Incremental parsing over any `AsyncBufRead`, so tests drive it from byte slices
//! - Malformed header lines are skipped, never fatal
//! - A closed connection before the first line is `Ok(None)`, not an error
//! - Size limits are checked while reading, before anything is buffered in full

use std::fmt;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::config::LimitsConfig;
use crate::http::response::Status;
use crate::resilience::timeouts::{with_timeout, Elapsed};

/// Error type for request parsing.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Too few tokens or a protocol token not starting with `HTTP/`.
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    /// No `Host` header was sent.
    #[error("missing Host header")]
    MissingHost,

    /// The stream ended between the request line and the blank line.
    #[error("connection closed before end of headers")]
    IncompleteHeaders,

    /// A request or header line exceeded the configured limit.
    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    /// More header lines than the configured limit.
    #[error("more than {limit} headers")]
    TooManyHeaders { limit: usize },

    /// `Content-Length` above the configured limit.
    #[error("body of {length} bytes exceeds limit of {limit}")]
    BodyTooLarge { length: usize, limit: usize },

    /// Transport failure, including a body shorter than `Content-Length`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client did not finish sending the request in time.
    #[error("request not received: {0}")]
    Timeout(#[from] Elapsed),
}

impl RequestError {
    /// Status to answer with, or `None` when the connection should just be closed.
    pub fn status(&self) -> Option<Status> {
        match self {
            RequestError::Io(_) | RequestError::Timeout(_) => None,
            _ => Some(Status::BadRequest),
        }
    }
}

/// Request method. Matching is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Trace,
    Other(String),
}

impl Method {
    pub fn parse(token: &str) -> Self {
        match token {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "TRACE" => Method::Trace,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Trace => "TRACE",
            Method::Other(token) => token,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request headers in arrival order.
///
/// Names are case-sensitive. A repeated name replaces the earlier value but
/// keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a header.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// A parsed request. Owned by the connection that read it.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Raw request target, query included.
    pub target: String,
    pub protocol: String,
    pub headers: Headers,
    /// Present iff `Content-Length` was a valid non-negative integer.
    pub body: Option<Vec<u8>>,
    request_line: String,
}

impl Request {
    /// The request line exactly as received.
    pub fn request_line(&self) -> &str {
        &self.request_line
    }

    /// Whether the client asked for a chunked response (`chunked: yes`).
    pub fn wants_chunked(&self) -> bool {
        self.headers
            .get("chunked")
            .is_some_and(|v| v.eq_ignore_ascii_case("yes"))
    }

    /// Parsed `Content-Length`, if present and valid.
    pub fn content_length(&self) -> Option<usize> {
        parse_content_length(&self.headers)
    }

    /// Path component of the target (everything before the first `?`).
    pub fn path(&self) -> &str {
        split_target(&self.target).0
    }

    /// Query component of the target, if any.
    pub fn query(&self) -> Option<&str> {
        split_target(&self.target).1
    }
}

/// Split a request target at the first `?`.
pub fn split_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    }
}

fn parse_content_length(headers: &Headers) -> Option<usize> {
    headers.get("Content-Length")?.trim().parse().ok()
}

/// Incremental parser for a single request.
#[derive(Debug, Clone, Copy)]
pub struct RequestParser {
    limits: LimitsConfig,
    read_timeout: Option<Duration>,
}

impl RequestParser {
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            limits,
            read_timeout: None,
        }
    }

    /// Bound the time allowed for receiving a whole request.
    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Parse one request from `reader`.
    ///
    /// Returns `Ok(None)` for an empty request: the peer closed the
    /// connection without sending a single line.
    pub async fn parse<R>(&self, reader: &mut R) -> Result<Option<Request>, RequestError>
    where
        R: AsyncBufRead + Unpin,
    {
        with_timeout(self.read_timeout, self.parse_request(reader)).await?
    }

    async fn parse_request<R>(&self, reader: &mut R) -> Result<Option<Request>, RequestError>
    where
        R: AsyncBufRead + Unpin,
    {
        // 1. Request line
        let Some(request_line) = self.read_line(reader).await? else {
            return Ok(None);
        };
        tracing::debug!(request_line = %request_line, "Request line received");

        let tokens: Vec<&str> = request_line.split(' ').collect();
        if tokens.len() < 3 || !tokens[2].starts_with("HTTP/") {
            return Err(RequestError::MalformedRequestLine(request_line));
        }
        let method = Method::parse(tokens[0]);
        let target = tokens[1].to_string();
        let protocol = tokens[2].to_string();

        // 2. Headers
        let mut headers = Headers::new();
        let mut header_lines = 0usize;
        loop {
            let line = self
                .read_line(reader)
                .await?
                .ok_or(RequestError::IncompleteHeaders)?;
            if line.is_empty() {
                break;
            }

            header_lines += 1;
            if header_lines > self.limits.max_header_count {
                return Err(RequestError::TooManyHeaders {
                    limit: self.limits.max_header_count,
                });
            }

            match line.split_once(": ") {
                Some((name, value)) => {
                    let (name, value) = (name.trim(), value.trim());
                    tracing::debug!(header = %name, value = %value, "Request header");
                    headers.insert(name, value);
                }
                None => tracing::debug!(line = %line, "Ignoring malformed header line"),
            }
        }

        if !headers.contains("Host") {
            return Err(RequestError::MissingHost);
        }

        // 3. Body
        let body = match parse_content_length(&headers) {
            Some(length) => {
                if length > self.limits.max_body_bytes {
                    return Err(RequestError::BodyTooLarge {
                        length,
                        limit: self.limits.max_body_bytes,
                    });
                }
                Some(read_body(reader, length).await?)
            }
            None => None,
        };

        Ok(Some(Request {
            method,
            target,
            protocol,
            headers,
            body,
            request_line,
        }))
    }

    /// Read one line without its terminator (`\n` or `\r\n`).
    ///
    /// `Ok(None)` means end of stream before any byte of the line.
    async fn read_line<R>(&self, reader: &mut R) -> Result<Option<String>, RequestError>
    where
        R: AsyncBufRead + Unpin,
    {
        let limit = self.limits.max_header_line_bytes;
        let mut buf = Vec::new();
        // One byte of slack for the terminator itself
        let read = (&mut *reader)
            .take(limit as u64 + 2)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            return Ok(None);
        }

        let terminated = buf.last() == Some(&b'\n');
        if terminated {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        if buf.len() > limit {
            return Err(RequestError::LineTooLong { limit });
        }

        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }
}

/// Read exactly `length` bytes. A short stream is an `UnexpectedEof` error.
async fn read_body<R>(reader: &mut R, length: usize) -> Result<Vec<u8>, RequestError>
where
    R: AsyncBufRead + Unpin,
{
    let mut body = vec![0u8; length];
    let mut filled = 0;
    while filled < length {
        let n = reader.read(&mut body[filled..]).await?;
        if n == 0 {
            return Err(RequestError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("body ended after {filled} of {length} bytes"),
            )));
        }
        filled += n;
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parse(raw: &[u8]) -> Result<Option<Request>, RequestError> {
        let mut reader = raw;
        RequestParser::new(LimitsConfig::default())
            .parse(&mut reader)
            .await
    }

    #[tokio::test]
    async fn parses_request_line_and_headers() {
        let request = parse(b"GET /index.html?a=1 HTTP/1.1\r\nHost: x\r\nAccept: */*\r\n\r\n")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(request.method, Method::Get);
        assert_eq!(request.target, "/index.html?a=1");
        assert_eq!(request.path(), "/index.html");
        assert_eq!(request.query(), Some("a=1"));
        assert_eq!(request.protocol, "HTTP/1.1");
        assert_eq!(request.headers.get("Host"), Some("x"));
        assert_eq!(request.headers.get("Accept"), Some("*/*"));
        assert!(request.body.is_none());
        assert_eq!(request.request_line(), "GET /index.html?a=1 HTTP/1.1");
    }

    #[tokio::test]
    async fn accepts_bare_newlines() {
        let request = parse(b"GET / HTTP/1.0\nHost: x\n\n").await.unwrap().unwrap();
        assert_eq!(request.protocol, "HTTP/1.0");
    }

    #[tokio::test]
    async fn empty_stream_is_not_an_error() {
        assert!(parse(b"").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_short_request_line() {
        let err = parse(b"GET /\r\nHost: x\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, RequestError::MalformedRequestLine(_)));
        assert_eq!(err.status(), Some(Status::BadRequest));
    }

    #[tokio::test]
    async fn rejects_bad_protocol_token() {
        let err = parse(b"GET / FTP/1.1\r\nHost: x\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, RequestError::MalformedRequestLine(_)));
    }

    #[tokio::test]
    async fn requires_host_header() {
        let err = parse(b"GET / HTTP/1.1\r\nAccept: */*\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, RequestError::MissingHost));
        assert_eq!(err.status(), Some(Status::BadRequest));
    }

    #[tokio::test]
    async fn malformed_header_lines_are_skipped() {
        let request = parse(b"GET / HTTP/1.1\r\nnonsense\r\nHost: x\r\nKey:novalue\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.headers.len(), 1);
        assert!(!request.headers.contains("Key"));
    }

    #[tokio::test]
    async fn duplicate_headers_last_write_wins() {
        let request = parse(b"GET / HTTP/1.1\r\nHost: a\r\nX: 1\r\nHost: b\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.headers.get("Host"), Some("b"));
        let names: Vec<_> = request.headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["Host", "X"]);
    }

    #[tokio::test]
    async fn header_names_are_case_sensitive() {
        let err = parse(b"GET / HTTP/1.1\r\nhost: x\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, RequestError::MissingHost));
    }

    #[tokio::test]
    async fn reads_exact_body() {
        let request = parse(b"POST /f HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nhelloEXTRA")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.body.as_deref(), Some(&b"hello"[..]));
        assert_eq!(request.content_length(), Some(5));
    }

    #[tokio::test]
    async fn short_body_is_io_failure() {
        let err = parse(b"POST /f HTTP/1.1\r\nHost: x\r\nContent-Length: 10\r\n\r\nabc")
            .await
            .unwrap_err();
        match err {
            RequestError::Io(ref e) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn invalid_content_length_means_no_body() {
        let request = parse(b"POST /f HTTP/1.1\r\nHost: x\r\nContent-Length: -3\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert!(request.body.is_none());
        assert!(request.content_length().is_none());
    }

    #[tokio::test]
    async fn chunked_flag_is_case_insensitive() {
        let request = parse(b"GET / HTTP/1.1\r\nHost: x\r\nchunked: YES\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert!(request.wants_chunked());

        let request = parse(b"GET / HTTP/1.1\r\nHost: x\r\nchunked: no\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert!(!request.wants_chunked());
    }

    #[tokio::test]
    async fn truncated_headers_are_rejected() {
        let err = parse(b"GET / HTTP/1.1\r\nHost: x\r\n").await.unwrap_err();
        assert!(matches!(err, RequestError::IncompleteHeaders));
    }

    #[tokio::test]
    async fn enforces_limits() {
        let limits = LimitsConfig {
            max_header_line_bytes: 16,
            max_header_count: 2,
            max_body_bytes: 4,
        };
        let parser = RequestParser::new(limits);

        let mut reader: &[u8] = b"GET /a-very-long-target HTTP/1.1\r\n\r\n";
        let err = parser.parse(&mut reader).await.unwrap_err();
        assert!(matches!(err, RequestError::LineTooLong { limit: 16 }));

        let mut reader: &[u8] = b"GET / HTTP/1.1\r\nHost: x\r\nA: 1\r\nB: 2\r\n\r\n";
        let err = parser.parse(&mut reader).await.unwrap_err();
        assert!(matches!(err, RequestError::TooManyHeaders { limit: 2 }));

        let parser = RequestParser::new(LimitsConfig {
            max_body_bytes: 4,
            ..LimitsConfig::default()
        });
        let mut reader: &[u8] = b"POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nhello";
        let err = parser.parse(&mut reader).await.unwrap_err();
        assert!(matches!(err, RequestError::BodyTooLarge { length: 5, limit: 4 }));
    }

    #[tokio::test]
    async fn stalled_client_times_out() {
        let (mut client, server) = tokio::io::duplex(64);
        let parser = RequestParser::new(LimitsConfig::default())
            .with_read_timeout(Some(Duration::from_millis(50)));

        tokio::io::AsyncWriteExt::write_all(&mut client, b"GET / HTTP/1.1\r\n")
            .await
            .unwrap();
        let mut reader = tokio::io::BufReader::new(server);
        let err = parser.parse(&mut reader).await.unwrap_err();
        assert!(matches!(err, RequestError::Timeout(_)));
        assert!(err.status().is_none());
        drop(client);
    }
}
