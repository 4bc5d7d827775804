//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use lab_http_server::config::ServerConfig;
use lab_http_server::http::HttpServer;
use lab_http_server::lifecycle::Shutdown;
use lab_http_server::net::Listener;
use lab_http_server::ParameterStore;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

/// A server running on an ephemeral port over a temporary document root.
pub struct TestServer {
    pub addr: SocketAddr,
    pub root: TempDir,
    pub params: Arc<ParameterStore>,
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server whose root holds `files` (path relative to the root, contents).
    pub async fn start(files: &[(&str, &[u8])], max_threads: usize) -> Self {
        let root = tempfile::tempdir().unwrap();
        for (path, contents) in files {
            write_file(root.path(), path, contents);
        }

        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            root: root.path().to_path_buf(),
            max_threads,
            ..ServerConfig::default()
        };
        let server = HttpServer::new(config).unwrap();
        let params = Arc::clone(server.params());

        let listener = Listener::bind("127.0.0.1:0", max_threads).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let receiver = shutdown.subscribe();
        let handle = tokio::spawn(async move {
            server.run(listener, receiver).await.unwrap();
        });

        Self {
            addr,
            root,
            params,
            shutdown,
            handle,
        }
    }

    /// Send raw bytes and read the response until the server closes.
    pub async fn send(&self, request: &[u8]) -> RawResponse {
        send_raw(self.addr, request).await
    }

    /// Trigger shutdown and wait for the accept loop to finish draining.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop in time")
            .unwrap();
    }
}

pub fn write_file(root: &Path, path: &str, contents: &[u8]) {
    let path = root.join(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> RawResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut bytes = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut bytes))
        .await
        .expect("response not received in time")
        .unwrap();
    RawResponse::parse(bytes)
}

/// A response split into status line, headers and raw body bytes.
#[derive(Debug)]
pub struct RawResponse {
    pub raw: Vec<u8>,
    pub status_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn parse(raw: Vec<u8>) -> Self {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response has no header terminator");
        let head = String::from_utf8(raw[..split].to_vec()).unwrap();
        let body = raw[split + 4..].to_vec();

        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap_or_default().to_string();
        let headers = lines
            .filter_map(|line| line.split_once(": "))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        Self {
            raw,
            status_line,
            headers,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Concatenate the payloads of a chunked body.
    pub fn dechunk(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut rest = self.body.as_slice();
        loop {
            let line_end = rest
                .windows(2)
                .position(|w| w == b"\r\n")
                .expect("chunk size line");
            let size = usize::from_str_radix(std::str::from_utf8(&rest[..line_end]).unwrap(), 16)
                .unwrap();
            rest = &rest[line_end + 2..];
            if size == 0 {
                assert_eq!(rest, b"\r\n", "missing terminating blank line");
                return out;
            }
            out.extend_from_slice(&rest[..size]);
            assert_eq!(&rest[size..size + 2], b"\r\n");
            rest = &rest[size + 2..];
        }
    }
}
