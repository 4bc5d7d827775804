//! Per-request dispatch.
//!
//! # Responsibilities
//! - Drive one request through its states:
//!   `ParseRequest → Dispatch → {ServeFile | Echo | StoreAndRenderParams | NotImplemented} → Closed`
//! - Map parse and resolution failures to 400 / 404 / 501
//! - Record submitted parameters in the shared store
//! - Answer 500 for failures that happen before headers are sent
//!
//! # Design Decisions
//! - `dispatch` is pure: it decides the action from the parsed request alone
//! - No state outlives a request except the parameter store and params page
//! - A POST to a regular file records only its body parameters, while a POST
//!   to the params page records URL and body parameters merged

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::http::request::{Method, Request, RequestError, RequestParser};
use crate::http::response::{Framing, ResponseWriter, Status, OCTET_STREAM};
use crate::params::{Params, ParameterStore, ParamsPage, PARAMS_PAGE_PATH};
use crate::routing::{content_type_for, normalize, PathResolver, ResolveError};

/// Error type for request handling.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Transport failure while reading the request.
    #[error("failed to read request: {0}")]
    Request(#[source] RequestError),

    /// A resolved file could not be read.
    #[error("failed to read {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The params page could not be regenerated.
    #[error("failed to regenerate params page: {0}")]
    ParamsPage(#[source] std::io::Error),

    /// Writing the response failed.
    #[error("failed to write response: {0}")]
    Write(#[from] std::io::Error),
}

/// What to do with a parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Serve the target as a file; on success append `record` to the store.
    ServeFile { head_only: bool, record: Params },
    /// TRACE: send the received request back.
    Echo,
    /// POST to the params page: append `params`, regenerate and serve it.
    StoreAndRenderParams { params: Params },
    /// Unsupported method.
    NotImplemented,
    /// Request is unusable as sent (POST without `Content-Length`).
    BadRequest,
}

/// Decide how to answer `request`.
pub fn dispatch(request: &Request) -> Action {
    match request.method {
        Method::Get => Action::ServeFile {
            head_only: false,
            record: request.query().map(Params::from_query).unwrap_or_default(),
        },
        // HEAD never records parameters
        Method::Head => Action::ServeFile {
            head_only: true,
            record: Params::new(),
        },
        Method::Post => {
            let Some(body) = &request.body else {
                return Action::BadRequest;
            };
            let url_params = request.query().map(Params::from_query).unwrap_or_default();
            let body_params = Params::from_form(body);

            let normalized = normalize(request.path());
            if !normalized.escaped && normalized.path == PARAMS_PAGE_PATH {
                Action::StoreAndRenderParams {
                    params: url_params.merged_with(&body_params),
                }
            } else {
                Action::ServeFile {
                    head_only: false,
                    record: body_params,
                }
            }
        }
        Method::Trace => Action::Echo,
        Method::Other(_) => Action::NotImplemented,
    }
}

/// Summary of a handled request, for logs and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// `None` when the request could not be parsed.
    pub method: Option<Method>,
    pub target: Option<String>,
    /// `None` when the connection was dropped without a status.
    pub status: Option<Status>,
    pub body_bytes: usize,
}

/// Handles exactly one request per connection.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    parser: RequestParser,
    resolver: Arc<PathResolver>,
    params: Arc<ParameterStore>,
    params_page: Arc<ParamsPage>,
}

impl RequestHandler {
    pub fn new(
        parser: RequestParser,
        resolver: Arc<PathResolver>,
        params: Arc<ParameterStore>,
    ) -> Self {
        let params_page = Arc::new(ParamsPage::new(resolver.root()));
        Self {
            parser,
            resolver,
            params,
            params_page,
        }
    }

    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    pub fn resolver(&self) -> &Arc<PathResolver> {
        &self.resolver
    }

    /// Read one request from `reader` and answer it on `writer`.
    ///
    /// Returns `Ok(None)` when the peer closed the connection without
    /// sending anything.
    pub async fn handle<R, W>(&self, reader: &mut R, writer: W) -> Result<Option<Outcome>, HandlerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        // ParseRequest
        let request = match self.parser.parse(reader).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                tracing::debug!("Client closed the connection before sending a request");
                return Ok(None);
            }
            Err(e) => {
                let Some(status) = e.status() else {
                    return Err(HandlerError::Request(e));
                };
                tracing::warn!(error = %e, "Rejecting malformed request");
                let mut response = ResponseWriter::new(writer, Framing::Fixed, false);
                response.send_status(status).await?;
                close(response).await;
                return Ok(Some(Outcome {
                    method: None,
                    target: None,
                    status: Some(status),
                    body_bytes: 0,
                }));
            }
        };

        let framing = if request.wants_chunked() {
            Framing::Chunked
        } else {
            Framing::Fixed
        };
        let head_only = request.method == Method::Head;
        let mut response = ResponseWriter::new(writer, framing, head_only);

        // Dispatch
        let action = dispatch(&request);
        tracing::debug!(method = %request.method, target = %request.target, action = ?action, "Dispatching");

        let status = match self.execute(&request, action, &mut response).await {
            Ok(status) => Some(status),
            Err(HandlerError::Write(e)) => {
                tracing::warn!(error = %e, "Client connection failed mid-response");
                None
            }
            Err(e) if !response.headers_sent() => {
                tracing::error!(error = %e, "Request failed before headers were sent");
                response.send_status(Status::InternalServerError).await?;
                Some(Status::InternalServerError)
            }
            Err(e) => {
                tracing::error!(error = %e, "Request failed after headers were sent, dropping connection");
                None
            }
        };

        let body_bytes = response.body_bytes();
        close(response).await;

        Ok(Some(Outcome {
            method: Some(request.method),
            target: Some(request.target),
            status,
            body_bytes,
        }))
    }

    async fn execute<W>(
        &self,
        request: &Request,
        action: Action,
        response: &mut ResponseWriter<W>,
    ) -> Result<Status, HandlerError>
    where
        W: AsyncWrite + Unpin,
    {
        match action {
            Action::ServeFile { record, .. } => self.serve_file(request, &record, response).await,
            Action::Echo => {
                let body = echo_body(request);
                response.send(Status::Ok, OCTET_STREAM, &body).await?;
                Ok(Status::Ok)
            }
            Action::StoreAndRenderParams { params } => {
                let html = self
                    .params_page
                    .store_and_render(&self.params, &params)
                    .await
                    .map_err(HandlerError::ParamsPage)?;
                response.send(Status::Ok, "text/html", &html).await?;
                Ok(Status::Ok)
            }
            Action::NotImplemented => {
                response.send_status(Status::NotImplemented).await?;
                Ok(Status::NotImplemented)
            }
            Action::BadRequest => {
                response.send_status(Status::BadRequest).await?;
                Ok(Status::BadRequest)
            }
        }
    }

    async fn serve_file<W>(
        &self,
        request: &Request,
        record: &Params,
        response: &mut ResponseWriter<W>,
    ) -> Result<Status, HandlerError>
    where
        W: AsyncWrite + Unpin,
    {
        let resolved = match self.resolver.resolve(&request.target).await {
            Ok(resolved) => resolved,
            Err(ResolveError::PathTraversal) => {
                response.send_status(Status::BadRequest).await?;
                return Ok(Status::BadRequest);
            }
            Err(ResolveError::NotFound) => {
                response.send_status(Status::NotFound).await?;
                return Ok(Status::NotFound);
            }
        };

        let path = resolved.as_path();
        let content_type = content_type_for(path);
        let body = {
            let _page_guard = if self.params_page.is_page(path) {
                Some(self.params_page.read_lock().await)
            } else {
                None
            };
            tokio::fs::read(path).await.map_err(|source| HandlerError::File {
                path: path.display().to_string(),
                source,
            })?
        };

        self.params.append(record);

        response.send(Status::Ok, content_type, &body).await?;
        Ok(Status::Ok)
    }
}

/// Body of a TRACE response: request line, captured headers, blank line.
pub fn echo_body(request: &Request) -> Vec<u8> {
    let mut body = String::with_capacity(256);
    body.push_str(request.request_line());
    body.push_str("\r\n");
    for (name, value) in request.headers.iter() {
        body.push_str(name);
        body.push_str(": ");
        body.push_str(value);
        body.push_str("\r\n");
    }
    body.push_str("\r\n");
    body.into_bytes()
}

async fn close<W>(response: ResponseWriter<W>)
where
    W: AsyncWrite + Unpin,
{
    if let Err(e) = response.finish().await {
        tracing::debug!(error = %e, "Error closing connection");
    }
}
