//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, one task per connection)
//!     → request.rs (request line, headers, body)
//!     → handler.rs (dispatch on method and target)
//!     → routing (path resolution, content type) / params (store, page)
//!     → response.rs (status line, headers, fixed or chunked body)
//!     → Close connection
//! ```
//!
//! # Design Decisions
//! - One request per connection; the connection is closed after the response
//! - Only the subset of HTTP/1.1 needed for static files, forms and TRACE

pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use handler::{dispatch, Action, HandlerError, Outcome, RequestHandler};
pub use request::{Headers, Method, Request, RequestError, RequestParser};
pub use response::{Framing, ResponseHead, ResponseWriter, Status};
pub use server::{HttpServer, ServerError};
