//! Routing subsystem: request targets to files.
//!
//! # Data Flow
//! ```text
//! Request target ("/docs/../a.html?x=1")
//!     → resolver.rs (strip query, normalize, reject escapes)
//!     → canonicalize under the document root
//!     → directory? append default page
//!     → Return: ResolvedPath, PathTraversal or NotFound
//!
//! ResolvedPath
//!     → content_type.rs (suffix → media type)
//! ```
//!
//! # Design Decisions
//! - Root canonicalized at startup, immutable at runtime
//! - Lexical check first, filesystem check second
//! - Deterministic: same target always resolves to the same file

pub mod content_type;
pub mod resolver;

pub use content_type::content_type_for;
pub use resolver::{normalize, NormalizedPath, PathResolver, ResolveError, ResolvedPath};
