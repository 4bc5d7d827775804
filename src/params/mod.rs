//! Submitted-parameter subsystem.
//!
//! # Data Flow
//! ```text
//! GET query string / POST body
//!     → query.rs (form-urlencoded decoding, URL + body merge)
//!     → store.rs (append-only, shared via Arc by every connection)
//!     → render.rs (HTML table of every stored value)
//!     → page.rs (<root>/params_info.html, regenerated on POST)
//! ```
//!
//! # Design Decisions
//! - The store lives as long as the server that owns it; there is no global
//! - Appends are atomic per request; rendering sees a consistent snapshot
//! - Page regeneration and page reads are serialized by one lock

pub mod page;
pub mod query;
pub mod render;
pub mod store;

pub use page::{ParamsPage, PARAMS_PAGE_FILE, PARAMS_PAGE_PATH};
pub use query::Params;
pub use render::render_params_page;
pub use store::ParameterStore;
