//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (key=value or TOML)
//!     → loader.rs (parse & deserialize, missing file = defaults)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → shared via Arc to the server and every connection task
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults so an absent file still starts the server
//! - Validation separates syntactic (parsing) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_properties, ConfigError};
pub use schema::{LimitsConfig, ObservabilityConfig, ServerConfig};
pub use validation::{validate_config, ValidationError};
