//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (parsing handles syntax)
//! - Validate value ranges (port, pool size, limits)
//! - Check that the default page is a plain file name
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - The document root's existence is checked at startup, not here

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ServerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Config key the problem refers to.
    pub field: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every problem.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.port == 0 {
        errors.push(ValidationError::new("port", "must be between 1 and 65535"));
    }

    if config.max_threads == 0 {
        errors.push(ValidationError::new("maxThreads", "must be at least 1"));
    }

    if config.default_page.is_empty() {
        errors.push(ValidationError::new("defaultPage", "must not be empty"));
    } else if config.default_page.contains('/') || config.default_page == ".." {
        errors.push(ValidationError::new(
            "defaultPage",
            "must be a file name, not a path",
        ));
    }

    if config.root.as_os_str().is_empty() {
        errors.push(ValidationError::new("root", "must not be empty"));
    }

    if config.read_timeout_secs == Some(0) {
        errors.push(ValidationError::new(
            "readTimeoutSecs",
            "must be positive when set",
        ));
    }

    let limits = &config.limits;
    if limits.max_header_line_bytes == 0 {
        errors.push(ValidationError::new("maxHeaderLineBytes", "must be positive"));
    }
    if limits.max_header_count == 0 {
        errors.push(ValidationError::new("maxHeaderCount", "must be positive"));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "logFormat",
            format!("{:?} is not one of \"pretty\", \"json\"", config.observability.log_format),
        ));
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "metricsAddress",
                format!("{addr:?} is not a socket address"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
