//! Configuration loading from disk.
//!
//! Two formats are accepted: TOML (files ending in `.toml`) and the flat
//! key=value properties format (`config.ini`). A missing file is not an
//! error; the server starts with defaults.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::schema::ServerConfig;
use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for `{key}` on line {line}: {value:?}")]
    InvalidValue {
        key: String,
        value: String,
        line: usize,
    },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from `path`.
///
/// Falls back to `ServerConfig::default()` when the file does not exist.
/// Semantic validation is left to the caller, which may still apply
/// overrides on top of the file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(ServerConfig::default());
        }
        Err(e) => return Err(ConfigError::Io(e)),
    };

    let config = if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str(&content)?
    } else {
        parse_properties(&content)?
    };

    Ok(config)
}

/// Parse the key=value format into a `ServerConfig`.
///
/// Lines starting with `#` or `!` are comments; keys and values are split on
/// the first `=` or `:` and trimmed. Unknown keys are ignored with a warning.
pub fn parse_properties(content: &str) -> Result<ServerConfig, ConfigError> {
    let mut config = ServerConfig::default();

    for (line_no, key, value) in properties(content) {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            line: line_no,
        };

        match key {
            "host" => config.host = value.to_string(),
            "port" => config.port = value.parse().map_err(|_| invalid())?,
            "root" => config.root = PathBuf::from(value),
            "defaultPage" => config.default_page = value.to_string(),
            "maxThreads" => config.max_threads = value.parse().map_err(|_| invalid())?,
            "readTimeoutSecs" => {
                config.read_timeout_secs = Some(value.parse().map_err(|_| invalid())?)
            }
            "maxHeaderLineBytes" => {
                config.limits.max_header_line_bytes = value.parse().map_err(|_| invalid())?
            }
            "maxHeaderCount" => {
                config.limits.max_header_count = value.parse().map_err(|_| invalid())?
            }
            "maxBodyBytes" => {
                config.limits.max_body_bytes = value.parse().map_err(|_| invalid())?
            }
            "logLevel" => config.observability.log_level = value.to_string(),
            "logFormat" => config.observability.log_format = value.to_string(),
            "metricsAddress" => config.observability.metrics_address = Some(value.to_string()),
            _ => tracing::warn!(key = %key, line = line_no, "Ignoring unknown config key"),
        }
    }

    Ok(config)
}

/// Iterate `(line_number, key, value)` entries of a properties document in file order.
fn properties(content: &str) -> Vec<(usize, &str, &str)> {
    content
        .lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                return None;
            }
            let (key, value) = match line.find(['=', ':']) {
                Some(pos) => (line[..pos].trim(), line[pos + 1..].trim()),
                None => (line, ""),
            };
            Some((idx + 1, key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn properties_override_defaults() {
        let config = parse_properties(
            "# lab server\nport=9090\nroot = /srv/www\ndefaultPage: home.html\nmaxThreads=4\n",
        )
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.root, PathBuf::from("/srv/www"));
        assert_eq!(config.default_page, "home.html");
        assert_eq!(config.max_threads, 4);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn properties_reject_bad_numbers() {
        let err = parse_properties("port=eighty\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, line: 1, .. } if key == "port"));
    }

    #[test]
    fn later_keys_win() {
        let config = parse_properties("port=1000\nport=2000\n").unwrap();
        assert_eq!(config.port, 2000);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.ini")).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_threads, 10);
    }

    #[test]
    fn toml_files_use_serde() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            "port = 8181\nmaxThreads = 2\n[limits]\nmaxBodyBytes = 1024\n[observability]\nlogLevel = \"debug\""
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.port, 8181);
        assert_eq!(config.max_threads, 2);
        assert_eq!(config.limits.max_body_bytes, 1024);
        assert_eq!(config.limits.max_header_count, 100);
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn loading_does_not_validate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        fs::write(&path, "port=0\nmaxThreads=0\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.port, 0);
        assert_eq!(config.max_threads, 0);
    }
}
