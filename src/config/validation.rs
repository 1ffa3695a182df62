//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure function: ApiConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use tracing_subscriber::EnvFilter;
use url::Url;

use crate::config::schema::ApiConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a deserialized configuration.
pub fn validate_config(config: &ApiConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let host = &config.server.host;
    if host.is_empty() || (host.parse::<IpAddr>().is_err() && host != "localhost") {
        errors.push(ValidationError {
            field: "server.host",
            message: format!("'{}' is not an IP address or 'localhost'", host),
        });
    }

    if let Some(base_url) = &config.client.base_url {
        match Url::parse(base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            Ok(url) => errors.push(ValidationError {
                field: "client.base_url",
                message: format!("unsupported base url '{}' (scheme {})", base_url, url.scheme()),
            }),
            Err(e) => errors.push(ValidationError {
                field: "client.base_url",
                message: format!("'{}': {}", base_url, e),
            }),
        }
    }

    if EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError {
            field: "observability.log_level",
            message: format!("invalid filter '{}'", config.observability.log_level),
        });
    }

    if config.observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "observability.metrics_address",
            message: format!("'{}' is not a socket address", config.observability.metrics_address),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&ApiConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ApiConfig::default();
        config.server.host = "not a host".into();
        config.client.base_url = Some("nope".into());
        config.observability.metrics_address = "9090".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["server.host", "client.base_url", "observability.metrics_address"]
        );
    }

    #[test]
    fn test_accepts_localhost_and_https() {
        let mut config = ApiConfig::default();
        config.server.host = "localhost".into();
        config.client.base_url = Some("https://api.example.com/".into());
        assert!(validate_config(&config).is_ok());
    }
}
