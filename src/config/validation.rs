//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid, limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ComposerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ComposerConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} {value:?}")]
    InvalidAddress { field: &'static str, value: String },
    #[error("proxy.host must not be empty")]
    EmptyProxyHost,
    #[error("proxy.port must not be 0")]
    ZeroProxyPort,
    #[error("{0} must be greater than 0")]
    Zero(&'static str),
}

pub fn validate_config(config: &ComposerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.proxy.host.trim().is_empty() {
        errors.push(ValidationError::EmptyProxyHost);
    }
    if config.proxy.port == 0 {
        errors.push(ValidationError::ZeroProxyPort);
    }

    let positive = [
        ("limits.max_request_body", config.limits.max_request_body as u64),
        ("limits.max_response_body", config.limits.max_response_body as u64),
        ("limits.max_head_size", config.limits.max_head_size as u64),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }
    if config.history.enabled && config.history.capacity == 0 {
        errors.push(ValidationError::Zero("history.capacity"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
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
    fn defaults_are_valid() {
        assert_eq!(validate_config(&ComposerConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = ComposerConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.proxy.port = 0;
        config.limits.max_response_body = 0;
        config.history.capacity = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroProxyPort));
        assert!(errors.contains(&ValidationError::Zero("limits.max_response_body")));
    }

    #[test]
    fn history_capacity_ignored_when_disabled() {
        let mut config = ComposerConfig::default();
        config.history.enabled = false;
        config.history.capacity = 0;
        assert!(validate_config(&config).is_ok());
    }
}
