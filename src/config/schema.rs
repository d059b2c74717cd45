//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the composer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the request composer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ComposerConfig {
    /// Listener for the compose endpoint.
    pub listener: ListenerConfig,

    /// Local intercepting proxy every composed request goes through.
    pub proxy: LocalProxyConfig,

    /// TLS policy for tunnels to TLS-bearing schemes.
    pub tls: TlsPolicyConfig,

    /// Size limits.
    pub limits: LimitsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Compose history.
    pub history: HistoryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8900").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8900".to_string(),
        }
    }
}

/// Address of the local intercepting proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocalProxyConfig {
    pub host: String,
    pub port: u16,
}

impl Default for LocalProxyConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8899,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TlsPolicyConfig {
    /// Verify server certificates on tunnels to TLS schemes.
    pub reject_unauthorized: bool,
}

/// Size limits in bytes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted compose POST body.
    pub max_request_body: usize,

    /// Response bodies above this are dropped from the result.
    pub max_response_body: usize,

    /// Largest accepted response head from the local proxy.
    pub max_head_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_body: 3 * 1024 * 1024,
            max_response_body: 512 * 1024,
            max_head_size: 64 * 1024,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connecting to the local proxy, in seconds.
    pub connect_secs: u64,

    /// Total time the compose endpoint may take to answer, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,

    /// Entries kept before the oldest is evicted.
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 120,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
