//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ComposerConfig (validated, immutable)
//!     → injected into the Composer and the HTTP server at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; nothing reads ambient process state
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::ComposerConfig;
pub use schema::{HistoryConfig, LimitsConfig, ListenerConfig, LocalProxyConfig, TimeoutConfig};
