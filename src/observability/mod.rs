//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout log stream
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the HTTP layer into every log line of a compose
//! - Metrics are cheap (atomic increments) and no-ops until a recorder is installed
//! - Only the binary installs a subscriber; the library just emits events

pub mod logging;
pub mod metrics;
