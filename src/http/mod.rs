//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware: request ID, trace, timeout, body limit)
//!     → request.rs (decode JSON/form body, caller context)
//!     → compose::Composer
//!     → JSON envelope {ec, em, res}
//! ```

pub mod request;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{build_router, AppState, ComposeServer, COMPOSE_PATH, HISTORY_PATH};
