//! Request composer: builds requests authored in a debugging UI and forwards
//! them through a local intercepting proxy as HTTP, WebSocket or raw tunnels.

pub mod body;
pub mod compose;
pub mod config;
pub mod forward;
pub mod headers;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use compose::{CallerContext, ComposeResponse, ComposedRequest, Composer, ForwardResult};
pub use config::ComposerConfig;
pub use http::ComposeServer;
pub use lifecycle::Shutdown;
