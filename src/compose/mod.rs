//! Request composition subsystem.
//!
//! # Data Flow
//! ```text
//! ComposedRequest (JSON / form body)
//!     → request.rs    URL + method normalization → NormalizedOptions
//!     → headers/      parse header text, client-id injection, housekeeping
//!     → classify.rs   tunnel | websocket | http(h2?)  (mutates headers)
//!     → history.rs    record unless noStore
//!     → body/         charset / base64 / gzip encoding
//!     → forward/      one forwarder per route
//!     → completion.rs set-once reply → result.rs envelope {ec, em, res}
//! ```
//!
//! # Design Decisions
//! - The dispatcher owns no cross-request state besides the history sink
//! - Classification always precedes body encoding
//! - A request whose result is not wanted is acknowledged before any I/O finishes

pub mod classify;
pub mod completion;
pub mod dispatcher;
pub mod history;
pub mod request;
pub mod result;

pub use classify::Route;
pub use dispatcher::{CallerContext, Composer, DispatchError};
pub use history::{HistorySink, MemoryHistory, NoHistory};
pub use request::{ComposedRequest, NormalizedOptions};
pub use result::{ComposeResponse, ForwardResult};
