//! Body encoding subsystem.
//!
//! # Data Flow
//! ```text
//! request:  text | base64 → codec.rs (charset / base64 → bytes, optional gzip,
//!                                     content-length / content-encoding fixups)
//! response: wire bytes → decompress.rs (gzip | deflate | br | identity)
//! ```

pub mod codec;
pub mod decompress;

pub use codec::{encode_request_body, resolve_charset, EncodingError};
pub use decompress::decompress;
