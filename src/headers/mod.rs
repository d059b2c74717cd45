//! Header model subsystem.
//!
//! # Data Flow
//! ```text
//! composed header text / JSON object
//!     → parse.rs (line or JSON parsing, client-id injection)
//!     → HeaderSet (lower-case lookup, raw names kept per entry)
//!     → classifier / body codec mutate it
//!     → set.rs serializes it back with the caller's casing
//! ```
//!
//! # Design Decisions
//! - One ordered list of `{name, raw_name, value}` entries instead of two maps
//! - Lookups are always by lower-cased name
//! - Names that differ only by case are kept as separate entries

pub mod names;
pub mod parse;
pub mod set;

pub use parse::{parse_headers, parse_line};
pub use set::{HeaderEntry, HeaderSet};
