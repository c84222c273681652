//! Moves document-level CSS into inline `style` attributes.
//!
//! ```ignore
//! let html = cssflatten_lib::flatten("<p class=\"hl\">x</p>", ".hl{color:red}")?;
//! assert_eq!(html, "<p class=\"hl\" style=\"color:red\">x</p>");
//! ```

pub mod dom;
pub mod error;
pub mod flatten;
pub mod parser;
pub mod query;
pub mod style;

pub use error::{FlattenError, StyleError};
pub use flatten::{flatten, FlattenOptions, Flattener};
