pub mod cascade;
pub mod declarations;
pub mod precedence;
pub mod stylesheet;
pub mod translate;

pub use cascade::{CascadeReport, RuleFailure};
pub use declarations::{MalformedPolicy, StyleDeclarations};
pub use stylesheet::{StyleRule, Stylesheet};
