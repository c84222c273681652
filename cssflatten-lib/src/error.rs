use crate::query::QueryError;

/// Errors raised while reading stylesheet or inline-style text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StyleError {
    #[error("malformed declaration {segment:?}: expected `property:value`")]
    MalformedDeclaration { segment: String },
}

/// Errors returned by the top-level flatten operation.
#[derive(thiserror::Error, Debug)]
pub enum FlattenError {
    /// A required input was not supplied.
    #[error("missing required input: {name}")]
    InvalidArgument { name: &'static str },

    #[error(transparent)]
    Style(#[from] StyleError),

    #[error(transparent)]
    Query(#[from] QueryError),
}
