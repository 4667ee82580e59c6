//! Errors raised while building a router.
//!
//! Dispatch itself never fails: a request either matches a route or gets the
//! not-found response. Everything that can go wrong is caught when the tree is
//! frozen by [`Router::build`](crate::Router::build) or when a declarative
//! configuration is turned into a tree.

use thiserror::Error;

/// A route pattern that cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern must begin with '/'")]
    MissingLeadingSlash,

    #[error("parameter `{0}` is declared more than once")]
    DuplicateParam(String),

    #[error("segment `{0}` captures the rest of the path and must be the last segment")]
    NotLast(String),

    #[error("parameter name is empty")]
    EmptyName,

    #[error("parameter name `{0}` may only contain letters, digits, '_' and '-'")]
    InvalidName(String),
}

/// Errors produced while assembling or freezing a routing tree.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid route pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: PatternError,
    },

    #[error("route `{0}` has no handler")]
    MissingHandler(String),

    #[error("no handler registered under the name `{0}`")]
    UnknownHandler(String),

    #[error("no middleware registered under the name `{0}`")]
    UnknownMiddleware(String),

    #[error("invalid HTTP method `{0}`")]
    InvalidMethod(String),

    #[error("invalid router configuration: {0}")]
    Config(#[from] serde_json::Error),
}
