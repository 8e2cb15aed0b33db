//! Error types of the filter synchronization engine.
//!
//! Only failures that a caller may want to inspect are represented here.
//! Expected outcomes such as a rejected order vector or a stale load
//! completion are reported through plain return values instead.

use thiserror::Error;

/// A failure reported by a [`Transport`](crate::sync::Transport) while
/// fetching the full filter list.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not reach the server or the response was lost.
    #[error("the filter list request failed: {0}")]
    Network(String),

    /// The request was dropped before it completed.
    #[error("the filter list request was cancelled")]
    Cancelled,
}

/// An invalid [`FilterStoreConfig`](crate::FilterStoreConfig).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A filter must be able to hold at least one pinned conversation.
    #[error("the pinned limit must be at least 1")]
    ZeroPinnedLimit,
}

/// Crate-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// See [`TransportError`].
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A push update payload did not match any known update shape.
    #[error("malformed filter update: {0}")]
    MalformedUpdate(#[source] serde_json::Error),
}

/// Convenience alias for results carrying this crate's [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
