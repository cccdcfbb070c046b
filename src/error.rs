//! Connector error types.

use thiserror::Error;

/// Errors surfaced by the connector core.
///
/// Collaborator failures (gateway HTTP, event-stream transport) are carried
/// through as [`ConnectorError::Transport`]; identifier and request shape
/// problems are typed so callers can map them to a 4xx-style rejection
/// without retrying.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Malformed pool id tag or out-of-range numeral during packing.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A request field that is not an identifier failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Failure reported by the chain client or event-stream transport.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ConnectorError>;
