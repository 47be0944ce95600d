//! Error types shared by the naming, configuration and runtime layers.

use thiserror::Error;

use crate::naming::MessageType;

/// Errors surfaced while configuring or operating a bus.
#[derive(Debug, Error)]
pub enum BusError {
    /// Missing or malformed configuration (empty application name, bad
    /// connection settings, unresolvable consumer). Never retried.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The transport failed to connect, declare or deliver.
    #[error("transport failure: {0}")]
    TransportFailure(#[from] TransportError),

    /// `send` was called for a message type without a registered route.
    #[error("no route registered for message type {0}")]
    RouteNotFound(MessageType),

    /// The caller's cancellation token fired before the operation completed.
    #[error("operation cancelled")]
    Cancelled,

    /// A message could not be encoded into an envelope.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("bus is already started")]
    AlreadyStarted,

    #[error("bus is not started")]
    NotStarted,
}

impl BusError {
    /// Shorthand for [`BusError::InvalidConfiguration`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        BusError::InvalidConfiguration(msg.into())
    }

    /// True for configuration errors; these are fatal at startup.
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, BusError::InvalidConfiguration(_))
    }
}

/// Errors reported by a [`Transport`](crate::bus::Transport) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("queue declaration failed for {queue}: {reason}")]
    DeclareFailed { queue: String, reason: String },

    #[error("unknown destination: {0}")]
    UnknownDestination(String),

    #[error("transport rejected the message: {0}")]
    Rejected(String),
}

/// Error returned by a consumer while handling a message.
///
/// Any `ConsumeError` triggers the endpoint's retry policy; once retries are
/// exhausted the message is moved to the endpoint's error queue.
#[derive(Debug, Error)]
pub enum ConsumeError {
    /// The envelope payload could not be decoded into the message type.
    #[error("decode failed: {0}")]
    DecodeFailed(String),

    /// The consumer could not be resolved from the service provider.
    #[error("consumer not resolvable: {0}")]
    Unresolved(&'static str),

    /// The handler rejected or failed to process the message.
    #[error("consumer failed: {0}")]
    Failed(String),

    /// The consumer panicked; the payload message is kept.
    #[error("consumer panicked: {0}")]
    Panicked(String),

    #[error("consumer error: {0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ConsumeError {
    pub fn failed(msg: impl Into<String>) -> Self {
        ConsumeError::Failed(msg.into())
    }
}

impl From<serde_json::Error> for ConsumeError {
    fn from(err: serde_json::Error) -> Self {
        ConsumeError::DecodeFailed(err.to_string())
    }
}
