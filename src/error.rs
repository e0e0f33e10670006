use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to connect to IAM service at {address}: {reason}")]
    Connectivity { address: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("Hook already closed")]
    AlreadyClosed,

    #[error("Hook already registered: {0}")]
    DuplicateHook(String),
}

/// Failure of a single in-flight call to the IAM service.
///
/// Every variant maps to a deny verdict at the hook boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("deadline of {0:?} exceeded")]
    Timeout(Duration),

    #[error("rpc failed with {code}: {message}")]
    Status { code: String, message: String },

    #[error("channel closed")]
    Closed,
}

impl From<prometheus::Error> for GatewayError {
    fn from(e: prometheus::Error) -> Self {
        GatewayError::Metrics(e.to_string())
    }
}

impl From<tonic::Status> for TransportError {
    fn from(status: tonic::Status) -> Self {
        TransportError::Status {
            code: format!("{:?}", status.code()),
            message: status.message().to_string(),
        }
    }
}
