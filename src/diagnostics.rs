//! Decision records and the sink they are reported to.
//!
//! The hook never logs on its own; every decision and lifecycle step goes
//! through the [`DiagnosticsSink`] it was built with. [`TracingSink`] is the
//! default and forwards records to `tracing`. Records carry no credential
//! material, so no sink can leak one.

use crate::error::TransportError;
use crate::packets::ClientId;
use std::fmt;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Authenticate,
    Authorize,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Authenticate => "authenticate",
            Operation::Authorize => "authorize",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Allowed,
    /// The service answered and refused, with its own error text.
    Denied { reason: String },
    /// The call did not complete.
    TransportError(TransportError),
    /// The hook was already shut down.
    Closed,
}

impl Outcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Outcome::Allowed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Allowed => "allowed",
            Outcome::Denied { .. } => "denied",
            Outcome::TransportError(_) => "transport_error",
            Outcome::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionRecord {
    pub operation: Operation,
    pub client_id: ClientId,
    /// Present for Authorize only.
    pub topic: Option<String>,
    pub write: Option<bool>,
    pub outcome: Outcome,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Connected { address: String },
    ConnectFailed { address: String, reason: String },
    Initialized { hook_id: String },
    Stopping { hook_id: String },
    Stopped { hook_id: String },
}

pub trait DiagnosticsSink: Send + Sync {
    fn decision(&self, record: &DecisionRecord);

    fn lifecycle(&self, _event: &LifecycleEvent) {}
}

/// Forwards records to `tracing` with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn decision(&self, record: &DecisionRecord) {
        let client_id = record.client_id.as_str();
        let topic = record.topic.as_deref().unwrap_or("");
        let elapsed_ms = record.elapsed.as_millis() as u64;

        match (&record.operation, &record.outcome) {
            (Operation::Authenticate, Outcome::Allowed) => {
                info!(client_id, elapsed_ms, "Client {} authenticated successfully", client_id);
            }
            (Operation::Authenticate, Outcome::Denied { reason }) => {
                warn!(client_id, elapsed_ms, "Authentication denied for client {}: {}", client_id, reason);
            }
            (Operation::Authenticate, Outcome::TransportError(e)) => {
                error!(client_id, elapsed_ms, "Authentication failed for client {}: {}", client_id, e);
            }
            (Operation::Authorize, Outcome::Allowed) => {
                info!(
                    client_id,
                    topic,
                    write = record.write.unwrap_or(false),
                    elapsed_ms,
                    "Client {} authorized for topic {}",
                    client_id,
                    topic
                );
            }
            (Operation::Authorize, Outcome::Denied { reason }) => {
                warn!(
                    client_id,
                    topic,
                    elapsed_ms,
                    "Authorization denied for client {} on topic {}: {}",
                    client_id,
                    topic,
                    reason
                );
            }
            (Operation::Authorize, Outcome::TransportError(e)) => {
                error!(
                    client_id,
                    topic,
                    elapsed_ms,
                    "Authorization failed for client {} on topic {}: {}",
                    client_id,
                    topic,
                    e
                );
            }
            (Operation::Authenticate, Outcome::Closed) => {
                error!(client_id, "Authentication for client {} rejected: hook is closed", client_id);
            }
            (Operation::Authorize, Outcome::Closed) => {
                error!(
                    client_id,
                    topic,
                    "Authorization for client {} on topic {} rejected: hook is closed",
                    client_id,
                    topic
                );
            }
        }
    }

    fn lifecycle(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Connected { address } => info!("Connected to IAM service at {}", address),
            LifecycleEvent::ConnectFailed { address, reason } => {
                error!("Failed to connect to IAM service at {}: {}", address, reason)
            }
            LifecycleEvent::Initialized { hook_id } => info!("{} initialized", hook_id),
            LifecycleEvent::Stopping { hook_id } => info!("Closing {} IAM connection", hook_id),
            LifecycleEvent::Stopped { hook_id } => info!("{} stopped", hook_id),
        }
    }
}
