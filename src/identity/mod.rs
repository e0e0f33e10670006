//! Remote channel to the IAM service.
//!
//! [`IdentityClient`] is the seam between the hook and the transport. The
//! production implementation is [`GrpcIdentityClient`]; tests plug in stubs.

pub mod grpc_client;

pub use grpc_client::GrpcIdentityClient;

use crate::error::TransportError;
use crate::packets::ClientId;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::time::Duration;

/// Bearer value presented at connect time. Never printed.
pub struct Credential(SecretString);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// MQTT passwords are binary; the IAM service takes the token as a string.
    pub fn from_password(password: Option<&[u8]>) -> Self {
        let value = password
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default();
        Self::new(value)
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Consumed by a single Authenticate call.
#[derive(Debug)]
pub struct AuthenticateRequest {
    pub client_id: ClientId,
    pub credential: Credential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessIntent {
    Read,
    Write,
}

impl AccessIntent {
    pub fn from_write(write: bool) -> Self {
        if write {
            AccessIntent::Write
        } else {
            AccessIntent::Read
        }
    }

    pub fn is_write(self) -> bool {
        matches!(self, AccessIntent::Write)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessRequest {
    pub client_id: ClientId,
    pub topic: String,
    pub intent: AccessIntent,
}

impl AccessRequest {
    pub fn new(client_id: ClientId, topic: impl Into<String>, write: bool) -> Self {
        Self {
            client_id,
            topic: topic.into(),
            intent: AccessIntent::from_write(write),
        }
    }
}

/// What the IAM service answered: `granted` is `success` for Authenticate
/// and `allowed` for Authorize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDecision {
    pub granted: bool,
    pub error: String,
}

impl RemoteDecision {
    pub fn granted() -> Self {
        Self {
            granted: true,
            error: String::new(),
        }
    }

    pub fn refused(error: impl Into<String>) -> Self {
        Self {
            granted: false,
            error: error.into(),
        }
    }
}

/// The two IAM operations the hook consumes.
///
/// Implementations must resolve within `deadline`, returning
/// [`TransportError::Timeout`] when no answer arrived in time.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    async fn authenticate(
        &self,
        request: AuthenticateRequest,
        deadline: Duration,
    ) -> Result<RemoteDecision, TransportError>;

    async fn authorize(
        &self,
        request: AccessRequest,
        deadline: Duration,
    ) -> Result<RemoteDecision, TransportError>;
}
