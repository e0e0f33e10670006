//! IAM authentication/authorization hook.
//!
//! Every connect and every topic access becomes one bounded call to the IAM
//! service. A verdict is `true` only when the call completed and the service
//! explicitly granted it; transport failures, timeouts, refusals and use after
//! shutdown all deny. There is no caching and no retry.

use super::{Hook, HookEvent};
use crate::config::Config;
use crate::diagnostics::{
    DecisionRecord, DiagnosticsSink, LifecycleEvent, Operation, Outcome, TracingSink,
};
use crate::error::{GatewayError, Result, TransportError};
use crate::identity::{
    AccessRequest, AuthenticateRequest, Credential, GrpcIdentityClient, IdentityClient,
    RemoteDecision,
};
use crate::metrics::GatewayMetrics;
use crate::packets::{Client, ClientId, Packet};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_HOOK_ID: &str = "iam-auth-hook";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct HookOptions {
    pub id: String,
    pub request_timeout: Duration,
}

impl Default for HookOptions {
    fn default() -> Self {
        Self {
            id: DEFAULT_HOOK_ID.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl HookOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            id: config.hook.id.clone(),
            request_timeout: config.identity_service.request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    Connected,
    Closed,
}

enum RemoteChannel {
    Connected(Arc<dyn IdentityClient>),
    Closed,
}

pub struct IamAuthHook {
    options: HookOptions,
    channel: RwLock<RemoteChannel>,
    shutdown: CancellationToken,
    sink: Arc<dyn DiagnosticsSink>,
    metrics: GatewayMetrics,
}

impl IamAuthHook {
    /// Dial the IAM service at `address` with default timeouts and report to
    /// `tracing`. Fails if the service is not reachable within 5 seconds.
    pub async fn connect(address: impl Into<String>) -> Result<Self> {
        Self::from_config(&Config::for_address(address), Arc::new(TracingSink)).await
    }

    pub async fn from_config(config: &Config, sink: Arc<dyn DiagnosticsSink>) -> Result<Self> {
        config.validate()?;

        let address = config.identity_service.endpoint_uri();
        let client = match GrpcIdentityClient::connect(&config.identity_service).await {
            Ok(client) => client,
            Err(e) => {
                sink.lifecycle(&LifecycleEvent::ConnectFailed {
                    address,
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };
        sink.lifecycle(&LifecycleEvent::Connected { address });

        Self::with_client(Arc::new(client), HookOptions::from_config(config), sink)
    }

    /// Build the hook around an already established channel.
    pub fn with_client(
        client: Arc<dyn IdentityClient>,
        options: HookOptions,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Result<Self> {
        if options.request_timeout.is_zero() {
            return Err(GatewayError::InvalidConfig(
                "request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            options,
            channel: RwLock::new(RemoteChannel::Connected(client)),
            shutdown: CancellationToken::new(),
            sink,
            metrics: GatewayMetrics::new()?,
        })
    }

    pub fn state(&self) -> HookState {
        match &*self.channel.read() {
            RemoteChannel::Connected(_) => HookState::Connected,
            RemoteChannel::Closed => HookState::Closed,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.options.request_timeout
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    /// Release the IAM channel. Calls still in flight resolve as denied.
    /// Closing twice is a caller error.
    pub fn shutdown(&self) -> Result<()> {
        let previous = std::mem::replace(&mut *self.channel.write(), RemoteChannel::Closed);
        let RemoteChannel::Connected(client) = previous else {
            return Err(GatewayError::AlreadyClosed);
        };

        self.sink.lifecycle(&LifecycleEvent::Stopping {
            hook_id: self.options.id.clone(),
        });
        self.shutdown.cancel();
        drop(client);
        self.sink.lifecycle(&LifecycleEvent::Stopped {
            hook_id: self.options.id.clone(),
        });
        Ok(())
    }

    /// Verify a connecting client's credential with the IAM service.
    pub async fn authenticate_connect(&self, client_id: &ClientId, credential: Credential) -> bool {
        let started = Instant::now();
        let outcome = match self.client() {
            Some(client) => {
                let request = AuthenticateRequest {
                    client_id: client_id.clone(),
                    credential,
                };
                let deadline = self.options.request_timeout;
                Self::interpret(self.bounded(client.authenticate(request, deadline)).await)
            }
            None => Outcome::Closed,
        };

        self.report(DecisionRecord {
            operation: Operation::Authenticate,
            client_id: client_id.clone(),
            topic: None,
            write: None,
            outcome,
            elapsed: started.elapsed(),
        })
    }

    /// Ask the IAM service whether `client_id` may read (`write == false`) or
    /// write `topic`.
    pub async fn authorize_access(&self, client_id: &ClientId, topic: &str, write: bool) -> bool {
        let started = Instant::now();
        let outcome = match self.client() {
            Some(client) => {
                let request = AccessRequest::new(client_id.clone(), topic, write);
                let deadline = self.options.request_timeout;
                Self::interpret(self.bounded(client.authorize(request, deadline)).await)
            }
            None => Outcome::Closed,
        };

        self.report(DecisionRecord {
            operation: Operation::Authorize,
            client_id: client_id.clone(),
            topic: Some(topic.to_string()),
            write: Some(write),
            outcome,
            elapsed: started.elapsed(),
        })
    }

    fn client(&self) -> Option<Arc<dyn IdentityClient>> {
        match &*self.channel.read() {
            RemoteChannel::Connected(client) => Some(Arc::clone(client)),
            RemoteChannel::Closed => None,
        }
    }

    /// Run one remote call under the request deadline, racing shutdown.
    async fn bounded<F>(&self, call: F) -> std::result::Result<RemoteDecision, TransportError>
    where
        F: Future<Output = std::result::Result<RemoteDecision, TransportError>>,
    {
        let deadline = self.options.request_timeout;
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(TransportError::Closed),
            result = tokio::time::timeout(deadline, call) => {
                result.unwrap_or(Err(TransportError::Timeout(deadline)))
            }
        }
    }

    fn interpret(result: std::result::Result<RemoteDecision, TransportError>) -> Outcome {
        match result {
            Ok(decision) if decision.granted => Outcome::Allowed,
            Ok(decision) => Outcome::Denied {
                reason: decision.error,
            },
            Err(e) => Outcome::TransportError(e),
        }
    }

    fn report(&self, record: DecisionRecord) -> bool {
        self.metrics
            .record(record.operation, &record.outcome, record.elapsed);
        self.sink.decision(&record);
        record.outcome.is_allowed()
    }
}

#[async_trait]
impl Hook for IamAuthHook {
    fn id(&self) -> &str {
        &self.options.id
    }

    fn provides(&self, event: HookEvent) -> bool {
        matches!(
            event,
            HookEvent::OnConnectAuthenticate | HookEvent::OnAclCheck
        )
    }

    /// Accepts and ignores any configuration.
    fn init(&self, _config: Option<&toml::Value>) -> Result<()> {
        self.sink.lifecycle(&LifecycleEvent::Initialized {
            hook_id: self.options.id.clone(),
        });
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.shutdown()
    }

    async fn on_connect_authenticate(&self, client: &Client, packet: &Packet) -> bool {
        let credential = Credential::from_password(packet.connect.password.as_deref());
        self.authenticate_connect(&client.id, credential).await
    }

    async fn on_acl_check(&self, client: &Client, topic: &str, write: bool) -> bool {
        self.authorize_access(&client.id, topic, write).await
    }

    // Enhanced authentication exchanges are not used; decisions happen at connect.
    async fn on_auth_packet(&self, _client: &Client, packet: Packet) -> Result<Packet> {
        Ok(packet)
    }
}
