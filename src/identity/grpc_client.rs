//! gRPC implementation of the IAM channel.
//!
//! One tonic [`Channel`] is dialled at construction and shared by every
//! decision call. `Channel` multiplexes requests over a single HTTP/2
//! connection, so callers clone the client stub per request instead of
//! locking it.

use super::{AccessRequest, AuthenticateRequest, IdentityClient, RemoteDecision};
use crate::config::{IdentityServiceConfig, IdentityTlsConfig};
use crate::error::{GatewayError, Result, TransportError};
use crate::proto::{self, IamClient};
use async_trait::async_trait;
use std::time::Duration;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity};
use tracing::debug;

pub struct GrpcIdentityClient {
    client: IamClient<Channel>,
    address: String,
}

impl GrpcIdentityClient {
    /// Dial the IAM service and wait for the connection, bounded by
    /// `connect_timeout`. Any failure is a connectivity error.
    pub async fn connect(config: &IdentityServiceConfig) -> Result<Self> {
        let address = config.endpoint_uri();
        let endpoint = Self::endpoint(config).await?;

        debug!("Dialling IAM service at {}", address);

        let channel = tokio::time::timeout(config.connect_timeout(), endpoint.connect())
            .await
            .map_err(|_| GatewayError::Connectivity {
                address: address.clone(),
                reason: format!("no connection within {:?}", config.connect_timeout()),
            })?
            .map_err(|e| GatewayError::Connectivity {
                address: address.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self::from_channel(channel, address))
    }

    /// Build the client without dialling. The first call establishes the
    /// connection; if that fails the call resolves as a transport error.
    pub async fn connect_lazy(config: &IdentityServiceConfig) -> Result<Self> {
        let address = config.endpoint_uri();
        let endpoint = Self::endpoint(config).await?;
        Ok(Self::from_channel(endpoint.connect_lazy(), address))
    }

    pub fn from_channel(channel: Channel, address: impl Into<String>) -> Self {
        Self {
            client: IamClient::new(channel),
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn endpoint(config: &IdentityServiceConfig) -> Result<Endpoint> {
        config.validate()?;

        let address = config.endpoint_uri();
        let mut endpoint = Endpoint::from_shared(address.clone())
            .map_err(|e| {
                GatewayError::InvalidConfig(format!("Invalid endpoint URL {}: {}", address, e))
            })?
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .http2_keep_alive_interval(config.keep_alive_interval())
            .keep_alive_timeout(config.keep_alive_timeout());

        if let Some(tls) = &config.tls {
            let tls_config = Self::tls_config(tls).await?;
            endpoint = endpoint
                .tls_config(tls_config)
                .map_err(|e| GatewayError::Tls(e.to_string()))?;
        }

        Ok(endpoint)
    }

    async fn tls_config(tls: &IdentityTlsConfig) -> Result<ClientTlsConfig> {
        let mut tls_config = ClientTlsConfig::new();

        if let Some(ca_path) = &tls.ca_cert_path {
            let ca = tokio::fs::read(ca_path).await?;
            tls_config = tls_config.ca_certificate(Certificate::from_pem(ca));
        }

        if let Some(domain) = &tls.domain_name {
            tls_config = tls_config.domain_name(domain.clone());
        }

        if let (Some(cert_path), Some(key_path)) = (&tls.client_cert_path, &tls.client_key_path) {
            let cert = tokio::fs::read(cert_path).await?;
            let key = tokio::fs::read(key_path).await?;
            tls_config = tls_config.identity(Identity::from_pem(cert, key));
        }

        Ok(tls_config)
    }

    fn status_to_error(status: tonic::Status, deadline: Duration) -> TransportError {
        match status.code() {
            tonic::Code::DeadlineExceeded => TransportError::Timeout(deadline),
            _ => TransportError::from(status),
        }
    }
}

#[async_trait]
impl IdentityClient for GrpcIdentityClient {
    async fn authenticate(
        &self,
        request: AuthenticateRequest,
        deadline: Duration,
    ) -> std::result::Result<RemoteDecision, TransportError> {
        debug!("Sending Authenticate for client {}", request.client_id);

        let mut grpc_request = tonic::Request::new(proto::AuthenticateRequest {
            client_id: request.client_id.to_string(),
            token: request.credential.expose().to_owned(),
        });
        grpc_request.set_timeout(deadline);

        let mut client = self.client.clone();
        let response = tokio::time::timeout(deadline, client.authenticate(grpc_request))
            .await
            .map_err(|_| TransportError::Timeout(deadline))?
            .map_err(|status| Self::status_to_error(status, deadline))?
            .into_inner();

        Ok(RemoteDecision {
            granted: response.success,
            error: response.error,
        })
    }

    async fn authorize(
        &self,
        request: AccessRequest,
        deadline: Duration,
    ) -> std::result::Result<RemoteDecision, TransportError> {
        debug!(
            "Sending Authorize for client {} on topic {}",
            request.client_id, request.topic
        );

        let mut grpc_request = tonic::Request::new(proto::AuthorizeRequest {
            client_id: request.client_id.to_string(),
            topic: request.topic,
            write: request.intent.is_write(),
        });
        grpc_request.set_timeout(deadline);

        let mut client = self.client.clone();
        let response = tokio::time::timeout(deadline, client.authorize(grpc_request))
            .await
            .map_err(|_| TransportError::Timeout(deadline))?
            .map_err(|status| Self::status_to_error(status, deadline))?
            .into_inner();

        Ok(RemoteDecision {
            granted: response.allowed,
            error: response.error,
        })
    }
}
