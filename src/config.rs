use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub hook: HookConfig,
    pub identity_service: IdentityServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookConfig {
    /// Identifier reported to the broker for diagnostics and hook ordering
    pub id: String,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            id: "iam-auth-hook".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityServiceConfig {
    /// `host:port` or a full `http(s)://` URI of the IAM service
    pub address: String,
    /// Upper bound on establishing the channel at hook construction
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Deadline applied to every Authenticate/Authorize call
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_keep_alive_interval_ms")]
    pub keep_alive_interval_ms: u64,
    #[serde(default = "default_keep_alive_timeout_ms")]
    pub keep_alive_timeout_ms: u64,
    #[serde(default)]
    pub tls: Option<IdentityTlsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityTlsConfig {
    pub ca_cert_path: Option<PathBuf>,
    /// Overrides the name checked against the server certificate
    pub domain_name: Option<String>,
    pub client_cert_path: Option<PathBuf>,
    pub client_key_path: Option<PathBuf>,
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    2_000
}

fn default_keep_alive_interval_ms() -> u64 {
    30_000
}

fn default_keep_alive_timeout_ms() -> u64 {
    10_000
}

const MAX_REQUEST_TIMEOUT_MS: u64 = 60_000;

impl IdentityServiceConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            keep_alive_interval_ms: default_keep_alive_interval_ms(),
            keep_alive_timeout_ms: default_keep_alive_timeout_ms(),
            tls: None,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_millis(self.keep_alive_interval_ms)
    }

    pub fn keep_alive_timeout(&self) -> Duration {
        Duration::from_millis(self.keep_alive_timeout_ms)
    }

    /// The address as a URI tonic can dial. A bare `host:port` gets a scheme
    /// matching the transport security setting.
    pub fn endpoint_uri(&self) -> String {
        let address = self.address.trim();
        if address.contains("://") {
            address.to_string()
        } else if self.tls.is_some() {
            format!("https://{}", address)
        } else {
            format!("http://{}", address)
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.address.trim().is_empty() {
            return Err(crate::error::GatewayError::InvalidConfig(
                "identity_service.address must not be empty".to_string(),
            ));
        }

        if self.endpoint_uri().parse::<tonic::transport::Uri>().is_err() {
            return Err(crate::error::GatewayError::InvalidConfig(format!(
                "identity_service.address is not a valid URI: {}",
                self.address
            )));
        }

        if self.connect_timeout_ms == 0 {
            return Err(crate::error::GatewayError::InvalidConfig(
                "identity_service.connect_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_ms == 0 {
            return Err(crate::error::GatewayError::InvalidConfig(
                "identity_service.request_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_ms > MAX_REQUEST_TIMEOUT_MS {
            return Err(crate::error::GatewayError::InvalidConfig(format!(
                "identity_service.request_timeout_ms exceeds {}ms; broker workers block for the whole deadline",
                MAX_REQUEST_TIMEOUT_MS
            )));
        }

        if let Some(tls) = &self.tls {
            // tonic only negotiates TLS for https URIs; anything else would dial plaintext.
            if self.address.contains("://") && !self.address.trim().starts_with("https://") {
                return Err(crate::error::GatewayError::InvalidConfig(format!(
                    "identity_service.tls is set but address {} does not use https://",
                    self.address
                )));
            }
            tls.validate()?;
        }

        Ok(())
    }
}

impl IdentityTlsConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.client_cert_path.is_some() != self.client_key_path.is_some() {
            return Err(crate::error::GatewayError::InvalidConfig(
                "identity_service.tls.client_cert_path and client_key_path must be set together"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Minimal configuration: only the IAM service address, everything else defaulted.
    pub fn for_address(address: impl Into<String>) -> Self {
        Self {
            hook: HookConfig::default(),
            identity_service: IdentityServiceConfig::new(address),
        }
    }

    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::error::GatewayError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.hook.id.trim().is_empty() {
            return Err(crate::error::GatewayError::InvalidConfig(
                "hook.id must not be empty".to_string(),
            ));
        }

        self.identity_service.validate()
    }
}
