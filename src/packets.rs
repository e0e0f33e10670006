//! Broker-side client and packet types handed to hooks.
//!
//! These mirror the parts of the broker's session and MQTT packet model that
//! hooks are allowed to see. Decoding and routing stay inside the broker.

use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// Opaque identifier of a broker client, borrowed from the broker session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(Arc<str>);

impl ClientId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

/// A connected (or connecting) client as seen by hooks.
#[derive(Debug, Clone)]
pub struct Client {
    pub id: ClientId,
}

impl Client {
    pub fn new(id: impl Into<ClientId>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacketType {
    #[default]
    Connect,
    Auth,
}

/// CONNECT fields. `Debug` redacts the password.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ConnectParams {
    pub client_identifier: String,
    pub username: Option<Bytes>,
    pub password: Option<Bytes>,
    pub clean_start: bool,
    pub keepalive: u16,
    pub protocol_version: u8,
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("client_identifier", &self.client_identifier)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("clean_start", &self.clean_start)
            .field("keepalive", &self.keepalive)
            .field("protocol_version", &self.protocol_version)
            .finish()
    }
}

/// MQTT v5 enhanced-authentication properties carried by CONNECT and AUTH.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthProperties {
    pub authentication_method: Option<String>,
    pub authentication_data: Option<Bytes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    pub packet_type: PacketType,
    pub connect: ConnectParams,
    pub properties: AuthProperties,
    pub reason_code: u8,
}

impl Packet {
    pub fn connect(client_identifier: impl Into<String>, password: Option<Bytes>) -> Self {
        Self {
            packet_type: PacketType::Connect,
            connect: ConnectParams {
                client_identifier: client_identifier.into(),
                password,
                clean_start: true,
                protocol_version: 5,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn auth(method: impl Into<String>, data: Bytes, reason_code: u8) -> Self {
        Self {
            packet_type: PacketType::Auth,
            properties: AuthProperties {
                authentication_method: Some(method.into()),
                authentication_data: Some(data),
            },
            reason_code,
            ..Default::default()
        }
    }
}
