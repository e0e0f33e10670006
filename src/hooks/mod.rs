//! Broker extension points.
//!
//! The broker discovers what a hook handles by calling [`Hook::provides`] once
//! per [`HookEvent`] at registration, then only dispatches those events to it.

pub mod iam_auth;

pub use iam_auth::{HookOptions, HookState, IamAuthHook};

use crate::error::{GatewayError, Result};
use crate::packets::{Client, Packet};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    OnStarted,
    OnStopped,
    OnConnect,
    OnConnectAuthenticate,
    OnAclCheck,
    OnAuthPacket,
    OnSubscribe,
    OnPublish,
    OnDisconnect,
}

impl HookEvent {
    pub const ALL: [HookEvent; 9] = [
        HookEvent::OnStarted,
        HookEvent::OnStopped,
        HookEvent::OnConnect,
        HookEvent::OnConnectAuthenticate,
        HookEvent::OnAclCheck,
        HookEvent::OnAuthPacket,
        HookEvent::OnSubscribe,
        HookEvent::OnPublish,
        HookEvent::OnDisconnect,
    ];
}

/// Contract between the broker and a hook.
///
/// Decision callbacks return a plain verdict; anything a hook cannot decide
/// must come back as `false`. Defaults deny, so a hook only has to override
/// the events it declares in `provides`.
#[async_trait]
pub trait Hook: Send + Sync {
    fn id(&self) -> &str;

    fn provides(&self, event: HookEvent) -> bool;

    fn init(&self, _config: Option<&toml::Value>) -> Result<()> {
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        Ok(())
    }

    async fn on_connect_authenticate(&self, _client: &Client, _packet: &Packet) -> bool {
        false
    }

    async fn on_acl_check(&self, _client: &Client, _topic: &str, _write: bool) -> bool {
        false
    }

    async fn on_auth_packet(&self, _client: &Client, packet: Packet) -> Result<Packet> {
        Ok(packet)
    }
}

struct RegisteredHook {
    hook: Arc<dyn Hook>,
    events: Vec<HookEvent>,
}

impl RegisteredHook {
    fn handles(&self, event: HookEvent) -> bool {
        self.events.contains(&event)
    }
}

/// Ordered set of hooks as the broker holds them.
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<RegisteredHook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialise `hook` and record its capabilities. Hook ids must be unique.
    pub fn add(&mut self, hook: Arc<dyn Hook>, config: Option<&toml::Value>) -> Result<()> {
        if self.hooks.iter().any(|h| h.hook.id() == hook.id()) {
            return Err(GatewayError::DuplicateHook(hook.id().to_string()));
        }

        hook.init(config)?;

        let events: Vec<HookEvent> = HookEvent::ALL
            .iter()
            .copied()
            .filter(|event| hook.provides(*event))
            .collect();
        debug!("Registered hook {} for {:?}", hook.id(), events);

        self.hooks.push(RegisteredHook { hook, events });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn provides(&self, event: HookEvent) -> bool {
        self.hooks.iter().any(|h| h.handles(event))
    }

    /// Allowed as soon as one hook handling the event allows; denied when none does.
    pub async fn on_connect_authenticate(&self, client: &Client, packet: &Packet) -> bool {
        for registered in self.hooks.iter().filter(|h| h.handles(HookEvent::OnConnectAuthenticate)) {
            if registered.hook.on_connect_authenticate(client, packet).await {
                return true;
            }
        }
        false
    }

    pub async fn on_acl_check(&self, client: &Client, topic: &str, write: bool) -> bool {
        for registered in self.hooks.iter().filter(|h| h.handles(HookEvent::OnAclCheck)) {
            if registered.hook.on_acl_check(client, topic, write).await {
                return true;
            }
        }
        false
    }

    pub async fn on_auth_packet(&self, client: &Client, packet: Packet) -> Result<Packet> {
        let mut packet = packet;
        for registered in self.hooks.iter().filter(|h| h.handles(HookEvent::OnAuthPacket)) {
            packet = registered.hook.on_auth_packet(client, packet).await?;
        }
        Ok(packet)
    }

    /// Stop hooks in reverse registration order. Every hook is stopped even if
    /// an earlier one fails; the first failure is returned.
    pub fn stop_all(&self) -> Result<()> {
        let mut first_error = None;
        for registered in self.hooks.iter().rev() {
            if let Err(e) = registered.hook.stop() {
                warn!("Failed to stop hook {}: {}", registered.hook.id(), e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
