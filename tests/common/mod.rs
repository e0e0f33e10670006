//! Stub IAM service and recording diagnostics sink shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use iam_auth_hook::diagnostics::{DecisionRecord, DiagnosticsSink, LifecycleEvent};
use iam_auth_hook::hooks::HookOptions;
use iam_auth_hook::identity::{
    AccessRequest, AuthenticateRequest, IdentityClient, RemoteDecision,
};
use iam_auth_hook::{IamAuthHook, TransportError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// How the stub answers one request key.
#[derive(Clone)]
pub enum Behavior {
    Respond(RemoteDecision),
    Fail(TransportError),
    /// Answer after a delay, ignoring the caller's deadline.
    Delay(Duration, RemoteDecision),
    /// Never answer.
    Hang,
}

/// Stub IAM service. Authenticate is keyed by client id, Authorize by
/// `client_id|topic|r` or `client_id|topic|w`. Unknown keys fail as unavailable.
#[derive(Default)]
pub struct StubIdentityService {
    behaviors: Mutex<HashMap<String, Behavior>>,
    pub tokens_seen: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
    pub entered: Notify,
}

impl StubIdentityService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on_authenticate(&self, client_id: &str, behavior: Behavior) {
        self.behaviors.lock().insert(client_id.to_string(), behavior);
    }

    pub fn on_authorize(&self, client_id: &str, topic: &str, write: bool, behavior: Behavior) {
        self.behaviors
            .lock()
            .insert(access_key(client_id, topic, write), behavior);
    }

    async fn answer(&self, key: &str) -> Result<RemoteDecision, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behaviors.lock().get(key).cloned();
        self.entered.notify_one();

        match behavior {
            Some(Behavior::Respond(decision)) => Ok(decision),
            Some(Behavior::Fail(e)) => Err(e),
            Some(Behavior::Delay(delay, decision)) => {
                tokio::time::sleep(delay).await;
                Ok(decision)
            }
            Some(Behavior::Hang) => std::future::pending().await,
            None => Err(TransportError::Status {
                code: "Unavailable".to_string(),
                message: format!("no stubbed answer for {}", key),
            }),
        }
    }
}

pub fn access_key(client_id: &str, topic: &str, write: bool) -> String {
    format!("{}|{}|{}", client_id, topic, if write { "w" } else { "r" })
}

#[async_trait]
impl IdentityClient for StubIdentityService {
    async fn authenticate(
        &self,
        request: AuthenticateRequest,
        _deadline: Duration,
    ) -> Result<RemoteDecision, TransportError> {
        self.tokens_seen
            .lock()
            .push(request.credential.expose().to_string());
        self.answer(request.client_id.as_str()).await
    }

    async fn authorize(
        &self,
        request: AccessRequest,
        _deadline: Duration,
    ) -> Result<RemoteDecision, TransportError> {
        let key = access_key(
            request.client_id.as_str(),
            &request.topic,
            request.intent.is_write(),
        );
        self.answer(&key).await
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub decisions: Mutex<Vec<DecisionRecord>>,
    pub lifecycle: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn decisions(&self) -> Vec<DecisionRecord> {
        self.decisions.lock().clone()
    }
}

impl DiagnosticsSink for RecordingSink {
    fn decision(&self, record: &DecisionRecord) {
        self.decisions.lock().push(record.clone());
    }

    fn lifecycle(&self, event: &LifecycleEvent) {
        self.lifecycle.lock().push(event.clone());
    }
}

pub fn hook_with(
    service: Arc<StubIdentityService>,
    sink: Arc<RecordingSink>,
) -> IamAuthHook {
    IamAuthHook::with_client(service, HookOptions::default(), sink).unwrap()
}
