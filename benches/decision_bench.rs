//! Hook overhead per decision, measured against an in-process IAM stub that
//! answers immediately. Network latency is deliberately absent.

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use futures::future::join_all;
use iam_auth_hook::diagnostics::{DecisionRecord, DiagnosticsSink};
use iam_auth_hook::hooks::HookOptions;
use iam_auth_hook::identity::{
    AccessRequest, AuthenticateRequest, Credential, IdentityClient, RemoteDecision,
};
use iam_auth_hook::packets::ClientId;
use iam_auth_hook::{IamAuthHook, TransportError};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

struct InstantIdentityService;

#[async_trait]
impl IdentityClient for InstantIdentityService {
    async fn authenticate(
        &self,
        _request: AuthenticateRequest,
        _deadline: Duration,
    ) -> Result<RemoteDecision, TransportError> {
        Ok(RemoteDecision::granted())
    }

    async fn authorize(
        &self,
        request: AccessRequest,
        _deadline: Duration,
    ) -> Result<RemoteDecision, TransportError> {
        if request.intent.is_write() {
            Ok(RemoteDecision::refused("read only"))
        } else {
            Ok(RemoteDecision::granted())
        }
    }
}

struct NullSink;

impl DiagnosticsSink for NullSink {
    fn decision(&self, record: &DecisionRecord) {
        black_box(record);
    }
}

fn hook() -> Arc<IamAuthHook> {
    Arc::new(
        IamAuthHook::with_client(
            Arc::new(InstantIdentityService),
            HookOptions::default(),
            Arc::new(NullSink),
        )
        .unwrap(),
    )
}

fn single_decision_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_decision");
    let hook = hook();
    let client_id = ClientId::new("bench-client");

    group.bench_function("authenticate_connect", |b| {
        b.to_async(Runtime::new().unwrap()).iter(|| {
            let hook = hook.clone();
            let client_id = client_id.clone();
            async move {
                black_box(
                    hook.authenticate_connect(&client_id, Credential::new("token"))
                        .await,
                )
            }
        });
    });

    group.bench_function("authorize_access", |b| {
        b.to_async(Runtime::new().unwrap()).iter(|| {
            let hook = hook.clone();
            let client_id = client_id.clone();
            async move { black_box(hook.authorize_access(&client_id, "sensors/temp", false).await) }
        });
    });

    group.finish();
}

fn concurrent_decision_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_authorize");
    let hook = hook();

    for concurrency in [8usize, 64, 256] {
        let client_ids: Arc<Vec<ClientId>> = Arc::new(
            (0..concurrency)
                .map(|i| ClientId::new(format!("client-{}", i)))
                .collect(),
        );

        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            &client_ids,
            |b, client_ids| {
                b.to_async(Runtime::new().unwrap()).iter(|| {
                    let hook = hook.clone();
                    let client_ids = Arc::clone(client_ids);
                    async move {
                        let calls = client_ids
                            .iter()
                            .map(|client_id| hook.authorize_access(client_id, "telemetry/a", false));
                        black_box(join_all(calls).await)
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, single_decision_benchmarks, concurrent_decision_benchmarks);
criterion_main!(benches);
