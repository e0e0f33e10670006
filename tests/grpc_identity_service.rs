//! The IAM hook against a real tonic IAM server on a loopback port.

mod common;

use async_trait::async_trait;
use common::RecordingSink;
use iam_auth_hook::diagnostics::{LifecycleEvent, Outcome};
use iam_auth_hook::identity::Credential;
use iam_auth_hook::packets::ClientId;
use iam_auth_hook::proto::{
    AuthenticateRequest, AuthenticateResponse, AuthorizeRequest, AuthorizeResponse, Iam,
    IamServer,
};
use iam_auth_hook::{Config, IamAuthHook};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::{Request, Response, Status};

/// Accepts token "good-token" only, lets everyone read `sensors/*` but never
/// write, and never answers for client "hang".
#[derive(Default)]
struct MockIamService {
    authenticate_seen: Mutex<Vec<AuthenticateRequest>>,
    authorize_seen: Mutex<Vec<AuthorizeRequest>>,
}

#[async_trait]
impl Iam for MockIamService {
    async fn authenticate(
        &self,
        request: Request<AuthenticateRequest>,
    ) -> Result<Response<AuthenticateResponse>, Status> {
        let req = request.into_inner();
        self.authenticate_seen.lock().push(req.clone());

        if req.client_id == "hang" {
            std::future::pending::<()>().await;
        }

        let response = if req.token == "good-token" {
            AuthenticateResponse {
                success: true,
                error: String::new(),
            }
        } else {
            AuthenticateResponse {
                success: false,
                error: "bad token".to_string(),
            }
        };
        Ok(Response::new(response))
    }

    async fn authorize(
        &self,
        request: Request<AuthorizeRequest>,
    ) -> Result<Response<AuthorizeResponse>, Status> {
        let req = request.into_inner();
        self.authorize_seen.lock().push(req.clone());

        if req.client_id == "hang" {
            std::future::pending::<()>().await;
        }

        let response = if req.write {
            AuthorizeResponse {
                allowed: false,
                error: "read only".to_string(),
            }
        } else if req.topic.starts_with("sensors/") {
            AuthorizeResponse {
                allowed: true,
                error: String::new(),
            }
        } else {
            AuthorizeResponse {
                allowed: false,
                error: format!("no access to {}", req.topic),
            }
        };
        Ok(Response::new(response))
    }
}

async fn serve(service: Arc<MockIamService>) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        Server::builder()
            .add_service(IamServer::from_arc(service))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    (addr, handle)
}

async fn connected_hook() -> (Arc<MockIamService>, Arc<RecordingSink>, IamAuthHook, JoinHandle<()>) {
    let service = Arc::new(MockIamService::default());
    let (addr, server) = serve(service.clone()).await;

    let sink = RecordingSink::new();
    let hook = IamAuthHook::from_config(&Config::for_address(addr.to_string()), sink.clone())
        .await
        .unwrap();

    (service, sink, hook, server)
}

#[tokio::test]
async fn construction_connects_and_reports_address() {
    let service = Arc::new(MockIamService::default());
    let (addr, server) = serve(service).await;

    let sink = RecordingSink::new();
    let hook = IamAuthHook::from_config(&Config::for_address(addr.to_string()), sink.clone())
        .await
        .unwrap();

    assert_eq!(
        sink.lifecycle.lock().clone(),
        vec![LifecycleEvent::Connected {
            address: format!("http://{}", addr)
        }]
    );

    hook.shutdown().unwrap();
    server.abort();
}

#[tokio::test]
async fn authenticate_maps_service_answer() {
    let (service, sink, hook, server) = connected_hook().await;

    assert!(hook.authenticate_connect(&ClientId::new("dev1"), Credential::new("good-token")).await);
    assert!(!hook.authenticate_connect(&ClientId::new("dev2"), Credential::new("stolen")).await);

    let seen = service.authenticate_seen.lock().clone();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].client_id, "dev1");
    assert_eq!(seen[0].token, "good-token");
    assert_eq!(seen[1].client_id, "dev2");

    let records = sink.decisions();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].outcome, Outcome::Allowed);
    assert_eq!(
        records[1].outcome,
        Outcome::Denied {
            reason: "bad token".to_string()
        }
    );

    server.abort();
}

#[tokio::test]
async fn authorize_maps_service_answer() {
    let (service, sink, hook, server) = connected_hook().await;
    let client_id = ClientId::new("dev1");

    assert!(hook.authorize_access(&client_id, "sensors/temp", false).await);
    assert!(!hook.authorize_access(&client_id, "sensors/temp", true).await);
    assert!(!hook.authorize_access(&client_id, "admin/reset", false).await);

    let seen = service.authorize_seen.lock().clone();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0].topic, "sensors/temp");
    assert!(!seen[0].write);
    assert!(seen[1].write);

    let records = sink.decisions();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].outcome, Outcome::Allowed);
    assert_eq!(
        records[1].outcome,
        Outcome::Denied {
            reason: "read only".to_string()
        }
    );
    assert_eq!(
        records[2].outcome,
        Outcome::Denied {
            reason: "no access to admin/reset".to_string()
        }
    );

    server.abort();
}

#[tokio::test]
async fn unanswered_calls_deny_at_deadline() {
    let (service, sink, hook, server) = connected_hook().await;
    let client_id = ClientId::new("hang");

    let started = Instant::now();
    assert!(!hook.authenticate_connect(&client_id, Credential::new("good-token")).await);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1900), "{:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3), "{:?}", elapsed);

    let started = Instant::now();
    assert!(!hook.authorize_access(&client_id, "sensors/temp", false).await);
    assert!(started.elapsed() < Duration::from_secs(3));

    assert_eq!(service.authenticate_seen.lock().len(), 1);
    assert_eq!(service.authorize_seen.lock().len(), 1);

    let records = sink.decisions();
    assert_eq!(records.len(), 2);
    for record in records {
        assert!(
            matches!(record.outcome, Outcome::TransportError(_)),
            "unexpected outcome {:?}",
            record.outcome
        );
    }

    server.abort();
}
