//! Serve Workflow Integration Tests
//!
//! ServeWorkflow と HttpServer の統合テスト

use anyhow::Result;
use async_trait::async_trait;
use finchat_bootstrap::adapter::apps::ChatbotGateway;
use finchat_bootstrap::adapter::config::Config;
use finchat_bootstrap::adapter::http::HttpServer;
use finchat_bootstrap::domain::entities::http_message::{AppRequest, AppResponse};
use finchat_bootstrap::domain::errors::StartupError;
use finchat_bootstrap::domain::repositories::application::Application;
use finchat_bootstrap::driver::cli::ServeArgs;
use finchat_bootstrap::driver::workflow::{exit_code_for, ServeWorkflow, EXIT_STARTUP_FAILURE};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

fn fixtures_context() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("context")
}

fn serve_args(app_root: &str) -> ServeArgs {
    ServeArgs {
        bind: Some("127.0.0.1:0".to_string()),
        timeout: None,
        entrypoint: None,
        app_root: Some(app_root.to_string()),
        upstream_url: None,
        workers: None,
        skip_module_check: false,
    }
}

/// テスト用サーバー
struct RunningServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<()>>,
}

impl RunningServer {
    async fn start(app: Arc<dyn Application>, timeout: Duration) -> Self {
        let server = HttpServer::bind("127.0.0.1:0".parse().unwrap(), app, timeout)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let (shutdown, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.run(async move {
            let _ = rx.await;
        }));
        Self {
            addr,
            shutdown,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(self) {
        let _ = self.shutdown.send(());
        self.handle.await.unwrap().unwrap();
    }
}

struct SlowApp;

#[async_trait]
impl Application for SlowApp {
    async fn handle(&self, _request: AppRequest) -> Result<AppResponse> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(AppResponse::new(200, "late"))
    }
}

struct FailingApp;

#[async_trait]
impl Application for FailingApp {
    async fn handle(&self, _request: AppRequest) -> Result<AppResponse> {
        anyhow::bail!("model call failed")
    }
}

/// アップストリーム役: リクエスト内容をJSONで返す
struct EchoApp;

#[async_trait]
impl Application for EchoApp {
    async fn handle(&self, request: AppRequest) -> Result<AppResponse> {
        Ok(AppResponse::json(
            200,
            &json!({
                "method": request.method,
                "path": request.path_and_query(),
                "body": String::from_utf8_lossy(&request.body),
            }),
        ))
    }
}

#[test]
fn test_prepare_resolves_default_entrypoint() {
    let context = fixtures_context();
    let workflow = ServeWorkflow::new(Config::default(), &serve_args(&context.to_string_lossy()));

    let plan = workflow.prepare().unwrap();

    assert_eq!(plan.entrypoint.to_string(), "Flask_Server:app");
    assert_eq!(plan.request_timeout, Duration::from_secs(300));
    assert_eq!(std::env::var("PYTHONUNBUFFERED").unwrap(), "1");
    assert_eq!(
        std::env::var("GOOGLE_APPLICATION_CREDENTIALS").unwrap(),
        "/app/credentials.json"
    );
}

#[test]
fn test_prepare_fails_fast_without_module_source() {
    let empty = TempDir::new().unwrap();
    let workflow = ServeWorkflow::new(
        Config::default(),
        &serve_args(&empty.path().to_string_lossy()),
    );

    let err = workflow.prepare().err().unwrap();

    assert!(matches!(
        err.downcast_ref::<StartupError>(),
        Some(StartupError::ModuleNotFound { .. })
    ));
    assert_eq!(exit_code_for(&err), EXIT_STARTUP_FAILURE);
}

#[test]
fn test_prepare_rejects_unregistered_entrypoint() {
    let context = fixtures_context();
    let mut args = serve_args(&context.to_string_lossy());
    args.entrypoint = Some("Flask_Server:application".to_string());

    let err = ServeWorkflow::new(Config::default(), &args)
        .prepare()
        .err()
        .unwrap();

    assert!(matches!(
        err.downcast_ref::<StartupError>(),
        Some(StartupError::ApplicationNotFound(_))
    ));
    assert_eq!(exit_code_for(&err), EXIT_STARTUP_FAILURE);
}

#[test]
fn test_prepare_rejects_malformed_entrypoint() {
    let mut args = serve_args("/nonexistent");
    args.entrypoint = Some("Flask_Server".to_string());

    let err = ServeWorkflow::new(Config::default(), &args)
        .prepare()
        .err()
        .unwrap();
    assert_eq!(exit_code_for(&err), EXIT_STARTUP_FAILURE);
}

#[test]
fn test_prepare_rejects_unexportable_environment() {
    let context = fixtures_context();
    let mut config = Config::default();
    config.image.env.insert("A=B".to_string(), "x".to_string());

    let err = ServeWorkflow::new(config, &serve_args(&context.to_string_lossy()))
        .prepare()
        .err()
        .unwrap();

    assert!(matches!(
        err.downcast_ref::<StartupError>(),
        Some(StartupError::InvalidEnvironment(_))
    ));
    assert_eq!(exit_code_for(&err), EXIT_STARTUP_FAILURE);
}

#[test]
fn test_prepare_rejects_bad_bind_address() {
    let context = fixtures_context();
    let mut args = serve_args(&context.to_string_lossy());
    args.bind = Some("localhost:eighty".to_string());

    let err = ServeWorkflow::new(Config::default(), &args)
        .prepare()
        .err()
        .unwrap();

    assert!(matches!(
        err.downcast_ref::<StartupError>(),
        Some(StartupError::InvalidBind { .. })
    ));
    assert_eq!(exit_code_for(&err), EXIT_STARTUP_FAILURE);
}

#[tokio::test]
async fn test_health_endpoint() {
    let gateway = Arc::new(ChatbotGateway::new(None).unwrap());
    let server = RunningServer::start(gateway, Duration::from_secs(300)).await;

    let response = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "status": "healthy" }));

    server.stop().await;
}

#[tokio::test]
async fn test_request_timeout_returns_504() {
    let server = RunningServer::start(Arc::new(SlowApp), Duration::from_millis(200)).await;

    let response = reqwest::get(server.url("/chat")).await.unwrap();
    assert_eq!(response.status().as_u16(), 504);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "request timed out");

    server.stop().await;
}

#[tokio::test]
async fn test_handler_error_returns_500() {
    let server = RunningServer::start(Arc::new(FailingApp), Duration::from_secs(5)).await;

    let response = reqwest::get(server.url("/chat")).await.unwrap();
    assert_eq!(response.status().as_u16(), 500);

    server.stop().await;
}

#[tokio::test]
async fn test_gateway_forwards_to_upstream() {
    let upstream = RunningServer::start(Arc::new(EchoApp), Duration::from_secs(5)).await;
    let gateway = Arc::new(ChatbotGateway::new(Some(upstream.url(""))).unwrap());
    let server = RunningServer::start(gateway, Duration::from_secs(5)).await;

    let response = reqwest::Client::new()
        .post(server.url("/chat?session=42"))
        .body(r#"{"message":"How is AAPL doing?"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["method"], "POST");
    assert_eq!(body["path"], "/chat?session=42");
    assert_eq!(body["body"], r#"{"message":"How is AAPL doing?"}"#);

    server.stop().await;
    upstream.stop().await;
}

#[tokio::test]
async fn test_bind_conflict_is_startup_failure() {
    let first = RunningServer::start(Arc::new(EchoApp), Duration::from_secs(5)).await;

    let result = HttpServer::bind(first.addr, Arc::new(EchoApp), Duration::from_secs(5)).await;
    let err = anyhow::Error::from(result.err().unwrap());
    assert_eq!(exit_code_for(&err), EXIT_STARTUP_FAILURE);

    first.stop().await;
}
