//! HTTP Server
//!
//! hyper の HTTP/1.1 サーバー。コネクションごとにタスクを起動し、
//! 各リクエストをタイムアウト付きでアプリケーションへ渡す

use anyhow::Result;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use log::{debug, error, info, warn};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::domain::entities::http_message::{AppRequest, AppResponse};
use crate::domain::errors::StartupError;
use crate::domain::repositories::application::Application;

/// Listener bound to the service port, serving one application object
pub struct HttpServer {
    listener: TcpListener,
    app: Arc<dyn Application>,
    request_timeout: Duration,
}

impl HttpServer {
    /// Binds the listener; failure is a startup error
    pub async fn bind(
        addr: SocketAddr,
        app: Arc<dyn Application>,
        request_timeout: Duration,
    ) -> Result<Self, StartupError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| StartupError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        Ok(Self {
            listener,
            app,
            request_timeout,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until `shutdown` resolves, then drains open connections
    ///
    /// Draining waits at most one request timeout.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let HttpServer {
            listener,
            app,
            request_timeout,
        } = self;
        let graceful = GracefulShutdown::new();
        tokio::pin!(shutdown);

        if let Ok(addr) = listener.local_addr() {
            info!("Listening on http://{}", addr);
        }

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, remote_addr) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!("Accept error: {}", e);
                            continue;
                        }
                    };

                    let app = app.clone();
                    let service = service_fn(move |req| {
                        let app = app.clone();
                        async move {
                            Ok::<_, Infallible>(dispatch(app, request_timeout, remote_addr, req).await)
                        }
                    });

                    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                    let conn = graceful.watch(conn);
                    tokio::spawn(async move {
                        if let Err(e) = conn.await {
                            debug!("Connection error from {}: {}", remote_addr, e);
                        }
                    });
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
            }
        }

        drop(listener);

        tokio::select! {
            _ = graceful.shutdown() => {
                info!("All connections closed");
            }
            _ = tokio::time::sleep(request_timeout) => {
                warn!("Timed out waiting for connections to close");
            }
        }

        Ok(())
    }
}

/// Converts a hyper request, runs the application under the timeout and
/// converts the result back
async fn dispatch(
    app: Arc<dyn Application>,
    request_timeout: Duration,
    remote_addr: SocketAddr,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();
    let method = parts.method.to_string();
    let path = parts.uri.path().to_string();

    // Reading the body and running the handler share one deadline
    let deadline = tokio::time::Instant::now() + request_timeout;

    let body = match tokio::time::timeout_at(deadline, body.collect()).await {
        Ok(Ok(collected)) => collected.to_bytes().to_vec(),
        Ok(Err(e)) => {
            warn!("Failed to read request body from {}: {}", remote_addr, e);
            return into_hyper(AppResponse::error(400, "failed to read request body"));
        }
        Err(_) => {
            warn!(
                "{} {} body not received within {}s",
                method,
                path,
                request_timeout.as_secs_f64()
            );
            return into_hyper(AppResponse::error(408, "request body timed out"));
        }
    };

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.to_string(), v.to_string()))
        })
        .collect();

    let request = AppRequest {
        method: method.clone(),
        path: path.clone(),
        query: parts.uri.query().map(|q| q.to_string()),
        headers,
        body,
    };

    let response = match tokio::time::timeout_at(deadline, app.handle(request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            error!("{} {} failed: {:#}", method, path, e);
            AppResponse::error(500, "internal server error")
        }
        Err(_) => {
            warn!(
                "{} {} timed out after {}s",
                method,
                path,
                request_timeout.as_secs_f64()
            );
            AppResponse::error(504, "request timed out")
        }
    };

    info!("{} \"{} {}\" {}", remote_addr, method, path, response.status);
    into_hyper(response)
}

fn into_hyper(response: AppResponse) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(response.status);
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder
        .body(Full::new(Bytes::from(response.body)))
        .unwrap_or_else(|e| {
            error!("Invalid response from application: {}", e);
            let mut fallback = Response::new(Full::new(Bytes::from_static(
                br#"{"error":"internal server error"}"#,
            )));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
