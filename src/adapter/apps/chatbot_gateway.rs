//! Chatbot Gateway Application
//!
//! `Flask_Server:app` として登録される組み込みアプリケーション。
//! ヘルスチェックに応答し、それ以外は外部のアプリケーションへ転送する

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Method};
use serde_json::json;

use crate::domain::entities::http_message::{AppRequest, AppResponse};
use crate::domain::repositories::application::Application;

pub const HEALTH_PATH: &str = "/health";

/// Headers that describe a single connection and must not be forwarded
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

fn is_forwardable(name: &str) -> bool {
    !HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

/// Health endpoint plus pass-through to the external application
pub struct ChatbotGateway {
    client: Client,
    upstream_url: Option<String>,
}

impl ChatbotGateway {
    pub fn new(upstream_url: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client for upstream forwarding")?;

        Ok(Self {
            client,
            upstream_url: upstream_url.map(|u| u.trim_end_matches('/').to_string()),
        })
    }

    fn health(request: &AppRequest) -> AppResponse {
        if request.method.eq_ignore_ascii_case("GET") || request.method.eq_ignore_ascii_case("HEAD")
        {
            AppResponse::json(200, &json!({ "status": "healthy" }))
        } else {
            let mut response = AppResponse::error(405, "method not allowed");
            response
                .headers
                .push(("allow".to_string(), "GET, HEAD".to_string()));
            response
        }
    }

    async fn forward(&self, upstream: &str, request: AppRequest) -> AppResponse {
        let url = format!("{}{}", upstream, request.path_and_query());

        let method = match Method::from_bytes(request.method.as_bytes()) {
            Ok(method) => method,
            Err(_) => return AppResponse::error(405, "method not allowed"),
        };

        let mut outbound = self.client.request(method, &url);
        for (name, value) in request.headers.iter().filter(|(n, _)| is_forwardable(n)) {
            outbound = outbound.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            outbound = outbound.body(request.body);
        }

        let response = match outbound.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Upstream request to {} failed: {}", url, e);
                return upstream_failure(&e.to_string());
            }
        };

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter(|(name, _)| is_forwardable(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();

        match response.bytes().await {
            Ok(body) => {
                debug!("{} {} -> {}", request.method, url, status);
                AppResponse {
                    status,
                    headers,
                    body: body.to_vec(),
                }
            }
            Err(e) => {
                warn!("Failed to read upstream response from {}: {}", url, e);
                upstream_failure(&e.to_string())
            }
        }
    }
}

fn upstream_failure(details: &str) -> AppResponse {
    AppResponse::json(
        502,
        &json!({ "error": "upstream application unavailable", "details": details }),
    )
}

#[async_trait]
impl Application for ChatbotGateway {
    async fn handle(&self, request: AppRequest) -> Result<AppResponse> {
        if request.path == HEALTH_PATH {
            return Ok(Self::health(&request));
        }

        match &self.upstream_url {
            Some(upstream) => Ok(self.forward(upstream, request).await),
            None => Ok(AppResponse::error(503, "no upstream application configured")),
        }
    }
}
