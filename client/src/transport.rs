use async_trait::async_trait;
use reqwest::{
    header::{HeaderValue, ACCEPT, AUTHORIZATION},
    Client, ClientBuilder,
};
use serde::Serialize;
use std::time::Duration;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// A request relative to the API base URL. Kept free of credentials so the
/// same value can be replayed with a fresh token.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            ..Self::get(path)
        }
    }

    pub fn post<B: Serialize>(path: impl Into<String>, body: &B) -> Result<Self, ApiError> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(Self {
            method: Method::Post,
            body: Some(body),
            ..Self::get(path)
        })
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub bytes: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes one HTTP exchange. Non-2xx statuses are returned as responses,
/// only failures to obtain a response are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(
        &self,
        request: &HttpRequest,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, ApiError>;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = ClientBuilder::new()
            .tcp_keepalive(Some(Duration::from_secs(30)))
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        request: &HttpRequest,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Delete => self.client.delete(&url),
        };
        builder = builder.header(ACCEPT, HeaderValue::from_static("application/json"));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let started = std::time::Instant::now();
        let resp = builder.send().await.map_err(|e| {
            log::warn!(target: "http", "{:?} {} failed: {e}", request.method, request.path);
            ApiError::Transport(e.to_string())
        })?;
        let status = resp.status().as_u16();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?
            .to_vec();
        log::debug!(
            target: "http",
            "{:?} {} -> {} in {}ms",
            request.method,
            request.path,
            status,
            started.elapsed().as_millis()
        );
        Ok(HttpResponse { status, bytes })
    }
}
