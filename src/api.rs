use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde_json::Value;

use crate::tunnel::ConfigDocument;

/// Failures talking to the config API. `Display` is the message shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("unexpected response from server")]
    UnexpectedResponse,
}

/// Operations the editor needs from the remote side.
pub trait ConfigApi {
    fn health(&self) -> Result<(), ApiError>;
    fn get_config(&self) -> Result<ConfigDocument, ApiError>;
    fn put_config(&self, doc: &ConfigDocument) -> Result<(), ApiError>;
    fn port_in_use(&self, port: u16) -> Result<bool, ApiError>;
}

/// Join a base URL and a path without doubling slashes.
pub fn join_url(base: &str, path: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if path.is_empty() {
        return trimmed.to_string();
    }
    if path.starts_with('/') {
        format!("{}{}", trimmed, path)
    } else {
        format!("{}/{}", trimmed, path)
    }
}

/// Blocking HTTP client for `GET/PUT /config`, `GET /health` and `GET /port-check`.
pub struct ApiClient {
    base: String,
    http: Client,
}

impl ApiClient {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base, path)
    }
}

/// Use the server's `detail` string when it sent one, otherwise `<fallback>: <status>`.
fn status_error(resp: Response, fallback: &str) -> ApiError {
    let status = resp.status();
    let detail = resp
        .json::<Value>()
        .ok()
        .and_then(|body| body.get("detail").and_then(Value::as_str).map(str::to_string));
    status_error_from(status, detail, fallback)
}

fn status_error_from(status: StatusCode, detail: Option<String>, fallback: &str) -> ApiError {
    let message = match detail {
        Some(d) if !d.trim().is_empty() => d,
        _ => format!("{}: {}", fallback, status.as_u16()),
    };
    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

impl ConfigApi for ApiClient {
    fn health(&self) -> Result<(), ApiError> {
        let url = self.url("/health");
        log::debug!("GET {}", url);
        let resp = self.http.get(&url).send()?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(status_error_from(resp.status(), None, "health check failed"))
        }
    }

    fn get_config(&self) -> Result<ConfigDocument, ApiError> {
        let url = self.url("/config");
        log::debug!("GET {}", url);
        let resp = self.http.get(&url).send()?;
        if !resp.status().is_success() {
            return Err(status_error_from(resp.status(), None, "failed to load"));
        }
        Ok(resp.json::<ConfigDocument>()?)
    }

    fn put_config(&self, doc: &ConfigDocument) -> Result<(), ApiError> {
        let url = self.url("/config");
        log::debug!("PUT {} ({} tunnels)", url, doc.tunnels.len());
        let resp = self.http.put(&url).json(doc).send()?;
        if !resp.status().is_success() {
            return Err(status_error(resp, "failed to save"));
        }
        Ok(())
    }

    fn port_in_use(&self, port: u16) -> Result<bool, ApiError> {
        let url = self.url("/port-check");
        log::debug!("GET {}?port={}", url, port);
        let resp = self
            .http
            .get(&url)
            .query(&[("port", port)])
            .send()?;
        if !resp.status().is_success() {
            return Err(status_error(resp, "failed to check port"));
        }
        let body: Value = resp.json().map_err(|_| ApiError::UnexpectedResponse)?;
        parse_port_check(&body)
    }
}

/// `{"in_use": bool}`; anything else is an unexpected response.
fn parse_port_check(body: &Value) -> Result<bool, ApiError> {
    body.get("in_use")
        .and_then(Value::as_bool)
        .ok_or(ApiError::UnexpectedResponse)
}
