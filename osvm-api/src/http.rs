//! Generic HTTP verb helpers over a catalog endpoint.
//!
//! Every API wrapper goes through these so request headers, timeouts, and
//! error body formatting stay in one place.

use once_cell::sync::Lazy;
use osvm_core::{Error, Result};
use reqwest::blocking::Client;
use reqwest::Method;
use serde::Serialize;
use std::time::Duration;

use crate::errors::format_error_body;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const USER_AGENT: &str = concat!("osvm v", env!("CARGO_PKG_VERSION"));

// Nova microversion that understands volume_type in block_device_mapping_v2.
const NOVA_API_VERSION: &str = "2.72";

static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .expect("HTTP client construction with static settings should not fail")
});

/// Status code, body, and the subject-token header of one API exchange.
#[derive(Debug, Default)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
    /// `X-Subject-Token` from the identity service, when present.
    pub subject_token: Option<String>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Convert a non-success response into the typed API error.
    pub fn into_api_error(self) -> Error {
        Error::Api {
            status: self.status,
            message: self.body,
        }
    }
}

fn send(method: Method, url: &str, token: &str, body: Option<String>) -> Result<ApiResponse> {
    tracing::debug!(%method, url, has_body = body.is_some(), "api request");

    let mut req = CLIENT
        .request(method, url)
        .header("Accept", "application/json")
        .header("X-OpenStack-Nova-API-Version", NOVA_API_VERSION);
    if !token.is_empty() {
        req = req.header("X-Auth-Token", token);
    }
    if let Some(json) = body {
        req = req.header("Content-Type", "application/json").body(json);
    }

    let resp = req
        .send()
        .map_err(|e| Error::Http(format!("request to {url} failed: {e}")))?;

    let status = resp.status().as_u16();
    let subject_token = resp
        .headers()
        .get("X-Subject-Token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let raw = resp
        .text()
        .map_err(|e| Error::Http(format!("failed to read response body: {e}")))?;

    tracing::debug!(status, bytes = raw.len(), "api response");

    let body = if status >= 400 {
        format_error_body(&raw)
    } else {
        raw
    };

    Ok(ApiResponse {
        status,
        body,
        subject_token,
    })
}

pub fn get(url: &str, token: &str) -> Result<ApiResponse> {
    send(Method::GET, url, token, None)
}

pub fn delete(url: &str, token: &str) -> Result<ApiResponse> {
    send(Method::DELETE, url, token, None)
}

pub fn post<B: Serialize>(url: &str, token: &str, body: &B) -> Result<ApiResponse> {
    let json = serde_json::to_string(body).map_err(|e| Error::Serialization(e.to_string()))?;
    send(Method::POST, url, token, Some(json))
}

pub fn put<B: Serialize>(url: &str, token: &str, body: &B) -> Result<ApiResponse> {
    let json = serde_json::to_string(body).map_err(|e| Error::Serialization(e.to_string()))?;
    send(Method::PUT, url, token, Some(json))
}

pub fn patch<B: Serialize>(url: &str, token: &str, body: &B) -> Result<ApiResponse> {
    let json = serde_json::to_string(body).map_err(|e| Error::Serialization(e.to_string()))?;
    send(Method::PATCH, url, token, Some(json))
}

/// Parse a success body into `T`, mapping JSON errors to the shared taxonomy.
pub fn parse<T: serde::de::DeserializeOwned>(resp: &ApiResponse) -> Result<T> {
    serde_json::from_str(&resp.body)
        .map_err(|e| Error::Serialization(format!("failed to parse response: {e}")))
}
