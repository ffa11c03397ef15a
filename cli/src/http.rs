use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use mealsync_core::error::RemoteError;

const ACCEPTED_STATUSES: [u16; 3] = [200, 201, 202];
const ERROR_BODY_LIMIT: usize = 300;

pub(crate) fn build_client(headers: HeaderMap, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(format!("mealsync/{}", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5).min(timeout))
        .build()
        .context("Failed to build HTTP client")
}

/// Send a request once and return its JSON body (`Null` when empty).
pub(crate) async fn send(request: reqwest::RequestBuilder, url: &str) -> Result<Value, RemoteError> {
    debug!("{url}");
    let resp = request.send().await.map_err(|e| RemoteError::Transport {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    let status = resp.status().as_u16();
    let text = resp.text().await.map_err(|e| RemoteError::Transport {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    classify(url, status, &text)
}

/// Turn a raw response into a JSON body or the matching error.
///
/// Besides the status code, a JSON array whose entries carry a non-empty
/// `errorMessage` counts as a rejection.
pub(crate) fn classify(url: &str, status: u16, text: &str) -> Result<Value, RemoteError> {
    if !ACCEPTED_STATUSES.contains(&status) {
        return Err(RemoteError::Status {
            url: url.to_string(),
            status,
            body: truncate(text.trim(), ERROR_BODY_LIMIT),
        });
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    let body: Value = serde_json::from_str(text).map_err(|e| RemoteError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    if let Some(message) = embedded_error(&body) {
        return Err(RemoteError::Rejected {
            url: url.to_string(),
            message,
        });
    }
    Ok(body)
}

pub(crate) fn decode<T: DeserializeOwned>(url: &str, body: Value) -> Result<T, RemoteError> {
    serde_json::from_value(body).map_err(|e| RemoteError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

fn embedded_error(body: &Value) -> Option<String> {
    body.as_array()?
        .iter()
        .filter_map(|item| item.get("errorMessage"))
        .find_map(|msg| match msg {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
