//! JSON-RPC channel to the camera control endpoint
//!
//! Every call is an HTTP POST of `{method, params, id, version}` to the
//! endpoint. Request ids come from a [`RequestIds`] counter that starts at 1
//! and is incremented exactly once per call, whatever its outcome.
//!
//! # Protocol quirk
//!
//! Depending on the firmware, the payload of a successful answer is found
//! either in `result` or in `results`. Both are accepted, `result` first.
//! Real devices exhibit both forms, do not "fix" this.

use crate::error::{CameraError, Result};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};
use url::Url;

/// Monotonic request id source, shared by the successive channels of one
/// session so that a reconnect does not reuse ids.
#[derive(Debug, Clone)]
pub struct RequestIds(Arc<AtomicU64>);

impl RequestIds {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU64::new(1)))
    }

    /// Take the next id
    pub fn next_id(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }

    /// Id the next call will use
    pub fn peek(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for RequestIds {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    method: &'a str,
    params: &'a [Value],
    id: u64,
    version: &'a str,
}

/// Channel bound to one control endpoint
#[derive(Debug, Clone)]
pub struct RpcChannel {
    http: reqwest::Client,
    endpoint: Url,
    version: String,
    ids: RequestIds,
}

impl RpcChannel {
    pub fn new(
        http: reqwest::Client,
        endpoint: Url,
        version: impl Into<String>,
        ids: RequestIds,
    ) -> Self {
        Self {
            http,
            endpoint,
            version: version.into(),
            ids,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn host(&self) -> Option<&str> {
        self.endpoint.host_str()
    }

    /// Send one request and return its `result` (or `results`) payload.
    ///
    /// Nothing is retried here; retry policy belongs to the caller.
    pub async fn call(&self, method: &str, params: &[Value]) -> Result<Value> {
        let request = RpcRequest {
            method,
            params,
            id: self.ids.next_id(),
            version: &self.version,
        };

        debug!("📤 {} id={} params={}", method, request.id, serde_json::Value::from(params));

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| CameraError::rpc_transport(method, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CameraError::rpc_transport(method, e))?;

        trace!("📥 {} id={} HTTP {} body={}", method, request.id, status, body);

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                CameraError::rpc_transport(method, format!("malformed response body: {}", e))
            } else {
                CameraError::rpc_transport(method, format!("HTTP status {}", status))
            }
        })?;

        match extract_result(method, value) {
            Err(CameraError::RpcProtocol { .. }) if !status.is_success() => Err(
                CameraError::rpc_transport(method, format!("HTTP status {}", status)),
            ),
            other => other,
        }
    }
}

/// Pull the payload out of a decoded response.
pub fn extract_result(method: &str, response: Value) -> Result<Value> {
    let Value::Object(mut fields) = response else {
        return Err(CameraError::rpc_protocol(method, "response is not a JSON object"));
    };

    for key in ["result", "results"] {
        match fields.remove(key) {
            Some(Value::Null) | None => {}
            Some(payload) => return Ok(payload),
        }
    }

    if let Some(error) = fields.remove("error") {
        let (code, message) = parse_device_error(&error);
        return Err(CameraError::Device {
            method: method.to_string(),
            code,
            message,
        });
    }

    Err(CameraError::rpc_protocol(
        method,
        "neither 'result' nor 'results' in response",
    ))
}

/// `error` is `[code, message]`; anything else is kept verbatim
fn parse_device_error(error: &Value) -> (i64, String) {
    match error.as_array().map(Vec::as_slice) {
        Some([code, message, ..]) if code.is_i64() => (
            code.as_i64().unwrap_or_default(),
            message
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| message.to_string()),
        ),
        Some([code]) if code.is_i64() => (code.as_i64().unwrap_or_default(), String::new()),
        _ => (-1, error.to_string()),
    }
}
