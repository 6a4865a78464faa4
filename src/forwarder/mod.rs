//! Server-side forwarder: performs one HTTP call on behalf of a client that
//! cannot reach the target itself (for instance because of browser origin
//! rules) and reports the outcome as JSON.

mod server;

use std::collections::HashMap;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::http::client::{build_headers, collect_headers, read_text};
use crate::http::request::PreparedRequest;

pub use server::{ForwarderState, router, serve};

/// Body of `POST /api/proxy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardRequest {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Sent JSON-encoded for every method except GET. Absent or `null` means
    /// no body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Successful forwarder reply. `body` is the raw upstream text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardReply {
    pub ok: bool,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwarderFailure {
    pub error: String,
}

impl From<&PreparedRequest> for ForwardRequest {
    fn from(request: &PreparedRequest) -> Self {
        let body = request
            .body
            .as_ref()
            .map(|_| request.spec.body.clone());

        ForwardRequest {
            url: request.spec.url.clone(),
            method: request.spec.method.to_string(),
            headers: request.headers.clone().into_iter().collect(),
            body,
        }
    }
}

/// Performs exactly one outbound call. No retries and no timeout: a hung
/// upstream hangs the caller.
pub async fn forward(client: &Client, request: ForwardRequest) -> Result<ForwardReply> {
    let method = reqwest::Method::from_bytes(request.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::Method(request.method.clone()))?;
    let headers = build_headers(&request.headers)?;

    let mut builder = client.request(method.clone(), &request.url).headers(headers);
    if method != reqwest::Method::GET {
        if let Some(body) = &request.body {
            let encoded = serde_json::to_string(body).map_err(|source| Error::Encode {
                what: "request body",
                source,
            })?;
            builder = builder.body(encoded);
        }
    }

    let response = builder.send().await?;
    let status = response.status();
    let headers = collect_headers(response.headers());
    let body = read_text(response).await?;

    debug!(%method, url = %request.url, status = status.as_u16(), "forwarded");

    Ok(ForwardReply {
        ok: status.is_success(),
        status: status.as_u16(),
        headers,
        body,
    })
}

/// Decodes a raw request body and forwards it. Malformed input is reported
/// like any other forwarding failure.
pub async fn forward_bytes(client: &Client, raw: &[u8]) -> Result<ForwardReply> {
    let request: ForwardRequest = serde_json::from_slice(raw).map_err(|source| Error::Json {
        field: "forward request",
        source,
    })?;
    forward(client, request).await
}
