use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::json::interpret_body;
use super::request::PreparedRequest;
use super::response::ResponseResult;
use crate::error::{Error, Result};
use crate::forwarder::{ForwardReply, ForwardRequest, ForwarderFailure};

/// How a submission reaches its target. Both paths yield the same
/// [`ResponseResult`] contract.
#[derive(Debug, Clone)]
pub enum Transport {
    Direct(Client),
    Forwarder { client: Client, endpoint: String },
}

impl Transport {
    pub fn direct() -> Self {
        Transport::Direct(Client::new())
    }

    pub fn via_forwarder(endpoint: impl Into<String>) -> Self {
        Transport::Forwarder {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub async fn execute(&self, request: &PreparedRequest) -> Result<ResponseResult> {
        match self {
            Transport::Direct(client) => send_request(client, request).await,
            Transport::Forwarder { client, endpoint } => {
                send_via_forwarder(client, endpoint, request).await
            }
        }
    }
}

pub async fn send_request(client: &Client, request: &PreparedRequest) -> Result<ResponseResult> {
    let method: reqwest::Method = request.spec.method.into();
    let headers = build_headers(&request.headers)?;

    let mut builder = client.request(method, &request.spec.url).headers(headers);
    if let Some(body) = &request.body {
        builder = builder.body(body.clone());
    }

    let started = Instant::now();
    let response = builder.send().await?;
    let status = response.status();
    let headers = collect_headers(response.headers());
    let text = read_text(response).await?;
    let elapsed = started.elapsed();

    debug!(
        method = %request.spec.method,
        url = %request.spec.url,
        status = status.as_u16(),
        "direct request finished"
    );

    Ok(ResponseResult::completed(
        status.as_u16(),
        headers,
        interpret_body(text),
        elapsed,
    ))
}

async fn send_via_forwarder(
    client: &Client,
    endpoint: &str,
    request: &PreparedRequest,
) -> Result<ResponseResult> {
    let payload = ForwardRequest::from(request);

    let started = Instant::now();
    let response = client.post(endpoint).json(&payload).send().await?;
    let status = response.status();
    let text = read_text(response).await?;
    let elapsed = started.elapsed();

    if status != StatusCode::OK {
        let message = serde_json::from_str::<ForwarderFailure>(&text)
            .map(|failure| failure.error)
            .unwrap_or_else(|_| format!("unexpected forwarder status {status}"));
        return Err(Error::Forwarder(message));
    }

    let reply: ForwardReply = serde_json::from_str(&text)
        .map_err(|err| Error::Forwarder(format!("malformed forwarder reply: {err}")))?;

    debug!(
        method = %request.spec.method,
        url = %request.spec.url,
        status = reply.status,
        "forwarded request finished"
    );

    Ok(ResponseResult::completed(
        reply.status,
        reply.headers,
        interpret_body(reply.body),
        elapsed,
    ))
}

pub fn build_headers<'a, I>(input: I) -> Result<HeaderMap>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut headers = HeaderMap::new();

    for (key, value) in input {
        if key.is_empty() {
            continue;
        }

        let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|err| Error::HeaderName {
            name: key.clone(),
            reason: err.to_string(),
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|err| Error::HeaderValue {
            name: key.clone(),
            reason: err.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

/// Flattens a header map; repeated names are joined with `", "`.
pub fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut collected: HashMap<String, String> = HashMap::new();

    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    collected
}

/// Reads the whole body; invalid UTF-8 is replaced rather than rejected.
pub async fn read_text(response: reqwest::Response) -> Result<String> {
    let bytes = response.bytes().await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub(crate) fn sorted(headers: &HashMap<String, String>) -> BTreeMap<&str, &str> {
    headers
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::method::HttpMethod;
    use crate::http::request::RequestInput;
    use axum::Router;
    use axum::body::Bytes;
    use axum::http::{HeaderMap as AxumHeaders, Method};
    use axum::routing::any;
    use serde_json::json;

    /// Echoes method, headers and body back as JSON.
    async fn spawn_echo() -> String {
        async fn echo(method: Method, headers: AxumHeaders, body: Bytes) -> axum::Json<serde_json::Value> {
            let content_type = headers
                .get("content-type")
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string();
            axum::Json(json!({
                "method": method.as_str(),
                "content_type": content_type,
                "body": String::from_utf8_lossy(&body),
            }))
        }

        let app = Router::new()
            .route("/echo", any(echo))
            .route("/ping", any(|| async { "pong" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn form(method: HttpMethod, url: String, headers: &str, body: &str) -> RequestInput {
        RequestInput {
            method,
            url,
            headers: headers.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_headers_rejects_bad_names() {
        let input = HashMap::from([("bad name".to_string(), "x".to_string())]);
        let err = build_headers(&input).unwrap_err();
        assert!(err.to_string().starts_with("Invalid header name `bad name`"));
    }

    #[test]
    fn build_headers_skips_empty_names() {
        let input = HashMap::from([(String::new(), "x".to_string())]);
        assert!(build_headers(&input).unwrap().is_empty());
    }

    #[test]
    fn collect_headers_joins_repeats() {
        let mut headers = HeaderMap::new();
        headers.append("x-tag", HeaderValue::from_static("a"));
        headers.append("x-tag", HeaderValue::from_static("b"));
        let collected = collect_headers(&headers);
        assert_eq!(collected["x-tag"], "a, b");
    }

    #[tokio::test]
    async fn direct_post_sends_body_verbatim() {
        let base = spawn_echo().await;
        let request = form(HttpMethod::Post, format!("{base}/echo"), "", "{\"a\": 1}")
            .prepare()
            .unwrap();

        let result = send_request(&Client::new(), &request).await.unwrap();
        assert_eq!(result.status, 200);
        assert!(result.ok);
        assert_eq!(result.body["method"], "POST");
        assert_eq!(result.body["body"], "{\"a\": 1}");
        assert_eq!(result.body["content_type"], "application/json");
    }

    #[tokio::test]
    async fn direct_get_sends_no_body() {
        let base = spawn_echo().await;
        let request = form(HttpMethod::Get, format!("{base}/echo"), "", "{\"a\": 1}")
            .prepare()
            .unwrap();

        let result = send_request(&Client::new(), &request).await.unwrap();
        assert_eq!(result.body["method"], "GET");
        assert_eq!(result.body["body"], "");
    }

    #[tokio::test]
    async fn plain_text_response_is_a_string() {
        let base = spawn_echo().await;
        let request = form(HttpMethod::Get, format!("{base}/ping"), "", "")
            .prepare()
            .unwrap();

        let result = send_request(&Client::new(), &request).await.unwrap();
        assert_eq!(result.body, json!("pong"));
        assert!(result.time >= 0.0);
    }

    #[tokio::test]
    async fn unreachable_target_is_an_error() {
        let request = form(HttpMethod::Get, "http://127.0.0.1:1/".to_string(), "", "")
            .prepare()
            .unwrap();

        let err = Transport::direct().execute(&request).await.unwrap_err();
        assert!(err.to_string().starts_with("Request failed:"));
    }
}
