use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::json::{parse_headers_text, parse_or_string};
use super::method::HttpMethod;
use crate::error::{Error, Result};

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// A request as saved to history or a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    pub url: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Value,
    /// The body as typed, kept only when it is not valid JSON. `body` then
    /// holds the same text as a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_body: Option<String>,
}

/// The request form as the user typed it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInput {
    pub method: HttpMethod,
    pub url: String,
    pub headers: String,
    pub body: String,
}

/// A submission ready to go on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub spec: RequestSpec,
    /// User headers merged over the default content type.
    pub headers: BTreeMap<String, String>,
    /// Verbatim body text, only for methods that carry one.
    pub body: Option<String>,
}

impl RequestInput {
    /// Copies the form into an independent snapshot. Header text must parse;
    /// body text is stored as JSON when it parses and as a string otherwise.
    pub fn snapshot(&self) -> Result<RequestSpec> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(Error::EmptyUrl);
        }

        let headers = parse_headers_text(&self.headers)?;
        let (body, raw_body) = parse_or_string(&self.body);
        Ok(RequestSpec {
            url: url.to_string(),
            method: self.method,
            headers,
            body,
            raw_body,
        })
    }

    pub fn prepare(&self) -> Result<PreparedRequest> {
        let spec = self.snapshot()?;

        let mut headers = BTreeMap::new();
        let overrides_content_type = spec
            .headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case("content-type"));
        if !overrides_content_type {
            headers.insert("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string());
        }
        headers.extend(spec.headers.clone());

        let body = if self.method.carries_body() && !self.body.trim().is_empty() {
            Some(self.body.clone())
        } else {
            None
        };

        Ok(PreparedRequest {
            spec,
            headers,
            body,
        })
    }
}

impl From<&RequestSpec> for RequestInput {
    fn from(spec: &RequestSpec) -> Self {
        let headers = if spec.headers.is_empty() {
            "{}".to_string()
        } else {
            serde_json::to_string_pretty(&spec.headers).unwrap_or_else(|_| "{}".to_string())
        };

        RequestInput {
            method: spec.method,
            url: spec.url.clone(),
            headers,
            body: spec
                .raw_body
                .clone()
                .unwrap_or_else(|| super::json::editor_text(&spec.body)),
        }
    }
}
