//! Write-only clipboard sink and the two text formats copied into it.

use std::sync::Mutex;

use crate::http::json::{parse_headers_text, pretty};
use crate::http::request::RequestInput;
use crate::http::response::ResponseResult;

pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str);
}

/// Prints copied text; used by the command line front end.
#[derive(Debug, Default)]
pub struct StdoutClipboard;

impl Clipboard for StdoutClipboard {
    fn write_text(&self, text: &str) {
        println!("{text}");
    }
}

/// Keeps every write, most recent last.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    writes: Mutex<Vec<String>>,
}

impl MemoryClipboard {
    pub fn last(&self) -> Option<String> {
        self.writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .last()
            .cloned()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) {
        self.writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(text.to_string());
    }
}

/// Pretty JSON of the response body. Failures have nothing to copy.
pub fn response_json(response: &ResponseResult) -> Option<String> {
    if response.is_failure() || response.body.is_null() {
        return None;
    }
    Some(pretty(&response.body))
}

/// Rebuilds the form as a curl command line. Headers that do not parse are
/// left out rather than failing the copy.
pub fn curl_command(form: &RequestInput) -> String {
    let mut curl = format!("curl -X {} \"{}\"", form.method, form.url.trim());

    if let Ok(headers) = parse_headers_text(&form.headers) {
        for (name, value) in headers {
            curl.push_str(&format!(" -H \"{name}: {value}\""));
        }
    }

    let body = form.body.trim();
    if form.method.carries_body() && !body.is_empty() {
        curl.push_str(&format!(" -d '{body}'"));
    }

    curl
}
