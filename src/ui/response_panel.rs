use crate::http::client::sorted;
use crate::http::json::pretty;
use crate::http::response::ResponseResult;

pub fn render(response: Option<&ResponseResult>, notice: Option<&str>) -> String {
    let mut out = String::new();

    match response {
        None => out.push_str("No response yet..."),
        Some(response) if response.is_failure() => {
            let error = response.error.as_deref().unwrap_or_default();
            out.push_str(&format!("Error: {error}"));
        }
        Some(response) => {
            out.push_str(&format!(
                "Status: {} {} | Time: {} ms\n",
                response.status,
                status_label(response.status),
                response.time
            ));
            if !response.headers.is_empty() {
                out.push_str("Headers:\n");
                for (name, value) in sorted(&response.headers) {
                    out.push_str(&format!("  {name}: {value}\n"));
                }
            }
            out.push_str("Body:\n");
            out.push_str(&body_text(&response.body));
        }
    }

    if let Some(notice) = notice {
        out.push_str(&format!("\n! {notice}"));
    }

    out
}

/// Plain strings are shown as-is, everything else pretty printed.
fn body_text(body: &serde_json::Value) -> String {
    match body {
        serde_json::Value::String(text) => text.clone(),
        other => pretty(other),
    }
}

fn status_label(status: u16) -> &'static str {
    match status {
        200..=299 => "(success)",
        300..=399 => "(redirect)",
        400..=599 => "(error)",
        _ => "",
    }
}
