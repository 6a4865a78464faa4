use std::collections::HashMap;
use std::time::Duration;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// What the response panel shows for one submission.
///
/// A failure serializes as `{"error": ...}` alone; the other fields only
/// hold placeholders then.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseResult {
    pub status: u16,
    pub ok: bool,
    pub headers: HashMap<String, String>,
    pub body: Value,
    /// Round trip in milliseconds, one decimal place.
    pub time: f64,
    pub error: Option<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Wire<'a> {
    Failed {
        error: &'a str,
    },
    Completed {
        status: u16,
        ok: bool,
        headers: &'a HashMap<String, String>,
        body: &'a Value,
        time: f64,
    },
}

impl Serialize for ResponseResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match &self.error {
            Some(error) => Wire::Failed { error },
            None => Wire::Completed {
                status: self.status,
                ok: self.ok,
                headers: &self.headers,
                body: &self.body,
                time: self.time,
            },
        };
        wire.serialize(serializer)
    }
}

impl ResponseResult {
    pub fn completed(
        status: u16,
        headers: HashMap<String, String>,
        body: Value,
        elapsed: Duration,
    ) -> Self {
        Self {
            status,
            ok: is_success(status),
            headers,
            body,
            time: elapsed_ms(elapsed),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: 0,
            ok: false,
            headers: HashMap::new(),
            body: Value::Null,
            time: 0.0,
            error: Some(message.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

pub fn is_success(status: u16) -> bool {
    (200..=299).contains(&status)
}

pub fn elapsed_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 10_000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_mirrors_the_success_range() {
        assert!(!is_success(199));
        assert!(is_success(200));
        assert!(is_success(299));
        assert!(!is_success(301));
        assert!(!is_success(500));
    }

    #[test]
    fn elapsed_is_rounded_to_one_decimal() {
        assert_eq!(elapsed_ms(Duration::from_micros(12_340)), 12.3);
        assert_eq!(elapsed_ms(Duration::from_micros(12_360)), 12.4);
        assert_eq!(elapsed_ms(Duration::from_millis(3)), 3.0);
    }

    #[test]
    fn failure_serializes_as_error_only() {
        let result = ResponseResult::failure("Request failed: boom");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, serde_json::json!({"error": "Request failed: boom"}));
        assert!(result.is_failure());
    }

    #[test]
    fn completed_results_omit_error() {
        let result = ResponseResult::completed(
            204,
            HashMap::new(),
            Value::Null,
            Duration::from_millis(1),
        );
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("error").is_none());
        assert_eq!(value["status"], 204);
        assert_eq!(value["ok"], true);
        assert_eq!(value["time"], 1.0);
        assert!(result.ok);
    }
}
