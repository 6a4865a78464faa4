//! Request history: one row per successful submission, newest first.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::request::RequestSpec;

pub type HistoryId = i64;

/// A persisted request/response pair. Rows are never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: HistoryId,
    #[serde(flatten)]
    pub request: RequestSpec,
    pub response: Value,
    /// Unix time in milliseconds.
    pub created_at: i64,
}

/// A row about to be inserted; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryEntry {
    pub request: RequestSpec,
    pub response: Value,
    pub created_at: i64,
}

impl NewHistoryEntry {
    pub fn new(request: RequestSpec, response: Value) -> Self {
        Self {
            request,
            response,
            created_at: current_unix_millis(),
        }
    }
}

pub fn current_unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}
