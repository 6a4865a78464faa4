use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid JSON in {field}: {source}")]
    Json {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Headers must be a JSON object of name/value pairs")]
    HeadersNotObject,

    #[error("Header `{0}` must have a string, number or boolean value")]
    HeaderValueType(String),

    #[error("Invalid header name `{name}`: {reason}")]
    HeaderName { name: String, reason: String },

    #[error("Invalid header value for `{name}`: {reason}")]
    HeaderValue { name: String, reason: String },

    #[error("Invalid HTTP method: {0}")]
    Method(String),

    #[error("URL cannot be empty")]
    EmptyUrl,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Forwarder error: {0}")]
    Forwarder(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
