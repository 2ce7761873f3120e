//! Backend collaborator interfaces.
//!
//! - [`Fetcher`]: one round trip for one logical resource
//! - [`RemoteWriter`]: delete/create/update calls used by the mutation coordinator
//! - [`HttpBackend`]: both, over plain REST/JSON
//!
//! Neither trait retries; retry belongs to the poller's next tick.

pub mod http;

#[cfg(test)]
pub mod testing;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ErrorInfo;
use crate::record::{Record, RecordId, DEFAULT_ID_FIELD};

pub use http::HttpBackend;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Identifies one backend resource: where it lives and how its records are keyed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Short name used in logs and notifications ("recent", "archive")
    pub name: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub id_field: String,
    /// Upper bound on a single fetch
    pub timeout: Duration,
}

impl ResourceDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            query: Vec::new(),
            id_field: DEFAULT_ID_FIELD.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_id_field(mut self, id_field: &str) -> Self {
        self.id_field = id_field.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a resource. A scalar resource comes back as a one-element list.
    async fn fetch(&self, resource: &ResourceDescriptor) -> Result<Vec<Record>, ErrorInfo>;
}

#[async_trait]
pub trait RemoteWriter: Send + Sync {
    /// Delete by id. The backend expects `{"id": ...}` in the body.
    async fn delete(&self, path: &str, id: &RecordId) -> Result<(), ErrorInfo>;

    /// Create a record. Returns the server's copy when it sends one back.
    async fn create(&self, path: &str, payload: &Record) -> Result<Option<Record>, ErrorInfo>;

    /// Replace a record. Returns the server's copy when it sends one back.
    async fn update(&self, path: &str, payload: &Record) -> Result<Option<Record>, ErrorInfo>;
}

/// Run a backend call under a deadline, surfacing expiry as `Timeout`
pub async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, ErrorInfo>
where
    F: Future<Output = Result<T, ErrorInfo>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ErrorInfo::timeout(timeout)),
    }
}

/// Normalise a response body into records.
///
/// Arrays map element-wise, a lone object becomes a one-element list and
/// `null` (no current detection yet) is empty.
pub fn decode_records(value: Value) -> Result<Vec<Record>, ErrorInfo> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(vec![Record::from_map(map)]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(map) => Ok(Record::from_map(map)),
                other => Err(ErrorInfo::decode(format!(
                    "element {} is {}, expected an object",
                    i,
                    json_type(&other)
                ))),
            })
            .collect(),
        other => Err(ErrorInfo::decode(format!(
            "expected an object or array, got {}",
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
