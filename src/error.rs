//! Typed failures surfaced at the fetch and mutation boundaries.
//!
//! Nothing here is fatal: a poller absorbs these into its snapshot and the
//! mutation coordinator turns them into notifications.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What went wrong on a backend round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transport failure (connection refused, reset, DNS)
    Network,
    /// Non-2xx response
    HttpStatus,
    /// Body was not the JSON shape we expected
    Decode,
    /// Caller-supplied deadline elapsed
    Timeout,
    /// Target already gone or changed (e.g. delete of an already deleted record)
    Conflict,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Network => write!(f, "network error"),
            ErrorKind::HttpStatus => write!(f, "http status error"),
            ErrorKind::Decode => write!(f, "decode error"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Conflict => write!(f, "conflict"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    /// HTTP status code, when the backend answered at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("no response after {}ms", after.as_millis()),
        )
    }

    /// Classify a non-2xx response.
    ///
    /// `write` marks a delete/create/update call: 404 and 409 there mean the
    /// target was already changed server-side.
    pub fn from_status(status: u16, body: &str, write: bool) -> Self {
        let kind = if write && (status == 404 || status == 409) {
            ErrorKind::Conflict
        } else {
            ErrorKind::HttpStatus
        };
        Self {
            kind,
            message: status_message(status, body),
            status: Some(status),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }
}

/// Prefer the backend's own `error`/`message` field over the raw body
fn status_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().chars().take(200).collect());

    if detail.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, detail)
    }
}

impl From<reqwest::Error> for ErrorInfo {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ErrorInfo::new(ErrorKind::Timeout, e.to_string())
        } else if e.is_decode() {
            ErrorInfo::decode(e.to_string())
        } else if let Some(status) = e.status() {
            ErrorInfo::from_status(status.as_u16(), "", false)
        } else {
            ErrorInfo::network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ErrorInfo {
    fn from(e: serde_json::Error) -> Self {
        ErrorInfo::decode(e.to_string())
    }
}
