//! Immutable resource snapshots.
//!
//! A poller publishes `Arc<Snapshot>` values; every change produces a new
//! snapshot derived from the previous one, readers never see a half-applied
//! update.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ErrorInfo;
use crate::record::{Record, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SnapshotStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub data: Vec<Record>,
    /// Time of the last successful fetch
    pub fetched_at: Option<DateTime<Utc>>,
    pub status: SnapshotStatus,
    pub error: Option<ErrorInfo>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::idle()
    }
}

impl Snapshot {
    pub fn idle() -> Self {
        Self {
            data: Vec::new(),
            fetched_at: None,
            status: SnapshotStatus::Idle,
            error: None,
        }
    }

    pub fn loading(&self) -> Self {
        Self {
            status: SnapshotStatus::Loading,
            ..self.clone()
        }
    }

    /// Fresh data from the server; clears any previous error
    pub fn ready(data: Vec<Record>) -> Self {
        Self {
            data,
            fetched_at: Some(Utc::now()),
            status: SnapshotStatus::Ready,
            error: None,
        }
    }

    /// Failed fetch: keep the last known-good data
    pub fn failed(&self, error: ErrorInfo) -> Self {
        Self {
            data: self.data.clone(),
            fetched_at: self.fetched_at,
            status: SnapshotStatus::Error,
            error: Some(error),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == SnapshotStatus::Ready
    }

    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn find(&self, id_field: &str, id: &RecordId) -> Option<&Record> {
        self.data
            .iter()
            .find(|r| r.id(id_field).as_ref() == Some(id))
    }

    /// Copy without the record carrying `id`, or `None` if it isn't present
    pub fn without(&self, id_field: &str, id: &RecordId) -> Option<Self> {
        let index = self
            .data
            .iter()
            .position(|r| r.id(id_field).as_ref() == Some(id))?;
        let mut data = self.data.clone();
        data.remove(index);
        Some(Self {
            data,
            ..self.clone()
        })
    }

    /// Copy with `record` upserted: replaced in place when its id already
    /// exists, appended otherwise. Ids stay unique.
    pub fn with_upserted(&self, id_field: &str, record: Record) -> Self {
        let mut data = self.data.clone();
        let existing = record
            .id(id_field)
            .and_then(|id| data.iter().position(|r| r.id(id_field).as_ref() == Some(&id)));
        match existing {
            Some(index) => data[index] = record,
            None => data.push(record),
        }
        Self {
            data,
            ..self.clone()
        }
    }
}
