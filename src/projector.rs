//! Filtered projections of a snapshot for display.

use crate::record::Record;
use crate::snapshot::Snapshot;

pub const DEFAULT_FILTER_FIELD: &str = "name";

/// Case-insensitive substring filter on one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub pattern: String,
    pub field: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::on_field(DEFAULT_FILTER_FIELD)
    }
}

impl FilterState {
    pub fn on_field(field: &str) -> Self {
        Self {
            pattern: String::new(),
            field: field.to_string(),
        }
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = pattern.to_string();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        if self.pattern.is_empty() {
            return true;
        }
        // Null, nested, and missing values never match a non-empty pattern
        record
            .text(&self.field)
            .map(|value| value.to_lowercase().contains(&self.pattern.to_lowercase()))
            .unwrap_or(false)
    }
}

/// Records of `snapshot` matching `filter`, in snapshot order.
///
/// Borrows from the snapshot; never reorders or mutates it.
pub fn project<'a>(snapshot: &'a Snapshot, filter: &FilterState) -> Vec<&'a Record> {
    snapshot.data.iter().filter(|r| filter.matches(r)).collect()
}
