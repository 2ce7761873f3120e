//! Polling sync core for the species detection dashboard.
//!
//! Pollers keep one snapshot per backend resource fresh, the mutation
//! coordinator applies writes and reconciles those snapshots, and the
//! notification sink reports every outcome. [`dashboard::Dashboard`] wires
//! them together for the terminal UI in `main.rs`.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod mutation;
pub mod notify;
pub mod poller;
pub mod projector;
pub mod record;
pub mod snapshot;
pub mod views;

pub use config::Config;
pub use dashboard::Dashboard;
pub use error::{ErrorInfo, ErrorKind};
pub use record::{Record, RecordId};
pub use snapshot::{Snapshot, SnapshotStatus};
