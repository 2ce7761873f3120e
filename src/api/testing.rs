//! In-memory backend with scripted responses for poller and mutation tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{Fetcher, RemoteWriter, ResourceDescriptor};
use crate::error::ErrorInfo;
use crate::record::{Record, RecordId};

type FetchOutcome = Result<Vec<Record>, ErrorInfo>;

#[derive(Debug, Clone, PartialEq)]
pub enum WriteCall {
    Delete { path: String, id: RecordId },
    Create { path: String, payload: Record },
    Update { path: String, payload: Record },
}

#[derive(Default)]
struct Script {
    /// One-shot outcomes, consumed in order
    queued: VecDeque<FetchOutcome>,
    /// Served once `queued` is empty
    standing: Option<FetchOutcome>,
    calls: usize,
}

#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<HashMap<String, Script>>,
    fetch_delay: Mutex<Duration>,
    write_delay: Mutex<Duration>,
    deletes: Mutex<HashMap<String, VecDeque<Result<(), ErrorInfo>>>>,
    creates: Mutex<HashMap<String, VecDeque<Result<Option<Record>, ErrorInfo>>>>,
    writes: Mutex<Vec<WriteCall>>,
    /// Write path to (data path, id field) whose standing data it changes
    mirrors: Mutex<HashMap<String, (String, String)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data served for `path` on every fetch with nothing queued
    pub fn set_data(&self, path: &str, records: Vec<Record>) {
        self.script(path, |s| s.standing = Some(Ok(records)));
    }

    pub fn set_error(&self, path: &str, error: ErrorInfo) {
        self.script(path, |s| s.standing = Some(Err(error)));
    }

    pub fn push_fetch(&self, path: &str, outcome: FetchOutcome) {
        self.script(path, |s| s.queued.push_back(outcome));
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = delay;
    }

    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = delay;
    }

    pub fn push_delete(&self, path: &str, outcome: Result<(), ErrorInfo>) {
        self.deletes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(outcome);
    }

    pub fn push_create(&self, path: &str, outcome: Result<Option<Record>, ErrorInfo>) {
        self.creates
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Make successful deletes and creates on `write_path` change what
    /// `data_path` serves afterwards, like a real server would
    pub fn mirror_writes(&self, write_path: &str, data_path: &str, id_field: &str) {
        self.mirrors.lock().unwrap().insert(
            write_path.to_string(),
            (data_path.to_string(), id_field.to_string()),
        );
    }

    pub fn fetch_count(&self, path: &str) -> usize {
        self.scripts
            .lock()
            .unwrap()
            .get(path)
            .map(|s| s.calls)
            .unwrap_or(0)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<WriteCall> {
        self.writes.lock().unwrap().clone()
    }

    fn script(&self, path: &str, f: impl FnOnce(&mut Script)) {
        let mut scripts = self.scripts.lock().unwrap();
        f(scripts.entry(path.to_string()).or_default());
    }

    fn apply_mirror(&self, write_path: &str, f: impl FnOnce(&mut Vec<Record>, &str)) {
        let Some((data_path, id_field)) = self.mirrors.lock().unwrap().get(write_path).cloned() else {
            return;
        };
        self.script(&data_path, |s| {
            if let Some(Ok(records)) = s.standing.as_mut() {
                f(records, &id_field);
            }
        });
    }

    async fn write_pause(&self) {
        let delay = *self.write_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Fetcher for ScriptedBackend {
    async fn fetch(&self, resource: &ResourceDescriptor) -> Result<Vec<Record>, ErrorInfo> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let outcome = {
            let mut scripts = self.scripts.lock().unwrap();
            let script = scripts.entry(resource.path.clone()).or_default();
            script.calls += 1;
            script
                .queued
                .pop_front()
                .or_else(|| script.standing.clone())
                .unwrap_or_else(|| Ok(Vec::new()))
        };

        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

#[async_trait]
impl RemoteWriter for ScriptedBackend {
    async fn delete(&self, path: &str, id: &RecordId) -> Result<(), ErrorInfo> {
        self.writes.lock().unwrap().push(WriteCall::Delete {
            path: path.to_string(),
            id: id.clone(),
        });
        self.write_pause().await;
        let outcome = self
            .deletes
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(|q| q.pop_front())
            .unwrap_or(Ok(()));
        if outcome.is_ok() {
            self.apply_mirror(path, |records, id_field| {
                records.retain(|r| r.id(id_field).as_ref() != Some(id));
            });
        }
        outcome
    }

    async fn create(&self, path: &str, payload: &Record) -> Result<Option<Record>, ErrorInfo> {
        self.writes.lock().unwrap().push(WriteCall::Create {
            path: path.to_string(),
            payload: payload.clone(),
        });
        self.write_pause().await;
        let outcome = self
            .creates
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| Ok(Some(payload.clone())));
        if let Ok(Some(created)) = &outcome {
            self.apply_mirror(path, |records, _| records.push(created.clone()));
        }
        outcome
    }

    async fn update(&self, path: &str, payload: &Record) -> Result<Option<Record>, ErrorInfo> {
        self.writes.lock().unwrap().push(WriteCall::Update {
            path: path.to_string(),
            payload: payload.clone(),
        });
        self.write_pause().await;
        Ok(Some(payload.clone()))
    }
}
