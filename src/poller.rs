//! Fixed-period polling of one resource.
//!
//! Each poller owns a background task and exactly one snapshot, published
//! through a `watch` channel as `Arc<Snapshot>`. Fetches are strictly
//! sequential: the task awaits each attempt before scheduling the next, and
//! ticks that elapse while an attempt is in flight are skipped.
//!
//! Every result is tagged with the generation current when its fetch began.
//! `stop()` and local patches bump the generation, so a response that
//! started before either is dropped instead of applied.
//!
//! Records with a delete in flight are hidden: they are filtered out of every
//! fetched result until the delete settles, so a scheduled poll can never
//! bring them back in the meantime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::api::{bounded, Fetcher, ResourceDescriptor};
use crate::record::{Record, RecordId};
use crate::snapshot::{Snapshot, SnapshotStatus};

type RefreshAck = oneshot::Sender<()>;

struct Shared {
    resource: ResourceDescriptor,
    snapshot: watch::Sender<Arc<Snapshot>>,
    generation: AtomicU64,
    stopped: AtomicBool,
    /// Ids hidden from fetched data, with the number of holds on each
    hidden: Mutex<HashMap<RecordId, usize>>,
}

impl Shared {
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn hidden(&self) -> MutexGuard<'_, HashMap<RecordId, usize>> {
        self.hidden.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn without_hidden(&self, mut data: Vec<Record>) -> Vec<Record> {
        let hidden = self.hidden();
        if !hidden.is_empty() {
            let id_field = &self.resource.id_field;
            data.retain(|r| r.id(id_field).map_or(true, |id| !hidden.contains_key(&id)));
        }
        data
    }

    /// Run one fetch and publish its result if still current
    async fn poll_once(&self, fetcher: &dyn Fetcher) {
        let generation = self.generation.load(Ordering::SeqCst);

        // Only the very first attempt shows as Loading; later attempts keep
        // the previous status until they resolve.
        self.snapshot.send_if_modified(|snap| {
            if self.is_stopped() || snap.status != SnapshotStatus::Idle {
                return false;
            }
            *snap = Arc::new(snap.loading());
            true
        });

        let outcome = bounded(self.resource.timeout, fetcher.fetch(&self.resource)).await;

        if let Err(ref e) = outcome {
            tracing::warn!("{}: fetch failed: {}", self.resource.name, e);
        }

        let applied = self.snapshot.send_if_modified(|snap| {
            if self.is_stopped() || self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *snap = Arc::new(match outcome {
                Ok(data) => Snapshot::ready(self.without_hidden(data)),
                Err(e) => snap.failed(e),
            });
            true
        });

        if !applied {
            tracing::debug!("{}: discarded stale fetch result", self.resource.name);
        }
    }
}

pub struct Poller;

impl Poller {
    /// Start polling `resource` every `interval`, fetching once immediately.
    ///
    /// A zero interval fetches once and afterwards only on [`PollerHandle::refresh`].
    /// Must be called from within a tokio runtime.
    pub fn start(
        fetcher: Arc<dyn Fetcher>,
        resource: ResourceDescriptor,
        interval: Duration,
    ) -> PollerHandle {
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::idle()));
        let shared = Arc::new(Shared {
            resource,
            snapshot,
            generation: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            hidden: Mutex::new(HashMap::new()),
        });
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();

        tracing::info!(
            "{}: polling {} every {}ms",
            shared.resource.name,
            shared.resource.path,
            interval.as_millis()
        );

        let task = tokio::spawn(run(shared.clone(), fetcher, interval, refresh_rx));

        PollerHandle {
            shared,
            refresh_tx,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }
}

async fn run(
    shared: Arc<Shared>,
    fetcher: Arc<dyn Fetcher>,
    interval: Duration,
    mut refresh_rx: mpsc::UnboundedReceiver<RefreshAck>,
) {
    let period = (!interval.is_zero()).then_some(interval);
    let started = Instant::now();
    shared.poll_once(fetcher.as_ref()).await;
    let mut next_due = period.map(|p| skip_elapsed(started + p, p, Instant::now()));

    loop {
        let mut acks = Vec::new();
        tokio::select! {
            _ = wait_until(next_due) => {}
            req = refresh_rx.recv() => match req {
                Some(ack) => acks.push(ack),
                // Every handle is gone
                None => break,
            },
        }
        // Coalesce refresh requests that queued up behind this one
        while let Ok(ack) = refresh_rx.try_recv() {
            acks.push(ack);
        }

        if shared.is_stopped() {
            break;
        }

        shared.poll_once(fetcher.as_ref()).await;

        if let (Some(due), Some(p)) = (next_due, period) {
            let now = Instant::now();
            let due = if due <= now { due + p } else { due };
            next_due = Some(skip_elapsed(due, p, now));
        }

        for ack in acks {
            let _ = ack.send(());
        }
    }

    tracing::debug!("{}: poll task exited", shared.resource.name);
}

async fn wait_until(due: Option<Instant>) {
    match due {
        Some(due) => tokio::time::sleep_until(due).await,
        None => std::future::pending().await,
    }
}

/// Advance `due` by whole periods until it lies in the future
fn skip_elapsed(mut due: Instant, period: Duration, now: Instant) -> Instant {
    while due <= now {
        due += period;
    }
    due
}

/// Shared handle to a running poller. Clones refer to the same poller.
#[derive(Clone)]
pub struct PollerHandle {
    shared: Arc<Shared>,
    refresh_tx: mpsc::UnboundedSender<RefreshAck>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl PollerHandle {
    pub fn resource(&self) -> &ResourceDescriptor {
        &self.shared.resource
    }

    pub fn id_field(&self) -> &str {
        &self.shared.resource.id_field
    }

    /// Current snapshot; always a complete, consistent value
    pub fn latest(&self) -> Arc<Snapshot> {
        self.shared.snapshot.borrow().clone()
    }

    /// Change feed for render layers
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.shared.snapshot.subscribe()
    }

    pub fn is_active(&self) -> bool {
        !self.shared.is_stopped()
    }

    /// Fetch now, out of schedule, and wait until the result is applied.
    ///
    /// Serialized with scheduled ticks. Returns immediately on a stopped poller.
    pub async fn refresh(&self) {
        if !self.is_active() {
            return;
        }
        let (ack, done) = oneshot::channel();
        if self.refresh_tx.send(ack).is_err() {
            return;
        }
        let _ = done.await;
    }

    /// Replace the snapshot with one derived from the current value.
    ///
    /// `derive` returning `None` leaves the snapshot untouched. A successful
    /// patch invalidates any fetch already in flight. Returns whether the
    /// snapshot changed; always `false` once stopped.
    pub fn patch<F>(&self, derive: F) -> bool
    where
        F: FnOnce(&Snapshot) -> Option<Snapshot>,
    {
        let shared = &self.shared;
        shared.snapshot.send_if_modified(|snap| {
            if shared.is_stopped() {
                return false;
            }
            match derive(snap) {
                Some(next) => {
                    shared.generation.fetch_add(1, Ordering::SeqCst);
                    *snap = Arc::new(next);
                    true
                }
                None => false,
            }
        })
    }

    /// Remove the record with `id` locally and keep it out of fetched data
    /// until the returned guard is dropped.
    ///
    /// Dropping the guard also invalidates any fetch in flight, since it may
    /// have been served before the backend settled the delete.
    pub fn hide(&self, id: &RecordId) -> Hidden {
        let shared = &self.shared;
        let mut removed = false;
        shared.snapshot.send_if_modified(|snap| {
            *shared.hidden().entry(id.clone()).or_insert(0) += 1;
            if shared.is_stopped() {
                return false;
            }
            shared.generation.fetch_add(1, Ordering::SeqCst);
            match snap.without(&shared.resource.id_field, id) {
                Some(next) => {
                    *snap = Arc::new(next);
                    removed = true;
                    true
                }
                None => false,
            }
        });
        Hidden {
            shared: shared.clone(),
            id: id.clone(),
            removed,
        }
    }

    pub fn is_hidden(&self, id: &RecordId) -> bool {
        self.shared.hidden().contains_key(id)
    }

    /// Stop polling. No snapshot change happens after this returns.
    pub fn stop(&self) {
        let shared = &self.shared;
        // Taking the watch lock orders this after any apply already underway
        shared.snapshot.send_if_modified(|_| {
            shared.stopped.store(true, Ordering::SeqCst);
            shared.generation.fetch_add(1, Ordering::SeqCst);
            false
        });

        if let Ok(mut task) = self.task.lock() {
            if let Some(task) = task.take() {
                task.abort();
                tracing::info!("{}: polling stopped", shared.resource.name);
            }
        }
    }
}

/// Hold on a hidden record; see [`PollerHandle::hide`]
pub struct Hidden {
    shared: Arc<Shared>,
    id: RecordId,
    removed: bool,
}

impl Hidden {
    /// Whether the record was present locally when hidden
    pub fn removed(&self) -> bool {
        self.removed
    }
}

impl Drop for Hidden {
    fn drop(&mut self) {
        let shared = &self.shared;
        shared.snapshot.send_if_modified(|_| {
            let mut hidden = shared.hidden();
            if let Some(holds) = hidden.get_mut(&self.id) {
                *holds -= 1;
                if *holds == 0 {
                    hidden.remove(&self.id);
                }
            }
            shared.generation.fetch_add(1, Ordering::SeqCst);
            false
        });
    }
}
