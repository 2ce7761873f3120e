//! Remote writes with local snapshot reconciliation.
//!
//! - Delete: optimistic local removal, corrective re-fetch on failure
//! - Create/Update: remote first, then upsert the server's record locally
//! - Move (archive/restore): create in the destination, then delete from the
//!   source; a failed second half is reported as a partial failure
//!
//! Every outcome goes to the notification sink, including the rejection of a
//! duplicate: at most one mutation per kind and target id is in flight, and
//! a second one fails with `Conflict` without reaching the backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::api::{bounded, RemoteWriter};
use crate::error::ErrorInfo;
use crate::notify::NotificationSink;
use crate::poller::PollerHandle;
use crate::record::{Record, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Delete,
    Create,
    Update,
}

impl MutationKind {
    pub fn noun(self) -> &'static str {
        match self {
            MutationKind::Delete => "delete",
            MutationKind::Create => "create",
            MutationKind::Update => "update",
        }
    }
}

/// A write currently waiting on the backend
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMutation {
    pub kind: MutationKind,
    pub target_id: Option<RecordId>,
    pub payload: Option<Record>,
    pub submitted_at: DateTime<Utc>,
}

/// One remote write against a target poller
#[derive(Debug, Clone)]
pub enum Mutation {
    Delete { path: String, id: RecordId },
    Create { path: String, payload: Record },
    Update { path: String, payload: Record },
}

/// Create-then-delete between two resources
#[derive(Debug, Clone)]
pub struct Transfer {
    /// Verb for messages, e.g. "archive" or "restore"
    pub action: String,
    pub create_path: String,
    pub delete_path: String,
    /// Delete the source record after the create succeeds
    pub remove_source: bool,
}

type PendingKey = (MutationKind, RecordId);
type PendingMap = Mutex<HashMap<PendingKey, PendingMutation>>;

/// Clears its pending entry on drop, including on error or cancellation
struct InFlight<'a> {
    pending: &'a PendingMap,
    key: PendingKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.pending).remove(&self.key);
    }
}

fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<PendingKey, PendingMutation>> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct MutationCoordinator {
    writer: Arc<dyn RemoteWriter>,
    sink: NotificationSink,
    timeout: Duration,
    pending: PendingMap,
}

impl MutationCoordinator {
    pub fn new(writer: Arc<dyn RemoteWriter>, sink: NotificationSink, timeout: Duration) -> Self {
        Self {
            writer,
            sink,
            timeout,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn sink(&self) -> &NotificationSink {
        &self.sink
    }

    /// Snapshot of in-flight writes, for "deleting…" style indicators
    pub fn pending(&self) -> Vec<PendingMutation> {
        lock(&self.pending).values().cloned().collect()
    }

    pub fn is_pending(&self, kind: MutationKind, id: &RecordId) -> bool {
        lock(&self.pending).contains_key(&(kind, id.clone()))
    }

    /// Apply one mutation to `target`. Returns the server's record for
    /// creates and updates when one is known.
    pub async fn mutate(&self, target: &PollerHandle, mutation: Mutation) -> Result<Option<Record>, ErrorInfo> {
        match mutation {
            Mutation::Delete { path, id } => self.delete(target, &path, &id).await.map(|_| None),
            Mutation::Create { path, payload } => self.create(Some(target), &path, payload).await,
            Mutation::Update { path, payload } => self.update(target, &path, payload).await,
        }
    }

    pub async fn delete(&self, target: &PollerHandle, path: &str, id: &RecordId) -> Result<(), ErrorInfo> {
        let _guard = self.begin(MutationKind::Delete, Some(id), None)?;
        let label = label_for(target, id);

        match self.delete_in(target, path, id).await {
            Ok(()) => {
                self.sink.success(format!("Deleted {}", label));
                Ok(())
            }
            Err(e) => {
                self.sink.error(format!("Failed to delete {}: {}", label, e));
                target.refresh().await;
                Err(e)
            }
        }
    }

    /// Create remotely, then upsert into `target` if it is still polling
    pub async fn create(
        &self,
        target: Option<&PollerHandle>,
        path: &str,
        payload: Record,
    ) -> Result<Option<Record>, ErrorInfo> {
        let id_field = id_field_of(target);
        let id = payload.id(id_field);
        let _guard = self.begin(MutationKind::Create, id.as_ref(), Some(&payload))?;
        let label = display_name(&payload, id.as_ref());

        match self.create_in(target, path, &payload).await {
            Ok(created) => {
                self.sink.success(format!("Created {}", label));
                Ok(created)
            }
            Err(e) => {
                self.sink.error(format!("Failed to create {}: {}", label, e));
                Err(e)
            }
        }
    }

    /// Replace a record remotely, then locally once confirmed
    pub async fn update(&self, target: &PollerHandle, path: &str, payload: Record) -> Result<Option<Record>, ErrorInfo> {
        let id = payload.id(target.id_field()).ok_or_else(|| {
            let e = ErrorInfo::decode(format!("update payload has no `{}` field", target.id_field()));
            self.sink.error(format!("Failed to update record: {}", e));
            e
        })?;
        let _guard = self.begin(MutationKind::Update, Some(&id), Some(&payload))?;
        let label = display_name(&payload, Some(&id));

        let result = bounded(self.timeout, self.writer.update(path, &payload)).await;
        match result {
            Ok(returned) => {
                let record = returned
                    .filter(|r| r.id(target.id_field()).as_ref() == Some(&id))
                    .unwrap_or(payload);
                let id_field = target.id_field().to_string();
                let stored = record.clone();
                target.patch(move |s| s.find(&id_field, &id).map(|_| s.with_upserted(&id_field, stored)));
                self.sink.success(format!("Updated {}", label));
                Ok(Some(record))
            }
            Err(e) => {
                self.sink.error(format!("Failed to update {}: {}", label, e));
                Err(e)
            }
        }
    }

    /// Move `record` from `source` to the resource behind `destination`.
    ///
    /// The create half runs first so a failure never loses the record. When
    /// it succeeds but the delete half fails, both the notification and the
    /// returned error name the failed half and `source` is re-fetched; the
    /// created copy is left in place.
    pub async fn transfer(
        &self,
        source: &PollerHandle,
        destination: Option<&PollerHandle>,
        record: &Record,
        transfer: &Transfer,
    ) -> Result<Option<Record>, ErrorInfo> {
        let Some(id) = record.id(source.id_field()) else {
            let e = ErrorInfo::decode(format!("record has no `{}` field", source.id_field()));
            self.sink.error(format!("Failed to {}: {}", transfer.action, e));
            return Err(e);
        };
        let label = display_name(record, Some(&id));

        let _create_guard = self.begin(MutationKind::Create, Some(&id), Some(record))?;
        let _delete_guard = if transfer.remove_source {
            self.begin(MutationKind::Delete, Some(&id), None)?
        } else {
            None
        };

        // The destination assigns its own id
        let mut payload = record.clone();
        payload.remove(source.id_field());

        let created = match self.create_in(destination, &transfer.create_path, &payload).await {
            Ok(created) => created,
            Err(e) => {
                self.sink.error(format!("Failed to {} {}: {}", transfer.action, label, e));
                return Err(e);
            }
        };

        if transfer.remove_source {
            if let Err(e) = self.delete_in(source, &transfer.delete_path, &id).await {
                self.sink.error(format!(
                    "{} {} succeeded, but removing it from {} failed: {}",
                    capitalize(&transfer.action),
                    label,
                    source.resource().name,
                    e
                ));
                source.refresh().await;
                return Err(ErrorInfo {
                    message: format!("delete half of {} failed: {}", transfer.action, e.message),
                    ..e
                });
            }
        }

        self.sink.success(format!("{} {}", past_tense(&transfer.action), label));
        Ok(created)
    }

    /// Optimistic remove, then remote delete. No notification, no rollback.
    ///
    /// The record stays hidden from `target`'s polls until the remote call
    /// settles, so scheduled refreshes cannot resurrect it mid-delete.
    async fn delete_in(&self, target: &PollerHandle, path: &str, id: &RecordId) -> Result<(), ErrorInfo> {
        let hold = target.hide(id);
        tracing::debug!("delete {} via {} (local copy removed: {})", id, path, hold.removed());

        let result = bounded(self.timeout, self.writer.delete(path, id)).await;
        if let Err(ref e) = result {
            tracing::warn!("delete {} failed: {}", id, e);
        }
        drop(hold);
        result
    }

    /// Remote create, then local upsert of the authoritative record
    async fn create_in(
        &self,
        target: Option<&PollerHandle>,
        path: &str,
        payload: &Record,
    ) -> Result<Option<Record>, ErrorInfo> {
        let id_field = id_field_of(target).to_string();
        let returned = bounded(self.timeout, self.writer.create(path, payload)).await?;

        // Prefer the server's copy; fall back to the payload if it carries an id
        let record = returned
            .filter(|r| r.id(&id_field).is_some())
            .or_else(|| payload.id(&id_field).map(|_| payload.clone()));

        match (target, &record) {
            (Some(target), Some(record)) if target.is_active() => {
                let stored = record.clone();
                target.patch(move |s| Some(s.with_upserted(&id_field, stored)));
            }
            // Inactive target or no id to key by: the next poll picks it up
            _ => tracing::debug!("create via {}: no local insert", path),
        }
        Ok(record)
    }

    fn begin(
        &self,
        kind: MutationKind,
        id: Option<&RecordId>,
        payload: Option<&Record>,
    ) -> Result<Option<InFlight<'_>>, ErrorInfo> {
        // Without an id there is nothing to coalesce on
        let Some(id) = id else {
            return Ok(None);
        };
        let key = (kind, id.clone());
        let mut pending = lock(&self.pending);
        if pending.contains_key(&key) {
            drop(pending);
            tracing::debug!("{:?} {} already in flight, rejecting duplicate", kind, id);
            let e = ErrorInfo::conflict(format!(
                "a {} of record {} is already in progress",
                kind.noun(),
                id
            ));
            self.sink.error(capitalize(&e.message));
            return Err(e);
        }
        pending.insert(
            key.clone(),
            PendingMutation {
                kind,
                target_id: Some(id.clone()),
                payload: payload.cloned(),
                submitted_at: Utc::now(),
            },
        );
        Ok(Some(InFlight {
            pending: &self.pending,
            key,
        }))
    }
}

fn id_field_of(target: Option<&PollerHandle>) -> &str {
    target
        .map(|t| t.id_field())
        .unwrap_or(crate::record::DEFAULT_ID_FIELD)
}

/// Human label for messages: the record's name, falling back to its id
fn display_name(record: &Record, id: Option<&RecordId>) -> String {
    match (record.str_field("name"), id) {
        (Some(name), _) => format!("'{}'", name),
        (None, Some(id)) => format!("record {}", id),
        (None, None) => "record".to_string(),
    }
}

fn label_for(target: &PollerHandle, id: &RecordId) -> String {
    let snapshot = target.latest();
    match snapshot.find(target.id_field(), id) {
        Some(record) => display_name(record, Some(id)),
        None => format!("record {}", id),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn past_tense(verb: &str) -> String {
    let verb = capitalize(verb);
    if verb.ends_with('e') {
        format!("{}d", verb)
    } else {
        format!("{}ed", verb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{ScriptedBackend, WriteCall};
    use crate::api::ResourceDescriptor;
    use crate::error::ErrorKind;
    use crate::notify::NotificationLevel;
    use crate::poller::Poller;

    const RECENT: &str = "/api/alldata";
    const ARCHIVE: &str = "/api/archivespecies";
    const DEL_RECENT: &str = "/api/delspecies";
    const NEW_ARCHIVE: &str = "/api/archive";

    fn bug(id: u64, name: &str) -> Record {
        Record::new().with("id", id).with("name", name)
    }

    fn setup() -> (Arc<ScriptedBackend>, Arc<MutationCoordinator>) {
        let backend = Arc::new(ScriptedBackend::new());
        let coordinator = Arc::new(MutationCoordinator::new(
            backend.clone(),
            NotificationSink::default(),
            Duration::from_secs(5),
        ));
        (backend, coordinator)
    }

    async fn ready_poller(backend: &Arc<ScriptedBackend>, name: &str, path: &str, id_field: &str) -> PollerHandle {
        polling_every(backend, name, path, id_field, 60_000).await
    }

    async fn polling_every(
        backend: &Arc<ScriptedBackend>,
        name: &str,
        path: &str,
        id_field: &str,
        interval_ms: u64,
    ) -> PollerHandle {
        let poller = Poller::start(
            backend.clone(),
            ResourceDescriptor::new(name, path).with_id_field(id_field),
            Duration::from_millis(interval_ms),
        );
        poller.subscribe().wait_for(|s| s.is_ready()).await.unwrap();
        poller
    }

    fn levels(sink: &NotificationSink) -> Vec<NotificationLevel> {
        sink.active().iter().map(|n| n.level).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_success_removes_exactly_one() {
        let (backend, coordinator) = setup();
        backend.set_data(RECENT, vec![bug(1, "Ant"), bug(2, "Bee")]);
        let recent = ready_poller(&backend, "recent", RECENT, "id").await;

        coordinator
            .mutate(&recent, Mutation::Delete { path: DEL_RECENT.into(), id: RecordId::from(1) })
            .await
            .unwrap();

        assert_eq!(recent.latest().data, vec![bug(2, "Bee")]);
        assert_eq!(levels(coordinator.sink()), vec![NotificationLevel::Success]);
        assert_eq!(
            backend.writes(),
            vec![WriteCall::Delete { path: DEL_RECENT.into(), id: RecordId::from(1) }]
        );
        recent.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delete_resyncs_with_server() {
        let (backend, coordinator) = setup();
        backend.set_data(RECENT, vec![bug(1, "Ant"), bug(2, "Bee")]);
        backend.push_delete(DEL_RECENT, Err(ErrorInfo::from_status(500, "", true)));
        let recent = ready_poller(&backend, "recent", RECENT, "id").await;
        let fetches_before = backend.fetch_count(RECENT);

        let err = coordinator.delete(&recent, DEL_RECENT, &RecordId::from(2)).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::HttpStatus);
        assert_eq!(backend.fetch_count(RECENT), fetches_before + 1);
        assert_eq!(recent.latest().data, vec![bug(1, "Ant"), bug(2, "Bee")]);

        let active = coordinator.sink().active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].level, NotificationLevel::Error);
        assert!(active[0].message.contains("'Bee'"));
        recent.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_is_optimistic() {
        let (backend, coordinator) = setup();
        backend.set_data(RECENT, vec![bug(1, "Ant"), bug(2, "Bee")]);
        backend.set_write_delay(Duration::from_millis(1_000));
        let recent = ready_poller(&backend, "recent", RECENT, "id").await;

        let task = {
            let (coordinator, recent) = (coordinator.clone(), recent.clone());
            tokio::spawn(async move { coordinator.delete(&recent, DEL_RECENT, &RecordId::from(1)).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(recent.latest().data, vec![bug(2, "Bee")]);
        assert!(coordinator.is_pending(MutationKind::Delete, &RecordId::from(1)));

        task.await.unwrap().unwrap();
        assert!(coordinator.pending().is_empty());
        recent.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_delete_is_rejected() {
        let (backend, coordinator) = setup();
        backend.set_data(RECENT, vec![bug(1, "Ant")]);
        backend.set_write_delay(Duration::from_millis(1_000));
        let recent = ready_poller(&backend, "recent", RECENT, "id").await;

        let first = {
            let (coordinator, recent) = (coordinator.clone(), recent.clone());
            tokio::spawn(async move { coordinator.delete(&recent, DEL_RECENT, &RecordId::from(1)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = coordinator.delete(&recent, DEL_RECENT, &RecordId::from(1)).await;
        assert_eq!(second.unwrap_err().kind, ErrorKind::Conflict);

        // The rejection is visible on its own
        let active = coordinator.sink().active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].level, NotificationLevel::Error);
        assert!(active[0].message.contains("already in progress"));

        first.await.unwrap().unwrap();
        assert_eq!(backend.writes().len(), 1);
        assert_eq!(
            levels(coordinator.sink()),
            vec![NotificationLevel::Success, NotificationLevel::Error]
        );

        // Once settled the same id may be deleted again
        backend.push_delete(DEL_RECENT, Err(ErrorInfo::conflict("HTTP 404")));
        let again = coordinator.delete(&recent, DEL_RECENT, &RecordId::from(1)).await;
        assert_eq!(again.unwrap_err().kind, ErrorKind::Conflict);
        assert_eq!(backend.writes().len(), 2);
        recent.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_survives_scheduled_polls() {
        let (backend, coordinator) = setup();
        backend.set_data(RECENT, vec![bug(1, "Ant"), bug(2, "Bee")]);
        backend.mirror_writes(DEL_RECENT, RECENT, "id");
        backend.set_write_delay(Duration::from_millis(2_000));
        let recent = polling_every(&backend, "recent", RECENT, "id", 500).await;

        let task = {
            let (coordinator, recent) = (coordinator.clone(), recent.clone());
            tokio::spawn(async move { coordinator.delete(&recent, DEL_RECENT, &RecordId::from(1)).await })
        };

        tokio::time::sleep(Duration::from_millis(650)).await;
        assert_eq!(recent.latest().data, vec![bug(2, "Bee")]);

        tokio::time::sleep(Duration::from_millis(1_200)).await;
        // Ticks at 500, 1000 and 1500 all served the record; none applied it
        assert!(backend.fetch_count(RECENT) >= 4);
        assert_eq!(recent.latest().data, vec![bug(2, "Bee")]);

        task.await.unwrap().unwrap();
        assert_eq!(recent.latest().data, vec![bug(2, "Bee")]);
        assert!(!recent.is_hidden(&RecordId::from(1)));

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(recent.latest().data, vec![bug(2, "Bee")]);
        assert_eq!(levels(coordinator.sink()), vec![NotificationLevel::Success]);
        recent.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delete_under_fast_polls_comes_back() {
        let (backend, coordinator) = setup();
        backend.set_data(RECENT, vec![bug(1, "Ant"), bug(2, "Bee")]);
        backend.mirror_writes(DEL_RECENT, RECENT, "id");
        backend.set_write_delay(Duration::from_millis(1_000));
        backend.push_delete(DEL_RECENT, Err(ErrorInfo::from_status(500, "", true)));
        let recent = polling_every(&backend, "recent", RECENT, "id", 300).await;

        let err = coordinator.delete(&recent, DEL_RECENT, &RecordId::from(1)).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::HttpStatus);
        assert_eq!(recent.latest().data, vec![bug(1, "Ant"), bug(2, "Bee")]);
        assert!(!recent.is_hidden(&RecordId::from(1)));
        recent.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_inserts_server_record() {
        let (backend, coordinator) = setup();
        let archive = ready_poller(&backend, "archive", ARCHIVE, "_id").await;
        backend.push_create(
            NEW_ARCHIVE,
            Ok(Some(Record::new().with("_id", "srv-1").with("name", "Ant"))),
        );

        let created = coordinator
            .create(Some(&archive), NEW_ARCHIVE, Record::new().with("name", "Ant"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(created.id("_id"), Some(RecordId::from("srv-1")));
        assert_eq!(archive.latest().data, vec![created]);
        assert_eq!(levels(coordinator.sink()), vec![NotificationLevel::Success]);
        archive.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_into_stopped_poller_is_noop() {
        let (backend, coordinator) = setup();
        let archive = ready_poller(&backend, "archive", ARCHIVE, "_id").await;
        archive.stop();

        coordinator
            .create(Some(&archive), NEW_ARCHIVE, Record::new().with("_id", "a").with("name", "Ant"))
            .await
            .unwrap();

        assert!(archive.latest().data.is_empty());
        assert_eq!(backend.writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_failure_leaves_target_alone() {
        let (backend, coordinator) = setup();
        backend.set_data(ARCHIVE, vec![Record::new().with("_id", "a").with("name", "Ant")]);
        let archive = ready_poller(&backend, "archive", ARCHIVE, "_id").await;
        backend.push_create(NEW_ARCHIVE, Err(ErrorInfo::network("reset")));
        let before = archive.latest();

        let err = coordinator
            .create(Some(&archive), NEW_ARCHIVE, Record::new().with("name", "Bee"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Network);
        assert_eq!(archive.latest(), before);
        assert_eq!(levels(coordinator.sink()), vec![NotificationLevel::Error]);
        archive.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_replaces_record() {
        let (backend, coordinator) = setup();
        backend.set_data(RECENT, vec![bug(1, "Ant"), bug(2, "Bee")]);
        let recent = ready_poller(&backend, "recent", RECENT, "id").await;

        coordinator
            .mutate(&recent, Mutation::Update { path: "/api/species".into(), payload: bug(2, "Bumble Bee") })
            .await
            .unwrap();

        assert_eq!(recent.latest().data, vec![bug(1, "Ant"), bug(2, "Bumble Bee")]);
        recent.stop();
    }

    fn archive_transfer() -> Transfer {
        Transfer {
            action: "archive".into(),
            create_path: NEW_ARCHIVE.into(),
            delete_path: DEL_RECENT.into(),
            remove_source: true,
        }
    }

    fn sighting(id: &str, name: &str) -> Record {
        Record::new().with("_id", id).with("name", name).with("date", "2025-03-01")
    }

    #[tokio::test(start_paused = true)]
    async fn test_archive_moves_record() {
        let (backend, coordinator) = setup();
        backend.set_data(RECENT, vec![sighting("r1", "Ant"), sighting("r2", "Bee")]);
        let recent = ready_poller(&backend, "recent", RECENT, "_id").await;
        let archive = ready_poller(&backend, "archive", ARCHIVE, "_id").await;
        backend.push_create(NEW_ARCHIVE, Ok(Some(sighting("a1", "Ant"))));

        let ant = recent.latest().data[0].clone();
        coordinator
            .transfer(&recent, Some(&archive), &ant, &archive_transfer())
            .await
            .unwrap();

        assert_eq!(recent.latest().data, vec![sighting("r2", "Bee")]);
        assert_eq!(archive.latest().data, vec![sighting("a1", "Ant")]);

        let writes = backend.writes();
        assert_eq!(writes.len(), 2);
        // Sent without the source id; the archive assigns its own
        assert!(matches!(&writes[0], WriteCall::Create { payload, .. } if payload.get("_id").is_none()));
        assert_eq!(writes[1], WriteCall::Delete { path: DEL_RECENT.into(), id: RecordId::from("r1") });

        let active = coordinator.sink().active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].message, "Archived 'Ant'");
        recent.stop();
        archive.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_archive_partial_failure_is_reported() {
        let (backend, coordinator) = setup();
        backend.set_data(RECENT, vec![sighting("r1", "Ant")]);
        let recent = ready_poller(&backend, "recent", RECENT, "_id").await;
        let archive = ready_poller(&backend, "archive", ARCHIVE, "_id").await;
        backend.push_create(NEW_ARCHIVE, Ok(Some(sighting("a1", "Ant"))));
        backend.push_delete(DEL_RECENT, Err(ErrorInfo::from_status(500, "", true)));

        let ant = recent.latest().data[0].clone();
        let err = coordinator
            .transfer(&recent, Some(&archive), &ant, &archive_transfer())
            .await
            .unwrap_err();

        assert!(err.message.contains("delete half"));
        // The created copy stays; the source is back to the server's view
        assert_eq!(archive.latest().data, vec![sighting("a1", "Ant")]);
        assert_eq!(recent.latest().data, vec![sighting("r1", "Ant")]);

        let active = coordinator.sink().active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].level, NotificationLevel::Error);
        assert!(active[0].message.contains("removing it from recent failed"));
        recent.stop();
        archive.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_archive_survives_scheduled_polls() {
        let (backend, coordinator) = setup();
        backend.set_data(RECENT, vec![sighting("r1", "Ant"), sighting("r2", "Bee")]);
        backend.set_data(ARCHIVE, vec![]);
        backend.mirror_writes(DEL_RECENT, RECENT, "_id");
        backend.mirror_writes(NEW_ARCHIVE, ARCHIVE, "_id");
        backend.push_create(NEW_ARCHIVE, Ok(Some(sighting("a1", "Ant"))));
        backend.set_write_delay(Duration::from_millis(1_000));
        let recent = polling_every(&backend, "recent", RECENT, "_id", 300).await;
        let archive = polling_every(&backend, "archive", ARCHIVE, "_id", 300).await;

        let task = {
            let (coordinator, recent, archive) = (coordinator.clone(), recent.clone(), archive.clone());
            let ant = recent.latest().data[0].clone();
            tokio::spawn(async move {
                coordinator
                    .transfer(&recent, Some(&archive), &ant, &archive_transfer())
                    .await
            })
        };

        // Create done at 1000, delete in flight until 2000
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(recent.latest().data, vec![sighting("r2", "Bee")]);
        assert_eq!(archive.latest().data, vec![sighting("a1", "Ant")]);

        task.await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(1_000)).await;

        assert_eq!(recent.latest().data, vec![sighting("r2", "Bee")]);
        assert_eq!(archive.latest().data, vec![sighting("a1", "Ant")]);
        let active = coordinator.sink().active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].message, "Archived 'Ant'");
        recent.stop();
        archive.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_create_half_touches_nothing() {
        let (backend, coordinator) = setup();
        backend.set_data(RECENT, vec![sighting("r1", "Ant")]);
        let recent = ready_poller(&backend, "recent", RECENT, "_id").await;
        backend.push_create(NEW_ARCHIVE, Err(ErrorInfo::network("refused")));

        let ant = recent.latest().data[0].clone();
        let err = coordinator
            .transfer(&recent, None, &ant, &archive_transfer())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Network);
        assert_eq!(recent.latest().data.len(), 1);
        assert_eq!(backend.writes().len(), 1);
        assert!(coordinator.sink().active()[0].message.starts_with("Failed to archive"));
        recent.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_only_transfer_keeps_source() {
        let (backend, coordinator) = setup();
        backend.set_data(RECENT, vec![sighting("r1", "Ant")]);
        let recent = ready_poller(&backend, "recent", RECENT, "_id").await;

        let transfer = Transfer { remove_source: false, ..archive_transfer() };
        let ant = recent.latest().data[0].clone();
        coordinator.transfer(&recent, None, &ant, &transfer).await.unwrap();

        assert_eq!(recent.latest().data.len(), 1);
        assert_eq!(backend.writes().len(), 1);
        recent.stop();
    }

    #[test]
    fn test_past_tense() {
        assert_eq!(past_tense("archive"), "Archived");
        assert_eq!(past_tense("restore"), "Restored");
        assert_eq!(past_tense("delete"), "Deleted");
    }
}
