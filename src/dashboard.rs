//! Wiring for the dashboard screens.
//!
//! One poller per screen resource, one mutation coordinator and one
//! notification sink shared by all of them. Screens read through the
//! accessors below; they never talk to the backend directly.

use std::sync::Arc;

use futures_util::future::join_all;

use crate::api::{Fetcher, HttpBackend, RemoteWriter};
use crate::config::{Config, EndpointsConfig};
use crate::error::ErrorInfo;
use crate::mutation::{MutationCoordinator, Transfer};
use crate::notify::{Notification, NotificationSink};
use crate::poller::{Poller, PollerHandle};
use crate::projector::{project, FilterState};
use crate::record::{Record, RecordId};
use crate::snapshot::{Snapshot, SnapshotStatus};
use crate::views::{self, DailyCount, HeatPoint, ModelLink};

/// What the home screen shows: the latest detection and its fact sheet
#[derive(Debug, Clone, PartialEq)]
pub struct HomeView {
    pub detection: Option<Record>,
    pub facts: Option<Record>,
    pub status: SnapshotStatus,
    pub error: Option<ErrorInfo>,
}

struct Routes {
    endpoints: EndpointsConfig,
    remove_source: bool,
    models: Vec<ModelLink>,
}

#[derive(Clone)]
pub struct Dashboard {
    pub current: PollerHandle,
    pub facts: PollerHandle,
    pub recent: PollerHandle,
    pub archive: PollerHandle,
    pub species_info: PollerHandle,
    pub chart: PollerHandle,
    pub locations: PollerHandle,
    coordinator: Arc<MutationCoordinator>,
    sink: NotificationSink,
    routes: Arc<Routes>,
}

impl Dashboard {
    /// Start every poller against the configured HTTP backend
    pub fn connect(config: &Config) -> Self {
        let backend = Arc::new(HttpBackend::new(&config.api.base_url, config.api.timeout()));
        Self::start(config, backend)
    }

    pub fn start<B>(config: &Config, backend: Arc<B>) -> Self
    where
        B: Fetcher + RemoteWriter + 'static,
    {
        let endpoints = &config.endpoints;
        let polling = &config.polling;
        let interval = |ms: u64| std::time::Duration::from_millis(ms);
        let poll = |name: &str, path: &str, ms: u64| {
            Poller::start(backend.clone(), config.resource(name, path), interval(ms))
        };

        let sink = NotificationSink::new(config.notifications.ttl());
        let coordinator = Arc::new(MutationCoordinator::new(
            backend.clone(),
            sink.clone(),
            config.api.timeout(),
        ));

        Self {
            current: poll("current", &endpoints.current, polling.current_ms),
            facts: poll("facts", &endpoints.facts, polling.facts_ms),
            recent: poll("recent", &endpoints.recent, polling.recent_ms),
            archive: poll("archive", &endpoints.archive, polling.archive_ms),
            species_info: poll("species", &endpoints.species_info, polling.species_ms),
            chart: poll("chart", &endpoints.recent, polling.chart_ms),
            locations: poll("locations", &endpoints.locations, polling.locations_ms),
            coordinator,
            sink,
            routes: Arc::new(Routes {
                endpoints: endpoints.clone(),
                remove_source: config.archive.remove_source,
                models: config.models.clone(),
            }),
        }
    }

    pub fn pollers(&self) -> [&PollerHandle; 7] {
        [
            &self.current,
            &self.facts,
            &self.recent,
            &self.archive,
            &self.species_info,
            &self.chart,
            &self.locations,
        ]
    }

    pub fn sink(&self) -> &NotificationSink {
        &self.sink
    }

    pub fn coordinator(&self) -> &MutationCoordinator {
        &self.coordinator
    }

    /// Visible notifications, newest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.sink.active()
    }

    pub fn home(&self) -> HomeView {
        let current = self.current.latest();
        let detection = current.data.first().cloned();
        let facts = detection
            .as_ref()
            .and_then(|d| d.str_field("name"))
            .and_then(|name| views::facts_for(&self.facts.latest().data, name).cloned());

        HomeView {
            detection,
            facts,
            status: current.status,
            error: current.error.clone(),
        }
    }

    pub fn recent_rows(&self, filter: &FilterState) -> Vec<Record> {
        rows(&self.recent.latest(), filter)
    }

    pub fn archive_rows(&self, filter: &FilterState) -> Vec<Record> {
        rows(&self.archive.latest(), filter)
    }

    /// Move a recent detection into the archive
    pub async fn archive_record(&self, record: &Record) -> Result<Option<Record>, ErrorInfo> {
        let transfer = Transfer {
            action: "archive".to_string(),
            create_path: self.routes.endpoints.archive_create.clone(),
            delete_path: self.routes.endpoints.recent_delete.clone(),
            remove_source: self.routes.remove_source,
        };
        self.coordinator
            .transfer(&self.recent, Some(&self.archive), record, &transfer)
            .await
    }

    /// Move an archived detection back to the recent list
    pub async fn restore_record(&self, record: &Record) -> Result<Option<Record>, ErrorInfo> {
        let transfer = Transfer {
            action: "restore".to_string(),
            create_path: self.routes.endpoints.recent_create.clone(),
            delete_path: self.routes.endpoints.archive_delete.clone(),
            remove_source: self.routes.remove_source,
        };
        self.coordinator
            .transfer(&self.archive, Some(&self.recent), record, &transfer)
            .await
    }

    pub async fn delete_recent(&self, id: &RecordId) -> Result<(), ErrorInfo> {
        self.coordinator
            .delete(&self.recent, &self.routes.endpoints.recent_delete, id)
            .await
    }

    pub async fn delete_archived(&self, id: &RecordId) -> Result<(), ErrorInfo> {
        self.coordinator
            .delete(&self.archive, &self.routes.endpoints.archive_delete, id)
            .await
    }

    /// Re-fetch every resource now and wait for all of them
    pub async fn sync(&self) {
        join_all(self.pollers().into_iter().map(|p| p.refresh())).await;
    }

    /// Species the chart can be drawn for
    pub fn species(&self) -> Vec<String> {
        views::species_names(&self.species_info.latest().data)
    }

    pub fn chart(&self, species: &str) -> Vec<DailyCount> {
        views::daily_counts(&self.chart.latest().data, species)
    }

    pub fn heat_points(&self) -> Vec<HeatPoint> {
        views::heat_points(&self.locations.latest().data)
    }

    pub fn map_center(&self) -> (f64, f64) {
        views::map_center(&self.locations.latest().data)
    }

    pub fn models(&self) -> &[ModelLink] {
        &self.routes.models
    }

    pub fn stop(&self) {
        for poller in self.pollers() {
            poller.stop();
        }
    }
}

fn rows(snapshot: &Snapshot, filter: &FilterState) -> Vec<Record> {
    project(snapshot, filter).into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{ScriptedBackend, WriteCall};
    use crate::notify::NotificationLevel;

    fn sighting(id: &str, name: &str, date: &str) -> Record {
        Record::new()
            .with("_id", id)
            .with("name", name)
            .with("date", date)
    }

    fn backend(config: &Config) -> Arc<ScriptedBackend> {
        let backend = Arc::new(ScriptedBackend::new());
        let e = &config.endpoints;
        backend.set_data(&e.current, vec![Record::new().with("name", "Spotted Lanternfly")]);
        backend.set_data(
            &e.facts,
            vec![
                Record::new().with("speciesName", "Ant").with("funFact", "Strong"),
                Record::new()
                    .with("speciesName", "Spotted Lanternfly")
                    .with("funFact", "Invasive in Ontario"),
            ],
        );
        backend.set_data(
            &e.recent,
            vec![
                sighting("r1", "Ant", "2025-03-01"),
                sighting("r2", "Bee", "2025-03-01"),
                sighting("r3", "Ant", "2025-03-02"),
            ],
        );
        backend.set_data(&e.archive, vec![sighting("a1", "Wasp", "2025-02-10")]);
        backend.set_data(
            &e.species_info,
            vec![Record::new().with("name", "Ant"), Record::new().with("name", "Bee")],
        );
        backend.set_data(
            &e.locations,
            vec![Record::new()
                .with("latitude", 44.0)
                .with("longitude", -79.0)
                .with("count", 7)],
        );
        backend
    }

    async fn started() -> (Config, Arc<ScriptedBackend>, Dashboard) {
        let config = Config::default();
        let backend = backend(&config);
        let dashboard = Dashboard::start(&config, backend.clone());
        for poller in dashboard.pollers() {
            poller.subscribe().wait_for(|s| s.is_ready()).await.unwrap();
        }
        (config, backend, dashboard)
    }

    #[tokio::test(start_paused = true)]
    async fn test_home_pairs_detection_with_facts() {
        let (_, _, dashboard) = started().await;

        let home = dashboard.home();
        assert_eq!(home.status, SnapshotStatus::Ready);
        assert_eq!(
            home.detection.unwrap().str_field("name"),
            Some("Spotted Lanternfly")
        );
        assert_eq!(
            home.facts.unwrap().str_field("funFact"),
            Some("Invasive in Ontario")
        );
        dashboard.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_models() {
        let (_, _, dashboard) = started().await;

        let ants = dashboard.recent_rows(&FilterState::default().with_pattern("ant"));
        assert_eq!(ants.len(), 2);
        assert_eq!(dashboard.species(), vec!["Ant", "Bee"]);
        assert_eq!(dashboard.chart("Ant").len(), 2);
        assert_eq!(dashboard.heat_points()[0].intensity, 0.5);
        assert_eq!(dashboard.map_center(), (44.0, -79.0));
        assert_eq!(dashboard.models().len(), 10);
        dashboard.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_archive_then_restore() {
        let (config, backend, dashboard) = started().await;
        let e = &config.endpoints;
        backend.push_create(&e.archive_create, Ok(Some(sighting("a2", "Ant", "2025-03-01"))));
        backend.push_create(&e.recent_create, Ok(Some(sighting("r9", "Ant", "2025-03-01"))));

        let ant = dashboard.recent_rows(&FilterState::default())[0].clone();
        let archived = dashboard.archive_record(&ant).await.unwrap().unwrap();

        let all = FilterState::default();
        assert_eq!(dashboard.recent_rows(&all).len(), 2);
        assert_eq!(dashboard.archive_rows(&all).len(), 2);

        dashboard.restore_record(&archived).await.unwrap();
        assert_eq!(dashboard.archive_rows(&all).len(), 1);
        assert!(dashboard
            .recent_rows(&all)
            .iter()
            .any(|r| r.id("_id") == Some(RecordId::from("r9"))));

        let paths: Vec<String> = backend
            .writes()
            .into_iter()
            .map(|w| match w {
                WriteCall::Delete { path, .. }
                | WriteCall::Create { path, .. }
                | WriteCall::Update { path, .. } => path,
            })
            .collect();
        assert_eq!(
            paths,
            vec![
                e.archive_create.clone(),
                e.recent_delete.clone(),
                e.recent_create.clone(),
                e.archive_delete.clone(),
            ]
        );

        let levels: Vec<NotificationLevel> =
            dashboard.notifications().iter().map(|n| n.level).collect();
        assert_eq!(levels, vec![NotificationLevel::Success; 2]);
        dashboard.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_archived_uses_archive_route() {
        let (config, backend, dashboard) = started().await;

        dashboard.delete_archived(&RecordId::from("a1")).await.unwrap();

        assert!(dashboard.archive_rows(&FilterState::default()).is_empty());
        assert_eq!(
            backend.writes(),
            vec![WriteCall::Delete {
                path: config.endpoints.archive_delete.clone(),
                id: RecordId::from("a1"),
            }]
        );
        dashboard.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_refreshes_every_poller() {
        let (config, backend, dashboard) = started().await;
        let before = backend.fetch_count(&config.endpoints.locations);

        dashboard.sync().await;

        assert_eq!(backend.fetch_count(&config.endpoints.locations), before + 1);
        // recent and chart share a path
        assert_eq!(backend.fetch_count(&config.endpoints.recent), 4);
        dashboard.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_species_list_polls_on_its_own_period() {
        let mut config = Config::default();
        config.polling.chart_ms = 1_000;
        config.polling.species_ms = 0;
        let backend = backend(&config);
        let dashboard = Dashboard::start(&config, backend.clone());

        tokio::time::sleep(std::time::Duration::from_millis(3_500)).await;

        assert_eq!(backend.fetch_count(&config.endpoints.species_info), 1);
        dashboard.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_deactivates_all() {
        let (_, _, dashboard) = started().await;
        dashboard.stop();
        assert!(dashboard.pollers().iter().all(|p| !p.is_active()));
    }
}
