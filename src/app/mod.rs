pub mod state;

use std::path::PathBuf;
use std::time::Duration;

use specwatch::config::Config;
use specwatch::dashboard::Dashboard;
use specwatch::projector::FilterState;
use specwatch::record::Record;

use crate::ui::Theme;

pub use state::{FilterInput, Selection, StatusMessage, Tab};

const STATUS_TTL: Duration = Duration::from_secs(5);

pub struct App {
    pub tab: Tab,
    pub dashboard: Dashboard,
    pub selection: Selection,

    // Per-list filters; `/` edits the one for the current tab
    pub recent_filter: FilterState,
    pub archive_filter: FilterState,
    pub filter_input: FilterInput,

    pub config: Config,
    pub config_path: PathBuf,
    pub theme: Theme,

    pub status_message: Option<StatusMessage>,
}

impl App {
    pub fn new(config: Config, config_path: PathBuf, dashboard: Dashboard) -> Self {
        let filter_field = config.ui.filter_field.as_str();
        Self {
            tab: Tab::Home,
            dashboard,
            selection: Selection::default(),
            recent_filter: FilterState::on_field(filter_field),
            archive_filter: FilterState::on_field(filter_field),
            filter_input: FilterInput::default(),
            theme: Theme::for_mode(config.ui.dark_mode),
            config,
            config_path,
            status_message: None,
        }
    }

    pub fn next_tab(&mut self) {
        self.tab = self.tab.next();
        self.filter_input.is_active = false;
    }

    pub fn prev_tab(&mut self) {
        self.tab = self.tab.prev();
        self.filter_input.is_active = false;
    }

    /// Filter for the current tab, if it has a filterable list
    pub fn active_filter_mut(&mut self) -> Option<&mut FilterState> {
        match self.tab {
            Tab::Recent => Some(&mut self.recent_filter),
            Tab::Archive => Some(&mut self.archive_filter),
            _ => None,
        }
    }

    pub fn start_filter(&mut self) {
        if self.active_filter_mut().is_some() {
            self.filter_input.is_active = true;
        }
    }

    pub fn push_filter_char(&mut self, c: char) {
        if let Some(filter) = self.active_filter_mut() {
            filter.pattern.push(c);
        }
        self.reset_list_cursor();
    }

    pub fn pop_filter_char(&mut self) {
        if let Some(filter) = self.active_filter_mut() {
            filter.pattern.pop();
        }
        self.reset_list_cursor();
    }

    pub fn clear_filter(&mut self) {
        if let Some(filter) = self.active_filter_mut() {
            filter.pattern.clear();
        }
        self.filter_input.is_active = false;
        self.reset_list_cursor();
    }

    fn reset_list_cursor(&mut self) {
        match self.tab {
            Tab::Recent => self.selection.recent = 0,
            Tab::Archive => self.selection.archive = 0,
            _ => {}
        }
    }

    fn list_len(&self) -> usize {
        match self.tab {
            Tab::Recent => self.dashboard.recent_rows(&self.recent_filter).len(),
            Tab::Archive => self.dashboard.archive_rows(&self.archive_filter).len(),
            Tab::Graph => self.dashboard.species().len(),
            Tab::Models => self.dashboard.models().len(),
            Tab::Home | Tab::Map => 0,
        }
    }

    fn cursor_mut(&mut self) -> Option<&mut usize> {
        match self.tab {
            Tab::Recent => Some(&mut self.selection.recent),
            Tab::Archive => Some(&mut self.selection.archive),
            Tab::Graph => Some(&mut self.selection.species),
            Tab::Models => Some(&mut self.selection.model),
            Tab::Home | Tab::Map => None,
        }
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.list_len();
        if let Some(cursor) = self.cursor_mut() {
            *cursor = if len == 0 {
                0
            } else {
                cursor.saturating_add_signed(delta).min(len - 1)
            };
        }
    }

    /// Lists shrink under the cursor as polls land and deletes apply
    pub fn clamp_selection(&mut self) {
        self.move_selection(0);
    }

    pub fn selected_recent(&self) -> Option<Record> {
        self.dashboard
            .recent_rows(&self.recent_filter)
            .into_iter()
            .nth(self.selection.recent)
    }

    pub fn selected_archived(&self) -> Option<Record> {
        self.dashboard
            .archive_rows(&self.archive_filter)
            .into_iter()
            .nth(self.selection.archive)
    }

    pub fn selected_species(&self) -> Option<String> {
        self.dashboard.species().into_iter().nth(self.selection.species)
    }

    /// Archive the highlighted recent detection in the background
    pub fn archive_selected(&mut self) {
        if self.tab != Tab::Recent {
            return;
        }
        let Some(record) = self.selected_recent() else {
            return;
        };
        let dashboard = self.dashboard.clone();
        tokio::spawn(async move {
            // Outcome is reported through the notification sink
            let _ = dashboard.archive_record(&record).await;
        });
    }

    pub fn restore_selected(&mut self) {
        if self.tab != Tab::Archive {
            return;
        }
        let Some(record) = self.selected_archived() else {
            return;
        };
        let dashboard = self.dashboard.clone();
        tokio::spawn(async move {
            let _ = dashboard.restore_record(&record).await;
        });
    }

    pub fn delete_selected(&mut self) {
        let id_field = self.config.endpoints.id_field.clone();
        let (record, from_archive) = match self.tab {
            Tab::Recent => (self.selected_recent(), false),
            Tab::Archive => (self.selected_archived(), true),
            _ => return,
        };
        let Some(id) = record.and_then(|r| r.id(&id_field)) else {
            self.set_status_error(format!("Selected record has no `{}`", id_field));
            return;
        };

        let dashboard = self.dashboard.clone();
        tokio::spawn(async move {
            let _ = if from_archive {
                dashboard.delete_archived(&id).await
            } else {
                dashboard.delete_recent(&id).await
            };
        });
    }

    pub fn sync(&mut self) {
        let dashboard = self.dashboard.clone();
        tokio::spawn(async move { dashboard.sync().await });
        self.set_status_info("Syncing...".to_string());
    }

    /// Flip dark mode and persist the choice
    pub fn toggle_dark_mode(&mut self) {
        self.config.ui.dark_mode = !self.config.ui.dark_mode;
        self.theme = Theme::for_mode(self.config.ui.dark_mode);

        match self.config.save_to(&self.config_path) {
            Ok(()) => self.set_status_info(format!(
                "{} mode",
                if self.config.ui.dark_mode { "Dark" } else { "Light" }
            )),
            Err(e) => self.set_status_error(format!("Failed to save config: {:#}", e)),
        }
    }

    pub fn set_status_error(&mut self, msg: String) {
        tracing::warn!("{}", msg);
        self.status_message = Some(StatusMessage {
            message: msg,
            is_error: true,
            timestamp: std::time::Instant::now(),
        });
    }

    pub fn set_status_info(&mut self, msg: String) {
        self.status_message = Some(StatusMessage {
            message: msg,
            is_error: false,
            timestamp: std::time::Instant::now(),
        });
    }

    pub fn clear_expired_status(&mut self) {
        if let Some(ref msg) = self.status_message {
            if msg.timestamp.elapsed() > STATUS_TTL {
                self.status_message = None;
            }
        }
    }
}
