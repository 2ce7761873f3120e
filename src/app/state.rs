use std::time::Instant;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Tab {
    Home,
    Recent,
    Archive,
    Map,
    Graph,
    Models,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Home,
        Tab::Recent,
        Tab::Archive,
        Tab::Map,
        Tab::Graph,
        Tab::Models,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Home => "Home",
            Tab::Recent => "Recent",
            Tab::Archive => "Archive",
            Tab::Map => "Map",
            Tab::Graph => "Graph",
            Tab::Models => "Models",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Cursor positions per list screen
#[derive(Default)]
pub struct Selection {
    pub recent: usize,
    pub archive: usize,
    pub species: usize,
    pub model: usize,
}

/// Filter text entry (`/`)
#[derive(Default)]
pub struct FilterInput {
    pub is_active: bool,
}

/// Local status line message, separate from backend notifications
pub struct StatusMessage {
    pub message: String,
    pub is_error: bool,
    pub timestamp: Instant,
}
