pub mod detections;
pub mod graph;
pub mod home;
pub mod map;
pub mod models;
pub mod status_bar;
pub mod styles;
pub mod theme;

pub use detections::{render_detections_view, DetectionsViewState};
pub use graph::{render_graph_view, GraphViewState};
pub use home::{render_home_view, HomeViewState};
pub use map::{render_map_view, MapViewState};
pub use models::{render_models_view, ModelsViewState};
pub use status_bar::{render_status_bar, StatusBarState};
pub use theme::Theme;
