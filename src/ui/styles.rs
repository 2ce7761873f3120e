use ratatui::style::{Modifier, Style};

use specwatch::record::Record;
use specwatch::snapshot::SnapshotStatus;

use super::theme::Theme;

/// Placeholder for absent or non-scalar fields
pub const MISSING: &str = "-";

/// Columns shown for detection lists: (header, record field)
pub const DETECTION_COLUMNS: [(&str, &str); 5] = [
    ("Species", "name"),
    ("Date", "date"),
    ("Time", "time"),
    ("Location", "location"),
    ("Confidence", "confidence"),
];

pub fn field_text(record: &Record, field: &str) -> String {
    record.text(field).unwrap_or_else(|| MISSING.to_string())
}

/// Short label and style for a snapshot's status, shown in panel titles
pub fn status_badge(status: SnapshotStatus, theme: &Theme) -> (&'static str, Style) {
    match status {
        SnapshotStatus::Idle => ("idle", Style::default().fg(theme.text_disabled())),
        SnapshotStatus::Loading => ("loading", Style::default().fg(theme.warning())),
        SnapshotStatus::Ready => ("live", Style::default().fg(theme.success())),
        SnapshotStatus::Error => (
            "offline",
            Style::default()
                .fg(theme.error())
                .add_modifier(Modifier::BOLD),
        ),
    }
}

/// Text bar for a 0.0..=1.0 heat intensity
pub fn intensity_bar(intensity: f64, width: usize) -> String {
    let filled = ((intensity.clamp(0.0, 1.0) * width as f64).round() as usize).max(1);
    format!("{}{}", "█".repeat(filled), "░".repeat(width.saturating_sub(filled)))
}
