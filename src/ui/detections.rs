use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Row, Table, TableState},
    Frame,
};

use specwatch::error::ErrorInfo;
use specwatch::projector::FilterState;
use specwatch::record::Record;
use specwatch::snapshot::SnapshotStatus;

use super::styles::{field_text, status_badge, DETECTION_COLUMNS};
use super::theme::Theme;

/// Recent and Archive share this table
pub struct DetectionsViewState<'a> {
    pub title: &'a str,
    pub rows: &'a [Record],
    pub total: usize,
    pub selected: usize,
    pub filter: &'a FilterState,
    pub filter_active: bool,
    pub status: SnapshotStatus,
    pub error: Option<&'a ErrorInfo>,
    pub hints: &'a str,
}

pub fn render_detections_view(
    f: &mut Frame,
    state: &DetectionsViewState,
    area: Rect,
    theme: &Theme,
) -> Rect {
    let (badge, badge_style) = status_badge(state.status, theme);

    let mut title = vec![
        Span::raw(format!(" {} ", state.title)),
        Span::styled(format!("[{}] ", badge), badge_style),
    ];
    if state.filter_active || !state.filter.is_empty() {
        title.push(Span::styled(
            format!(
                "/{}{} ({}/{}) ",
                state.filter.pattern,
                if state.filter_active { "_" } else { "" },
                state.rows.len(),
                state.total
            ),
            Style::default().fg(theme.warning()),
        ));
    } else {
        title.push(Span::raw(format!("({}) ", state.total)));
    }
    title.push(Span::styled(
        format!("[{}] ", state.hints),
        Style::default().fg(theme.text_muted()),
    ));

    let header = Row::new(
        DETECTION_COLUMNS
            .iter()
            .map(|(label, _)| Cell::from(*label)),
    )
    .style(
        Style::default()
            .fg(theme.primary())
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = state
        .rows
        .iter()
        .map(|record| {
            Row::new(
                DETECTION_COLUMNS
                    .iter()
                    .map(|(_, field)| Cell::from(field_text(record, field))),
            )
        })
        .collect();

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(Line::from(title))
        .border_style(theme.border_style(state.filter_active));
    if let Some(error) = state.error {
        block = block.title_bottom(Line::from(Span::styled(
            format!(" {} ", error),
            Style::default().fg(theme.error()),
        )));
    }

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(28),
            Constraint::Percentage(14),
            Constraint::Percentage(12),
            Constraint::Percentage(30),
            Constraint::Percentage(16),
        ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(theme.highlight_style())
    .highlight_symbol("> ");

    let selected = (!state.rows.is_empty()).then_some(state.selected);
    f.render_stateful_widget(table, area, &mut TableState::default().with_selected(selected));

    area
}
