use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};

use specwatch::dashboard::HomeView;
use specwatch::record::Record;

use super::styles::status_badge;
use super::theme::Theme;

/// Fields not worth a line on the home screen
const HIDDEN_FIELDS: [&str; 4] = ["_id", "id", "image", "speciesName"];

pub struct HomeViewState<'a> {
    pub home: &'a HomeView,
}

pub fn render_home_view(f: &mut Frame, state: &HomeViewState, area: Rect, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let (badge, badge_style) = status_badge(state.home.status, theme);
    let title = Line::from(vec![
        Span::raw(" Latest detection "),
        Span::styled(format!("[{}] ", badge), badge_style),
    ]);

    let mut lines = match &state.home.detection {
        Some(detection) => {
            let name = detection.str_field("name").unwrap_or("Unknown species");
            let mut lines = vec![
                Line::from(Span::styled(
                    name.to_string(),
                    Style::default()
                        .fg(theme.primary())
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
            ];
            lines.extend(field_lines(detection, &["name"], theme));
            lines
        }
        None => vec![Line::from(Span::styled(
            "No detections yet",
            Style::default().fg(theme.text_disabled()),
        ))],
    };

    if let Some(error) = &state.home.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(theme.error()),
        )));
    }

    let detection = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(title)
            .border_style(theme.border_style(true)),
    );
    f.render_widget(detection, chunks[0]);

    let facts = match &state.home.facts {
        Some(facts) => field_lines(facts, &[], theme),
        None => vec![Line::from(Span::styled(
            "No fact sheet for this species",
            Style::default().fg(theme.text_disabled()),
        ))],
    };
    let facts = Paragraph::new(facts).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" Species facts ")
            .border_style(theme.border_style(false)),
    );
    f.render_widget(facts, chunks[1]);
}

fn field_lines<'a>(record: &'a Record, skip: &[&str], theme: &Theme) -> Vec<Line<'a>> {
    record
        .as_map()
        .keys()
        .filter(|k| !HIDDEN_FIELDS.contains(&k.as_str()) && !skip.contains(&k.as_str()))
        .filter_map(|k| {
            let value = record.text(k)?;
            Some(Line::from(vec![
                Span::styled(
                    format!("{}: ", k),
                    Style::default().fg(theme.text_muted()),
                ),
                Span::styled(value, Style::default().fg(theme.text())),
            ]))
        })
        .collect()
}
