use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use specwatch::notify::Notification;

use super::theme::Theme;

pub struct StatusBarState<'a> {
    /// Newest first
    pub notifications: &'a [Notification],
    pub status_message: Option<(String, bool)>, // (message, is_error)
    pub filter_active: bool,
    pub hints: &'a str,
}

fn key_hint<'a>(key: &'a str, action: &'a str) -> [Span<'a>; 2] {
    [
        Span::styled(key, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(action),
    ]
}

pub fn render_status_bar(
    f: &mut Frame,
    state: &StatusBarState,
    area: ratatui::layout::Rect,
    theme: &Theme,
) {
    let status_bar = if let Some(newest) = state.notifications.first() {
        let color = if newest.is_error() { theme.error() } else { theme.success() };
        let mut spans = vec![
            Span::styled(
                if newest.is_error() { "ERROR" } else { "OK" },
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(": "),
            Span::styled(newest.message.as_str(), Style::default().fg(color)),
        ];
        if state.notifications.len() > 1 {
            spans.push(Span::styled(
                format!("  (+{} more)", state.notifications.len() - 1),
                Style::default().fg(theme.text_muted()),
            ));
        }
        Paragraph::new(Line::from(spans))
    } else if let Some((ref msg, is_error)) = state.status_message {
        let color = if is_error { theme.error() } else { theme.warning() };
        Paragraph::new(Line::from(vec![
            Span::styled(
                if is_error { "ERROR" } else { "INFO" },
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(": "),
            Span::styled(msg.as_str(), Style::default().fg(color)),
        ]))
    } else if state.filter_active {
        let mut spans = vec![
            Span::styled(
                "FILTER",
                Style::default().fg(theme.warning()).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" | "),
        ];
        spans.extend(key_hint("Enter", ": keep | "));
        spans.extend(key_hint("Esc", ": clear"));
        Paragraph::new(Line::from(spans))
    } else {
        let mut spans = vec![
            Span::styled(
                "NORMAL",
                Style::default().fg(theme.success()).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" | "),
        ];
        spans.extend(key_hint("Tab/1-6", ": screen | "));
        spans.extend(key_hint("jk", ": move | "));
        spans.extend(key_hint("s", ": sync | "));
        spans.extend(key_hint("t", ": theme | "));
        spans.extend(key_hint("q", ": quit"));
        if !state.hints.is_empty() {
            spans.push(Span::raw(" | "));
            spans.push(Span::styled(state.hints, Style::default().fg(theme.text_muted())));
        }
        Paragraph::new(Line::from(spans))
    };

    let status_bar = status_bar.block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(status_bar, area);
}
