use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{BarChart, Block, BorderType, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use specwatch::views::DailyCount;

use super::theme::Theme;

pub struct GraphViewState<'a> {
    pub species: &'a [String],
    pub selected: usize,
    pub counts: &'a [DailyCount],
}

pub fn render_graph_view(f: &mut Frame, state: &GraphViewState, area: Rect, theme: &Theme) -> Rect {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(20)])
        .split(area);

    let items: Vec<ListItem> = state.species.iter().map(|s| ListItem::new(s.as_str())).collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(" Species [j/k] ")
                .border_style(theme.border_style(true)),
        )
        .highlight_style(theme.highlight_style())
        .highlight_symbol("> ");
    let selected = (!state.species.is_empty()).then_some(state.selected);
    f.render_stateful_widget(list, chunks[0], &mut ListState::default().with_selected(selected));

    let name = state
        .species
        .get(state.selected)
        .map(String::as_str)
        .unwrap_or("no species");
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(format!(" Detections per day: {} ", name))
        .border_style(theme.border_style(false));

    if state.counts.is_empty() {
        let empty = Paragraph::new("No detections recorded")
            .style(Style::default().fg(theme.text_disabled()))
            .block(block);
        f.render_widget(empty, chunks[1]);
        return chunks[0];
    }

    let labels: Vec<String> = state
        .counts
        .iter()
        .map(|c| c.date.format("%m-%d").to_string())
        .collect();
    let data: Vec<(&str, u64)> = labels
        .iter()
        .zip(state.counts)
        .map(|(label, c)| (label.as_str(), c.count as u64))
        .collect();

    let chart = BarChart::default()
        .block(block)
        .data(data.as_slice())
        .bar_width(5)
        .bar_gap(1)
        .bar_style(Style::default().fg(theme.secondary()))
        .value_style(Style::default().fg(theme.text()));
    f.render_widget(chart, chunks[1]);

    chunks[0]
}
