use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState},
    Frame,
};

use specwatch::views::ModelLink;

use super::theme::Theme;

pub struct ModelsViewState<'a> {
    pub models: &'a [ModelLink],
    pub selected: usize,
}

pub fn render_models_view(f: &mut Frame, state: &ModelsViewState, area: Rect, theme: &Theme) -> Rect {
    let items: Vec<ListItem> = state
        .models
        .iter()
        .map(|model| {
            ListItem::new(vec![
                Line::from(model.name.as_str()),
                Line::from(Span::styled(
                    format!("  {}", model.embed_url()),
                    Style::default().fg(theme.text_muted()),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(format!(" 3D models ({}) ", state.models.len()))
                .border_style(theme.border_style(true)),
        )
        .highlight_style(theme.highlight_style())
        .highlight_symbol("> ");

    let selected = (!state.models.is_empty()).then_some(state.selected);
    f.render_stateful_widget(list, area, &mut ListState::default().with_selected(selected));
    area
}
