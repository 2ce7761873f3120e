use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::{
        canvas::{Canvas, Map, MapResolution, Points},
        Block, BorderType, Borders, Cell, Row, Table,
    },
    Frame,
};

use specwatch::views::HeatPoint;

use super::styles::intensity_bar;
use super::theme::Theme;

/// Degrees shown either side of the map center
const SPAN_DEGREES: f64 = 6.0;

pub struct MapViewState<'a> {
    pub points: &'a [HeatPoint],
    pub center: (f64, f64),
}

pub fn render_map_view(f: &mut Frame, state: &MapViewState, area: Rect, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let (lat, lon) = state.center;
    let canvas = Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(format!(" Sightings near {:.3}, {:.3} ", lat, lon))
                .border_style(theme.border_style(true)),
        )
        .x_bounds([lon - SPAN_DEGREES * 1.5, lon + SPAN_DEGREES * 1.5])
        .y_bounds([lat - SPAN_DEGREES, lat + SPAN_DEGREES])
        .paint(|ctx| {
            ctx.draw(&Map {
                color: theme.text_disabled(),
                resolution: MapResolution::High,
            });
            ctx.layer();
            for (threshold, color) in [(0.0, theme.success()), (0.5, theme.warning()), (1.0, theme.error())] {
                let coords: Vec<(f64, f64)> = state
                    .points
                    .iter()
                    .filter(|p| p.intensity >= threshold)
                    .map(|p| (p.longitude, p.latitude))
                    .collect();
                ctx.draw(&Points {
                    coords: &coords,
                    color,
                });
            }
        });
    f.render_widget(canvas, chunks[0]);

    let header = Row::new(["Lat", "Lon", "Count", "Heat"].map(Cell::from)).style(
        Style::default()
            .fg(theme.primary())
            .add_modifier(Modifier::BOLD),
    );
    let rows: Vec<Row> = state
        .points
        .iter()
        .map(|p| {
            Row::new([
                Cell::from(format!("{:.4}", p.latitude)),
                Cell::from(format!("{:.4}", p.longitude)),
                Cell::from(p.count.to_string()),
                Cell::from(Span::styled(
                    intensity_bar(p.intensity, 6),
                    Style::default().fg(theme.secondary()),
                )),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Min(6),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(format!(" Locations ({}) ", state.points.len()))
            .border_style(theme.border_style(false)),
    );
    f.render_widget(table, chunks[1]);
}
