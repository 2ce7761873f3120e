mod app;
mod handlers;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, BorderType, Borders, Tabs},
    Frame, Terminal,
};
use std::{fs, io, path::PathBuf, sync::Mutex, time::Duration};

use app::{App, Tab};
use handlers::{handle_key_event, KeyAction};
use specwatch::config::Config;
use specwatch::dashboard::Dashboard;
use specwatch::snapshot::Snapshot;
use ui::{
    render_detections_view, render_graph_view, render_home_view, render_map_view,
    render_models_view, render_status_bar, DetectionsViewState, GraphViewState, HomeViewState,
    MapViewState, ModelsViewState, StatusBarState,
};

/// Terminal dashboard for the species detection backend
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Config file (default: <config dir>/specwatch/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the backend base URL from the config
    #[arg(long)]
    base_url: Option<String>,

    /// Log debug output to the log file
    #[arg(short, long)]
    verbose: bool,

    /// Print the default config and exit
    #[arg(long)]
    print_config: bool,
}

fn init_logging(verbose: bool) -> Result<PathBuf> {
    let dir = dirs::cache_dir()
        .context("Failed to get cache directory")?
        .join("specwatch");
    fs::create_dir_all(&dir).context("Failed to create log directory")?;

    let path = dir.join("specwatch.log");
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    // The terminal belongs to the UI, so logs only go to the file
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(if verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", Config::example_config());
        return Ok(());
    }

    let log_path = init_logging(cli.verbose)?;

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };
    let mut config = Config::load_from(&config_path)?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }
    tracing::info!(
        "starting against {} (config {}, log {})",
        config.api.base_url,
        config_path.display(),
        log_path.display()
    );

    let dashboard = Dashboard::connect(&config);
    let mut app = App::new(config, config_path, dashboard.clone());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;

    dashboard.stop();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::warn!("exited with error: {:?}", err);
        eprintln!("{:?}", err);
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()>
where
    <B as ratatui::backend::Backend>::Error: Send + Sync + 'static,
{
    let tick_rate = Duration::from_millis(app.config.ui.tick_rate_ms.max(10));

    loop {
        app.clear_expired_status();
        app.clamp_selection();

        terminal.draw(|f| render_ui(f, app))?;

        // crossterm's poll blocks; keep it off the runtime's worker threads
        let ready = tokio::task::block_in_place(|| event::poll(tick_rate))?;
        if ready {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key_event(app, key) {
                    KeyAction::Quit => return Ok(()),
                    KeyAction::Continue => {}
                }
            }
        }
    }
}

fn render_ui(f: &mut Frame, app: &mut App) {
    let theme = app.theme.clone();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Min(10),   // Screen
            Constraint::Length(3), // Status bar
        ])
        .split(f.area());

    let tabs = Tabs::new(
        Tab::ALL
            .iter()
            .enumerate()
            .map(|(i, t)| Line::from(format!("{} {}", i + 1, t.title()))),
    )
    .select(app.tab.index())
    .style(Style::default().fg(theme.text_muted()))
    .highlight_style(
        Style::default()
            .fg(theme.primary())
            .add_modifier(Modifier::BOLD),
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" Invasive Species Watch "),
    );
    f.render_widget(tabs, chunks[0]);

    let hints = render_screen(f, app, chunks[1], &theme);

    let notifications = app.dashboard.notifications();
    let status_state = StatusBarState {
        notifications: &notifications,
        status_message: app
            .status_message
            .as_ref()
            .map(|m| (m.message.clone(), m.is_error)),
        filter_active: app.filter_input.is_active,
        hints,
    };
    render_status_bar(f, &status_state, chunks[2], &theme);
}

/// Draw the current tab; returns its key hints for the status bar
fn render_screen(f: &mut Frame, app: &App, area: Rect, theme: &ui::Theme) -> &'static str {
    let dashboard = &app.dashboard;
    match app.tab {
        Tab::Home => {
            let home = dashboard.home();
            render_home_view(f, &HomeViewState { home: &home }, area, theme);
            ""
        }
        Tab::Recent => {
            let hints = "/: filter | a: archive | d: delete";
            let snapshot = dashboard.recent.latest();
            let rows = dashboard.recent_rows(&app.recent_filter);
            render_list(f, app, "Recent detections", &snapshot, &rows, hints, area, theme);
            hints
        }
        Tab::Archive => {
            let hints = "/: filter | r: restore | d: delete";
            let snapshot = dashboard.archive.latest();
            let rows = dashboard.archive_rows(&app.archive_filter);
            render_list(f, app, "Archive", &snapshot, &rows, hints, area, theme);
            hints
        }
        Tab::Map => {
            let points = dashboard.heat_points();
            let state = MapViewState {
                points: &points,
                center: dashboard.map_center(),
            };
            render_map_view(f, &state, area, theme);
            ""
        }
        Tab::Graph => {
            let species = dashboard.species();
            let counts = app
                .selected_species()
                .map(|s| dashboard.chart(&s))
                .unwrap_or_default();
            let state = GraphViewState {
                species: &species,
                selected: app.selection.species,
                counts: &counts,
            };
            render_graph_view(f, &state, area, theme);
            "jk: species"
        }
        Tab::Models => {
            let state = ModelsViewState {
                models: dashboard.models(),
                selected: app.selection.model,
            };
            render_models_view(f, &state, area, theme);
            ""
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn render_list(
    f: &mut Frame,
    app: &App,
    title: &str,
    snapshot: &Snapshot,
    rows: &[specwatch::record::Record],
    hints: &str,
    area: Rect,
    theme: &ui::Theme,
) {
    let (filter, selected) = if app.tab == Tab::Archive {
        (&app.archive_filter, app.selection.archive)
    } else {
        (&app.recent_filter, app.selection.recent)
    };
    let state = DetectionsViewState {
        title,
        rows,
        total: snapshot.data.len(),
        selected,
        filter,
        filter_active: app.filter_input.is_active,
        status: snapshot.status,
        error: snapshot.error.as_ref(),
        hints,
    };
    render_detections_view(f, &state, area, theme);
}
