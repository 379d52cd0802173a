/// Cypher Tracer terminal dashboard
///
/// Charts the selected (asset, timeframe) window from the feed server and shows the
/// latest trend prediction for the selected asset. Switching selection is instant: every
/// window is maintained in the background whether it is on screen or not.
mod input;
mod ui;

use std::{
    error::Error,
    fs::OpenOptions,
    io,
    sync::Mutex,
    time::{Duration, Instant},
};

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use cypher_tracer::{Dashboard, DashboardConfig, SharedDashboard, WebSocketClient, drive};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;

const REDRAW_INTERVAL: Duration = Duration::from_millis(250);
const DEFAULT_LOG_FILE: &str = "cypher-tracer-tui.log";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging()?;

    let config = DashboardConfig::from_env();
    info!(?config, "starting dashboard");

    let dashboard = SharedDashboard::new(Dashboard::from_config(&config));
    let (frames, statuses) = WebSocketClient::with_config(config.websocket()).start();
    tokio::spawn(drive(dashboard.clone(), frames, statuses));

    // Setup panic hook to restore terminal on crash
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &dashboard);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("dashboard closed");
    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    dashboard: &SharedDashboard,
) -> Result<(), Box<dyn Error>> {
    let mut last_draw = Instant::now();
    let mut dirty = true;

    loop {
        if dirty || last_draw.elapsed() >= REDRAW_INTERVAL {
            let view = dashboard.view();
            terminal.draw(|f| ui::render_ui(f, &view))?;
            last_draw = Instant::now();
            dirty = false;
        }

        let timeout = REDRAW_INTERVAL.saturating_sub(last_draw.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if let Some(action) = input::action_for(key) {
                    if !dashboard.update(|dashboard| input::apply(action, dashboard)) {
                        return Ok(());
                    }
                    dirty = true;
                }
            }
        }
    }
}

/// Log to a file so output never lands on the alternate screen.
fn init_logging() -> Result<(), Box<dyn Error>> {
    let path = std::env::var("CYPHER_TUI_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
