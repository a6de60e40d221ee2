mod api;
mod app;
mod config;
mod form;
mod models;
mod ui;
mod viewer;

#[cfg(test)]
mod fake_transport;

use anyhow::{Context, Result};
use api::ApiClient;
use app::{App, AppEvent};
use clap::Parser;
use config::Config;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
};
use std::{
    fs::OpenOptions,
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Terminal client for the encryption service and its audit log
#[derive(Parser)]
#[command(name = "cipher-tui")]
#[command(about = "Encrypt, decrypt and browse the request log of a remote cipher service")]
struct Args {
    /// Path to configuration file (.env format)
    #[arg(short, long, default_value = ".env")]
    config: String,

    /// Service base address, overrides API_URL
    #[arg(long)]
    api_url: Option<String>,

    /// Log file, overrides LOG_FILE
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(&args.config, args.api_url, args.log_file)?;
    init_logging(&config.log_file)?;

    log::info!("Starting cipher-tui against {}", config.api_url);

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let transport = Arc::new(ApiClient::new(config.api_url.clone()));
    let mut app = App::new(config.api_url.clone(), transport, events_tx);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.start();
    let res = run_app(&mut terminal, &mut app, events_rx).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        log::error!("Terminal error: {}", err);
        println!("{:?}", err)
    }

    log::info!("cipher-tui stopped");
    Ok(())
}

/// Runs the UI loop until the user quits.
///
/// Each iteration draws the screen, waits up to one tick (250ms) for a key
/// press and then applies every network outcome that arrived in the
/// meantime. Network calls run as separate tasks, so the loop never waits
/// on the service.
async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut events: UnboundedReceiver<AppEvent>,
) -> io::Result<()> {
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(250);

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout_duration = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout_duration)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }

        while let Ok(event) = events.try_recv() {
            app.handle_event(event);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
}
