use color_eyre::Result;
use guardian_tui::{
    app::App,
    config::Config,
    events::EventHandler,
    logging,
    map::MapStyle,
    services::Services,
    store::{LocalStore, MemoryStore, SqliteStore},
    ui,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Instrumentation and safety
    let _log_guard = logging::initialize_logging();
    color_eyre::install()?;
    install_panic_hook();

    let config = Config::load();
    let style = MapStyle::parse(&config.ui.default_map_style).unwrap_or_else(|| {
        warn!("Unknown map style '{}', using street", config.ui.default_map_style);
        MapStyle::Street
    });

    // Ready state, services and terminal
    let mut app = App::new(open_store(&config), style);
    let mut event_handler = EventHandler::new(config.ui.tick_rate_ms);
    let services = Services::from_config(&config, event_handler.tx.clone())?;
    let mut terminal = setup_terminal()?;

    for command in app.start() {
        services.dispatch(command);
    }

    // Main loop
    while !app.should_quit {
        terminal.draw(|f| ui::render(f, &app))?;

        match event_handler.next().await {
            Some(event) => {
                for command in app.update(event) {
                    services.dispatch(command);
                }
            }
            None => break,
        }
    }

    info!("Shutting down.");
    restore_terminal(terminal)?;
    Ok(())
}

/// Losing local persistence only costs the offline fallback, so keep going.
fn open_store(config: &Config) -> Box<dyn LocalStore> {
    match SqliteStore::open(&config.storage.path) {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!("Could not open {}: {}. Using in-memory storage.", config.storage.path, e);
            Box::new(MemoryStore::default())
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen, crossterm::cursor::Hide)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show)?;
    Ok(())
}

fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Force terminal cleanup!
        crossterm::terminal::disable_raw_mode().ok();
        crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show).ok();
        original_hook(panic_info);
    }));
}
