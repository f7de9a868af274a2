//! Belvo TUI Application
//!
//! A terminal user interface for browsing accounts, links, owners and
//! transactions.  Connection settings come from `BELVO_*` environment
//! variables or a `.env` file; logs go to `belvo-tui.log`.

use std::fs::File;
use std::sync::Mutex;
use std::time::Duration;

use crossterm::event;
use tracing_subscriber::EnvFilter;

use belvo_client::tui::{
    handle_event, process_state, render, restore_terminal, setup_terminal, AppState,
};
use belvo_client::Settings;

const LOG_FILE: &str = "belvo-tui.log";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs must not be written to the terminal the UI draws on.
    let log_file = File::create(LOG_FILE)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("belvo_client=info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();

    let mut state = AppState::new(Settings::from_env());

    let mut terminal = setup_terminal()?;

    loop {
        terminal.draw(|f| render(f, &state))?;

        // Process any state transitions (e.g., loading -> loaded)
        process_state(&mut state);

        if state.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(100))? {
            let event = event::read()?;
            handle_event(event, &mut state);
        }
    }

    restore_terminal(&mut terminal)?;

    Ok(())
}
