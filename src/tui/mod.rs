//! Terminal browser for the Belvo API, used by the `belvo-tui` binary.

pub mod events;
pub mod state;
pub mod terminal;
pub mod ui;

pub use events::{handle_event, process_state};
pub use state::AppState;
pub use terminal::{restore_terminal, setup_terminal};
pub use ui::render;
