use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::state::{AppScreen, AppState};
use crate::ResourceKind;

/// Handle keyboard input for the connect screen.
fn handle_connect(event: KeyEvent, state: &mut AppState) {
    match event.code {
        KeyCode::Enter => {
            if state.settings.is_some() {
                state.clear_error();
                state.screen = AppScreen::Connecting;
            }
        }
        KeyCode::Esc => {
            state.should_quit = true;
        }
        _ => {}
    }
}

/// Handle keyboard input for the resource selection screen.
fn handle_resource_selection(event: KeyEvent, state: &mut AppState) {
    match event.code {
        KeyCode::Up => {
            if state.selected_kind_index > 0 {
                state.selected_kind_index -= 1;
            }
        }
        KeyCode::Down => {
            if state.selected_kind_index < ResourceKind::ALL.len() - 1 {
                state.selected_kind_index += 1;
            }
        }
        KeyCode::Enter => {
            let kind = state.selected_kind();
            if kind == ResourceKind::Transactions {
                state.set_error("Open a link and press 't' to list its transactions".into());
                return;
            }
            state.clear_error();
            if let Err(e) = state.start_listing(kind, None) {
                state.set_error(e);
            }
        }
        KeyCode::Esc => {
            state.screen = AppScreen::Connect;
        }
        _ => {}
    }
}

/// Handle keyboard input for the item table screen.
fn handle_item_table(event: KeyEvent, state: &mut AppState) {
    match event.code {
        KeyCode::Up => {
            if state.selected_row > 0 {
                state.selected_row -= 1;
            }
        }
        KeyCode::Down => {
            if state.selected_row < state.items.len().saturating_sub(1) {
                state.selected_row += 1;
            }
        }
        KeyCode::Char('m') => {
            if state.has_more() {
                state.screen = AppScreen::LoadingItems;
            }
        }
        KeyCode::Char('t') => {
            if state.listed_kind != ResourceKind::Links {
                return;
            }
            if let Some(link) = state.selected_id().map(str::to_string) {
                state.clear_error();
                if let Err(e) = state.start_listing(ResourceKind::Transactions, Some(link)) {
                    state.set_error(e);
                }
            }
        }
        KeyCode::Enter => {
            if state.selected_id().is_some() {
                state.clear_error();
                state.screen = AppScreen::LoadingDetails;
            }
        }
        KeyCode::Esc => {
            state.listing = None;
            state.screen = AppScreen::ResourceSelection;
            state.clear_error();
        }
        _ => {}
    }
}

/// Handle keyboard input for the details screen.
fn handle_details(event: KeyEvent, state: &mut AppState) {
    match event.code {
        KeyCode::Up => {
            state.detail_scroll = state.detail_scroll.saturating_sub(1);
        }
        KeyCode::Down => {
            state.detail_scroll = state.detail_scroll.saturating_add(1);
        }
        KeyCode::PageUp => {
            state.detail_scroll = state.detail_scroll.saturating_sub(10);
        }
        KeyCode::PageDown => {
            state.detail_scroll = state.detail_scroll.saturating_add(10);
        }
        KeyCode::Esc => {
            state.detail = None;
            state.screen = AppScreen::ItemTable;
        }
        _ => {}
    }
}

/// Main event handler that dispatches to the appropriate screen handler.
pub fn handle_event(event: Event, state: &mut AppState) {
    if let Event::Key(key_event) = event {
        if key_event.kind != KeyEventKind::Press {
            return;
        }

        if key_event.code == KeyCode::Char('q') && key_event.modifiers == KeyModifiers::NONE {
            state.should_quit = true;
            return;
        }

        match state.screen {
            AppScreen::Connect => handle_connect(key_event, state),
            AppScreen::ResourceSelection => handle_resource_selection(key_event, state),
            AppScreen::ItemTable => handle_item_table(key_event, state),
            AppScreen::Details => handle_details(key_event, state),
            _ => {} // Loading screens don't handle input
        }
    }
}

/// Perform the blocking work of loading screens.
pub fn process_state(state: &mut AppState) {
    match state.screen {
        AppScreen::Connecting => match state.connect() {
            Ok(()) => {
                state.screen = AppScreen::ResourceSelection;
                state.selected_kind_index = 0;
            }
            Err(e) => {
                state.set_error(e);
                state.screen = AppScreen::Connect;
            }
        },
        AppScreen::LoadingItems => {
            let result = state.load_more();
            if let Err(e) = result {
                state.set_error(e);
                if state.items.is_empty() {
                    state.screen = AppScreen::ResourceSelection;
                    return;
                }
            }
            state.screen = AppScreen::ItemTable;
        }
        AppScreen::LoadingDetails => match state.fetch_details() {
            Ok(()) => {
                state.screen = AppScreen::Details;
            }
            Err(e) => {
                state.set_error(e);
                state.screen = AppScreen::ItemTable;
            }
        },
        _ => {}
    }
}
