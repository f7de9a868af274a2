use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};
use serde_json::Value;

use super::state::{AppScreen, AppState};
use crate::{Account, Link, Owner, ResourceKind, Transaction};

/// Main render function that dispatches to the appropriate screen renderer.
pub fn render(f: &mut Frame, state: &AppState) {
    match state.screen {
        AppScreen::Connect => render_connect(f, state),
        AppScreen::Connecting => render_loading(f, state, "Logging in"),
        AppScreen::ResourceSelection => render_resource_selection(f, state),
        AppScreen::LoadingItems => render_loading(f, state, "Loading items"),
        AppScreen::ItemTable => render_item_table(f, state),
        AppScreen::LoadingDetails => render_loading(f, state, "Loading details"),
        AppScreen::Details => render_details(f, state),
    }
}

fn title_paragraph(text: String) -> Paragraph<'static> {
    Paragraph::new(text)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
}

fn help_paragraph(text: &'static str) -> Paragraph<'static> {
    Paragraph::new(text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
}

fn selected_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

/// Render the connect screen.
fn render_connect(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(f.area());

    f.render_widget(title_paragraph("Belvo Browser".into()), chunks[0]);

    let lines = match &state.settings {
        Some(s) => format!(
            "Environment: {:?}\nURL:         {}\nKey id:      {}\nTimeout:     {}s",
            s.environment,
            s.url,
            s.secret_id,
            s.timeout.as_secs()
        ),
        None => "No settings loaded.\nSet BELVO_SECRET_ID and BELVO_SECRET_PASSWORD.".into(),
    };
    let settings = Paragraph::new(lines).block(
        Block::default()
            .title(" Settings ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );
    f.render_widget(settings, chunks[1]);

    f.render_widget(help_paragraph("Press Enter to connect | Esc to quit"), chunks[2]);

    render_status_bar(f, chunks[4], state);
}

/// Render the loading screen.
fn render_loading(f: &mut Frame, state: &AppState, message: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(f.area());

    f.render_widget(title_paragraph("Belvo Browser".into()), chunks[0]);

    let loading = Paragraph::new(format!("{message}..."))
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(loading, chunks[1]);

    render_status_bar(f, chunks[3], state);
}

/// Render the resource selection screen.
fn render_resource_selection(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(2),
            Constraint::Length(2),
        ])
        .split(f.area());

    f.render_widget(title_paragraph("Select Resource".into()), chunks[0]);

    let rows: Vec<Row> = ResourceKind::ALL
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            let style = if i == state.selected_kind_index {
                selected_style()
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(kind.name()),
                Cell::from(kind.endpoint()),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(16), Constraint::Min(20)])
        .header(
            Row::new(vec!["Resource", "Endpoint"])
                .style(Style::default().add_modifier(Modifier::BOLD))
                .bottom_margin(1),
        )
        .block(Block::default().borders(Borders::ALL).title(" Resources "));
    f.render_widget(table, chunks[1]);

    f.render_widget(help_paragraph("Enter: Select | Esc: Back | q: Quit"), chunks[2]);

    render_status_bar(f, chunks[3], state);
}

/// Render the item table screen.
fn render_item_table(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(2),
            Constraint::Length(2),
        ])
        .split(f.area());

    let total = match state.total_count {
        Some(count) => count.to_string(),
        None => "?".into(),
    };
    let link = match &state.link_filter {
        Some(id) => format!(" | Link: {id}"),
        None => String::new(),
    };
    let more = if state.has_more() { " (more)" } else { "" };
    f.render_widget(
        title_paragraph(format!(
            "{} - {}/{}{}{}",
            state.listed_kind,
            state.items.len(),
            total,
            more,
            link
        )),
        chunks[0],
    );

    let visible_row_limit = chunks[1].height.saturating_sub(4).max(1) as usize;
    let visible_start = state
        .selected_row
        .saturating_sub(visible_row_limit.saturating_sub(1));

    let rows: Vec<Row> = state
        .items
        .iter()
        .enumerate()
        .skip(visible_start)
        .take(visible_row_limit)
        .map(|(i, item)| {
            let style = if i == state.selected_row {
                selected_style()
            } else {
                Style::default()
            };
            Row::new(
                summary_row(state.listed_kind, item)
                    .into_iter()
                    .map(Cell::from)
                    .collect::<Vec<_>>(),
            )
            .style(style)
        })
        .collect();

    let widths: Vec<Constraint> = column_widths(state.listed_kind).to_vec();
    let table = Table::new(rows, widths)
        .header(
            Row::new(column_headers(state.listed_kind).to_vec())
                .style(Style::default().add_modifier(Modifier::BOLD))
                .bottom_margin(1),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", state.listed_kind)),
        );
    f.render_widget(table, chunks[1]);

    let help = if state.listed_kind == ResourceKind::Links {
        "Enter: Details | m: More | t: Transactions | Esc: Back | q: Quit"
    } else {
        "Enter: Details | m: More | Esc: Back | q: Quit"
    };
    f.render_widget(help_paragraph(help), chunks[2]);

    render_status_bar(f, chunks[3], state);
}

/// Render the raw JSON of the selected item.
fn render_details(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(2),
            Constraint::Length(2),
        ])
        .split(f.area());

    let id = state.selected_id().unwrap_or("N/A");
    f.render_widget(
        title_paragraph(format!("{} - {}", state.listed_kind, id)),
        chunks[0],
    );

    let body = state
        .detail
        .as_ref()
        .and_then(|d| serde_json::to_string_pretty(d).ok())
        .unwrap_or_default();
    let details = Paragraph::new(body)
        .wrap(Wrap { trim: false })
        .scroll((state.detail_scroll, 0))
        .block(Block::default().borders(Borders::ALL).title(" Details "));
    f.render_widget(details, chunks[1]);

    f.render_widget(help_paragraph("Up/Down: Scroll | Esc: Back | q: Quit"), chunks[2]);

    render_status_bar(f, chunks[3], state);
}

/// Render the status bar at the bottom.
fn render_status_bar(f: &mut Frame, area: Rect, state: &AppState) {
    let status_text = if let Some(ref error) = state.error_message {
        format!(" Error: {error}")
    } else if let Some(client) = &state.client {
        format!(" Connected to: {}", client.session().base_url())
    } else {
        " Not connected".to_string()
    };

    let style = if state.error_message.is_some() {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Green)
    };

    let status = Paragraph::new(status_text)
        .style(style)
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::TOP));
    f.render_widget(status, area);
}

// ============================================================================
// Table columns
// ============================================================================

fn column_headers(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::Accounts => &["Id", "Name", "Type", "Currency", "Balance"],
        ResourceKind::Links => &["Id", "Institution", "Access", "Status", "Created"],
        ResourceKind::Owners => &["Id", "Name", "Email", "Phone"],
        ResourceKind::Transactions => &["Id", "Date", "Amount", "Type", "Description"],
    }
}

fn column_widths(kind: ResourceKind) -> &'static [Constraint] {
    match kind {
        ResourceKind::Accounts => &[
            Constraint::Length(38),
            Constraint::Min(20),
            Constraint::Length(12),
            Constraint::Length(9),
            Constraint::Length(14),
        ],
        ResourceKind::Links => &[
            Constraint::Length(38),
            Constraint::Min(20),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
        ResourceKind::Owners => &[
            Constraint::Length(38),
            Constraint::Min(20),
            Constraint::Length(28),
            Constraint::Length(16),
        ],
        ResourceKind::Transactions => &[
            Constraint::Length(38),
            Constraint::Length(12),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Min(20),
        ],
    }
}

/// Table cells for one item.  Items that do not match the model fall back
/// to their id.
pub(crate) fn summary_row(kind: ResourceKind, item: &Value) -> Vec<String> {
    let text = |v: Option<String>| v.unwrap_or_else(|| "N/A".into());
    let cells = match kind {
        ResourceKind::Accounts => serde_json::from_value::<Account>(item.clone())
            .ok()
            .map(|a| {
                let balance = a
                    .balance
                    .and_then(|b| b.current)
                    .map(format_amount)
                    .unwrap_or_else(|| "N/A".into());
                vec![
                    a.id,
                    text(a.name),
                    text(a.account_type),
                    text(a.currency),
                    balance,
                ]
            }),
        ResourceKind::Links => serde_json::from_value::<Link>(item.clone()).ok().map(|l| {
            vec![
                l.id,
                text(l.institution),
                text(l.access_mode),
                text(l.status),
                text(l.created_at.map(|d| d.chars().take(10).collect())),
            ]
        }),
        ResourceKind::Owners => serde_json::from_value::<Owner>(item.clone()).ok().map(|o| {
            vec![
                o.id,
                text(o.display_name),
                text(o.email),
                text(o.phone_number),
            ]
        }),
        ResourceKind::Transactions => serde_json::from_value::<Transaction>(item.clone())
            .ok()
            .map(|t| {
                vec![
                    t.id,
                    text(t.value_date),
                    t.amount.map(format_amount).unwrap_or_else(|| "N/A".into()),
                    text(t.transaction_type),
                    text(t.description.map(|d| truncate(&d, 40))),
                ]
            }),
    };

    cells.unwrap_or_else(|| {
        vec![item
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("N/A")
            .to_string()]
    })
}

/// Format an amount with two decimals and thousand separators.
pub(crate) fn format_amount(amount: f64) -> String {
    let raw = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = raw.split_once('.').unwrap_or((raw.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.insert(0, ',');
        }
        grouped.insert(0, c);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}
