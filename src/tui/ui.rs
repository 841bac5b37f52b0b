// UI rendering logic
//
// All rendering for the TUI lives here. In ratatui you define the layout and
// widgets in a render function that gets called on every frame.

use super::app::{App, View};
use super::markdown;
use crate::api::types::{Contact, Deal, Insight, Lead};
use crate::assistant::types::Role;
use crate::cache::CollectionKey;
use crate::logging::LogLevel;
use crate::util::{fit_to_width, short_time};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table},
    Frame,
};

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Main UI render function - called on every frame
pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar with view tabs
            Constraint::Min(10),   // Main content
            Constraint::Length(4), // System logs
            Constraint::Length(3), // Status bar
        ])
        .split(f.area());

    render_title(f, chunks[0], app);

    match app.view {
        View::Assistant => render_assistant_view(f, chunks[1], app),
        View::Leads => render_collection_view(f, chunks[1], app, CollectionKey::Leads),
        View::Contacts => render_collection_view(f, chunks[1], app, CollectionKey::Contacts),
        View::Deals => render_collection_view(f, chunks[1], app, CollectionKey::Deals),
        View::Notifications => render_notifications_view(f, chunks[1], app),
    }

    render_logs_panel(f, chunks[2], app);
    render_status(f, chunks[3], app);
}

// ─────────────────────────────────────────────────────────────────────────────
// Title bar
// ─────────────────────────────────────────────────────────────────────────────

fn render_title(f: &mut Frame, area: Rect, app: &App) {
    let tabs = [
        (View::Assistant, "F1"),
        (View::Leads, "F2"),
        (View::Contacts, "F3"),
        (View::Deals, "F4"),
        (View::Notifications, "F5"),
    ];

    let mut spans = vec![Span::styled(
        " corral ",
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    )];

    for (view, key) in tabs {
        let mut label = format!(" {} {} ", key, view.name());
        if view == View::Notifications {
            let unread = app.notifications.unread_count();
            if unread > 0 {
                label = format!(" {} {} ({}) ", key, view.name(), unread);
            }
        }

        let style = if app.view == view {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" "));
    }

    let title = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::DarkGray)));
    f.render_widget(title, area);
}

// ─────────────────────────────────────────────────────────────────────────────
// Assistant view
// ─────────────────────────────────────────────────────────────────────────────

fn render_assistant_view(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Insights strip
            Constraint::Min(5),    // Transcript (or suggestion panel)
            Constraint::Length(3), // Input bar
        ])
        .split(area);

    render_insights_strip(f, chunks[0], app);
    if app.controller.transcript().is_empty() {
        render_suggestion_panel(f, chunks[1], app);
    } else {
        render_transcript(f, chunks[1], app);
    }
    render_input_bar(f, chunks[2], app);
}

/// One-line dashboard over the chat: "open deals: 12  │  new leads: 4"
fn render_insights_strip(f: &mut Frame, area: Rect, app: &App) {
    let text = match app.cache.get(CollectionKey::Insights) {
        Some(value) => {
            let insights = decode_rows::<Insight>(&value);
            if insights.is_empty() {
                "No insights.".to_string()
            } else {
                insights
                    .iter()
                    .map(insight_cell)
                    .collect::<Vec<_>>()
                    .join("  │  ")
            }
        }
        None => "Loading...".to_string(),
    };

    let width = area.width.saturating_sub(2) as usize;
    let strip = Paragraph::new(Span::styled(
        fit_to_width(&text, width),
        Style::default().fg(Color::Gray),
    ))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Insights ")
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(strip, area);
}

/// Render one insight as "label: value"; string values come through
/// unquoted, everything else as compact JSON
fn insight_cell(insight: &Insight) -> String {
    let value = match &insight.value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    format!("{}: {}", insight.label, value)
}

/// The empty-transcript panel: greeting plus up to N suggested prompts
fn render_suggestion_panel(f: &mut Frame, area: Rect, app: &App) {
    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(
            "Ask the assistant about your leads, contacts, and deals.",
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
    ];

    let suggestions = app.controller.visible_suggestions();
    let shown = suggestions.iter().take(app.suggestion_limit);
    for (i, suggestion) in shown.enumerate() {
        let selected = i == app.suggestion_selected;
        let (marker, style) = if selected {
            (
                "▶ ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            ("  ", Style::default().fg(Color::Gray))
        };
        lines.push(Line::from(vec![
            Span::styled(marker, Style::default().fg(Color::Cyan)),
            Span::styled(suggestion.text.clone(), style),
        ]));
    }

    if !suggestions.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Enter inserts the highlighted prompt into the input. It is not sent until you press Enter again.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Assistant ")
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(panel, area);
}

fn render_transcript(f: &mut Frame, area: Rect, app: &App) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = Vec::new();

    for message in app.controller.transcript() {
        let (label, color) = match message.role {
            Role::User => ("You", Color::Cyan),
            Role::Assistant => ("Assistant", Color::Magenta),
        };
        lines.push(Line::from(vec![
            Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", short_time(&message.timestamp)),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

        match message.role {
            // Assistant replies are markdown; user messages are plain text
            Role::Assistant => {
                lines.extend(markdown::render_markdown(&message.content, inner_width));
            }
            Role::User => {
                for line in message.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
                lines.push(Line::from(""));
            }
        }

        if !message.actions_performed.is_empty() {
            let names: Vec<&str> = message
                .actions_performed
                .iter()
                .map(|a| a.name.as_str())
                .collect();
            lines.push(Line::from(Span::styled(
                format!("⚙ actions: {}", names.join(", ")),
                Style::default().fg(Color::Yellow),
            )));
            lines.push(Line::from(""));
        }
    }

    if app.controller.is_pending() {
        let frame = SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()];
        lines.push(Line::from(Span::styled(
            format!("{} thinking...", frame),
            Style::default().fg(Color::Yellow),
        )));
    }

    // Show the last lines that fit, offset upward by chat_scroll
    let visible_height = area.height.saturating_sub(2) as usize;
    let total = lines.len();
    let max_scroll = total.saturating_sub(visible_height);
    let scroll = app.chat_scroll.min(max_scroll);
    let start = total.saturating_sub(visible_height + scroll);
    let end = total.saturating_sub(scroll);
    let visible: Vec<Line> = lines[start..end].to_vec();

    let transcript = Paragraph::new(visible).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Assistant ")
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(transcript, area);
}

fn render_input_bar(f: &mut Frame, area: Rect, app: &App) {
    let pending = app.controller.is_pending();

    let (text, style) = if pending {
        (
            format!("{} (waiting for reply)", app.controller.draft()),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (
            format!("{}█", app.controller.draft()),
            Style::default().fg(Color::White),
        )
    };

    let border_color = if pending { Color::DarkGray } else { Color::Cyan };
    let input = Paragraph::new(Span::styled(text, style)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Message (Enter to send) ")
            .border_style(Style::default().fg(border_color)),
    );
    f.render_widget(input, area);
}

// ─────────────────────────────────────────────────────────────────────────────
// Collection views
// ─────────────────────────────────────────────────────────────────────────────

fn render_collection_view(f: &mut Frame, area: Rect, app: &App, key: CollectionKey) {
    let Some(value) = app.cache.get(key) else {
        render_placeholder(f, area, key, "Loading...");
        return;
    };

    let selected = app.table_selected.get(&key).copied().unwrap_or(0);
    let (header, rows) = match key {
        CollectionKey::Leads => lead_rows(&value, area.width),
        CollectionKey::Contacts => contact_rows(&value, area.width),
        CollectionKey::Deals => deal_rows(&value, area.width),
        // Insights render as the assistant dashboard strip, not a table
        CollectionKey::Insights => return,
    };

    if rows.is_empty() {
        render_placeholder(f, area, key, "No records.");
        return;
    }

    let widths = match key {
        CollectionKey::Deals => vec![
            Constraint::Percentage(40),
            Constraint::Percentage(15),
            Constraint::Percentage(20),
            Constraint::Percentage(25),
        ],
        _ => vec![
            Constraint::Percentage(30),
            Constraint::Percentage(30),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
        ],
    };

    let styled_rows: Vec<Row> = rows
        .into_iter()
        .enumerate()
        .map(|(i, cells)| {
            let style = if i == selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Row::new(cells.into_iter().map(Cell::from).collect::<Vec<_>>()).style(style)
        })
        .collect();

    let title = match app.cache.fetched_at(key) {
        Some(ts) => format!(" {} (as of {}) ", key, short_time(&ts)),
        None => format!(" {} ", key),
    };

    let table = Table::new(styled_rows, widths)
        .header(
            Row::new(header)
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    f.render_widget(table, area);
}

fn render_placeholder(f: &mut Frame, area: Rect, key: CollectionKey, message: &str) {
    let panel = Paragraph::new(Span::styled(
        message.to_string(),
        Style::default().fg(Color::DarkGray),
    ))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", key))
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(panel, area);
}

fn opt(s: &Option<String>) -> String {
    s.clone().unwrap_or_else(|| "-".to_string())
}

fn lead_rows(value: &serde_json::Value, width: u16) -> (Vec<&'static str>, Vec<Vec<String>>) {
    let col = (width as usize / 4).saturating_sub(2);
    let rows = decode_rows::<Lead>(value)
        .into_iter()
        .map(|lead| {
            vec![
                fit_to_width(&lead.name, col),
                fit_to_width(&opt(&lead.company), col),
                fit_to_width(&opt(&lead.email), col),
                fit_to_width(&opt(&lead.status), col),
            ]
        })
        .collect();
    (vec!["Name", "Company", "Email", "Status"], rows)
}

fn contact_rows(value: &serde_json::Value, width: u16) -> (Vec<&'static str>, Vec<Vec<String>>) {
    let col = (width as usize / 4).saturating_sub(2);
    let rows = decode_rows::<Contact>(value)
        .into_iter()
        .map(|contact| {
            vec![
                fit_to_width(&contact.name, col),
                fit_to_width(&opt(&contact.email), col),
                fit_to_width(&opt(&contact.phone), col),
                fit_to_width(&opt(&contact.company), col),
            ]
        })
        .collect();
    (vec!["Name", "Email", "Phone", "Company"], rows)
}

fn deal_rows(value: &serde_json::Value, width: u16) -> (Vec<&'static str>, Vec<Vec<String>>) {
    let col = (width as usize / 4).saturating_sub(2);
    let rows = decode_rows::<Deal>(value)
        .into_iter()
        .map(|deal| {
            let value_str = deal
                .value
                .map(|v| format!("${:.0}", v))
                .unwrap_or_else(|| "-".to_string());
            vec![
                fit_to_width(&deal.title, col),
                value_str,
                fit_to_width(&opt(&deal.stage), col),
                fit_to_width(&opt(&deal.contact_name), col),
            ]
        })
        .collect();
    (vec!["Title", "Value", "Stage", "Contact"], rows)
}

/// Decode a cached collection payload into typed rows, skipping rows that
/// fail to decode rather than blanking the whole table
fn decode_rows<T: serde::de::DeserializeOwned>(value: &serde_json::Value) -> Vec<T> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Notifications view
// ─────────────────────────────────────────────────────────────────────────────

fn render_notifications_view(f: &mut Frame, area: Rect, app: &App) {
    let entries = app.notifications.all();

    if entries.is_empty() {
        let panel = Paragraph::new(Span::styled(
            "No notifications.",
            Style::default().fg(Color::DarkGray),
        ))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Notifications ")
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(panel, area);
        return;
    }

    let items: Vec<ListItem> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let kind_color = match entry.kind.as_str() {
                "success" => Color::Green,
                "warning" => Color::Yellow,
                "error" => Color::Red,
                _ => Color::Blue,
            };
            let marker = if entry.read { "  " } else { "● " };

            let mut style = Style::default().fg(Color::White);
            if i == app.notification_selected {
                style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
            }
            if entry.read {
                style = style.add_modifier(Modifier::DIM);
            }

            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(kind_color)),
                Span::styled(format!("[{}] ", short_time(&entry.timestamp)), Style::default().fg(Color::DarkGray)),
                Span::styled(format!("{}: ", entry.title), Style::default().fg(kind_color)),
                Span::raw(entry.message.clone()),
            ]))
            .style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Notifications (Enter marks read, a marks all read) ")
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(list, area);
}

// ─────────────────────────────────────────────────────────────────────────────
// System logs
// ─────────────────────────────────────────────────────────────────────────────

/// A small tail of the in-memory log buffer, most recent last
fn render_logs_panel(f: &mut Frame, area: Rect, app: &App) {
    let visible = area.height.saturating_sub(2) as usize;
    let width = area.width.saturating_sub(4) as usize;
    let entries = app.log_buffer.get_all();

    let lines: Vec<Line> = entries
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|entry| {
            let level_color = match entry.level {
                LogLevel::Error => Color::Red,
                LogLevel::Warn => Color::Yellow,
                LogLevel::Info => Color::Green,
                LogLevel::Debug | LogLevel::Trace => Color::DarkGray,
            };
            Line::from(vec![
                Span::styled(
                    format!("{} ", short_time(&entry.timestamp)),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{:5} ", entry.level.as_str()),
                    Style::default().fg(level_color),
                ),
                Span::raw(fit_to_width(&entry.message, width)),
            ])
        })
        .collect();

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Logs ")
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(panel, area);
}

// ─────────────────────────────────────────────────────────────────────────────
// Status bar
// ─────────────────────────────────────────────────────────────────────────────

fn render_status(f: &mut Frame, area: Rect, app: &App) {
    let mut spans: Vec<Span> = Vec::new();

    match app.session.user() {
        Some(user) => {
            spans.push(Span::styled(
                format!(" {} ", user.email),
                Style::default().fg(Color::Green),
            ));
        }
        None => {
            spans.push(Span::styled(
                " not signed in ",
                Style::default().fg(Color::Red),
            ));
        }
    }

    if app.session_expired {
        spans.push(Span::styled(
            " SESSION EXPIRED - run `corral login` ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
        ));
    }

    if let Some(toast) = app.toast() {
        spans.push(Span::styled(
            format!(" {} ", toast),
            Style::default().fg(Color::Yellow),
        ));
    }

    let hints = if app.view.collection().is_some() {
        " r: refresh  d: delete  y: copy  Tab: next view  Ctrl+Q: quit "
    } else if app.view == View::Assistant {
        " Enter: send  Ctrl+Y: copy reply  Tab: next view  Ctrl+Q: quit "
    } else {
        " Tab: next view  F1-F5: views  Esc: assistant  Ctrl+Q: quit "
    };
    spans.push(Span::styled(hints, Style::default().fg(Color::DarkGray)));

    let status = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insight_cell_formats_scalars() {
        let count = Insight {
            label: "open deals".to_string(),
            value: json!(12),
        };
        assert_eq!(insight_cell(&count), "open deals: 12");

        let text = Insight {
            label: "top stage".to_string(),
            value: json!("negotiation"),
        };
        assert_eq!(insight_cell(&text), "top stage: negotiation");
    }

    #[test]
    fn test_decode_rows_skips_bad_entries() {
        let payload = json!([
            { "label": "open deals", "value": 12 },
            { "not_an_insight": true },
            { "label": "new leads", "value": 4 }
        ]);
        let rows = decode_rows::<Insight>(&payload);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "open deals");
        assert_eq!(rows[1].label, "new leads");
    }
}
