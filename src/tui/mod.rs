// TUI module - Terminal User Interface
//
// This module manages the terminal UI using ratatui. It handles:
// - Terminal initialization and cleanup
// - Event loop (keyboard input, timer ticks, background task completions)
// - Rendering the UI
// - Reacting to cache invalidations

pub mod app;
pub mod clipboard;
pub mod input;
pub mod markdown;
pub mod ui;

use crate::events::AppEvent;
use anyhow::{Context, Result};
use app::{App, View};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;

/// Run the TUI
///
/// Sets up the terminal, runs the event loop, and restores the terminal when
/// done, including on error.
pub async fn run_tui(mut app: App, mut event_rx: mpsc::Receiver<AppEvent>) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to setup terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    // Schedule the initial view's data before the first frame
    app.ensure_view_data();

    let result = run_event_loop(&mut terminal, &mut app, &mut event_rx).await;

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("Failed to restore terminal")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

/// Main event loop
///
/// Waits on four sources at once via tokio::select!:
/// 1. Keyboard input
/// 2. Timer ticks (periodic redraw, spinner animation)
/// 3. Background task completions on the AppEvent channel
/// 4. Cache invalidations broadcast by the query cache
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    event_rx: &mut mpsc::Receiver<AppEvent>,
) -> Result<()> {
    let mut tick_interval = tokio::time::interval(Duration::from_millis(200));
    let mut invalidations = app.cache.subscribe();

    loop {
        terminal
            .draw(|f| ui::draw(f, app))
            .context("Failed to draw terminal")?;

        tokio::select! {
            // Keyboard input
            _ = async {
                if event::poll(Duration::from_millis(10)).unwrap_or(false) {
                    if let Ok(Event::Key(key_event)) = event::read() {
                        handle_key_event(app, key_event);
                    }
                }
            } => {}

            // Periodic tick for redrawing and spinner animation
            _ = tick_interval.tick() => {
                app.tick_animation();
            }

            // Completions from spawned network tasks
            Some(app_event) = event_rx.recv() => {
                app.handle_app_event(app_event);
            }

            // Invalidated collections; refetch if the active view shows one.
            // A lagged receiver just means missed keys, which entry-time
            // staleness checks cover.
            result = invalidations.recv() => {
                if let Ok(key) = result {
                    app.on_invalidated(key);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Handle keyboard input
/// Layered dispatch: Global -> View-specific
fn handle_key_event(app: &mut App, key_event: KeyEvent) {
    match key_event.kind {
        KeyEventKind::Press => {}
        KeyEventKind::Release => {
            app.handle_key_release(key_event.code);
            return;
        }
        _ => return,
    }

    if handle_global_keys(app, &key_event) {
        return;
    }

    match app.view {
        View::Assistant => handle_assistant_keys(app, &key_event),
        View::Leads | View::Contacts | View::Deals => handle_collection_keys(app, &key_event),
        View::Notifications => handle_notification_keys(app, &key_event),
    }
}

/// Global keys work the same regardless of the active view.
/// Returns true if handled.
fn handle_global_keys(app: &mut App, key_event: &KeyEvent) -> bool {
    let key = key_event.code;

    // Ctrl+Q / Ctrl+C always quit; plain 'q' would collide with chat input
    if key_event.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key, KeyCode::Char('q') | KeyCode::Char('c'))
    {
        app.should_quit = true;
        return true;
    }

    match key {
        KeyCode::F(1) => {
            if app.handle_key_press(key) {
                app.set_view(View::Assistant);
            }
            true
        }
        KeyCode::F(2) => {
            if app.handle_key_press(key) {
                app.set_view(View::Leads);
            }
            true
        }
        KeyCode::F(3) => {
            if app.handle_key_press(key) {
                app.set_view(View::Contacts);
            }
            true
        }
        KeyCode::F(4) => {
            if app.handle_key_press(key) {
                app.set_view(View::Deals);
            }
            true
        }
        KeyCode::F(5) => {
            if app.handle_key_press(key) {
                app.set_view(View::Notifications);
            }
            true
        }
        KeyCode::Tab => {
            if app.handle_key_press(key) {
                app.set_view(app.view.next());
            }
            true
        }
        KeyCode::BackTab => {
            if app.handle_key_press(key) {
                app.set_view(app.view.prev());
            }
            true
        }
        _ => false,
    }
}

/// Keys in the assistant view. Printable characters feed the draft input.
fn handle_assistant_keys(app: &mut App, key_event: &KeyEvent) {
    match key_event.code {
        KeyCode::Enter => {
            if !app.handle_key_press(KeyCode::Enter) {
                return;
            }
            // On the empty panel with an empty draft, Enter picks the
            // highlighted suggestion; a second Enter sends it
            if app.controller.transcript().is_empty()
                && app.controller.draft().is_empty()
                && !app.controller.visible_suggestions().is_empty()
            {
                app.apply_selected_suggestion();
            } else {
                app.submit_draft();
            }
        }
        KeyCode::Esc => {
            if app.handle_key_press(KeyCode::Esc) {
                app.controller.clear_draft();
            }
        }
        KeyCode::Backspace => {
            app.controller.backspace_draft();
        }
        KeyCode::Up => {
            if app.handle_key_press(KeyCode::Up) {
                app.move_selection(-1);
            }
        }
        KeyCode::Down => {
            if app.handle_key_press(KeyCode::Down) {
                app.move_selection(1);
            }
        }
        KeyCode::PageUp => {
            if app.handle_key_press(KeyCode::PageUp) {
                for _ in 0..10 {
                    app.move_selection(-1);
                }
            }
        }
        KeyCode::PageDown => {
            if app.handle_key_press(KeyCode::PageDown) {
                for _ in 0..10 {
                    app.move_selection(1);
                }
            }
        }
        KeyCode::Char('y') if key_event.modifiers.contains(KeyModifiers::CONTROL) => {
            // Export the newest assistant reply
            if let Some(reply) = app.controller.latest_reply().map(str::to_string) {
                match clipboard::copy_to_clipboard(&reply) {
                    Ok(()) => app.show_toast("Reply copied to clipboard"),
                    Err(_) => app.show_toast("Failed to copy"),
                }
            }
        }
        KeyCode::Char(c) if !key_event.modifiers.contains(KeyModifiers::CONTROL) => {
            app.controller.push_draft_char(c);
        }
        _ => {}
    }
}

/// Keys in the Leads/Contacts/Deals table views
fn handle_collection_keys(app: &mut App, key_event: &KeyEvent) {
    match key_event.code {
        KeyCode::Up => {
            if app.handle_key_press(KeyCode::Up) {
                app.move_selection(-1);
            }
        }
        KeyCode::Down => {
            if app.handle_key_press(KeyCode::Down) {
                app.move_selection(1);
            }
        }
        KeyCode::Char('r') => {
            // Force a refetch of the visible collection
            if let Some(key) = app.view.collection() {
                app.cache.invalidate(key);
                app.show_toast(format!("Refreshing {}", key));
            }
        }
        KeyCode::Char('d') => {
            app.delete_selected();
        }
        KeyCode::Char('y') => {
            // Copy the raw cached payload for the visible collection
            if let Some(key) = app.view.collection() {
                if let Some(value) = app.cache.get(key) {
                    if let Ok(json) = serde_json::to_string_pretty(&value) {
                        match clipboard::copy_to_clipboard(&json) {
                            Ok(()) => app.show_toast("Copied to clipboard"),
                            Err(_) => app.show_toast("Failed to copy"),
                        }
                    }
                }
            }
        }
        KeyCode::Esc => {
            if app.handle_key_press(KeyCode::Esc) {
                app.set_view(View::Assistant);
            }
        }
        _ => {}
    }
}

/// Keys in the notifications view
fn handle_notification_keys(app: &mut App, key_event: &KeyEvent) {
    match key_event.code {
        KeyCode::Up => {
            if app.handle_key_press(KeyCode::Up) {
                app.move_selection(-1);
            }
        }
        KeyCode::Down => {
            if app.handle_key_press(KeyCode::Down) {
                app.move_selection(1);
            }
        }
        KeyCode::Enter => {
            if app.handle_key_press(KeyCode::Enter) {
                app.activate_selected_notification();
            }
        }
        KeyCode::Char('a') => {
            app.notifications.mark_all_read();
        }
        KeyCode::Esc => {
            if app.handle_key_press(KeyCode::Esc) {
                app.set_view(View::Assistant);
            }
        }
        _ => {}
    }
}
