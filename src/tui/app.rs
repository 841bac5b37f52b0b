// TUI application state
//
// Owns the assistant controller, the query cache, the notification center,
// and the per-view UI state. Network calls never run on the UI thread: they
// are spawned onto tokio and report back through the AppEvent channel, so a
// completion is applied even when the user has switched views in the
// meantime.

use super::input::InputHandler;
use crate::api::ApiClient;
use crate::assistant::types::SuggestionsRequest;
use crate::assistant::AssistantController;
use crate::cache::{CollectionKey, QueryCache};
use crate::events::AppEvent;
use crate::logging::LogBuffer;
use crate::notify::{NotificationCenter, NotificationKind};
use crate::session::SessionStore;
use crossterm::event::KeyCode;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Different views the TUI can display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum View {
    #[default]
    Assistant,
    Leads,
    Contacts,
    Deals,
    Notifications,
}

impl View {
    /// Get the next view in cycle (Tab)
    pub fn next(self) -> Self {
        match self {
            View::Assistant => View::Leads,
            View::Leads => View::Contacts,
            View::Contacts => View::Deals,
            View::Deals => View::Notifications,
            View::Notifications => View::Assistant,
        }
    }

    /// Get the previous view in cycle (BackTab)
    pub fn prev(self) -> Self {
        match self {
            View::Assistant => View::Notifications,
            View::Leads => View::Assistant,
            View::Contacts => View::Leads,
            View::Deals => View::Contacts,
            View::Notifications => View::Deals,
        }
    }

    /// Get display name for the title bar
    pub fn name(&self) -> &'static str {
        match self {
            View::Assistant => "Assistant",
            View::Leads => "Leads",
            View::Contacts => "Contacts",
            View::Deals => "Deals",
            View::Notifications => "Notifications",
        }
    }

    /// The cached collection this view renders, if it renders one
    pub fn collection(&self) -> Option<CollectionKey> {
        match self {
            View::Leads => Some(CollectionKey::Leads),
            View::Contacts => Some(CollectionKey::Contacts),
            View::Deals => Some(CollectionKey::Deals),
            View::Assistant | View::Notifications => None,
        }
    }
}

/// How long a toast message stays on screen
const TOAST_DURATION: Duration = Duration::from_secs(3);

/// Main application state for the TUI
pub struct App {
    /// Active view
    pub view: View,

    /// Assistant conversation state
    pub controller: AssistantController,

    pub cache: QueryCache,
    pub notifications: NotificationCenter,
    pub api: ApiClient,
    pub session: SessionStore,
    pub log_buffer: LogBuffer,

    /// Sender side of the channel the event loop drains; cloned into every
    /// spawned network task
    events_tx: mpsc::Sender<AppEvent>,

    /// Set when the TUI should exit
    pub should_quit: bool,

    /// Chat transcript scroll offset, in lines from the bottom
    pub chat_scroll: usize,

    /// Highlighted suggestion on the empty-transcript panel
    pub suggestion_selected: usize,

    /// Selected row per collection view
    pub table_selected: HashMap<CollectionKey, usize>,

    /// Selected row in the notifications view
    pub notification_selected: usize,

    /// Collections with a fetch currently in flight; guards duplicate fetches
    in_flight: HashSet<CollectionKey>,

    /// Set when the backend rejected our token mid-session
    pub session_expired: bool,

    /// Transient status message
    toast: Option<(String, Instant)>,

    /// Animation frame for the pending-query spinner
    pub spinner_frame: usize,

    /// Key state tracking for debounce and hold-to-repeat
    input_handler: InputHandler,

    /// Cap applied to the suggestion strip
    pub suggestion_limit: usize,
}

impl App {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        controller: AssistantController,
        cache: QueryCache,
        notifications: NotificationCenter,
        api: ApiClient,
        session: SessionStore,
        log_buffer: LogBuffer,
        events_tx: mpsc::Sender<AppEvent>,
        suggestion_limit: usize,
    ) -> Self {
        Self {
            view: View::Assistant,
            controller,
            cache,
            notifications,
            api,
            session,
            log_buffer,
            events_tx,
            should_quit: false,
            chat_scroll: 0,
            suggestion_selected: 0,
            table_selected: HashMap::new(),
            notification_selected: 0,
            in_flight: HashSet::new(),
            session_expired: false,
            toast: None,
            spinner_frame: 0,
            input_handler: InputHandler::with_default_config(),
            suggestion_limit,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // View switching and data scheduling
    // ─────────────────────────────────────────────────────────────────────────

    /// Switch to a view and schedule whatever data it is missing
    pub fn set_view(&mut self, view: View) {
        self.view = view;
        self.ensure_view_data();
    }

    /// Schedule fetches the active view needs: a stale or absent collection,
    /// or the once-per-session suggestion fetch on the empty assistant panel
    pub fn ensure_view_data(&mut self) {
        for key in prefetch_keys(self.view) {
            self.maybe_fetch_collection(*key);
        }

        if self.view == View::Assistant && self.controller.begin_suggestions() {
            self.spawn_suggestions_fetch();
        }
    }

    /// Fetch a collection unless fresh data is cached or a fetch is running
    pub fn maybe_fetch_collection(&mut self, key: CollectionKey) {
        if !self.cache.needs_fetch(key) || self.in_flight.contains(&key) {
            return;
        }
        self.in_flight.insert(key);

        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match api.list_collection(key).await {
                Ok(value) => AppEvent::CollectionLoaded { key, value },
                Err(error) => AppEvent::CollectionFailed { key, error },
            };
            let _ = tx.send(event).await;
        });
    }

    /// A collection was invalidated. Refetch immediately only when the
    /// active view is looking at it; other views pick it up on entry.
    pub fn on_invalidated(&mut self, key: CollectionKey) {
        if prefetch_keys(self.view).contains(&key) {
            self.maybe_fetch_collection(key);
        }
    }

    /// Delete the selected row of the active collection view. The spawned
    /// task reports back as an event; invalidation happens on success there.
    pub fn delete_selected(&mut self) {
        let Some(key) = self.view.collection() else {
            return;
        };
        let selected = self.table_selected.get(&key).copied().unwrap_or(0);
        let Some(id) = self.cache.get(key).and_then(|v| {
            v.as_array()
                .and_then(|rows| rows.get(selected))
                .and_then(|row| row.get("id"))
                .and_then(|id| id.as_str())
                .map(str::to_string)
        }) else {
            return;
        };

        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = api.delete_entity(key, &id).await;
            let _ = tx.send(AppEvent::EntityDeleted { key, outcome }).await;
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Assistant actions
    // ─────────────────────────────────────────────────────────────────────────

    /// Submit the draft input. No-op when blank or a query is pending.
    pub fn submit_draft(&mut self) {
        let Some(request) = self.controller.submit_draft() else {
            return;
        };
        self.chat_scroll = 0;

        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = api.assistant_query(&request).await;
            let _ = tx.send(AppEvent::AssistantCompleted(outcome)).await;
        });
    }

    /// Copy the highlighted suggestion into the draft field
    pub fn apply_selected_suggestion(&mut self) {
        if self.controller.apply_suggestion(self.suggestion_selected) {
            self.suggestion_selected = 0;
        }
    }

    fn spawn_suggestions_fetch(&self) {
        let api = self.api.clone();
        let tx = self.events_tx.clone();
        let request = SuggestionsRequest {
            context: serde_json::json!({ "view": "assistant" }),
        };
        tokio::spawn(async move {
            let event = match api.assistant_suggestions(&request).await {
                Ok(suggestions) => AppEvent::SuggestionsLoaded(suggestions),
                Err(error) => AppEvent::SuggestionsFailed(error.to_string()),
            };
            let _ = tx.send(event).await;
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Background event handling
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply a completed background task. Runs regardless of the active
    /// view, so nothing is lost when the user navigates mid-flight.
    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::AssistantCompleted(outcome) => {
                self.controller.complete(outcome);
                self.chat_scroll = 0;
            }

            AppEvent::SuggestionsLoaded(mut suggestions) => {
                suggestions.truncate(self.suggestion_limit);
                self.controller.set_suggestions(suggestions);
                self.suggestion_selected = 0;
            }

            AppEvent::SuggestionsFailed(error) => {
                // The panel simply stays blank
                tracing::debug!(error = %error, "Suggestion fetch failed");
            }

            AppEvent::CollectionLoaded { key, value } => {
                self.in_flight.remove(&key);
                self.cache.store(key, value);
            }

            AppEvent::CollectionFailed { key, error } => {
                self.in_flight.remove(&key);
                tracing::warn!(collection = %key, error = %error, "Collection fetch failed");
                self.notifications.add(
                    NotificationKind::Error,
                    format!("Failed to load {}", key),
                    error.to_string(),
                    Some(key),
                );
            }

            AppEvent::EntityDeleted { key, outcome } => match outcome {
                Ok(()) => {
                    self.cache.invalidate(key);
                    self.show_toast(format!("Deleted from {}", key));
                }
                Err(error) => {
                    tracing::warn!(collection = %key, error = %error, "Delete failed");
                    self.notifications.add(
                        NotificationKind::Error,
                        format!("Failed to delete from {}", key),
                        error.to_string(),
                        Some(key),
                    );
                }
            },

            AppEvent::SessionExpired => {
                if !self.session_expired {
                    self.session_expired = true;
                    self.notifications.add(
                        NotificationKind::Warning,
                        "Session expired",
                        "Your session is no longer valid. Run `corral login` to sign in again.",
                        None,
                    );
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Selection and scrolling
    // ─────────────────────────────────────────────────────────────────────────

    /// Move the active view's selection or scroll position
    pub fn move_selection(&mut self, delta: isize) {
        match self.view {
            View::Assistant => {
                if self.controller.transcript().is_empty() {
                    let count = self
                        .controller
                        .visible_suggestions()
                        .len()
                        .min(self.suggestion_limit);
                    self.suggestion_selected =
                        step_index(self.suggestion_selected, delta, count);
                } else {
                    // Up scrolls back through history, Down toward the bottom
                    if delta < 0 {
                        self.chat_scroll = self.chat_scroll.saturating_add(1);
                    } else {
                        self.chat_scroll = self.chat_scroll.saturating_sub(1);
                    }
                }
            }
            View::Leads | View::Contacts | View::Deals => {
                if let Some(key) = self.view.collection() {
                    let count = self.collection_len(key);
                    let current = self.table_selected.get(&key).copied().unwrap_or(0);
                    self.table_selected
                        .insert(key, step_index(current, delta, count));
                }
            }
            View::Notifications => {
                let count = self.notifications.all().len();
                self.notification_selected =
                    step_index(self.notification_selected, delta, count);
            }
        }
    }

    /// Row count of a cached collection, 0 when absent or not an array
    pub fn collection_len(&self, key: CollectionKey) -> usize {
        self.cache
            .get(key)
            .and_then(|v| v.as_array().map(|a| a.len()))
            .unwrap_or(0)
    }

    /// Mark the selected notification read; jump to its collection if it
    /// points at one
    pub fn activate_selected_notification(&mut self) {
        let entries = self.notifications.all();
        let Some(entry) = entries.get(self.notification_selected) else {
            return;
        };
        self.notifications.mark_read(entry.id);

        let target = entry.action_target.map(|key| match key {
            CollectionKey::Leads => View::Leads,
            CollectionKey::Contacts => View::Contacts,
            CollectionKey::Deals => View::Deals,
            // Insights render on the assistant dashboard strip
            CollectionKey::Insights => View::Assistant,
        });
        if let Some(view) = target {
            self.set_view(view);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Toast and animation
    // ─────────────────────────────────────────────────────────────────────────

    pub fn show_toast(&mut self, message: impl Into<String>) {
        self.toast = Some((message.into(), Instant::now()));
    }

    /// Current toast text, if it hasn't expired
    pub fn toast(&self) -> Option<&str> {
        match &self.toast {
            Some((message, shown_at)) if shown_at.elapsed() < TOAST_DURATION => {
                Some(message.as_str())
            }
            _ => None,
        }
    }

    /// Advance the spinner; called on every tick
    pub fn tick_animation(&mut self) {
        if self.controller.is_pending() {
            self.spinner_frame = self.spinner_frame.wrapping_add(1);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Input state delegation
    // ─────────────────────────────────────────────────────────────────────────

    pub fn handle_key_press(&mut self, key: KeyCode) -> bool {
        self.input_handler.handle_key_press(key)
    }

    pub fn handle_key_release(&mut self, key: KeyCode) {
        self.input_handler.handle_key_release(key);
    }
}

/// Collections a view reads, fetched on entry and refetched on invalidation.
/// The assistant view carries the insights dashboard strip.
fn prefetch_keys(view: View) -> &'static [CollectionKey] {
    match view {
        View::Assistant => &[CollectionKey::Insights],
        View::Leads => &[CollectionKey::Leads],
        View::Contacts => &[CollectionKey::Contacts],
        View::Deals => &[CollectionKey::Deals],
        View::Notifications => &[],
    }
}

/// Clamp-step an index by delta within [0, count)
fn step_index(current: usize, delta: isize, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let stepped = current as isize + delta;
    stepped.clamp(0, count as isize - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_cycle_is_closed() {
        let mut view = View::Assistant;
        for _ in 0..5 {
            view = view.next();
        }
        assert_eq!(view, View::Assistant);

        for _ in 0..5 {
            view = view.prev();
        }
        assert_eq!(view, View::Assistant);
    }

    #[test]
    fn every_view_prefetches_what_it_renders() {
        assert_eq!(prefetch_keys(View::Assistant), &[CollectionKey::Insights][..]);
        assert_eq!(prefetch_keys(View::Leads), &[CollectionKey::Leads][..]);
        assert_eq!(prefetch_keys(View::Contacts), &[CollectionKey::Contacts][..]);
        assert_eq!(prefetch_keys(View::Deals), &[CollectionKey::Deals][..]);
        assert!(prefetch_keys(View::Notifications).is_empty());
    }

    #[test]
    fn step_index_clamps_at_both_ends() {
        assert_eq!(step_index(0, -1, 5), 0);
        assert_eq!(step_index(4, 1, 5), 4);
        assert_eq!(step_index(2, 1, 5), 3);
        assert_eq!(step_index(2, -1, 5), 1);
        assert_eq!(step_index(3, 1, 0), 0);
    }
}
