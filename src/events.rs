// Events that flow from background tasks to the TUI event loop
//
// Every network call runs in a spawned task and reports back through this
// enum on the app's mpsc channel. The TUI loop applies completions whether or
// not the view that started them is still the active one, so a response that
// arrives after the user navigated away is never lost and never panics.

use crate::api::ApiError;
use crate::assistant::types::{QueryResponse, Suggestion};
use crate::cache::CollectionKey;

/// Main event type delivered to the TUI loop
#[derive(Debug)]
pub enum AppEvent {
    /// The in-flight assistant query finished, one way or the other
    AssistantCompleted(Result<QueryResponse, ApiError>),

    /// Empty-transcript suggestions arrived
    SuggestionsLoaded(Vec<Suggestion>),

    /// Suggestion fetch failed. Suggestions are decorative, so this only
    /// downgrades the panel to a blank prompt.
    SuggestionsFailed(String),

    /// A collection fetch finished; payload goes into the query cache
    CollectionLoaded {
        key: CollectionKey,
        value: serde_json::Value,
    },

    /// A collection fetch failed
    CollectionFailed { key: CollectionKey, error: ApiError },

    /// A delete finished; on success the collection must be invalidated
    EntityDeleted {
        key: CollectionKey,
        outcome: Result<(), ApiError>,
    },

    /// The backend rejected our token; the persisted session was cleared
    SessionExpired,
}
