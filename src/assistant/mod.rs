// Assistant session controller
//
// Drives one user <-> assistant conversation: accept an utterance, send it
// with the accumulated conversation history, append the reply to the
// transcript, and republish the updated history for the next turn.
//
// Phase machine: Idle -> Pending -> Idle, on success and on failure alike.
// At most one query is outstanding; a submit while Pending is silently
// dropped, never queued. Each accepted submit grows the transcript by exactly
// two messages (user first, then assistant), even when the backend fails -
// failures become classified assistant-voice messages via `classify`.
//
// The controller owns the transcript, the conversation history, and the
// draft input. It does not own the query cache or the notification center;
// it only pushes side effects into them when a reply reports backend actions.

pub mod classify;
pub mod types;

use crate::api::ApiError;
use crate::cache::{CollectionKey, QueryCache};
use crate::notify::{NotificationCenter, NotificationKind};
use types::{ChatMessage, ConversationTurn, QueryRequest, QueryResponse, Role, Suggestion};

/// Collections the assistant can touch through backend actions
///
/// Any turn that reports function calls invalidates all of these: the backend
/// does not say which collections a given action modified, and over-fetching
/// beats rendering stale rows.
pub const ASSISTANT_TOUCHED_COLLECTIONS: &[CollectionKey] = &[
    CollectionKey::Leads,
    CollectionKey::Deals,
    CollectionKey::Contacts,
    CollectionKey::Insights,
];

/// Whether a query is currently in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pending,
}

pub struct AssistantController {
    /// Visible messages, append-only for the life of the session
    transcript: Vec<ChatMessage>,

    /// Conversation history sent to the backend on each turn. Replaced
    /// wholesale when the backend returns its own copy (authoritative),
    /// otherwise synthesized from the completed exchange.
    context: Vec<ConversationTurn>,

    phase: Phase,

    /// The utterance of the in-flight query, kept for context synthesis
    pending_utterance: Option<String>,

    /// Pre-canned prompts, fetched once while the transcript is empty
    suggestions: Vec<Suggestion>,
    suggestions_requested: bool,

    /// The input field's current contents
    draft: String,

    cache: QueryCache,
    notifications: NotificationCenter,
}

impl AssistantController {
    pub fn new(cache: QueryCache, notifications: NotificationCenter) -> Self {
        Self {
            transcript: Vec::new(),
            context: Vec::new(),
            phase: Phase::Idle,
            pending_utterance: None,
            suggestions: Vec::new(),
            suggestions_requested: false,
            draft: String::new(),
            cache,
            notifications,
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn context(&self) -> &[ConversationTurn] {
        &self.context
    }

    /// Content of the newest assistant message, for clipboard export
    pub fn latest_reply(&self) -> Option<&str> {
        self.transcript
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        self.phase == Phase::Pending
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Draft input
    // ─────────────────────────────────────────────────────────────────────────

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn push_draft_char(&mut self, c: char) {
        self.draft.push(c);
    }

    pub fn backspace_draft(&mut self) {
        self.draft.pop();
    }

    pub fn clear_draft(&mut self) {
        self.draft.clear();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Submit
    // ─────────────────────────────────────────────────────────────────────────

    /// Accept an utterance and prepare the outbound request.
    ///
    /// Returns None (with no observable effect) when the utterance is blank
    /// after trimming or when a query is already pending. Otherwise appends
    /// the user message optimistically, enters Pending, and hands back the
    /// request body for the caller to ship; the outcome comes back through
    /// [`complete`](Self::complete).
    pub fn begin_submit(&mut self, utterance: &str) -> Option<QueryRequest> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return None;
        }
        if self.phase == Phase::Pending {
            tracing::debug!("Submit ignored: a query is already in flight");
            return None;
        }

        self.transcript.push(ChatMessage::user(utterance));
        self.pending_utterance = Some(utterance.to_string());
        self.phase = Phase::Pending;

        Some(QueryRequest {
            query: utterance.to_string(),
            history: self.context.clone(),
        })
    }

    /// Submit whatever is in the draft field, clearing it if accepted
    pub fn submit_draft(&mut self) -> Option<QueryRequest> {
        let draft = self.draft.clone();
        let request = self.begin_submit(&draft)?;
        self.draft.clear();
        Some(request)
    }

    /// Apply the outcome of the in-flight query.
    ///
    /// Always returns the phase to Idle and appends exactly one
    /// assistant-role message. On success the conversation history is
    /// replaced by the backend's copy when present, or synthesized from the
    /// completed exchange when absent; non-empty reported actions invalidate
    /// the collections the assistant can touch and raise a notification.
    pub fn complete(&mut self, outcome: Result<QueryResponse, ApiError>) {
        let Some(utterance) = self.pending_utterance.take() else {
            // Completion without a pending query: stale event, nothing to apply
            tracing::warn!("Assistant completion arrived with no pending query");
            return;
        };
        self.phase = Phase::Idle;

        match outcome {
            Ok(response) => {
                if !response.conversation_history.is_empty() {
                    self.context = response.conversation_history;
                } else {
                    // Fallback path: the client cannot know how the backend
                    // truncates or compacts history, so a synthesized context
                    // can drift from the server's. Logged to keep it visible.
                    tracing::debug!("Backend omitted conversation history, synthesizing turns");
                    self.context.push(ConversationTurn::user(utterance));
                    self.context
                        .push(ConversationTurn::model(response.response.clone()));
                }

                let actions = response.function_calls;
                self.transcript
                    .push(ChatMessage::assistant(response.response, actions.clone()));

                if !actions.is_empty() {
                    self.cache.invalidate_many(ASSISTANT_TOUCHED_COLLECTIONS);
                    let names: Vec<&str> = actions.iter().map(|a| a.name.as_str()).collect();
                    tracing::info!(actions = ?names, "Assistant performed backend actions");
                    self.notifications.add(
                        NotificationKind::Success,
                        "Assistant updated your data",
                        format!("Actions performed: {}", names.join(", ")),
                        None,
                    );
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "Assistant query failed");
                self.transcript.push(ChatMessage::assistant(
                    classify::fallback_message(&err),
                    Vec::new(),
                ));
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Suggestions
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether a suggestion fetch should be issued now. Marks the fetch as
    /// requested so it happens at most once per session.
    pub fn begin_suggestions(&mut self) -> bool {
        if self.suggestions_requested || !self.transcript.is_empty() {
            return false;
        }
        self.suggestions_requested = true;
        true
    }

    pub fn set_suggestions(&mut self, suggestions: Vec<Suggestion>) {
        self.suggestions = suggestions;
    }

    /// Suggestions eligible for display: only while the transcript is empty.
    /// Once any message exists they are never shown again, cached or not.
    pub fn visible_suggestions(&self) -> &[Suggestion] {
        if self.transcript.is_empty() {
            &self.suggestions
        } else {
            &[]
        }
    }

    /// Copy a suggestion into the draft field. Never submits.
    pub fn apply_suggestion(&mut self, index: usize) -> bool {
        let Some(suggestion) = self.visible_suggestions().get(index) else {
            return false;
        };
        self.draft = suggestion.text.clone();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{ActionCall, Role, TurnRole};

    fn controller() -> AssistantController {
        AssistantController::new(QueryCache::new(), NotificationCenter::new())
    }

    fn reply(text: &str) -> QueryResponse {
        QueryResponse {
            response: text.to_string(),
            function_calls: Vec::new(),
            conversation_history: Vec::new(),
        }
    }

    #[test]
    fn test_submit_rejected_while_pending() {
        // P1: only the first of overlapping submits is dispatched
        let mut ctl = controller();

        let first = ctl.begin_submit("show my pipeline");
        assert!(first.is_some());
        assert!(ctl.is_pending());

        let second = ctl.begin_submit("another question");
        assert!(second.is_none());
        // No observable effect from the dropped submit
        assert_eq!(ctl.transcript().len(), 1);

        ctl.complete(Ok(reply("here it is")));
        assert!(!ctl.is_pending());
        assert_eq!(ctl.transcript().len(), 2);

        // A new submit is accepted once the first resolved
        assert!(ctl.begin_submit("another question").is_some());
    }

    #[test]
    fn test_latest_reply_tracks_newest_assistant_message() {
        let mut ctl = controller();
        assert!(ctl.latest_reply().is_none());

        ctl.begin_submit("how many open deals?").unwrap();
        // Pending user message alone is not a reply
        assert!(ctl.latest_reply().is_none());
        ctl.complete(Ok(reply("You have 3 open deals.")));
        assert_eq!(ctl.latest_reply(), Some("You have 3 open deals."));

        ctl.begin_submit("and leads?").unwrap();
        ctl.complete(Ok(reply("12 leads.")));
        assert_eq!(ctl.latest_reply(), Some("12 leads."));
    }

    #[test]
    fn test_blank_utterance_rejected() {
        let mut ctl = controller();
        assert!(ctl.begin_submit("").is_none());
        assert!(ctl.begin_submit("   \n\t ").is_none());
        assert!(ctl.transcript().is_empty());
        assert!(!ctl.is_pending());
    }

    #[test]
    fn test_successful_submit_grows_transcript_by_two() {
        // P2 and scenario 1: user then assistant, context gains two turns
        let mut ctl = controller();

        let request = ctl.begin_submit("Show me my pipeline summary").unwrap();
        assert_eq!(request.query, "Show me my pipeline summary");
        assert!(request.history.is_empty());

        ctl.complete(Ok(reply("You have 3 open deals.")));

        let transcript = ctl.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(transcript[0].content, "Show me my pipeline summary");
        assert_eq!(transcript[1].role, Role::Assistant);
        assert_eq!(transcript[1].content, "You have 3 open deals.");

        let context = ctl.context();
        assert_eq!(context.len(), 2);
        assert_eq!(context[0].role, TurnRole::User);
        assert_eq!(context[1].role, TurnRole::Model);
        assert_eq!(context[1].parts, vec!["You have 3 open deals.".to_string()]);
    }

    #[test]
    fn test_failed_submit_grows_transcript_by_two() {
        // P3 and scenario 3: failure appends a synthesized assistant entry
        let mut ctl = controller();

        ctl.begin_submit("hello").unwrap();
        ctl.complete(Err(ApiError::Unreachable("connection refused".to_string())));

        let transcript = ctl.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].role, Role::Assistant);
        assert_eq!(transcript[1].content, classify::NETWORK_MESSAGE);
        assert!(!ctl.is_pending());
    }

    #[test]
    fn test_model_unavailable_error_is_classified() {
        // Scenario 4: raw backend text never reaches the transcript
        let mut ctl = controller();
        ctl.begin_submit("summarize deals").unwrap();
        ctl.complete(Err(ApiError::Api {
            status: 500,
            detail: "generation failed: gemini-1.5 model not found (404)".to_string(),
        }));

        assert_eq!(
            ctl.transcript()[1].content,
            classify::MODEL_UNAVAILABLE_MESSAGE
        );
        assert!(!ctl.transcript()[1].content.contains("gemini"));
    }

    #[test]
    fn test_backend_history_is_authoritative() {
        // P4: backend-supplied history replaces the synthesized one
        let mut ctl = controller();

        ctl.begin_submit("first").unwrap();
        ctl.complete(Ok(reply("one")));
        assert_eq!(ctl.context().len(), 2);

        ctl.begin_submit("second").unwrap();
        let backend_history = vec![
            ConversationTurn::user("first"),
            ConversationTurn::model("one"),
            ConversationTurn::user("second"),
            ConversationTurn::model("two"),
        ];
        ctl.complete(Ok(QueryResponse {
            response: "two".to_string(),
            function_calls: Vec::new(),
            conversation_history: backend_history.clone(),
        }));

        assert_eq!(ctl.context(), backend_history.as_slice());
    }

    #[test]
    fn test_context_never_shrinks_on_fallback() {
        // P4: the fallback path always extends the prior context by two
        let mut ctl = controller();
        for i in 0..3 {
            let before = ctl.context().len();
            ctl.begin_submit(&format!("question {}", i)).unwrap();
            ctl.complete(Ok(reply(&format!("answer {}", i))));
            assert_eq!(ctl.context().len(), before + 2);
        }
    }

    #[test]
    fn test_failed_submit_leaves_context_untouched() {
        let mut ctl = controller();
        ctl.begin_submit("a").unwrap();
        ctl.complete(Ok(reply("b")));
        let context_before = ctl.context().to_vec();

        ctl.begin_submit("c").unwrap();
        ctl.complete(Err(ApiError::Timeout));

        assert_eq!(ctl.context(), context_before.as_slice());
    }

    #[test]
    fn test_request_carries_prior_context() {
        let mut ctl = controller();
        ctl.begin_submit("a").unwrap();
        ctl.complete(Ok(reply("b")));

        let request = ctl.begin_submit("follow-up").unwrap();
        assert_eq!(request.history.len(), 2);
        assert_eq!(request.history[0].parts, vec!["a".to_string()]);
    }

    #[test]
    fn test_actions_trigger_invalidation_and_notification() {
        // P6: non-empty function_calls invalidate the touched collections
        let cache = QueryCache::new();
        let notifications = NotificationCenter::new();
        let mut rx = cache.subscribe();
        let mut ctl = AssistantController::new(cache.clone(), notifications.clone());

        ctl.begin_submit("mark lead 3 as won").unwrap();
        ctl.complete(Ok(QueryResponse {
            response: "Done, lead 3 is marked won.".to_string(),
            function_calls: vec![ActionCall {
                name: "update_lead".to_string(),
                arguments: serde_json::json!({"id": 3, "status": "won"}),
            }],
            conversation_history: Vec::new(),
        }));

        let mut invalidated = Vec::new();
        while let Ok(key) = rx.try_recv() {
            invalidated.push(key);
        }
        for key in ASSISTANT_TOUCHED_COLLECTIONS {
            assert!(invalidated.contains(key), "{} not invalidated", key);
        }

        let notes = notifications.all();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Success);
        assert!(notes[0].message.contains("update_lead"));

        // The transcript entry carries the reported actions
        assert_eq!(ctl.transcript()[1].actions_performed.len(), 1);
    }

    #[test]
    fn test_empty_actions_trigger_nothing() {
        // P6: an actionless reply must not invalidate or notify
        let cache = QueryCache::new();
        let notifications = NotificationCenter::new();
        let mut rx = cache.subscribe();
        let mut ctl = AssistantController::new(cache.clone(), notifications.clone());

        ctl.begin_submit("what is my best deal?").unwrap();
        ctl.complete(Ok(reply("Acme renewal, $40k.")));

        assert!(rx.try_recv().is_err());
        assert!(notifications.all().is_empty());
    }

    #[test]
    fn test_suggestions_fetched_once_and_gated() {
        // P5 and scenario 5
        let mut ctl = controller();

        assert!(ctl.begin_suggestions());
        assert!(!ctl.begin_suggestions()); // at most one fetch per session

        ctl.set_suggestions(vec![
            Suggestion { text: "Show my pipeline".to_string() },
            Suggestion { text: "Which leads went cold?".to_string() },
            Suggestion { text: "Summarize this week".to_string() },
            Suggestion { text: "Top deals by value".to_string() },
        ]);
        assert_eq!(ctl.visible_suggestions().len(), 4);

        // Clicking suggestion #2 fills the draft and submits nothing
        assert!(ctl.apply_suggestion(1));
        assert_eq!(ctl.draft(), "Which leads went cold?");
        assert!(ctl.transcript().is_empty());
        assert!(!ctl.is_pending());

        // After the first submit, suggestions are never displayed again
        ctl.begin_submit("Which leads went cold?").unwrap();
        assert!(ctl.visible_suggestions().is_empty());
        ctl.complete(Ok(reply("Three of them.")));
        assert!(ctl.visible_suggestions().is_empty());
        assert!(!ctl.apply_suggestion(0));
    }

    #[test]
    fn test_no_suggestion_fetch_once_transcript_nonempty() {
        let mut ctl = controller();
        ctl.begin_submit("hi").unwrap();
        ctl.complete(Ok(reply("hello")));
        assert!(!ctl.begin_suggestions());
    }

    #[test]
    fn test_submit_draft_clears_on_accept_only() {
        let mut ctl = controller();

        // Blank draft: rejected, nothing changes
        assert!(ctl.submit_draft().is_none());

        for c in "show deals".chars() {
            ctl.push_draft_char(c);
        }
        assert!(ctl.submit_draft().is_some());
        assert_eq!(ctl.draft(), "");

        // Draft typed while pending stays put when submit is rejected
        ctl.push_draft_char('x');
        assert!(ctl.submit_draft().is_none());
        assert_eq!(ctl.draft(), "x");
    }

    #[test]
    fn test_stale_completion_without_pending_is_dropped() {
        let mut ctl = controller();
        ctl.complete(Ok(reply("ghost")));
        assert!(ctl.transcript().is_empty());
        assert!(!ctl.is_pending());
    }
}
