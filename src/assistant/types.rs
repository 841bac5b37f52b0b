// Assistant data model and backend wire formats
//
// Two parallel histories exist on purpose. The transcript is what the user
// sees: append-only ChatMessages owned by the controller. The conversation
// history is what the backend consumes to stay coherent across turns:
// alternating user/model turns in call order. The backend's copy is
// authoritative whenever it returns one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A side effect the backend reports it performed during a turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// One visible turn in the transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Client-assigned creation instant
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions_performed: Vec<ActionCall>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            actions_performed: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>, actions_performed: Vec<ActionCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            actions_performed,
        }
    }
}

/// Role tag in the backend's conversation history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// One element of the history sent back to the backend each turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub parts: Vec<String>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            parts: vec![text.into()],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            parts: vec![text.into()],
        }
    }
}

/// A pre-canned prompt offered while the transcript is empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire formats
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /api/assistant/query` request body
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub query: String,
    pub history: Vec<ConversationTurn>,
}

/// `POST /api/assistant/query` success response
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub response: String,
    #[serde(default)]
    pub function_calls: Vec<ActionCall>,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
}

/// `POST /api/assistant/suggestions` request body
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionsRequest {
    pub context: serde_json::Value,
}

/// `POST /api/assistant/suggestions` response
#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionsResponse {
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_response_minimal() {
        // Backend may omit both optional fields entirely
        let resp: QueryResponse = serde_json::from_value(json!({
            "response": "Here is your pipeline."
        }))
        .unwrap();

        assert_eq!(resp.response, "Here is your pipeline.");
        assert!(resp.function_calls.is_empty());
        assert!(resp.conversation_history.is_empty());
    }

    #[test]
    fn test_query_response_with_actions_and_history() {
        let resp: QueryResponse = serde_json::from_value(json!({
            "response": "Done.",
            "function_calls": [{"name": "update_lead", "arguments": {"id": 3}}],
            "conversation_history": [
                {"role": "user", "parts": ["update lead 3"]},
                {"role": "model", "parts": ["Done."]}
            ]
        }))
        .unwrap();

        assert_eq!(resp.function_calls.len(), 1);
        assert_eq!(resp.function_calls[0].name, "update_lead");
        assert_eq!(resp.conversation_history.len(), 2);
        assert_eq!(resp.conversation_history[0].role, TurnRole::User);
    }

    #[test]
    fn test_query_request_wire_shape() {
        let req = QueryRequest {
            query: "hi".to_string(),
            history: vec![ConversationTurn::user("a"), ConversationTurn::model("b")],
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["query"], "hi");
        assert_eq!(v["history"][1]["role"], "model");
        assert_eq!(v["history"][1]["parts"][0], "b");
    }
}
