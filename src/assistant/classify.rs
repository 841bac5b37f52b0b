// Error classification for failed assistant submits
//
// A failed submit still produces an assistant-role transcript entry, and that
// entry must read like the assistant talking, never like a stack trace. This
// module is the single place that maps an ApiError to user-facing text.
//
// The "model unavailable" case is a substring heuristic over backend error
// text because the backend exposes no structured error code. Keeping the
// heuristic inside one function makes it easy to revise when that changes.

use crate::api::ApiError;
use regex::Regex;
use std::sync::OnceLock;

/// Shown when the transport reports a timeout
pub const TIMEOUT_MESSAGE: &str =
    "This request is taking longer than expected. Please try again in a moment.";

/// Shown when no response came back at all
pub const NETWORK_MESSAGE: &str =
    "I couldn't reach the server. Please check your connection and try again.";

/// Shown when backend error text points at a missing or overloaded model
pub const MODEL_UNAVAILABLE_MESSAGE: &str =
    "The AI service is temporarily unavailable. Please try again later.";

/// Shown when the session expired mid-conversation
pub const SESSION_MESSAGE: &str = "Your session has expired. Please log in again to continue.";

/// Last-resort wording for anything unclassified
pub const GENERIC_MESSAGE: &str = "Sorry, I encountered an error.";

/// Prefix for server-reported errors surfaced near-verbatim
const SERVER_ERROR_PREFIX: &str = "The server reported a problem: ";

fn model_unavailable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Matches e.g. "gemini-1.5 model not found (404)", "model is
        // unavailable", "the model does not exist", "model overloaded"
        Regex::new(r"(?i)model\b[^.]*\b(not found|unavailable|does not exist|overloaded)")
            .expect("model-unavailable pattern is valid")
    })
}

/// Whether backend error text describes a missing/unavailable model
pub fn looks_like_model_unavailable(text: &str) -> bool {
    model_unavailable_re().is_match(text)
}

/// Map a failed submit to the assistant-voice message shown in the transcript
///
/// Classification priority: timeout, then unreachable, then structured
/// backend errors (with the model-unavailable pattern taking precedence over
/// verbatim surfacing), then the generic fallback.
pub fn fallback_message(err: &ApiError) -> String {
    match err {
        ApiError::Timeout => TIMEOUT_MESSAGE.to_string(),
        ApiError::Unreachable(_) => NETWORK_MESSAGE.to_string(),
        ApiError::Unauthorized => SESSION_MESSAGE.to_string(),
        ApiError::Api { detail, .. } => {
            if looks_like_model_unavailable(detail) {
                MODEL_UNAVAILABLE_MESSAGE.to_string()
            } else {
                format!("{}{}", SERVER_ERROR_PREFIX, detail)
            }
        }
        ApiError::Http { .. } | ApiError::Decode(_) => GENERIC_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_and_network_take_priority() {
        assert_eq!(fallback_message(&ApiError::Timeout), TIMEOUT_MESSAGE);
        assert_eq!(
            fallback_message(&ApiError::Unreachable("dns failure".to_string())),
            NETWORK_MESSAGE
        );
    }

    #[test]
    fn test_structured_error_surfaced_with_prefix() {
        let err = ApiError::Api {
            status: 422,
            detail: "deal stage 'won2' does not exist in pipeline".to_string(),
        };
        let msg = fallback_message(&err);
        assert!(msg.starts_with("The server reported a problem: "));
        assert!(msg.contains("deal stage 'won2'"));
    }

    #[test]
    fn test_model_not_found_maps_to_unavailable() {
        // The raw backend string must never reach the transcript
        let err = ApiError::Api {
            status: 500,
            detail: "upstream call failed: gemini-1.5 model not found (404) for project x"
                .to_string(),
        };
        assert_eq!(fallback_message(&err), MODEL_UNAVAILABLE_MESSAGE);
    }

    #[test]
    fn test_model_unavailable_variants() {
        assert!(looks_like_model_unavailable("The model is unavailable right now"));
        assert!(looks_like_model_unavailable("model overloaded, retry later"));
        assert!(looks_like_model_unavailable("requested model does not exist"));
        assert!(!looks_like_model_unavailable("lead not found"));
        assert!(!looks_like_model_unavailable("invalid pipeline stage"));
    }

    #[test]
    fn test_unclassified_falls_back_to_generic() {
        assert_eq!(
            fallback_message(&ApiError::Http { status: 502 }),
            GENERIC_MESSAGE
        );
        assert_eq!(
            fallback_message(&ApiError::Decode("trailing garbage".to_string())),
            GENERIC_MESSAGE
        );
    }
}
