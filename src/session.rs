// Session store - the authenticated user and the persisted bearer token
//
// The token is the only durable client state: a single string at
// ~/.config/corral/token. It is loaded at startup, validated against
// /api/auth/me before the TUI starts, and removed on logout or when the
// backend rejects it. The raw token never appears in logs; a SHA-256 prefix
// stands in for it when correlating log lines.

use crate::api::types::AuthUser;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    user: Option<AuthUser>,
}

/// Shared handle to the session
///
/// Cheap to clone: all clones share the same state and token path.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<Mutex<SessionState>>,
    token_path: PathBuf,
}

impl SessionStore {
    /// Create a store backed by the default token path,
    /// loading any persisted token.
    ///
    /// Uses Unix-style ~/.config on all platforms for consistency.
    pub fn new() -> Self {
        let path = dirs::home_dir()
            .map(|p| p.join(".config").join("corral").join("token"))
            .unwrap_or_else(|| PathBuf::from(".corral-token"));
        Self::with_path(path)
    }

    /// Create a store backed by an explicit token path
    pub fn with_path(token_path: PathBuf) -> Self {
        let store = Self {
            state: Arc::new(Mutex::new(SessionState::default())),
            token_path,
        };
        store.load_persisted_token();
        store
    }

    /// Read the persisted token from disk, if any
    fn load_persisted_token(&self) {
        match std::fs::read_to_string(&self.token_path) {
            Ok(contents) => {
                let token = contents.trim().to_string();
                if !token.is_empty() {
                    tracing::debug!(token_hash = %hash_prefix(&token), "Loaded persisted token");
                    self.state.lock().unwrap().token = Some(token);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!("Could not read token file {:?}: {}", self.token_path, e);
            }
        }
    }

    /// Store a new token and user after login, persisting the token
    pub fn establish(&self, token: String, user: AuthUser) -> anyhow::Result<()> {
        if let Some(parent) = self.token_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.token_path, &token)?;
        tracing::info!(
            token_hash = %hash_prefix(&token),
            email = %user.email,
            "Session established"
        );

        let mut state = self.state.lock().unwrap();
        state.token = Some(token);
        state.user = Some(user);
        Ok(())
    }

    /// Attach the validated user to an already-loaded token
    pub fn set_user(&self, user: AuthUser) {
        self.state.lock().unwrap().user = Some(user);
    }

    /// Drop the session from memory and disk
    ///
    /// Called on logout and whenever the backend answers 401. Removing a
    /// token file that is already gone is not an error.
    pub fn clear(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.token = None;
            state.user = None;
        }
        match std::fs::remove_file(&self.token_path) {
            Ok(()) => tracing::debug!("Removed persisted token"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Could not remove token file: {}", e),
        }
    }

    /// The current bearer token, if any
    pub fn token(&self) -> Option<String> {
        self.state.lock().unwrap().token.clone()
    }

    /// The validated user, if the session has been confirmed
    pub fn user(&self) -> Option<AuthUser> {
        self.state.lock().unwrap().user.clone()
    }

    pub fn has_token(&self) -> bool {
        self.state.lock().unwrap().token.is_some()
    }

    /// Short hash of the current token for log correlation
    pub fn token_hash(&self) -> Option<String> {
        self.state.lock().unwrap().token.as_deref().map(hash_prefix)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// First 16 hex chars of SHA-256, enough to correlate without exposing the token
fn hash_prefix(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_token_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("corral-test-{}-{}", std::process::id(), name))
    }

    fn test_user() -> AuthUser {
        AuthUser {
            id: "u-1".to_string(),
            email: "ada@example.com".to_string(),
            name: Some("Ada".to_string()),
        }
    }

    #[test]
    fn test_establish_persists_and_reloads() {
        let path = temp_token_path("establish");
        let store = SessionStore::with_path(path.clone());
        assert!(!store.has_token());

        store.establish("tok-123".to_string(), test_user()).unwrap();
        assert_eq!(store.token().as_deref(), Some("tok-123"));
        assert_eq!(store.user().unwrap().email, "ada@example.com");

        // A fresh store against the same path picks the token up again
        let reloaded = SessionStore::with_path(path.clone());
        assert_eq!(reloaded.token().as_deref(), Some("tok-123"));
        // But the user is unknown until revalidated
        assert!(reloaded.user().is_none());

        store.clear();
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_clear_removes_file_and_is_idempotent() {
        let path = temp_token_path("clear");
        let store = SessionStore::with_path(path.clone());
        store.establish("tok-x".to_string(), test_user()).unwrap();

        store.clear();
        assert!(!store.has_token());
        assert!(store.user().is_none());
        assert!(!path.exists());

        // Clearing again must not fail
        store.clear();
    }

    #[test]
    fn test_token_hash_is_stable_and_short() {
        let path = temp_token_path("hash");
        let store = SessionStore::with_path(path.clone());
        store.establish("tok-abc".to_string(), test_user()).unwrap();

        let h1 = store.token_hash().unwrap();
        let h2 = store.token_hash().unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 16);
        assert!(!h1.contains("tok"));

        store.clear();
        let _ = std::fs::remove_file(path);
    }
}
