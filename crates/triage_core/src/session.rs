use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Authorization flow state saved between login initiation and the redirect
/// callback.
///
/// Single-use: the callback handler takes it out of the session before
/// attempting the token exchange, so a replayed callback can never drive a
/// second exchange against a stale verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFlow {
    /// The full authorization URL that was handed to the user.
    pub auth_url: String,
    /// CSRF state echoed back by the identity provider.
    pub state: String,
    /// PKCE code verifier matching the challenge embedded in `auth_url`.
    pub code_verifier: String,
}

/// Per-user session state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Set once a token exchange has succeeded during this session.
    pub authenticated: bool,
    /// At most one pending authorization flow; a new login overwrites it.
    pub pending_flow: Option<PendingFlow>,
}

/// Process-wide session registry, keyed by the `sid` cookie value.
///
/// Replaces the original design's single unsynchronized global map: each
/// logical user gets their own slot, and all access goes through a lock so
/// concurrent login/callback requests cannot corrupt each other's flow state.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh session identifier.
    pub fn new_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Ensure a session exists for `sid`, creating an empty one if needed.
    pub fn ensure(&self, sid: &str) {
        self.inner.write().entry(sid.to_string()).or_default();
    }

    /// Snapshot of the session, if it exists.
    pub fn get(&self, sid: &str) -> Option<Session> {
        self.inner.read().get(sid).cloned()
    }

    pub fn is_authenticated(&self, sid: &str) -> bool {
        self.inner
            .read()
            .get(sid)
            .map(|s| s.authenticated)
            .unwrap_or(false)
    }

    pub fn set_authenticated(&self, sid: &str, authenticated: bool) {
        self.inner
            .write()
            .entry(sid.to_string())
            .or_default()
            .authenticated = authenticated;
    }

    /// Record a pending flow, replacing any previous one for this session.
    pub fn set_pending(&self, sid: &str, flow: PendingFlow) {
        self.inner
            .write()
            .entry(sid.to_string())
            .or_default()
            .pending_flow = Some(flow);
    }

    /// Peek at the pending flow without consuming it.
    pub fn pending(&self, sid: &str) -> Option<PendingFlow> {
        self.inner
            .read()
            .get(sid)
            .and_then(|s| s.pending_flow.clone())
    }

    /// Take (and clear) the pending flow.
    pub fn take_pending(&self, sid: &str) -> Option<PendingFlow> {
        self.inner
            .write()
            .get_mut(sid)
            .and_then(|s| s.pending_flow.take())
    }

    /// Reset the session to a fresh unauthenticated state, e.g. on logout.
    pub fn reset(&self, sid: &str) {
        self.inner.write().insert(sid.to_string(), Session::default());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_flow(tag: &str) -> PendingFlow {
        PendingFlow {
            auth_url: format!("https://login.example/authorize?tag={tag}"),
            state: format!("state-{tag}"),
            code_verifier: format!("verifier-{tag}"),
        }
    }

    #[test]
    fn ensure_creates_empty_session() {
        let store = SessionStore::new();
        store.ensure("s1");
        let session = store.get("s1").unwrap();
        assert!(!session.authenticated);
        assert!(session.pending_flow.is_none());
    }

    #[test]
    fn missing_session_is_not_authenticated() {
        let store = SessionStore::new();
        assert!(!store.is_authenticated("nope"));
        assert!(store.get("nope").is_none());
    }

    #[test]
    fn set_pending_then_take_consumes_it() {
        let store = SessionStore::new();
        store.set_pending("s1", sample_flow("a"));

        let taken = store.take_pending("s1").unwrap();
        assert_eq!(taken.state, "state-a");

        // Single-use: a second take finds nothing.
        assert!(store.take_pending("s1").is_none());
    }

    #[test]
    fn new_login_overwrites_prior_flow() {
        let store = SessionStore::new();
        store.set_pending("s1", sample_flow("first"));
        store.set_pending("s1", sample_flow("second"));

        let flow = store.take_pending("s1").unwrap();
        assert_eq!(flow.state, "state-second");
    }

    #[test]
    fn peek_does_not_consume() {
        let store = SessionStore::new();
        store.set_pending("s1", sample_flow("a"));
        assert!(store.pending("s1").is_some());
        assert!(store.pending("s1").is_some());
        assert!(store.take_pending("s1").is_some());
    }

    #[test]
    fn authenticated_flag_round_trip() {
        let store = SessionStore::new();
        store.set_authenticated("s1", true);
        assert!(store.is_authenticated("s1"));
        store.set_authenticated("s1", false);
        assert!(!store.is_authenticated("s1"));
    }

    #[test]
    fn reset_clears_everything() {
        let store = SessionStore::new();
        store.set_authenticated("s1", true);
        store.set_pending("s1", sample_flow("a"));

        store.reset("s1");

        let session = store.get("s1").unwrap();
        assert!(!session.authenticated);
        assert!(session.pending_flow.is_none());
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::new();
        store.set_pending("alice", sample_flow("alice"));
        store.set_authenticated("bob", true);

        assert!(store.pending("bob").is_none());
        assert!(!store.is_authenticated("alice"));
        assert_eq!(store.take_pending("alice").unwrap().state, "state-alice");
    }

    #[test]
    fn session_ids_are_unique() {
        let a = SessionStore::new_session_id();
        let b = SessionStore::new_session_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36); // uuid v4 hyphenated
    }
}
