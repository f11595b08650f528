//! Session state for one EPF login
//!
//! The token key is single use: every response carries the one to send next,
//! and a request that replays an older token is rejected. A [`Session`] is
//! owned by exactly one client and mutated only through `&mut` access, so two
//! calls can never race on the token.

use crate::headers::HeaderParams;
use serde_json::{Map, Value};
use std::fmt;

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated,
    Closed,
}

/// Outcome of the most recent exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestOutcome {
    #[default]
    Unknown,
    Succeeded,
    Failed,
}

/// Login credentials issued with the EPF subscription
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Mutable protocol state carried between calls
#[derive(Clone, Default)]
pub struct Session {
    logon_key: Option<String>,
    token_key: Option<String>,
    state: SessionState,
    last_request: RequestOutcome,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Session")
            .field("logon_key", &redact(&self.logon_key))
            .field("token_key", &redact(&self.token_key))
            .field("state", &self.state)
            .field("last_request", &self.last_request)
            .finish()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logon_key(&self) -> Option<&str> {
        self.logon_key.as_deref()
    }

    pub fn token_key(&self) -> Option<&str> {
        self.token_key.as_deref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn last_request(&self) -> RequestOutcome {
        self.last_request
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// Add `logonkey`/`tokenkey` to an outgoing JSON payload once known
    pub fn attach_keys(&self, payload: &mut Map<String, Value>) {
        if let Some(ref logon) = self.logon_key {
            payload.insert("logonkey".to_string(), Value::String(logon.clone()));
        }
        if let Some(ref token) = self.token_key {
            payload.insert("tokenkey".to_string(), Value::String(token.clone()));
        }
    }

    /// Take the next keys from a response; absent headers leave the old value
    pub fn rotate(&mut self, headers: &HeaderParams) {
        if let Some(logon) = headers.logon_key() {
            self.logon_key = Some(logon.to_string());
        }
        if let Some(token) = headers.token_key() {
            self.token_key = Some(token.to_string());
        }
    }

    pub(crate) fn begin_request(&mut self) {
        self.last_request = RequestOutcome::Unknown;
    }

    pub(crate) fn record_outcome(&mut self, succeeded: bool) {
        self.last_request = if succeeded {
            RequestOutcome::Succeeded
        } else {
            RequestOutcome::Failed
        };
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_attaches_nothing() {
        let session = Session::new();
        let mut payload = Map::new();
        session.attach_keys(&mut payload);
        assert!(payload.is_empty());
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert_eq!(session.last_request(), RequestOutcome::Unknown);
    }

    #[test]
    fn test_rotate_replaces_token_each_time() {
        let mut session = Session::new();
        session.rotate(&HeaderParams::parse("User-Logonkey: L1\r\nUser-Tokenkey: T1\r\n"));
        session.rotate(&HeaderParams::parse("User-Tokenkey: T2\r\n"));

        assert_eq!(session.logon_key(), Some("L1"));
        assert_eq!(session.token_key(), Some("T2"));

        let mut payload = Map::new();
        session.attach_keys(&mut payload);
        assert_eq!(payload["logonkey"], "L1");
        assert_eq!(payload["tokenkey"], "T2");
    }

    #[test]
    fn test_rotate_without_headers_keeps_keys() {
        let mut session = Session::new();
        session.rotate(&HeaderParams::parse("User-Tokenkey: T1\r\n"));
        session.rotate(&HeaderParams::default());
        assert_eq!(session.token_key(), Some("T1"));
    }

    #[test]
    fn test_outcome_tracking() {
        let mut session = Session::new();
        session.record_outcome(false);
        assert_eq!(session.last_request(), RequestOutcome::Failed);
        session.begin_request();
        assert_eq!(session.last_request(), RequestOutcome::Unknown);
        session.record_outcome(true);
        assert_eq!(session.last_request(), RequestOutcome::Succeeded);
    }

    #[test]
    fn test_session_debug_hides_keys() {
        let mut session = Session::new();
        session.rotate(&HeaderParams::parse("User-Logonkey: L-secret\r\nUser-Tokenkey: T-secret\r\n"));
        let rendered = format!("{:?}", session);
        assert!(!rendered.contains("L-secret"));
        assert!(!rendered.contains("T-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("ops@example.com", "hunter2");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("ops@example.com"));
        assert!(!rendered.contains("hunter2"));
    }
}
