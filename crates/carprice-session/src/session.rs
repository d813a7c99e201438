//! Session types: the data structures that represent the signed-in user.
//!
//! A "session" is the client's record of who is logged in. It tracks:
//! - WHO the user is (`subject`, an opaque id from the server)
//! - HOW to prove it on protected calls (`access_token`, a bearer token)
//!
//! The refresh credential is deliberately absent. It is an HTTP-only
//! cookie the transport's jar keeps out of reach, and its presence is
//! only ever inferred from whether `/auth/refresh` succeeds.

use std::fmt;

use carprice_protocol::PersistedSession;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// An authenticated identity plus its current access token.
///
/// Fields are private and [`Session::new`] rejects empty values, so a
/// half-populated session cannot exist. Code that holds a `Session` can
/// rely on both fields being non-empty. "No session" is `Option::None`.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    subject: String,
    access_token: String,
}

impl Session {
    /// Creates a session, or `None` if either field is empty.
    pub fn new(subject: impl Into<String>, access_token: impl Into<String>) -> Option<Self> {
        let subject = subject.into();
        let access_token = access_token.into();
        if subject.is_empty() || access_token.is_empty() {
            return None;
        }
        Some(Self {
            subject,
            access_token,
        })
    }

    /// The opaque user identifier.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The bearer credential for protected calls.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the same subject with a rotated token, or `None` if the
    /// new token is empty.
    pub fn with_token(&self, access_token: impl Into<String>) -> Option<Self> {
        Self::new(self.subject.clone(), access_token)
    }

    /// Validates a record read back from storage.
    pub fn from_record(record: PersistedSession) -> Option<Self> {
        Self::new(record.subject, record.access_token)
    }

    /// The storage representation.
    pub fn to_record(&self) -> PersistedSession {
        PersistedSession {
            subject: self.subject.clone(),
            access_token: self.access_token.clone(),
        }
    }
}

/// Tokens stay out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("subject", &self.subject)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AuthState
// ---------------------------------------------------------------------------

/// Where the session lifecycle currently is.
///
/// ```text
///   Anonymous ──login()──→ Authenticating ──ok──→ Authenticated
///       ↑                        │                   │     ↑
///       └────────fail────────────┘           refresh()    ok
///       ↑                                            ↓     │
///       └──────────────fail / logout()────────── Refreshing
/// ```
///
/// This value is derived on demand from the store snapshot and the
/// in-flight operation slots, never stored, so it cannot drift out of
/// sync with the session itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No session, nothing in flight.
    Anonymous,
    /// A login request is in flight.
    Authenticating,
    /// A session exists and no refresh is running.
    Authenticated,
    /// A session exists and its token is being refreshed.
    Refreshing,
}

impl AuthState {
    /// `true` while a session exists, including mid-refresh.
    pub fn has_session(&self) -> bool {
        matches!(self, Self::Authenticated | Self::Refreshing)
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "Anonymous"),
            Self::Authenticating => write!(f, "Authenticating"),
            Self::Authenticated => write!(f, "Authenticated"),
            Self::Refreshing => write!(f, "Refreshing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_fields() {
        assert!(Session::new("", "tok1").is_none());
        assert!(Session::new("u1", "").is_none());
        assert!(Session::new("u1", "tok1").is_some());
    }

    #[test]
    fn test_with_token_preserves_subject() {
        let s = Session::new("u1", "tok1").unwrap();
        let rotated = s.with_token("tok2").unwrap();
        assert_eq!(rotated.subject(), "u1");
        assert_eq!(rotated.access_token(), "tok2");
        assert!(s.with_token("").is_none());
    }

    #[test]
    fn test_from_record_validates_invariant() {
        let bad = PersistedSession {
            subject: "u1".into(),
            access_token: String::new(),
        };
        assert!(Session::from_record(bad).is_none());

        let good = Session::new("u1", "tok1").unwrap();
        assert_eq!(Session::from_record(good.to_record()), Some(good));
    }

    #[test]
    fn test_debug_redacts_token() {
        let s = Session::new("u1", "very-secret-token").unwrap();
        let printed = format!("{s:?}");
        assert!(printed.contains("u1"));
        assert!(!printed.contains("very-secret-token"));
    }

    #[test]
    fn test_auth_state_has_session() {
        assert!(!AuthState::Anonymous.has_session());
        assert!(!AuthState::Authenticating.has_session());
        assert!(AuthState::Authenticated.has_session());
        assert!(AuthState::Refreshing.has_session());
        assert_eq!(AuthState::Refreshing.to_string(), "Refreshing");
    }
}
