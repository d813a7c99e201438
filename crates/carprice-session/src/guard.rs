//! Route guarding: may the user see this view, or go log in first?
//!
//! [`decide`] is the whole policy: a session present means render,
//! absent means redirect to login with the requested path remembered so
//! the login view can send the user back. It never looks at the token.
//! Whether the token is still good is settled lazily by the
//! protected-call/refresh cycle in the [`SessionManager`](crate::SessionManager).
//!
//! [`RouteGuard`] adds the route table: which paths need a session at
//! all. Public paths always render.

use crate::Session;

/// Where unauthenticated users are sent.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Outcome of a navigation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Render,
    RedirectTo {
        login_path: String,
        return_path: String,
    },
}

impl Decision {
    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render)
    }
}

/// Gates a protected path on session presence, redirecting to
/// [`DEFAULT_LOGIN_PATH`].
///
/// Pure: the same inputs always produce an equal `Decision`, so callers
/// can compare against the previous decision to skip redundant
/// redirects.
pub fn decide(session: Option<&Session>, requested_path: &str) -> Decision {
    decide_with_login(session, requested_path, DEFAULT_LOGIN_PATH)
}

fn decide_with_login(
    session: Option<&Session>,
    requested_path: &str,
    login_path: &str,
) -> Decision {
    match session {
        Some(_) => Decision::Render,
        None => Decision::RedirectTo {
            login_path: login_path.to_owned(),
            return_path: requested_path.to_owned(),
        },
    }
}

/// The login path plus the set of protected route prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    login_path: String,
    protected: Vec<String>,
}

impl Default for RouteGuard {
    /// `/login`, with `/prediction` as the only protected area.
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_PATH).protect("/prediction")
    }
}

impl RouteGuard {
    /// A guard with no protected routes.
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            protected: Vec::new(),
        }
    }

    /// Marks `prefix` (and everything below it) as protected.
    #[must_use]
    pub fn protect(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        self.protected.push(if trimmed.is_empty() {
            "/".to_owned()
        } else {
            trimmed.to_owned()
        });
        self
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn protected_routes(&self) -> &[String] {
        &self.protected
    }

    /// `true` if `path` equals a protected prefix or sits below it.
    /// Query strings and fragments are ignored. The login path itself is
    /// never protected.
    pub fn is_protected(&self, path: &str) -> bool {
        let path = strip_query(path);
        if path == self.login_path {
            return false;
        }
        self.protected.iter().any(|prefix| {
            prefix == "/"
                || path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Renders public paths; applies [`decide`] (with this guard's login
    /// path) to protected ones.
    pub fn evaluate(&self, session: Option<&Session>, requested_path: &str) -> Decision {
        if self.is_protected(requested_path) {
            decide_with_login(session, requested_path, &self.login_path)
        } else {
            Decision::Render
        }
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new("u1", "tok1").unwrap()
    }

    #[test]
    fn test_decide_without_session_redirects_with_return_path() {
        assert_eq!(
            decide(None, "/prediction"),
            Decision::RedirectTo {
                login_path: "/login".into(),
                return_path: "/prediction".into(),
            }
        );
    }

    #[test]
    fn test_decide_with_session_renders() {
        assert_eq!(decide(Some(&session()), "/prediction"), Decision::Render);
    }

    #[test]
    fn test_decide_is_referentially_stable() {
        let s = session();
        assert_eq!(decide(Some(&s), "/x"), decide(Some(&s), "/x"));
        assert_eq!(decide(None, "/x"), decide(None, "/x"));
    }

    #[test]
    fn test_is_protected_matches_whole_segments() {
        let guard = RouteGuard::default();
        assert!(guard.is_protected("/prediction"));
        assert!(guard.is_protected("/prediction/"));
        assert!(guard.is_protected("/prediction/history"));
        assert!(guard.is_protected("/prediction?model=rf"));
        assert!(!guard.is_protected("/predictions"));
        assert!(!guard.is_protected("/"));
        assert!(!guard.is_protected("/prices"));
    }

    #[test]
    fn test_is_protected_root_prefix_covers_all_but_login() {
        let guard = RouteGuard::new("/login").protect("/");
        assert!(guard.is_protected("/settings"));
        assert!(guard.is_protected("/"));
        assert!(!guard.is_protected("/login"));
    }

    #[test]
    fn test_evaluate_public_route_renders_without_session() {
        let guard = RouteGuard::default();
        assert_eq!(guard.evaluate(None, "/about"), Decision::Render);
    }

    #[test]
    fn test_evaluate_protected_route_uses_custom_login_path() {
        let guard = RouteGuard::new("/signin").protect("/prediction");
        assert_eq!(
            guard.evaluate(None, "/prediction?model=rf"),
            Decision::RedirectTo {
                login_path: "/signin".into(),
                return_path: "/prediction?model=rf".into(),
            }
        );
        assert!(guard.evaluate(Some(&session()), "/prediction").is_render());
    }
}
