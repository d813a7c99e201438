//! Client configuration.
//!
//! [`ClientConfig`] gathers everything that differs between deployments:
//! where the API lives, which views need a session, and where the
//! session is persisted. Every field has a sensible local-development
//! default, so `ClientConfig::default()` talks to a server on
//! `localhost:8000`.

use std::time::Duration;

use carprice_protocol::STORAGE_KEY;
use carprice_session::{DEFAULT_LOGIN_PATH, RouteGuard};

use crate::CarPriceError;

/// Base URL of the API.
pub const API_URL_VAR: &str = "CARPRICE_API_URL";
/// Path of the login view.
pub const LOGIN_ROUTE_VAR: &str = "CARPRICE_LOGIN_ROUTE";
/// Comma-separated protected route prefixes.
pub const PROTECTED_ROUTES_VAR: &str = "CARPRICE_PROTECTED_ROUTES";
/// Per-request timeout in whole seconds. `0` disables it.
pub const TIMEOUT_SECS_VAR: &str = "CARPRICE_TIMEOUT_SECS";

const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Settings for a [`CarPriceClient`](crate::CarPriceClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API base URL, without a trailing slash.
    pub base_url: String,

    /// Where unauthenticated users are redirected.
    pub login_path: String,

    /// Route prefixes that require a session. Everything else is public.
    pub protected_routes: Vec<String>,

    /// Storage key of the persisted session record.
    pub storage_key: String,

    /// Per-request timeout. `None` waits as long as the server takes.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_owned(),
            login_path: DEFAULT_LOGIN_PATH.to_owned(),
            protected_routes: vec!["/prediction".to_owned()],
            storage_key: STORAGE_KEY.to_owned(),
            request_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Reads overrides from the process environment.
    ///
    /// Reads:
    /// - `CARPRICE_API_URL`: API base URL
    /// - `CARPRICE_LOGIN_ROUTE`: login view path
    /// - `CARPRICE_PROTECTED_ROUTES`: comma-separated prefixes (set but
    ///   blank means no protected routes)
    /// - `CARPRICE_TIMEOUT_SECS`: request timeout, `0` for none
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CarPriceError::Config`] if the timeout is not a whole
    /// number of seconds.
    pub fn from_env() -> Result<Self, CarPriceError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through
    /// `lookup` instead of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CarPriceError> {
        let mut config = Self::default();

        if let Some(url) = non_blank(lookup(API_URL_VAR)) {
            config.base_url = url.trim_end_matches('/').to_owned();
        }
        if let Some(path) = non_blank(lookup(LOGIN_ROUTE_VAR)) {
            config.login_path = path;
        }
        if let Some(routes) = lookup(PROTECTED_ROUTES_VAR) {
            config.protected_routes = routes
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_owned)
                .collect();
        }
        if let Some(secs) = non_blank(lookup(TIMEOUT_SECS_VAR)) {
            let secs: u64 = secs.parse().map_err(|_| {
                CarPriceError::Config(format!(
                    "{TIMEOUT_SECS_VAR} must be a whole number of seconds, got {secs:?}"
                ))
            })?;
            config.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        tracing::debug!(
            base_url = %config.base_url,
            login_path = %config.login_path,
            protected = ?config.protected_routes,
            "client config loaded"
        );
        Ok(config)
    }

    /// The route table described by this config.
    pub fn route_guard(&self) -> RouteGuard {
        self.protected_routes
            .iter()
            .fold(RouteGuard::new(self.login_path.clone()), |guard, prefix| {
                guard.protect(prefix.as_str())
            })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_empty_env_uses_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.storage_key, "user");
        assert_eq!(config.request_timeout, None);
    }

    #[test]
    fn test_from_lookup_parses_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            (API_URL_VAR, "https://api.example.test/"),
            (LOGIN_ROUTE_VAR, "/signin"),
            (PROTECTED_ROUTES_VAR, "/prediction, /history ,,"),
            (TIMEOUT_SECS_VAR, "15"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "https://api.example.test");
        assert_eq!(config.login_path, "/signin");
        assert_eq!(config.protected_routes, vec!["/prediction", "/history"]);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_from_lookup_blank_routes_protects_nothing() {
        let config = ClientConfig::from_lookup(lookup(&[(PROTECTED_ROUTES_VAR, " ")])).unwrap();
        assert!(config.protected_routes.is_empty());
    }

    #[test]
    fn test_from_lookup_zero_timeout_disables_it() {
        let config = ClientConfig::from_lookup(lookup(&[(TIMEOUT_SECS_VAR, "0")])).unwrap();
        assert_eq!(config.request_timeout, None);
    }

    #[test]
    fn test_from_lookup_bad_timeout_is_config_error() {
        let err = ClientConfig::from_lookup(lookup(&[(TIMEOUT_SECS_VAR, "soon")])).unwrap_err();
        assert!(matches!(err, CarPriceError::Config(_)));
        assert!(err.to_string().contains(TIMEOUT_SECS_VAR));
    }

    #[test]
    fn test_route_guard_reflects_config() {
        let config = ClientConfig {
            login_path: "/signin".into(),
            protected_routes: vec!["/prediction".into(), "/history".into()],
            ..ClientConfig::default()
        };
        let guard = config.route_guard();

        assert_eq!(guard.login_path(), "/signin");
        assert!(guard.is_protected("/history/42"));
        assert!(!guard.is_protected("/about"));
    }
}
