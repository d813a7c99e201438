//! `CarPriceClient` builder and consumer surface.
//!
//! This is the entry point for UI code. It ties together all the layers:
//! transport → protocol → session, and adds the two API calls the app
//! makes on its own behalf (registration and saving a prediction).

use std::sync::Arc;
use std::time::Duration;

use carprice_protocol::{Codec, JsonCodec, PredictionRequest, ProtocolError, RegisterRequest, endpoints};
use carprice_session::{
    AuthError, AuthState, Decision, MemoryStorage, RouteGuard, Session, SessionManager,
    SessionStore, Storage, Subscription,
};
use carprice_transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

use crate::{CarPriceError, ClientConfig};

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring a [`CarPriceClient`].
///
/// # Example
///
/// ```rust,no_run
/// use carprice::prelude::*;
///
/// # fn run() -> Result<(), CarPriceError> {
/// let client = CarPriceClient::builder()
///     .base_url("https://api.example.test")
///     .protect("/history")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct CarPriceClientBuilder {
    config: ClientConfig,
    storage: Box<dyn Storage>,
}

impl CarPriceClientBuilder {
    /// Creates a builder with default config and in-memory storage.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            storage: Box::new(MemoryStorage::new()),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Sets the login view path used for redirects.
    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.config.login_path = path.into();
        self
    }

    /// Adds a protected route prefix.
    pub fn protect(mut self, prefix: impl Into<String>) -> Self {
        self.config.protected_routes.push(prefix.into());
        self
    }

    /// Sets the key the session record is persisted under.
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.config.storage_key = key.into();
        self
    }

    /// Sets a per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    /// Sets the persistence backend. A previously saved session in it is
    /// restored when the client is built.
    pub fn storage(mut self, storage: impl Storage) -> Self {
        self.storage = Box::new(storage);
        self
    }

    /// Builds a client over HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`CarPriceError::Transport`] if the HTTP client could not
    /// be constructed.
    pub fn build(self) -> Result<CarPriceClient<HttpTransport>, CarPriceError> {
        let transport =
            HttpTransport::with_timeout(self.config.base_url.clone(), self.config.request_timeout)?;
        Ok(self.build_with(transport))
    }

    /// Builds a client over any [`Transport`].
    pub fn build_with<T: Transport>(self, transport: T) -> CarPriceClient<T> {
        let store = Arc::new(SessionStore::open_with_key(
            self.storage,
            self.config.storage_key.clone(),
        ));
        let guard = self.config.route_guard();
        tracing::info!(
            base_url = %self.config.base_url,
            restored = store.get().is_some(),
            "car-price client ready"
        );

        CarPriceClient {
            manager: SessionManager::new(transport, store),
            guard,
        }
    }
}

impl Default for CarPriceClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// The car-price API client.
///
/// Cheap to clone: clones share the session, its subscribers, and the
/// in-flight login/refresh slots.
pub struct CarPriceClient<T: Transport = HttpTransport> {
    manager: SessionManager<T>,
    guard: RouteGuard,
}

impl<T: Transport> Clone for CarPriceClient<T> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            guard: self.guard.clone(),
        }
    }
}

impl CarPriceClient<HttpTransport> {
    /// Creates a new builder.
    pub fn builder() -> CarPriceClientBuilder {
        CarPriceClientBuilder::new()
    }

    /// Builds an HTTP client configured from `CARPRICE_*` variables.
    pub fn from_env() -> Result<Self, CarPriceError> {
        CarPriceClientBuilder::new()
            .config(ClientConfig::from_env()?)
            .build()
    }
}

impl<T: Transport> CarPriceClient<T> {
    // -- Session -----------------------------------------------------------

    /// The signed-in user, if any.
    pub fn session(&self) -> Option<Session> {
        self.manager.session()
    }

    pub fn state(&self) -> AuthState {
        self.manager.state()
    }

    /// See [`SessionManager::login`].
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<Session, AuthError> {
        self.manager.login(identifier, secret).await
    }

    /// See [`SessionManager::logout`].
    pub async fn logout(&self) {
        self.manager.logout().await;
    }

    /// See [`SessionManager::refresh`].
    pub async fn refresh(&self) -> Option<Session> {
        self.manager.refresh().await
    }

    /// Calls `listener` with the new snapshot after every session change
    /// until the returned [`Subscription`] is dropped.
    pub fn on_session_change(
        &self,
        listener: impl Fn(Option<&Session>) + Send + Sync + 'static,
    ) -> Subscription {
        self.manager.subscribe(listener)
    }

    /// Should the view at `path` render, or redirect to login?
    pub fn guard_route(&self, path: &str) -> Decision {
        self.guard.evaluate(self.session().as_ref(), path)
    }

    pub fn route_guard(&self) -> &RouteGuard {
        &self.guard
    }

    /// The underlying lifecycle manager, for protected calls this client
    /// doesn't wrap.
    pub fn manager(&self) -> &SessionManager<T> {
        &self.manager
    }

    /// Tears the client down: forgets the in-memory session and every
    /// subscriber. The persisted record survives.
    pub fn dispose(&self) {
        self.manager.store().dispose();
    }

    // -- API calls ---------------------------------------------------------

    /// Creates an account. Public: no session needed, none created.
    ///
    /// # Errors
    /// - [`CarPriceError::Auth`] with [`AuthError::Rejected`]: the
    ///   server refused (e.g. email taken); carries its message
    /// - [`CarPriceError::Auth`] with [`AuthError::ServerError`]: 5xx
    /// - [`CarPriceError::Transport`]: no response
    pub async fn register(
        &self,
        request: &RegisterRequest,
    ) -> Result<serde_json::Value, CarPriceError> {
        let body = serde_json::to_value(request).map_err(ProtocolError::Encode)?;
        let response = self
            .manager
            .transport()
            .send(ApiRequest::post(endpoints::REGISTER).json(body))
            .await?;
        tracing::info!(status = response.status, "registration answered");
        into_json(response)
    }

    /// Requests a price prediction with `model_name` and saves it to the
    /// signed-in user's history. Returns the server's JSON as-is.
    ///
    /// Goes through [`SessionManager::authorized`], so an expired access
    /// token is refreshed once behind the scenes.
    ///
    /// # Errors
    /// - [`AuthError::NotAuthenticated`]: nobody is signed in
    /// - [`AuthError::SessionExpired`] / [`AuthError::Unauthorized`]:
    ///   the refresh cycle failed
    /// - [`AuthError::Rejected`]: the server refused the vehicle data
    pub async fn predict_and_save(
        &self,
        model_name: &str,
        request: &PredictionRequest,
    ) -> Result<serde_json::Value, CarPriceError> {
        let session = self.session().ok_or(AuthError::NotAuthenticated)?;
        let body = serde_json::to_value(request).map_err(ProtocolError::Encode)?;
        let path = endpoints::predict_save(model_name, session.subject());

        let response = self
            .manager
            .authorized(ApiRequest::post(path).json(body))
            .await?;
        tracing::debug!(status = response.status, model = model_name, "prediction answered");
        into_json(response)
    }
}

/// Decodes a 2xx body as JSON (empty → `null`), or classifies the error.
fn into_json(response: ApiResponse) -> Result<serde_json::Value, CarPriceError> {
    if !response.is_success() {
        return Err(AuthError::from_response(&response).into());
    }
    if response.body.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    Ok(JsonCodec.decode(&response.body)?)
}
