//! The session lifecycle manager: login, refresh, logout, and the
//! protected-call cycle.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Establishing a session from credentials (`login`)
//! - Rotating the access token with the cookie-held refresh credential
//!   (`refresh`)
//! - Tearing the session down locally, then remotely (`logout`)
//! - Sending protected calls with the current bearer token and retrying
//!   once through a refresh on 401 (`authorized`)
//!
//! # Concurrency
//!
//! At most one login and one refresh are in flight at any time. The
//! first caller starts the remote call as a spawned Tokio task and
//! parks a [`Shared`] handle to its outcome in a slot. Later callers
//! find the slot occupied and await the same handle, so a double-submit
//! or a burst of 401s costs exactly one request.
//!
//! Spawning means an operation runs to completion even if every caller
//! drops its future. That makes stale results possible, so each
//! operation remembers the store epoch it started under and commits only
//! if no logout happened in between (see [`SessionStore`]).
//!
//! The slot mutex is never held across an `.await`, and never while the
//! store notifies subscribers, so a listener may call back into the
//! manager.

use std::sync::{Arc, Mutex};

use carprice_protocol::{
    Codec, ErrorBody, JsonCodec, LoginResponse, ProtocolError, RefreshResponse, endpoints,
};
use carprice_transport::{ApiRequest, ApiResponse, Transport};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

use crate::{AuthError, AuthState, Session, SessionStore, Subscription, lock};

type LoginFlight = Shared<BoxFuture<'static, Result<Session, AuthError>>>;
type RefreshFlight = Shared<BoxFuture<'static, Option<Session>>>;

/// An in-flight operation: its id, the epoch it started under, and the
/// shared outcome.
struct Flight<F> {
    id: u64,
    epoch: u64,
    outcome: F,
}

/// The outcome of `slot`, unless it started before the latest external
/// store write (`set`, `dispose`). Such a flight can no longer commit, so
/// callers start a fresh one instead of joining it.
fn live<F: Clone>(slot: &Option<Flight<F>>, epoch: u64) -> Option<F> {
    slot.as_ref()
        .filter(|flight| flight.epoch == epoch)
        .map(|flight| flight.outcome.clone())
}

#[derive(Default)]
struct Flights {
    next_id: u64,
    login: Option<Flight<LoginFlight>>,
    refresh: Option<Flight<RefreshFlight>>,
}

impl Flights {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

struct Inner<T> {
    transport: T,
    store: Arc<SessionStore>,
    flights: Mutex<Flights>,
}

/// Drives the session through its lifecycle.
///
/// Cheap to clone: clones share the same store, transport, and in-flight
/// slots.
///
/// ## Lifecycle
///
/// ```text
/// login() ──→ [Authenticated] ──401──→ refresh() ──ok──→ [Authenticated]
///                   │                       │
///                logout()                  fail
///                   ▼                       ▼
///              [Anonymous] ◄────────────────┘
/// ```
pub struct SessionManager<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for SessionManager<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> SessionManager<T> {
    /// Creates a manager that owns the lifecycle of `store`.
    pub fn new(transport: T, store: Arc<SessionStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                store,
                flights: Mutex::new(Flights::default()),
            }),
        }
    }

    /// Current session snapshot.
    pub fn session(&self) -> Option<Session> {
        self.inner.store.get()
    }

    /// The store this manager writes to.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.inner.store
    }

    /// The transport, for calls that need no session (registration, say).
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Current lifecycle state, derived from the in-flight slots and the
    /// store snapshot.
    pub fn state(&self) -> AuthState {
        let flights = lock(&self.inner.flights);
        let epoch = self.inner.store.epoch();
        if live(&flights.login, epoch).is_some() {
            return AuthState::Authenticating;
        }
        let has_session = self.inner.store.get().is_some();
        match (has_session, live(&flights.refresh, epoch).is_some()) {
            (true, true) => AuthState::Refreshing,
            (true, false) => AuthState::Authenticated,
            (false, _) => AuthState::Anonymous,
        }
    }

    /// Registers a listener for session changes.
    pub fn subscribe(
        &self,
        listener: impl Fn(Option<&Session>) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.store.subscribe(listener)
    }

    // =====================================================================
    // login
    // =====================================================================

    /// Exchanges credentials for a session.
    ///
    /// A call made while another login is in flight does not send a
    /// second request. It receives the in-flight outcome, whatever
    /// credentials it was given.
    ///
    /// # Errors
    /// - [`AuthError::InvalidCredentials`]: empty input, or the server
    ///   rejected the credentials (carries the server's message if any)
    /// - [`AuthError::NetworkFailure`]: no response
    /// - [`AuthError::ServerError`]: 5xx or malformed success body
    /// - [`AuthError::Superseded`]: a logout happened mid-flight
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<Session, AuthError> {
        if identifier.trim().is_empty() || secret.is_empty() {
            return Err(AuthError::InvalidCredentials { message: None });
        }

        let outcome = {
            let mut flights = lock(&self.inner.flights);
            let epoch = self.inner.store.epoch();
            match live(&flights.login, epoch) {
                Some(outcome) => {
                    tracing::debug!("joining in-flight login");
                    outcome
                }
                None => {
                    let id = flights.next_id();
                    let request = ApiRequest::post(endpoints::LOGIN)
                        .form([("username", identifier), ("password", secret)])
                        .with_credentials();

                    let inner = Arc::clone(&self.inner);
                    let task = tokio::spawn(async move {
                        let result = inner.run_login(request, epoch).await;
                        inner.finish_login(id);
                        result
                    });
                    let outcome: LoginFlight = async move {
                        task.await
                            .unwrap_or_else(|e| Err(AuthError::NetworkFailure(e.to_string())))
                    }
                    .boxed()
                    .shared();

                    flights.login = Some(Flight {
                        id,
                        epoch,
                        outcome: outcome.clone(),
                    });
                    outcome
                }
            }
        };
        outcome.await
    }

    // =====================================================================
    // refresh
    // =====================================================================

    /// Rotates the access token using the refresh cookie.
    ///
    /// Returns the updated session, or `None` if there was no session to
    /// refresh (no request is sent) or the refresh failed. A failed
    /// refresh clears the session, which subscribers see as a change to
    /// `None`.
    pub async fn refresh(&self) -> Option<Session> {
        let outcome = {
            let mut flights = lock(&self.inner.flights);
            let epoch = self.inner.store.epoch();
            match live(&flights.refresh, epoch) {
                Some(outcome) => {
                    tracing::debug!("joining in-flight refresh");
                    outcome
                }
                None => {
                    let Some(from) = self.inner.store.get() else {
                        tracing::debug!("refresh rejected: no session");
                        return None;
                    };
                    let id = flights.next_id();

                    let inner = Arc::clone(&self.inner);
                    let task = tokio::spawn(async move {
                        let result = inner.run_refresh(from, epoch).await;
                        inner.finish_refresh(id);
                        result
                    });
                    let outcome: RefreshFlight =
                        async move { task.await.unwrap_or(None) }.boxed().shared();

                    flights.refresh = Some(Flight {
                        id,
                        epoch,
                        outcome: outcome.clone(),
                    });
                    outcome
                }
            }
        };
        outcome.await
    }

    // =====================================================================
    // logout
    // =====================================================================

    /// Ends the session.
    ///
    /// The local session is cleared before the first `.await`, and any
    /// in-flight login or refresh is superseded. The remote invalidation
    /// is best-effort: failures are logged and swallowed. When there is
    /// no session and nothing in flight this is a no-op.
    pub async fn logout(&self) {
        let had_session = self.inner.store.get().is_some();
        let busy = {
            let flights = lock(&self.inner.flights);
            flights.login.is_some() || flights.refresh.is_some()
        };
        if !had_session && !busy {
            tracing::debug!("logout: already anonymous");
            return;
        }

        self.inner.store.set(None);
        self.inner.drop_stale_flights();
        tracing::info!("session cleared by logout");

        if !had_session {
            return;
        }

        let request = ApiRequest::post(endpoints::LOGOUT).with_credentials();
        match self.inner.transport.send(request).await {
            Ok(resp) if resp.is_success() => {
                tracing::debug!("remote logout acknowledged");
            }
            Ok(resp) => {
                tracing::warn!(status = resp.status, "remote logout rejected");
            }
            Err(e) => {
                tracing::warn!(error = %e, "remote logout failed");
            }
        }
    }

    // =====================================================================
    // Protected calls
    // =====================================================================

    /// Sends a protected call with the current bearer token.
    ///
    /// On 401 the token is refreshed once and the call retried. A second
    /// 401 is returned as [`AuthError::Unauthorized`] without refreshing
    /// again. Non-401 responses, including other error statuses, are
    /// returned as-is for the caller to interpret.
    ///
    /// # Errors
    /// - [`AuthError::NotAuthenticated`]: no session to begin with
    /// - [`AuthError::SessionExpired`]: the refresh failed (session cleared)
    /// - [`AuthError::Unauthorized`]: still 401 after refreshing
    /// - [`AuthError::NetworkFailure`]: no response
    pub async fn authorized(&self, request: ApiRequest) -> Result<ApiResponse, AuthError> {
        let session = self.session().ok_or(AuthError::NotAuthenticated)?;
        let response = self.send_as(&session, request.clone()).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        // Another caller may have rotated the token while this request
        // was in flight. If so, retry with it instead of refreshing again.
        let current = match self.session() {
            Some(current) if current.access_token() != session.access_token() => current,
            Some(_) => {
                tracing::debug!(path = %request.path, "protected call unauthorized, refreshing");
                let refreshed = self.refresh().await;
                // A refresh that lost to a concurrent login still leaves a
                // usable session behind.
                match (refreshed, self.session()) {
                    (_, Some(current)) if current.access_token() != session.access_token() => {
                        current
                    }
                    (Some(_), Some(current)) => current,
                    _ => return Err(AuthError::SessionExpired),
                }
            }
            None => return Err(AuthError::SessionExpired),
        };

        let path = request.path.clone();
        let retry = self.send_as(&current, request).await?;
        if retry.is_unauthorized() {
            tracing::warn!(%path, "still unauthorized after refresh");
            return Err(AuthError::Unauthorized);
        }
        Ok(retry)
    }

    async fn send_as(
        &self,
        session: &Session,
        request: ApiRequest,
    ) -> Result<ApiResponse, AuthError> {
        self.inner
            .transport
            .send(request.bearer(session.access_token()))
            .await
            .map_err(|e| AuthError::NetworkFailure(e.to_string()))
    }
}

impl<T: Transport> Inner<T> {
    async fn run_login(&self, request: ApiRequest, epoch: u64) -> Result<Session, AuthError> {
        let response = self.transport.send(request).await.map_err(|e| {
            tracing::warn!(error = %e, "login request failed");
            AuthError::NetworkFailure(e.to_string())
        })?;

        if !response.is_success() {
            let err = rejection(&response, |message| AuthError::InvalidCredentials { message });
            tracing::info!(status = response.status, "login rejected");
            return Err(err);
        }

        let status = response.status;
        let body: LoginResponse = JsonCodec.decode(&response.body).map_err(|e| {
            tracing::warn!(error = %e, "malformed login response");
            AuthError::ServerError { status }
        })?;
        let session = Session::new(body.user.to_string(), body.access_token)
            .ok_or_else(|| {
                ProtocolError::InvalidPayload("login response missing subject or token".into())
            })
            .map_err(|e| {
                tracing::warn!(error = %e, "malformed login response");
                AuthError::ServerError { status }
            })?;

        if !self.store.commit_if_epoch(epoch, session.clone()) {
            tracing::info!("login result discarded: superseded by logout");
            return Err(AuthError::Superseded);
        }
        tracing::info!(subject = %session.subject(), "session created");
        Ok(session)
    }

    async fn run_refresh(&self, from: Session, epoch: u64) -> Option<Session> {
        let request = ApiRequest::post(endpoints::REFRESH).with_credentials();
        let token = match self.transport.send(request).await {
            Ok(resp) if resp.is_success() => JsonCodec
                .decode::<RefreshResponse>(&resp.body)
                .map_err(|e| tracing::warn!(error = %e, "malformed refresh response"))
                .ok()
                .map(|body| body.access_token),
            Ok(resp) => {
                tracing::info!(status = resp.status, "refresh rejected");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "refresh request failed");
                None
            }
        };

        match token.and_then(|token| from.with_token(token)) {
            Some(rotated) => {
                if self
                    .store
                    .commit_if_current(epoch, &from, Some(rotated.clone()))
                {
                    tracing::info!(subject = %rotated.subject(), "access token rotated");
                    Some(rotated)
                } else {
                    tracing::info!("refresh result discarded: session changed meanwhile");
                    None
                }
            }
            None => {
                if self.store.commit_if_current(epoch, &from, None) {
                    tracing::info!(subject = %from.subject(), "session ended: refresh failed");
                }
                None
            }
        }
    }

    fn finish_login(&self, id: u64) {
        let mut flights = lock(&self.flights);
        if flights.login.as_ref().is_some_and(|f| f.id == id) {
            flights.login = None;
        }
    }

    fn finish_refresh(&self, id: u64) {
        let mut flights = lock(&self.flights);
        if flights.refresh.as_ref().is_some_and(|f| f.id == id) {
            flights.refresh = None;
        }
    }

    /// Forgets flights started before the latest external write, so new
    /// callers start fresh instead of joining an outcome that can no
    /// longer commit.
    fn drop_stale_flights(&self) {
        let epoch = self.store.epoch();
        let mut flights = lock(&self.flights);
        if flights.login.as_ref().is_some_and(|f| f.epoch != epoch) {
            flights.login = None;
        }
        if flights.refresh.as_ref().is_some_and(|f| f.epoch != epoch) {
            flights.refresh = None;
        }
    }
}

/// Turns a non-2xx response into an error.
///
/// 5xx always maps to a generic [`AuthError::ServerError`]; the body is
/// never echoed. For 4xx, `client_error` receives the server's
/// user-facing `detail` when one was sent.
pub(crate) fn rejection(
    response: &ApiResponse,
    client_error: impl FnOnce(Option<String>) -> AuthError,
) -> AuthError {
    if response.is_server_error() {
        return AuthError::ServerError {
            status: response.status,
        };
    }
    let message = JsonCodec
        .decode::<ErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.message().map(str::to_owned));
    client_error(message)
}
