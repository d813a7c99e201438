//! Client-side session management for the car-price API.
//!
//! This crate handles the lifecycle of the signed-in user:
//!
//! 1. **Storage**: holding the current session and persisting it for
//!    the tab ([`SessionStore`], [`Storage`])
//! 2. **Lifecycle**: login, token refresh, logout, and protected calls
//!    ([`SessionManager`])
//! 3. **Routing**: deciding whether a view renders or redirects to
//!    login ([`decide`], [`RouteGuard`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Client facade (above)  ← exposes login/logout/guard_route to the UI
//!     ↕
//! Session Layer (this crate)  ← owns the session and its state machine
//!     ↕
//! Protocol + Transport (below)  ← payload types, HTTP with credentials
//! ```

mod error;
mod guard;
mod manager;
mod session;
mod store;

pub use error::AuthError;
pub use guard::{DEFAULT_LOGIN_PATH, Decision, RouteGuard, decide};
pub use manager::SessionManager;
pub use session::{AuthState, Session};
pub use store::{MemoryStorage, SessionStore, Storage, Subscription};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `mutex`, recovering the data if a previous holder panicked.
///
/// Every critical section in this crate leaves the data consistent
/// before anything that could panic, so a poisoned lock is safe to reuse.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
