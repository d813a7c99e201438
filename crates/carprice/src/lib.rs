//! # CarPrice
//!
//! Authenticated client for the car-price prediction API.
//!
//! The client keeps one signed-in session per instance, persists it for
//! the lifetime of the tab (or process), transparently refreshes the
//! access token when a protected call comes back 401, and tells the UI
//! whether a route may render or must redirect to the login view.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use carprice::prelude::*;
//!
//! # async fn run() -> Result<(), CarPriceError> {
//! let client = CarPriceClient::builder()
//!     .base_url("http://localhost:8000")
//!     .build()?;
//!
//! client.login("alice@example.com", "hunter2").await?;
//! assert!(client.guard_route("/prediction").is_render());
//! client.logout().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! ```text
//! carprice (this crate)   ← client facade, config, unified error
//!   carprice-session      ← store, lifecycle manager, route guard
//!   carprice-protocol     ← payload types and JSON codec
//!   carprice-transport    ← HTTP with credential modes
//! ```

mod client;
mod config;
mod error;

pub use client::{CarPriceClient, CarPriceClientBuilder};
pub use config::ClientConfig;
pub use error::CarPriceError;

pub use carprice_protocol as protocol;
pub use carprice_session as session;
pub use carprice_transport as transport;

/// Everything a typical consumer needs, in one import.
pub mod prelude {
    pub use crate::{CarPriceClient, CarPriceClientBuilder, CarPriceError, ClientConfig};
    pub use carprice_protocol::{PredictionRequest, RegisterRequest};
    pub use carprice_session::{
        AuthError, AuthState, Decision, MemoryStorage, Session, Storage, Subscription,
    };
}
