//! HTTP contract for the car-price API client.
//!
//! This crate defines what the session layer sends and expects back:
//!
//! - **Types** ([`LoginResponse`], [`RefreshResponse`], [`ErrorBody`],
//!   [`PersistedSession`], etc.): payloads on the wire and in storage.
//! - **Endpoints** ([`endpoints`]): the paths those payloads travel to.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how payloads are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding.
//!
//! # Architecture
//!
//! ```text
//! Transport (status + bytes) → Protocol (typed payloads) → Session (state machine)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ErrorBody, LoginResponse, PersistedSession, PredictionRequest, RefreshResponse,
    RegisterRequest, STORAGE_KEY, UserRef, endpoints,
};
