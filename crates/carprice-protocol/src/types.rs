//! Payload types for the car-price API contract.
//!
//! Everything here is a plain serde struct mirroring what travels over
//! HTTP (or into session storage). Field names follow the server's JSON
//! exactly, including the capitalized vehicle attributes the prediction
//! endpoint expects.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// API paths, relative to the base URL.
pub mod endpoints {
    /// `POST`, form `{username, password}`, credentials included.
    pub const LOGIN: &str = "/auth/login";
    /// `POST`, empty body, credentials included.
    pub const REFRESH: &str = "/auth/refresh";
    /// `POST`, empty body, credentials included.
    pub const LOGOUT: &str = "/auth/logout";
    /// `POST`, JSON [`RegisterRequest`](crate::RegisterRequest).
    pub const REGISTER: &str = "/users/register";

    /// `POST`, JSON [`PredictionRequest`](crate::PredictionRequest),
    /// bearer required.
    pub fn predict_save(model_name: &str, user_id: &str) -> String {
        format!("/predict/save/{model_name}/{user_id}")
    }
}

// ---------------------------------------------------------------------------
// Auth responses
// ---------------------------------------------------------------------------

/// The user reference returned by `/auth/login`.
///
/// The server sends a UUID string today, but older deployments used
/// integer ids. `#[serde(untagged)]` tries each variant in order, so
/// both shapes decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Text(String),
    Number(u64),
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Body of a successful `/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user: UserRef,
}

/// Body of a successful `/auth/refresh`. Only the token rotates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Error body shape used by the server: `{"detail": ...}`.
///
/// `detail` is a string for deliberate rejections ("invalid
/// credentials") and a structured list for request-validation failures.
/// Only the string form is meant for end users.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// The human-readable `detail`, if the server sent a non-empty string.
    pub fn message(&self) -> Option<&str> {
        match &self.detail {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted session record
// ---------------------------------------------------------------------------

/// Storage key under which the session record is kept.
pub const STORAGE_KEY: &str = "user";

/// The session as written to tab-scoped storage:
/// `{"subject": "...", "accessToken": "..."}`.
///
/// This is the raw record. It is NOT guaranteed to satisfy the session
/// invariant (both fields non-empty); the session layer validates it on
/// load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub subject: String,
    pub access_token: String,
}

// ---------------------------------------------------------------------------
// Consumer payloads
// ---------------------------------------------------------------------------

/// Body of `POST /users/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
}

/// Vehicle attributes submitted to the prediction endpoint.
///
/// The server's field names are capitalized, hence the renames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Engine_Size")]
    pub engine_size: f64,
    #[serde(rename = "Fuel_Type")]
    pub fuel_type: String,
    #[serde(rename = "Transmission")]
    pub transmission: String,
    #[serde(rename = "Mileage")]
    pub mileage: u32,
    #[serde(rename = "Doors")]
    pub doors: u8,
    #[serde(rename = "Owner_Count")]
    pub owner_count: u8,
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;

    #[test]
    fn test_predict_save_path() {
        assert_eq!(
            endpoints::predict_save("prices_prediction", "u1"),
            "/predict/save/prices_prediction/u1"
        );
    }

    #[test]
    fn test_error_body_message_only_for_strings() {
        let text: ErrorBody =
            serde_json::from_str(r#"{"detail":"Credenciales inválidas"}"#).unwrap();
        assert_eq!(text.message(), Some("Credenciales inválidas"));

        let list: ErrorBody =
            serde_json::from_str(r#"{"detail":[{"loc":["body","username"]}]}"#).unwrap();
        assert_eq!(list.message(), None);

        let blank: ErrorBody = serde_json::from_str(r#"{"detail":"  "}"#).unwrap();
        assert_eq!(blank.message(), None);

        let missing: ErrorBody = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.message(), None);
    }

    #[test]
    fn test_prediction_request_uses_server_field_names() {
        let req = PredictionRequest {
            brand: "Toyota".into(),
            model: "RAV4".into(),
            year: 2006,
            engine_size: 1.3,
            fuel_type: "Hybrid".into(),
            transmission: "Manual".into(),
            mileage: 195_129,
            doors: 4,
            owner_count: 5,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["Brand"], "Toyota");
        assert_eq!(value["Engine_Size"], 1.3);
        assert_eq!(value["Owner_Count"], 5);
        assert!(value.get("brand").is_none());
    }

    #[test]
    fn test_persisted_session_uses_camel_case() {
        let record: PersistedSession =
            serde_json::from_str(r#"{"subject":"u1","accessToken":"tok1"}"#).unwrap();
        assert_eq!(record.access_token, "tok1");
    }
}
