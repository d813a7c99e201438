//! Signs in, requests one prediction, and signs out again.
//!
//! ```text
//! CARPRICE_EMAIL=alice@example.com CARPRICE_PASSWORD=... \
//! RUST_LOG=carprice_session=debug cargo run -p predict-cli
//! ```
//!
//! `CARPRICE_VEHICLE` may hold the vehicle as JSON (server field names);
//! otherwise a sample car is used.

use std::env;

use carprice::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_MODEL: &str = "prices_prediction";

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

fn sample_vehicle() -> PredictionRequest {
    PredictionRequest {
        brand: "Toyota".into(),
        model: "RAV4".into(),
        year: 2006,
        engine_size: 1.3,
        fuel_type: "Hybrid".into(),
        transmission: "Manual".into(),
        mileage: 195_129,
        doors: 4,
        owner_count: 5,
    }
}

fn vehicle_from(raw: Option<String>) -> Result<PredictionRequest, serde_json::Error> {
    match raw {
        Some(json) => serde_json::from_str(&json),
        None => Ok(sample_vehicle()),
    }
}

fn required(key: &str) -> Result<String, String> {
    env::var(key).map_err(|_| format!("{key} is not set"))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let email = required("CARPRICE_EMAIL")?;
    let password = required("CARPRICE_PASSWORD")?;
    let model = env::var("CARPRICE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_owned());
    let vehicle = vehicle_from(env::var("CARPRICE_VEHICLE").ok())?;

    let client = CarPriceClient::from_env()?;
    let _watch = client.on_session_change(|session| match session {
        Some(s) => tracing::info!(subject = %s.subject(), "signed in"),
        None => tracing::info!("signed out"),
    });

    if let Err(e) = client.login(&email, &password).await {
        eprintln!("login failed: {}", e.user_message());
        return Err(e.into());
    }

    match client.guard_route("/prediction") {
        Decision::Render => {}
        Decision::RedirectTo { login_path, .. } => {
            eprintln!("session lost, please sign in again at {login_path}");
            return Ok(());
        }
    }

    match client.predict_and_save(&model, &vehicle).await {
        Ok(saved) => println!("{}", serde_json::to_string_pretty(&saved)?),
        Err(e) => eprintln!("prediction failed: {}", e.user_message()),
    }

    client.logout().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_from_unset_uses_sample() {
        assert_eq!(vehicle_from(None).unwrap(), sample_vehicle());
    }

    #[test]
    fn test_vehicle_from_json_uses_server_field_names() {
        let raw = r#"{"Brand":"Ford","Model":"Focus","Year":2015,"Engine_Size":1.6,
            "Fuel_Type":"Petrol","Transmission":"Automatic","Mileage":80000,
            "Doors":5,"Owner_Count":2}"#;
        let vehicle = vehicle_from(Some(raw.to_owned())).unwrap();
        assert_eq!(vehicle.brand, "Ford");
        assert_eq!(vehicle.mileage, 80_000);
    }

    #[test]
    fn test_vehicle_from_bad_json_fails() {
        assert!(vehicle_from(Some("{\"Brand\":\"Ford\"}".into())).is_err());
    }
}
