//! RecognitionClient - Remote Recognition Backend Adapter
//!
//! ## Responsibilities
//!
//! - Submit frames to the detection endpoint (multipart JPEG upload)
//! - Vehicle metadata lookup
//! - Entry/exit registration and new-vehicle registration
//! - Typed response parsing (no stringly-typed state branching)
//!
//! Every call carries the operator identity in the `id` header.

use crate::error::{Error, Result};
use crate::plate;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Registration state reported by the backend for a detected plate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    Registered,
    Unregistered,
    Error,
}

/// Structured owner/vehicle metadata, meaningful only for registered plates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleDetails {
    pub vehicle_type: String,
    pub owner: String,
    pub national_id: String,
}

/// Parsed outcome of one detection call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    pub state: RegistrationState,

    /// Detected plate text; may be empty when detection failed
    #[serde(default)]
    pub plate_text: String,

    /// Base64 JPEG crop of the plate region, display only
    #[serde(default)]
    pub plate_image: Option<String>,

    /// Whether the backend reports an open entry for this plate
    #[serde(default)]
    pub entry_already_logged: bool,

    #[serde(default)]
    pub vehicle: Option<VehicleDetails>,
}

/// New vehicle registration payload
#[derive(Debug, Clone, Serialize)]
pub struct NewVehicle {
    pub plate: String,
    pub vehicle_type: String,
    pub owner: String,
    pub national_id: String,
}

/// The backend operations the detection loop depends on.
///
/// Split out so the classification logic can be exercised against an
/// in-memory backend in tests.
pub trait RecognitionApi: Send + Sync {
    /// Submit a frame for plate detection
    fn detect(
        &self,
        frame: &[u8],
        operator_id: &str,
    ) -> impl Future<Output = Result<DetectResponse>> + Send;

    /// Look up vehicle metadata for a normalized plate
    fn vehicle_details(
        &self,
        plate: &str,
        operator_id: &str,
    ) -> impl Future<Output = Result<VehicleDetails>> + Send;

    /// Open an entry record for a plate
    fn register_entry(
        &self,
        plate: &str,
        operator_id: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Close the open entry for a plate
    fn register_exit(
        &self,
        plate: &str,
        operator_id: &str,
        observation: Option<&str>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// HTTP client for the recognition backend
pub struct RecognitionClient {
    /// Client for the detection upload; no timeout imposed at this layer,
    /// a hanging detect call simply delays the next tick
    detect_client: reqwest::Client,
    /// Bounded-timeout client for lookup and registration calls
    client: reqwest::Client,
    base_url: String,
}

impl RecognitionClient {
    /// Create a new client for the given backend base URL
    pub fn new(base_url: String, lookup_timeout: Duration) -> Self {
        let detect_client = reqwest::Client::new();
        let client = reqwest::Client::builder()
            .timeout(lookup_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            detect_client,
            client,
            base_url,
        }
    }

    /// Check backend reachability
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Register a new vehicle record
    pub async fn register_vehicle(&self, vehicle: &NewVehicle, operator_id: &str) -> Result<()> {
        let url = format!("{}/vehicles", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("id", operator_id)
            .json(vehicle)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Error::Api(format!(
                "vehicle registration failed: {}",
                resp.status()
            )));
        }

        tracing::info!(plate = %vehicle.plate, "Vehicle registered");
        Ok(())
    }

    /// One detection upload attempt. The multipart form is consumed by send,
    /// so retries rebuild it from the frame bytes.
    async fn detect_once(&self, frame: &[u8], operator_id: &str) -> Result<DetectResponse> {
        let url = format!("{}/detect-and-register", self.base_url);

        let form = Form::new().part(
            "file",
            Part::bytes(frame.to_vec())
                .file_name("photo.jpg")
                .mime_str("image/jpeg")?,
        );

        let resp = self
            .detect_client
            .post(&url)
            .header("id", operator_id)
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Error::Api(format!("detection failed: {}", resp.status())));
        }

        let result: DetectResponse = resp.json().await?;
        Ok(result)
    }
}

impl RecognitionApi for RecognitionClient {
    /// Submit a frame, retrying once when the returned plate text fails the
    /// shape check (2 attempts total).
    async fn detect(&self, frame: &[u8], operator_id: &str) -> Result<DetectResponse> {
        const MAX_ATTEMPTS: u32 = 2;

        let mut last = None;
        for attempt in 1..=MAX_ATTEMPTS {
            let response = self.detect_once(frame, operator_id).await?;

            let normalized = plate::normalize(&response.plate_text);
            if plate::has_plausible_shape(&normalized) || attempt == MAX_ATTEMPTS {
                return Ok(response);
            }

            tracing::warn!(
                plate_text = %response.plate_text,
                attempt = attempt,
                "Detected plate failed shape check, retrying"
            );
            last = Some(response);
        }

        // Unreachable: the final attempt always returns above
        Ok(last.expect("at least one detect attempt"))
    }

    async fn vehicle_details(&self, plate: &str, operator_id: &str) -> Result<VehicleDetails> {
        let url = format!("{}/vehicle/{}?id={}", self.base_url, plate, operator_id);
        let resp = self.client.get(&url).header("id", operator_id).send().await?;

        if !resp.status().is_success() {
            return Err(Error::Api(format!(
                "vehicle lookup failed for {}: {}",
                plate,
                resp.status()
            )));
        }

        let details: VehicleDetails = resp.json().await?;
        Ok(details)
    }

    async fn register_entry(&self, plate: &str, operator_id: &str) -> Result<()> {
        let url = format!("{}/entry", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("id", operator_id)
            .json(&serde_json::json!({ "plate": plate }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Error::Api(format!(
                "entry registration failed for {}: {}",
                plate,
                resp.status()
            )));
        }

        tracing::info!(plate = %plate, "Entry registered");
        Ok(())
    }

    async fn register_exit(
        &self,
        plate: &str,
        operator_id: &str,
        observation: Option<&str>,
    ) -> Result<()> {
        let url = format!("{}/exit", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("id", operator_id)
            .json(&serde_json::json!({
                "plate": plate,
                "operator_id": operator_id,
                "observation": observation,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Error::Api(format!(
                "exit registration failed for {}: {}",
                plate,
                resp.status()
            )));
        }

        tracing::info!(plate = %plate, "Exit registered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_response_defaults() {
        let json = r#"{"state": "registered"}"#;
        let resp: DetectResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.state, RegistrationState::Registered);
        assert_eq!(resp.plate_text, "");
        assert!(resp.plate_image.is_none());
        assert!(!resp.entry_already_logged);
        assert!(resp.vehicle.is_none());
    }

    #[test]
    fn test_detect_response_full() {
        let json = r#"{
            "state": "registered",
            "plate_text": "XYZ-789",
            "plate_image": "AAAA",
            "entry_already_logged": true,
            "vehicle": {"vehicle_type": "car", "owner": "Ana", "national_id": "12345678"}
        }"#;
        let resp: DetectResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.plate_text, "XYZ-789");
        assert!(resp.entry_already_logged);
        assert_eq!(resp.vehicle.unwrap().owner, "Ana");
    }

    #[test]
    fn test_new_vehicle_serializes_registration_payload() {
        let vehicle = NewVehicle {
            plate: "AB123C".to_string(),
            vehicle_type: "truck".to_string(),
            owner: "Luis Quispe".to_string(),
            national_id: "87654321".to_string(),
        };
        let json = serde_json::to_value(&vehicle).unwrap();
        assert_eq!(json["plate"], "AB123C");
        assert_eq!(json["vehicle_type"], "truck");
        assert_eq!(json["owner"], "Luis Quispe");
        assert_eq!(json["national_id"], "87654321");
    }

    #[test]
    fn test_registration_state_tags() {
        assert_eq!(
            serde_json::from_str::<RegistrationState>(r#""unregistered""#).unwrap(),
            RegistrationState::Unregistered
        );
        assert_eq!(
            serde_json::from_str::<RegistrationState>(r#""error""#).unwrap(),
            RegistrationState::Error
        );
    }
}
