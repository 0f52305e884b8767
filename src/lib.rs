//! parkgate - License Plate Gate Agent
//!
//! Headless access-control agent for a parking gate: grabs frames from the
//! gate camera, sends them to the plate recognition backend, and turns each
//! detection into an entry or exit registration while a suppression ledger
//! keeps the 2-second polling cadence from double-registering the same
//! vehicle.
//!
//! ## Components
//!
//! - `capture` - camera session lifecycle and single-frame grabs (ffmpeg RTSP
//!   with HTTP snapshot fallback)
//! - `recognition_client` - HTTP client for the recognition backend
//! - `detection_loop` - polling, classification, and failure handling
//! - `suppression` - per-plate cooldown ledger
//! - `outcome_hub` - typed broadcast of detection outcomes
//! - `access_log` - in-memory ring buffer of recent outcomes
//! - `plate` - plate text normalization

pub mod access_log;
pub mod capture;
pub mod config;
pub mod detection_loop;
pub mod error;
pub mod outcome_hub;
pub mod plate;
pub mod recognition_client;
pub mod session;
pub mod suppression;

pub use error::{Error, Result};
