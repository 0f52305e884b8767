//! Application configuration
//!
//! Timings were tuned empirically in the field (tick intervals and cooldown
//! durations varied between deployments), so everything is an env-overridable
//! knob rather than a constant.

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Recognition backend base URL
    pub api_url: String,
    /// Operator identity attached to every detection/registration call
    pub operator_id: String,
    /// RTSP URL of the gate camera (preferred capture path)
    pub camera_rtsp_url: Option<String>,
    /// HTTP snapshot URL fallback for the gate camera
    pub camera_snapshot_url: Option<String>,
    /// Detection tick interval in seconds
    pub detect_interval_secs: u64,
    /// Suppression sweep interval in seconds
    pub sweep_interval_secs: u64,
    /// Cooldown after a successful entry registration, in seconds
    pub entry_cooldown_secs: i64,
    /// Cooldown after a successful exit registration, in seconds
    pub exit_cooldown_secs: i64,
    /// Consecutive failed ticks before the loop pauses
    pub max_consecutive_failures: u32,
    /// Pause duration after hitting the failure cap, in seconds
    pub failure_pause_secs: u64,
    /// ffmpeg timeout for a single-frame RTSP grab, in seconds
    pub ffmpeg_timeout_secs: u64,
    /// Timeout for lookup/registration calls, in seconds
    pub lookup_timeout_secs: u64,
    /// Capacity of the in-memory access log ring buffer
    pub access_log_capacity: usize,
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: std::env::var("GATE_API_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            operator_id: std::env::var("OPERATOR_ID").unwrap_or_default(),
            camera_rtsp_url: std::env::var("CAMERA_RTSP_URL").ok(),
            camera_snapshot_url: std::env::var("CAMERA_SNAPSHOT_URL").ok(),
            detect_interval_secs: env_u64("DETECT_INTERVAL_SECS", 2),
            sweep_interval_secs: env_u64("SWEEP_INTERVAL_SECS", 1),
            entry_cooldown_secs: env_i64("ENTRY_COOLDOWN_SECS", 180),
            exit_cooldown_secs: env_i64("EXIT_COOLDOWN_SECS", 120),
            max_consecutive_failures: env_u64("MAX_CONSECUTIVE_FAILURES", 5) as u32,
            failure_pause_secs: env_u64("FAILURE_PAUSE_SECS", 30),
            ffmpeg_timeout_secs: env_u64("FFMPEG_TIMEOUT_SECS", 10),
            lookup_timeout_secs: env_u64("LOOKUP_TIMEOUT_SECS", 10),
            access_log_capacity: env_u64("ACCESS_LOG_CAPACITY", 2000) as usize,
        }
    }
}
