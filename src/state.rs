//! Application state
//!
//! Holds all shared components and configuration

use crate::checkin_machine::{CheckInConfig, CheckInMachine, DEFAULT_RESET_DELAY_MS};
use crate::error::{Error, Result};
use crate::realtime_hub::RealtimeHub;
use crate::scan_loop::ScanLoop;
use crate::ticket_catalog::{TicketCatalogClient, DEFAULT_LIST_LIMIT};
use crate::validation_client::ValidationClient;
use chrono_tz::Tz;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Event used when EVENT_ID is not set
pub const DEFAULT_EVENT_ID: &str = "6909aef219f26eec22af4220";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Ticket back-end base URL
    pub api_base_url: String,
    /// Bearer token for the back-end
    pub api_auth_token: Option<String>,
    /// Event whose days/tickets are listed
    pub event_id: String,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Fixed camera device (skips device selection)
    pub camera_device: Option<String>,
    /// Frames decoded per second
    pub decode_fps: u32,
    /// Success overlay lifetime
    pub reset_delay_ms: u64,
    /// Back-end request timeout
    pub http_timeout_sec: u64,
    pub ffmpeg_path: String,
    pub zbarimg_path: String,
    /// Temp frames for the decoder
    pub temp_dir: PathBuf,
    /// Gate time zone (IANA name)
    pub timezone: String,
    /// Console UI assets, served at `/` when set
    pub static_dir: Option<PathBuf>,
    /// Ticket list size
    pub tickets_list_limit: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: std::env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:4000/api".to_string()),
            api_auth_token: std::env::var("API_AUTH_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            event_id: std::env::var("EVENT_ID")
                .unwrap_or_else(|_| DEFAULT_EVENT_ID.to_string()),
            host: std::env::var("HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            camera_device: std::env::var("CAMERA_DEVICE")
                .ok()
                .filter(|d| !d.is_empty()),
            decode_fps: std::env::var("DECODE_FPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            reset_delay_ms: std::env::var("RESET_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RESET_DELAY_MS),
            http_timeout_sec: std::env::var("HTTP_TIMEOUT_SEC")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            ffmpeg_path: std::env::var("FFMPEG_PATH")
                .unwrap_or_else(|_| "ffmpeg".to_string()),
            zbarimg_path: std::env::var("ZBARIMG_PATH")
                .unwrap_or_else(|_| "zbarimg".to_string()),
            temp_dir: std::env::var("TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
            timezone: std::env::var("GATE_TIMEZONE")
                .unwrap_or_else(|_| "America/Bogota".to_string()),
            static_dir: std::env::var("STATIC_DIR").ok().map(PathBuf::from),
            tickets_list_limit: std::env::var("TICKETS_LIST_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_LIST_LIMIT),
        }
    }
}

impl AppConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_sec)
    }

    /// Parsed gate time zone
    pub fn gate_timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| Error::Config(format!("GATE_TIMEZONE {}: {}", self.timezone, e)))
    }

    /// State machine settings derived from this config
    pub fn checkin_config(&self) -> Result<CheckInConfig> {
        Ok(CheckInConfig {
            reset_delay: Duration::from_millis(self.reset_delay_ms),
            device_id: self.camera_device.clone(),
            timezone: self.gate_timezone()?,
        })
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Gate console
    pub checkin: CheckInMachine,
    /// Camera scan loop (owned by the console, shared for device listing)
    pub scanner: Arc<ScanLoop>,
    /// Check-in endpoint client
    pub validation: Arc<ValidationClient>,
    /// Day/ticket listings
    pub catalog: Arc<TicketCatalogClient>,
    /// RealtimeHub (WebSocket)
    pub realtime: Arc<RealtimeHub>,
    /// Process start
    pub started_at: Instant,
}
