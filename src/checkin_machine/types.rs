//! Check-in console types

use crate::validation_client::{CheckInStatus, ValidationOutcome};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Overlay auto-reset delay
pub const DEFAULT_RESET_DELAY_MS: u64 = 3000;

/// Console state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInState {
    /// Camera off, nothing pending
    Idle,
    /// Camera on, waiting for a code or a manual submit
    Scanning,
    /// Validation in flight, camera paused
    Submitting,
    /// Outcome displayed (warning or error)
    Result,
    /// Full-screen admit confirmation, resets on its own
    SuccessOverlay,
}

/// Outcome severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Admit
    Success,
    /// Real ticket, but wrong day or already used: staff decides
    Warning,
    /// Malformed, unknown or transport failure
    Error,
}

impl Severity {
    /// Classify an outcome
    pub fn classify(outcome: &ValidationOutcome) -> Self {
        if !outcome.ok {
            return Severity::Error;
        }
        match (outcome.same_day, outcome.status) {
            (Some(true), Some(CheckInStatus::CheckedIn)) => Severity::Success,
            _ => Severity::Warning,
        }
    }
}

/// Single user-facing line for an outcome
pub fn status_message(outcome: &ValidationOutcome) -> String {
    if !outcome.ok {
        if let Some(ref error) = outcome.error {
            return error.clone();
        }
    }

    let same_day = outcome.same_day.unwrap_or(false);
    let message = match (outcome.status, same_day) {
        (Some(CheckInStatus::AlreadyCheckedIn), true) => "El boleto ya fue escaneado hoy.",
        (Some(CheckInStatus::AlreadyCheckedIn), false) => {
            "El boleto ya fue escaneado y no corresponde al día actual."
        }
        (Some(CheckInStatus::CheckedIn), true) => "Acceso permitido: boleto válido para hoy ✅",
        (Some(CheckInStatus::CheckedIn), false) => {
            "Boleto válido pero para otro día. Revisa la fecha antes de permitir el acceso."
        }
        (None, _) => "Resultado desconocido.",
    };
    message.to_string()
}

/// Where a token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitSource {
    Camera,
    Manual,
}

/// Accepted submission result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitAck {
    /// Request sent
    Submitted,
    /// Same token already in flight, nothing sent
    Duplicate,
}

/// Ticket detail block (only for resolved tickets)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDetails {
    pub short_code: String,
    pub event_day: Option<String>,
    pub last_scan: Option<String>,
    pub status_label: String,
}

impl TicketDetails {
    pub fn from_outcome(outcome: &ValidationOutcome, tz: &Tz) -> Option<Self> {
        if !outcome.ok {
            return None;
        }
        Some(Self {
            short_code: outcome.short_code.clone().unwrap_or_default(),
            event_day: outcome.event_day.map(|d| d.format("%Y-%m-%d").to_string()),
            last_scan: outcome
                .scanned_at
                .map(|t| t.with_timezone(tz).format("%d/%m/%Y, %H:%M:%S").to_string()),
            status_label: outcome
                .status
                .map(|s| s.label())
                .unwrap_or("Desconocido")
                .to_string(),
        })
    }
}

/// Admit confirmation payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessOverlayView {
    pub title: String,
    pub message: String,
    pub short_code: Option<String>,
    pub event_day: Option<String>,
    pub closes_in_ms: u64,
}

/// Console snapshot published to the UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInView {
    pub state: CheckInState,
    /// Operator wants the camera on
    pub camera_enabled: bool,
    /// Camera currently capturing
    pub camera_running: bool,
    /// Manual-entry field / last submitted token
    pub token: String,
    pub outcome: Option<ValidationOutcome>,
    pub severity: Option<Severity>,
    pub message: Option<String>,
    pub ticket: Option<TicketDetails>,
    pub overlay: Option<SuccessOverlayView>,
    pub camera_error: Option<String>,
    pub can_submit_manual: bool,
    pub updated_at: DateTime<Utc>,
}

/// Machine configuration
#[derive(Debug, Clone)]
pub struct CheckInConfig {
    /// SuccessOverlay lifetime
    pub reset_delay: Duration,
    /// Fixed camera; `None` lets the DeviceSelector choose
    pub device_id: Option<String>,
    /// Time zone for "last scan" display
    pub timezone: Tz,
}

impl Default for CheckInConfig {
    fn default() -> Self {
        Self {
            reset_delay: Duration::from_millis(DEFAULT_RESET_DELAY_MS),
            device_id: None,
            timezone: chrono_tz::America::Bogota,
        }
    }
}
