//! Shared models and types
//!
//! This module contains types shared across multiple modules
//! to avoid circular dependencies.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    pub api_reachable: bool,
    pub camera_running: bool,
}

/// Parse a ticket day.
///
/// The back-end sends either `YYYY-MM-DD` or a full ISO date-time
/// (midnight UTC). Both reduce to the UTC calendar date.
pub fn parse_event_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(day);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

/// serde adapter for [`parse_event_day`]
pub fn deserialize_event_day<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_event_day(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid event day: {}", raw)))
}

/// Short, log-safe form of a QR token
pub fn token_preview(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    if token.chars().count() > 6 {
        format!("{}…", prefix)
    } else {
        prefix
    }
}
