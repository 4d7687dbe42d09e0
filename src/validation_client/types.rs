//! Validation wire types and normalized outcome

use crate::models::deserialize_event_day;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Ticket status reported by the check-in endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInStatus {
    /// This request performed the check-in
    CheckedIn,
    /// Ticket had been checked in before
    AlreadyCheckedIn,
}

impl CheckInStatus {
    /// Label for the ticket detail block
    pub fn label(&self) -> &'static str {
        match self {
            CheckInStatus::CheckedIn => "Check-in registrado",
            CheckInStatus::AlreadyCheckedIn => "Ya escaneado",
        }
    }
}

/// Why a validation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Token malformed or signature invalid
    InvalidQr,
    /// Token well-formed but no ticket behind it
    TicketNotFound,
    /// Anything else, including transport failures
    Generic,
}

impl FailureReason {
    /// Map a server reason code
    pub fn from_server(code: Option<&str>) -> Self {
        match code {
            Some("invalid_qr") => FailureReason::InvalidQr,
            Some("ticket_not_found") => FailureReason::TicketNotFound,
            _ => FailureReason::Generic,
        }
    }

    /// User-facing message
    pub fn message(&self) -> &'static str {
        match self {
            FailureReason::InvalidQr => "QR inválido o manipulado.",
            FailureReason::TicketNotFound => "No se encontró el boleto.",
            FailureReason::Generic => "Error al validar el QR.",
        }
    }
}

/// Request body
#[derive(Debug, Serialize)]
pub struct ValidateRequest<'a> {
    pub token: &'a str,
}

/// Ticket fields echoed on success
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketEcho {
    pub short_code: String,
    #[serde(deserialize_with = "deserialize_event_day")]
    pub event_day: NaiveDate,
    #[serde(default)]
    pub scanned_at: Option<DateTime<Utc>>,
}

/// 2xx response body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub ok: bool,
    pub status: CheckInStatus,
    #[serde(default)]
    pub same_day: bool,
    pub ticket: TicketEcho,
}

/// non-2xx response body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidateErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Normalized result of one submission. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CheckInStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub same_day: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_day: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
}

impl ValidationOutcome {
    /// Outcome for a resolved ticket
    pub fn resolved(
        status: CheckInStatus,
        same_day: bool,
        short_code: impl Into<String>,
        event_day: NaiveDate,
        scanned_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            ok: true,
            status: Some(status),
            same_day: Some(same_day),
            short_code: Some(short_code.into()),
            event_day: Some(event_day),
            scanned_at,
            error: None,
            reason: None,
        }
    }

    /// Outcome for a failed validation
    pub fn failure(reason: FailureReason) -> Self {
        Self {
            ok: false,
            status: None,
            same_day: None,
            short_code: None,
            event_day: None,
            scanned_at: None,
            error: Some(reason.message().to_string()),
            reason: Some(reason),
        }
    }
}

impl From<ValidateResponse> for ValidationOutcome {
    fn from(resp: ValidateResponse) -> Self {
        Self::resolved(
            resp.status,
            resp.same_day,
            resp.ticket.short_code,
            resp.ticket.event_day,
            resp.ticket.scanned_at,
        )
    }
}
