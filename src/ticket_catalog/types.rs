//! Catalog wire types and display helpers

use crate::models::deserialize_event_day;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Default currency when a ticket carries none
pub const DEFAULT_CURRENCY: &str = "COP";

/// Ticket lifecycle status (`sold -> checked_in` only; refunded/cancelled are terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Sold,
    CheckedIn,
    Refunded,
    Cancelled,
}

impl TicketStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TicketStatus::Sold => "Vendido",
            TicketStatus::CheckedIn => "Check-in",
            TicketStatus::Refunded => "Reembolsado",
            TicketStatus::Cancelled => "Cancelado",
        }
    }
}

/// Ticket buyer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buyer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Issued ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    #[serde(default)]
    pub short_code: Option<String>,
    #[serde(default)]
    pub buyer: Option<Buyer>,
    #[serde(deserialize_with = "deserialize_event_day")]
    pub event_day: NaiveDate,
    pub status: TicketStatus,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub scanned_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Short code, or the last 6 characters of the id
    pub fn display_code(&self) -> String {
        match self.short_code.as_deref() {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => {
                let chars: Vec<char> = self.id.chars().collect();
                let start = chars.len().saturating_sub(6);
                chars[start..].iter().collect()
            }
        }
    }

    pub fn currency(&self) -> &str {
        match self.currency.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => DEFAULT_CURRENCY,
        }
    }
}

/// Row for the ticket list view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketRow {
    pub id: String,
    pub code: String,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub event_day: String,
    pub status: TicketStatus,
    pub status_label: String,
    pub price: String,
}

impl From<&Ticket> for TicketRow {
    fn from(t: &Ticket) -> Self {
        Self {
            id: t.id.clone(),
            code: t.display_code(),
            buyer_name: t.buyer.as_ref().and_then(|b| b.name.clone()),
            buyer_email: t.buyer.as_ref().and_then(|b| b.email.clone()),
            event_day: t.event_day.format("%Y-%m-%d").to_string(),
            status: t.status,
            status_label: t.status.label().to_string(),
            price: format_price(t.price, t.currency()),
        }
    }
}

/// Event day kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayKind {
    Opening,
    Penultimate,
    Last,
    #[serde(other)]
    Regular,
}

impl DayKind {
    pub fn label(&self) -> &'static str {
        match self {
            DayKind::Opening => "Apertura",
            DayKind::Penultimate => "Penúltimo día",
            DayKind::Last => "Último día",
            DayKind::Regular => "Día regular",
        }
    }
}

/// Per-day capacity and sales summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDaySummary {
    pub id: String,
    pub display: String,
    pub kind: DayKind,
    #[serde(default)]
    pub cap: u32,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub sold: u32,
    #[serde(default, rename = "checked_in")]
    pub checked_in: u32,
    #[serde(default)]
    pub is_active: bool,
}

impl TicketDaySummary {
    /// Sold plus checked in
    pub fn used(&self) -> u32 {
        self.sold + self.checked_in
    }

    /// Rounded percentage of capacity used (0 without capacity)
    pub fn usage_percent(&self) -> u32 {
        if self.cap == 0 {
            return 0;
        }
        (f64::from(self.used()) / f64::from(self.cap) * 100.0).round() as u32
    }
}

/// Card for the day grid view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayCard {
    pub id: String,
    pub display: String,
    pub kind: DayKind,
    pub kind_label: String,
    pub price: String,
    pub cap: u32,
    pub used: u32,
    pub usage_percent: u32,
    pub is_active: bool,
}

impl From<&TicketDaySummary> for DayCard {
    fn from(d: &TicketDaySummary) -> Self {
        Self {
            id: d.id.clone(),
            display: d.display.clone(),
            kind: d.kind,
            kind_label: d.kind.label().to_string(),
            price: format_price(d.price, DEFAULT_CURRENCY),
            cap: d.cap,
            used: d.used(),
            usage_percent: d.usage_percent(),
            is_active: d.is_active,
        }
    }
}

/// `GET /events/{id}/ticket-days` body
#[derive(Debug, Clone, Deserialize)]
pub struct TicketDaysResponse {
    #[serde(default)]
    pub days: Vec<TicketDaySummary>,
}

/// `GET /tickets` body
#[derive(Debug, Clone, Deserialize)]
pub struct TicketsResponse {
    #[serde(default)]
    pub data: Vec<Ticket>,
}

/// Whole-unit price with `.` thousands separators (`$ 150.000`)
pub fn format_price(amount: f64, currency: &str) -> String {
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{}", rounded.abs() as u64);

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    if currency.eq_ignore_ascii_case(DEFAULT_CURRENCY) {
        format!("{}$ {}", sign, grouped)
    } else {
        format!("{}{} {}", sign, currency.to_uppercase(), grouped)
    }
}
