//! TicketCatalogClient - Read-only day and ticket listings
//!
//! ## Responsibilities
//!
//! - Fetch per-day capacity/sales summaries for an event
//! - Fetch the latest issued tickets for an event
//!
//! Capacity editing stays with the back-office; this client never writes.

mod types;

pub use types::*;

use crate::error::{Error, Result};
use std::time::Duration;

/// Default ticket list size
pub const DEFAULT_LIST_LIMIT: u32 = 200;

/// Catalog client
pub struct TicketCatalogClient {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl TicketCatalogClient {
    pub fn new(base_url: String, auth_token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    /// Day summaries for an event
    pub async fn get_ticket_days(&self, event_id: &str) -> Result<Vec<TicketDaySummary>> {
        if event_id.trim().is_empty() {
            return Err(Error::Validation("eventId is required".to_string()));
        }

        let url = format!("{}/events/{}/ticket-days", self.base_url, event_id);
        let body: TicketDaysResponse = self.get_json(self.client.get(&url)).await?;

        tracing::debug!(event_id = %event_id, days = body.days.len(), "Ticket days fetched");
        Ok(body.days)
    }

    /// Latest tickets for an event
    pub async fn get_tickets(&self, event_id: &str, limit: u32) -> Result<Vec<Ticket>> {
        if event_id.trim().is_empty() {
            return Err(Error::Validation("eventId is required".to_string()));
        }

        let url = format!("{}/tickets", self.base_url);
        let request = self
            .client
            .get(&url)
            .query(&[("eventId", event_id.to_string()), ("limit", limit.to_string())]);
        let body: TicketsResponse = self.get_json(request).await?;

        tracing::debug!(event_id = %event_id, tickets = body.data.len(), "Tickets fetched");
        Ok(body.data)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        mut request: reqwest::RequestBuilder,
    ) -> Result<T> {
        if let Some(ref auth) = self.auth_token {
            request = request.bearer_auth(auth);
        }

        let resp = request.send().await?;
        let status = resp.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("catalog resource ({})", resp.url().path())));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api(format!("catalog returned {}: {}", status, body.trim())));
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_http;
    use axum::{
        extract::{Path, Query},
        http::StatusCode,
        response::IntoResponse,
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;

    async fn days(Path(event_id): Path<String>) -> axum::response::Response {
        if event_id != "evt-1" {
            return (StatusCode::NOT_FOUND, Json(json!({"error": "event_not_found"}))).into_response();
        }
        Json(json!({
            "days": [
                {"id": "d1", "display": "Sáb 1", "kind": "opening", "cap": 100,
                 "price": 45000, "sold": 40, "checked_in": 10, "isActive": true},
                {"id": "d2", "display": "Dom 2", "kind": "last", "cap": 0,
                 "price": 45000, "sold": 0, "checked_in": 0, "isActive": false}
            ]
        }))
        .into_response()
    }

    async fn tickets(Query(q): Query<HashMap<String, String>>) -> axum::response::Response {
        let limit: usize = q.get("limit").and_then(|l| l.parse().ok()).unwrap_or(0);
        let data: Vec<_> = (0..5)
            .map(|i| {
                json!({
                    "id": format!("tkt-{:06}", i),
                    "eventDay": "2025-03-01",
                    "status": "sold",
                    "price": 45000,
                    "buyer": {"name": "Ana", "email": "ana@example.com"}
                })
            })
            .take(limit)
            .collect();
        match q.get("eventId").map(String::as_str) {
            Some("evt-1") => Json(json!({ "data": data })).into_response(),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        }
    }

    async fn client() -> TicketCatalogClient {
        let router = Router::new()
            .route("/events/:id/ticket-days", get(days))
            .route("/tickets", get(tickets));
        let url = spawn_http(router).await;
        TicketCatalogClient::new(url, None, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_get_ticket_days() {
        let catalog = client().await;
        let days = catalog.get_ticket_days("evt-1").await.unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].usage_percent(), 50);
        assert_eq!(days[1].usage_percent(), 0);

        assert!(matches!(
            catalog.get_ticket_days("evt-404").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            catalog.get_ticket_days(" ").await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_get_tickets_honours_limit() {
        let catalog = client().await;
        let tickets = catalog.get_tickets("evt-1", 3).await.unwrap();
        assert_eq!(tickets.len(), 3);
        assert_eq!(tickets[0].display_code(), "000000");
        assert_eq!(tickets[0].buyer.as_ref().unwrap().name.as_deref(), Some("Ana"));

        assert!(matches!(
            catalog.get_tickets("evt-2", 3).await,
            Err(Error::Api(_))
        ));
    }
}
