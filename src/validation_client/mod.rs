//! ValidationClient - Check-in endpoint adapter
//!
//! ## Responsibilities
//!
//! - Submit a QR token to the ticket back-end
//! - Normalize success, rejection and transport failure into one outcome
//!
//! Only empty input is an `Err`; everything that reaches the network ends as a
//! `ValidationOutcome`, so callers always leave the submitting state.

mod types;

pub use types::*;

use crate::error::{Error, Result};
use crate::models::token_preview;
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Check-in endpoint, relative to the API base URL
pub const VALIDATE_PATH: &str = "/tickets/validate-qr";

/// Default HTTP timeout
const DEFAULT_TIMEOUT_SEC: u64 = 30;

/// Anything that can validate a token (the state machine's seam)
#[async_trait]
pub trait TicketValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<ValidationOutcome>;
}

/// HTTP validation client
pub struct ValidationClient {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
    timeout: Duration,
}

impl ValidationClient {
    /// Create new client with the default timeout
    pub fn new(base_url: String, auth_token: Option<String>) -> Result<Self> {
        Self::with_timeout(base_url, auth_token, Duration::from_secs(DEFAULT_TIMEOUT_SEC))
    }

    /// Create new client with custom timeout
    pub fn with_timeout(
        base_url: String,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
            timeout,
        })
    }

    /// Validate a token against the check-in endpoint
    pub async fn validate(&self, token: &str) -> Result<ValidationOutcome> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::Validation("QR token is empty".to_string()));
        }

        let url = format!("{}{}", self.base_url, VALIDATE_PATH);
        let started = Instant::now();

        let mut request = self.client.post(&url).json(&ValidateRequest { token });
        if let Some(ref auth) = self.auth_token {
            request = request.bearer_auth(auth);
        }

        let resp = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(
                    token = %token_preview(token),
                    timeout = e.is_timeout(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "Validation request failed"
                );
                return Ok(ValidationOutcome::failure(FailureReason::Generic));
            }
        };

        let status = resp.status();

        if status.is_success() {
            let outcome = match resp.json::<ValidateResponse>().await {
                Ok(body) if body.ok => ValidationOutcome::from(body),
                Ok(_) => {
                    tracing::warn!(token = %token_preview(token), "Check-in endpoint answered ok=false");
                    ValidationOutcome::failure(FailureReason::Generic)
                }
                Err(e) => {
                    tracing::warn!(
                        token = %token_preview(token),
                        error = %e,
                        "Unreadable check-in response"
                    );
                    ValidationOutcome::failure(FailureReason::Generic)
                }
            };

            tracing::info!(
                token = %token_preview(token),
                status = ?outcome.status,
                same_day = ?outcome.same_day,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Ticket validated"
            );
            return Ok(outcome);
        }

        let body = resp.json::<ValidateErrorBody>().await.unwrap_or_default();
        let reason = FailureReason::from_server(body.error.as_deref());

        tracing::info!(
            token = %token_preview(token),
            http_status = %status,
            server_reason = body.error.as_deref().unwrap_or("-"),
            reason = ?reason,
            "Ticket rejected"
        );

        Ok(ValidationOutcome::failure(reason))
    }

    /// Whether the back-end answers HTTP at all
    pub async fn health_check(&self) -> bool {
        self.client.get(&self.base_url).send().await.is_ok()
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl TicketValidator for ValidationClient {
    async fn validate(&self, token: &str) -> Result<ValidationOutcome> {
        ValidationClient::validate(self, token).await
    }
}
