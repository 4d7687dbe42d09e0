//! SubmissionGuard - Single in-flight validation
//!
//! The camera re-fires for every frame that still shows the same code, and the
//! manual field can be submitted at any time. The guard lets exactly one
//! validation be outstanding: the same token is dropped silently, any other
//! token is refused until the pending request settles.

use crate::models::token_preview;

/// Guard decision for an incoming token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Send the request
    Accepted,
    /// Same token already in flight, drop it
    Duplicate,
    /// Another token in flight, refuse it
    Busy,
}

/// In-flight tracker
#[derive(Debug, Default)]
pub struct SubmissionGuard {
    in_flight: Option<String>,
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to claim the in-flight slot for `token`
    pub fn try_begin(&mut self, token: &str) -> GuardDecision {
        match self.in_flight.as_deref() {
            Some(current) if current == token => {
                tracing::trace!(token = %token_preview(token), "Duplicate token dropped");
                GuardDecision::Duplicate
            }
            Some(current) => {
                tracing::debug!(
                    token = %token_preview(token),
                    in_flight = %token_preview(current),
                    "Token refused, another validation pending"
                );
                GuardDecision::Busy
            }
            None => {
                self.in_flight = Some(token.to_string());
                GuardDecision::Accepted
            }
        }
    }

    /// Release the slot (called on every settle, whatever the outcome)
    pub fn settle(&mut self) -> Option<String> {
        self.in_flight.take()
    }

    /// Token currently in flight
    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_dropped_while_pending() {
        let mut guard = SubmissionGuard::new();
        assert_eq!(guard.try_begin("T-1"), GuardDecision::Accepted);
        for _ in 0..10 {
            assert_eq!(guard.try_begin("T-1"), GuardDecision::Duplicate);
        }
        assert_eq!(guard.in_flight(), Some("T-1"));
    }

    #[test]
    fn test_other_token_refused_while_pending() {
        let mut guard = SubmissionGuard::new();
        assert_eq!(guard.try_begin("T-1"), GuardDecision::Accepted);
        assert_eq!(guard.try_begin("T-2"), GuardDecision::Busy);
        assert_eq!(guard.in_flight(), Some("T-1"));
    }

    #[test]
    fn test_settle_rearms_same_token() {
        let mut guard = SubmissionGuard::new();
        guard.try_begin("T-1");
        assert_eq!(guard.settle(), Some("T-1".to_string()));
        assert!(!guard.is_pending());
        assert_eq!(guard.try_begin("T-1"), GuardDecision::Accepted);
    }

    #[test]
    fn test_settle_when_idle() {
        let mut guard = SubmissionGuard::new();
        assert_eq!(guard.settle(), None);
        assert_eq!(guard.try_begin("T-2"), GuardDecision::Accepted);
    }
}
