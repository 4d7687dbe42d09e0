//! Gate Check-In Library
//!
//! QR ticket check-in console for event gates
//!
//! ## Architecture
//!
//! 1. DeviceSelector - Camera choice (rear-label heuristic, last-device fallback)
//! 2. ScanLoop - Camera capture + continuous QR decode
//! 3. SubmissionGuard - Single in-flight validation
//! 4. ValidationClient - Check-in endpoint adapter
//! 5. CheckInMachine - Console state machine and auto-reset
//! 6. TicketCatalogClient - Read-only day/ticket listings
//! 7. RealtimeHub - WebSocket distribution
//! 8. WebAPI - REST API endpoints
//!
//! ## Data flow
//!
//! DeviceSelector -> ScanLoop -> SubmissionGuard -> ValidationClient -> CheckInMachine

pub mod checkin_machine;
pub mod device_selector;
pub mod error;
pub mod models;
pub mod realtime_hub;
pub mod scan_loop;
pub mod state;
pub mod submission_guard;
pub mod ticket_catalog;
pub mod validation_client;
pub mod web_api;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
pub use state::AppState;
