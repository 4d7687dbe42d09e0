//! CheckInMachine - Gate console orchestrator
//!
//! ## Responsibilities
//!
//! - Own the console state (Idle/Scanning/Submitting/Result/SuccessOverlay)
//! - Feed camera decodes and manual submits through the SubmissionGuard
//! - Pause the camera while a validation is in flight
//! - Auto-reset to Scanning after a same-day admission
//! - Publish every change (watch channel + RealtimeHub)
//!
//! ## Design
//!
//! - All mutable state behind one async mutex; the guard is only written here
//! - Scan events carry their session id, events from a stopped session are dropped
//! - After `shutdown()` late validation results are discarded

mod types;

pub use types::*;

use crate::error::{Error, Result};
use crate::models::token_preview;
use crate::realtime_hub::{CameraStatusMessage, HubMessage, RealtimeHub};
use crate::scan_loop::{ScanEvent, ScanLoop};
use crate::submission_guard::{GuardDecision, SubmissionGuard};
use crate::validation_client::{FailureReason, TicketValidator, ValidationOutcome};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

/// Mutable console state
struct MachineInner {
    state: CheckInState,
    camera_enabled: bool,
    guard: SubmissionGuard,
    token: String,
    outcome: Option<ValidationOutcome>,
    camera_error: Option<String>,
    scan_session: Option<u64>,
    submission_seq: u64,
    reset_timer: Option<JoinHandle<()>>,
    timer_seq: u64,
    torn_down: bool,
}

impl MachineInner {
    fn new() -> Self {
        Self {
            state: CheckInState::Idle,
            camera_enabled: false,
            guard: SubmissionGuard::new(),
            token: String::new(),
            outcome: None,
            camera_error: None,
            scan_session: None,
            submission_seq: 0,
            reset_timer: None,
            timer_seq: 0,
            torn_down: false,
        }
    }

    fn cancel_reset_timer(&mut self) {
        if let Some(timer) = self.reset_timer.take() {
            timer.abort();
        }
    }

    fn view(&self, config: &CheckInConfig) -> CheckInView {
        let overlay = match (self.state, self.outcome.as_ref()) {
            (CheckInState::SuccessOverlay, Some(outcome)) => Some(SuccessOverlayView {
                title: "Acceso permitido".to_string(),
                message: "Boleto válido para hoy. Puede ingresar ✅".to_string(),
                short_code: outcome.short_code.clone(),
                event_day: outcome.event_day.map(|d| d.format("%Y-%m-%d").to_string()),
                closes_in_ms: config.reset_delay.as_millis() as u64,
            }),
            _ => None,
        };

        CheckInView {
            state: self.state,
            camera_enabled: self.camera_enabled,
            camera_running: self.scan_session.is_some(),
            token: self.token.clone(),
            outcome: self.outcome.clone(),
            severity: self.outcome.as_ref().map(Severity::classify),
            message: self.outcome.as_ref().map(status_message),
            ticket: self
                .outcome
                .as_ref()
                .and_then(|o| TicketDetails::from_outcome(o, &config.timezone)),
            overlay,
            camera_error: self.camera_error.clone(),
            can_submit_manual: !self.guard.is_pending() && !self.torn_down,
            updated_at: Utc::now(),
        }
    }
}

/// CheckInMachine instance (cheap to clone, all clones share state)
#[derive(Clone)]
pub struct CheckInMachine {
    inner: Arc<Mutex<MachineInner>>,
    scanner: Arc<ScanLoop>,
    validator: Arc<dyn TicketValidator>,
    realtime: Arc<RealtimeHub>,
    view_tx: Arc<watch::Sender<CheckInView>>,
    config: Arc<CheckInConfig>,
}

impl CheckInMachine {
    /// Create new CheckInMachine (starts Idle, camera off)
    pub fn new(
        scanner: Arc<ScanLoop>,
        validator: Arc<dyn TicketValidator>,
        realtime: Arc<RealtimeHub>,
        config: CheckInConfig,
    ) -> Self {
        let inner = MachineInner::new();
        let (view_tx, _) = watch::channel(inner.view(&config));

        Self {
            inner: Arc::new(Mutex::new(inner)),
            scanner,
            validator,
            realtime,
            view_tx: Arc::new(view_tx),
            config: Arc::new(config),
        }
    }

    /// Latest published view
    pub fn view(&self) -> CheckInView {
        self.view_tx.borrow().clone()
    }

    /// Subscribe to view changes
    pub fn subscribe(&self) -> watch::Receiver<CheckInView> {
        self.view_tx.subscribe()
    }

    /// Scan loop driven by this machine
    pub fn scanner(&self) -> &Arc<ScanLoop> {
        &self.scanner
    }

    /// Operator turns the camera on
    pub async fn resume_camera(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        Self::ensure_alive(&inner)?;

        inner.camera_enabled = true;
        inner.camera_error = None;

        match inner.state {
            CheckInState::Idle | CheckInState::Result => {
                // a fresh scan replaces the displayed result
                inner.outcome = None;
                inner.token.clear();
                self.arm_scanner(&mut inner).await;
                inner.state = CheckInState::Scanning;
            }
            CheckInState::Scanning if inner.scan_session.is_none() => {
                self.arm_scanner(&mut inner).await;
            }
            // resumes on settle / overlay reset
            CheckInState::Scanning | CheckInState::Submitting | CheckInState::SuccessOverlay => {}
        }

        tracing::info!(state = ?inner.state, "Camera resumed by operator");
        self.publish(&inner).await;
        Ok(())
    }

    /// Operator turns the camera off. A pending validation keeps running.
    pub async fn pause_camera(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        Self::ensure_alive(&inner)?;

        inner.camera_enabled = false;
        self.disarm_scanner(&mut inner).await;

        if inner.state == CheckInState::Scanning {
            inner.state = CheckInState::Idle;
        }

        tracing::info!(state = ?inner.state, "Camera paused by operator");
        self.publish(&inner).await;
        Ok(())
    }

    /// Manual token entry
    pub async fn submit_manual(&self, token: &str) -> Result<SubmitAck> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::Validation("QR token is empty".to_string()));
        }

        let mut inner = self.inner.lock().await;
        Self::ensure_alive(&inner)?;
        self.submit_locked(&mut inner, token, SubmitSource::Manual)
            .await
    }

    /// Operator dismisses the displayed result
    pub async fn dismiss(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        Self::ensure_alive(&inner)?;

        if inner.state == CheckInState::Submitting {
            return Err(Error::Conflict(
                "A ticket is still being validated".to_string(),
            ));
        }

        inner.cancel_reset_timer();
        inner.outcome = None;
        inner.token.clear();
        inner.camera_error = None;
        self.rearm(&mut inner).await;

        tracing::debug!(state = ?inner.state, "Result dismissed");
        self.publish(&inner).await;
        Ok(())
    }

    /// Tear down: camera released, timer cancelled, late results discarded
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        if inner.torn_down {
            return;
        }

        inner.torn_down = true;
        inner.cancel_reset_timer();
        self.disarm_scanner(&mut inner).await;
        inner.camera_enabled = false;
        inner.state = CheckInState::Idle;

        tracing::info!(
            pending = inner.guard.is_pending(),
            "Check-in console shut down"
        );
        self.publish(&inner).await;
    }

    /// Handle one event from the scan loop
    pub async fn handle_scan_event(&self, event: ScanEvent) {
        let mut inner = self.inner.lock().await;
        if inner.torn_down || inner.scan_session != Some(event.session_id()) {
            tracing::trace!(session_id = event.session_id(), "Stale scan event ignored");
            return;
        }

        match event {
            ScanEvent::Decoded { text, .. } => {
                let token = text.trim();
                if token.is_empty() {
                    return;
                }
                // camera-path refusals are silent
                if let Err(e) = self
                    .submit_locked(&mut inner, token, SubmitSource::Camera)
                    .await
                {
                    tracing::debug!(error = %e, "Camera decode not submitted");
                }
            }
            ScanEvent::Miss { .. } => {}
            ScanEvent::Fatal { message, .. } => {
                tracing::warn!(message = %message, "Camera failed, scanning stopped");
                inner.scan_session = None;
                inner.camera_enabled = false;
                inner.camera_error = Some(message.clone());
                if inner.state == CheckInState::Scanning {
                    inner.state = CheckInState::Idle;
                }
                self.announce_camera(false, Some(message)).await;
                self.publish(&inner).await;
            }
        }
    }

    async fn submit_locked(
        &self,
        inner: &mut MachineInner,
        token: &str,
        source: SubmitSource,
    ) -> Result<SubmitAck> {
        match inner.guard.try_begin(token) {
            GuardDecision::Accepted => {}
            GuardDecision::Duplicate => return Ok(SubmitAck::Duplicate),
            GuardDecision::Busy => {
                return Err(Error::Conflict(
                    "Another ticket is being validated".to_string(),
                ))
            }
        }

        inner.cancel_reset_timer();
        inner.submission_seq += 1;
        let seq = inner.submission_seq;
        inner.token = token.to_string();
        inner.state = CheckInState::Submitting;

        // no decoding while the request is pending
        self.disarm_scanner(inner).await;

        tracing::info!(
            token = %token_preview(token),
            token_len = token.len(),
            source = ?source,
            submission = seq,
            "Submitting ticket for validation"
        );
        self.publish(inner).await;
        self.spawn_validation(seq, token.to_string());

        Ok(SubmitAck::Submitted)
    }

    fn spawn_validation(&self, seq: u64, token: String) {
        let machine = self.clone();
        tokio::spawn(async move {
            let outcome = match machine.validator.validate(&token).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(error = %e, "Validation failed before reaching the server");
                    ValidationOutcome::failure(FailureReason::Generic)
                }
            };
            machine.settle(seq, outcome).await;
        });
    }

    async fn settle(&self, seq: u64, outcome: ValidationOutcome) {
        let mut inner = self.inner.lock().await;

        if inner.torn_down {
            tracing::debug!(submission = seq, "Console torn down, validation result discarded");
            return;
        }
        if seq != inner.submission_seq {
            tracing::warn!(submission = seq, current = inner.submission_seq, "Out-of-order settle ignored");
            return;
        }

        inner.guard.settle();
        let severity = Severity::classify(&outcome);

        tracing::info!(
            submission = seq,
            severity = ?severity,
            short_code = outcome.short_code.as_deref().unwrap_or("-"),
            "Validation settled"
        );

        inner.outcome = Some(outcome);
        match severity {
            Severity::Success => {
                inner.state = CheckInState::SuccessOverlay;
                self.schedule_reset(&mut inner);
            }
            Severity::Warning | Severity::Error => {
                inner.state = CheckInState::Result;
            }
        }

        self.publish(&inner).await;
    }

    fn schedule_reset(&self, inner: &mut MachineInner) {
        inner.cancel_reset_timer();
        inner.timer_seq += 1;
        let timer_id = inner.timer_seq;
        let delay = self.config.reset_delay;
        let machine = self.clone();

        inner.reset_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            machine.reset_after_overlay(timer_id).await;
        }));
    }

    async fn reset_after_overlay(&self, timer_id: u64) {
        let mut inner = self.inner.lock().await;
        if inner.torn_down
            || inner.timer_seq != timer_id
            || inner.state != CheckInState::SuccessOverlay
        {
            return;
        }

        // this task is the timer; drop the handle instead of aborting it
        inner.reset_timer = None;
        inner.outcome = None;
        inner.token.clear();
        self.rearm(&mut inner).await;

        tracing::debug!(state = ?inner.state, "Success overlay expired");
        self.publish(&inner).await;
    }

    /// Back to Scanning when the operator wants the camera, else Idle
    async fn rearm(&self, inner: &mut MachineInner) {
        if inner.camera_enabled {
            if inner.scan_session.is_none() {
                self.arm_scanner(inner).await;
            }
            inner.state = CheckInState::Scanning;
        } else {
            inner.state = CheckInState::Idle;
        }
    }

    async fn arm_scanner(&self, inner: &mut MachineInner) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = self
            .scanner
            .start(self.config.device_id.clone(), tx)
            .await;
        inner.scan_session = Some(session);
        self.spawn_event_pump(rx);
        self.announce_camera(true, None).await;
    }

    fn spawn_event_pump(&self, mut rx: mpsc::UnboundedReceiver<ScanEvent>) {
        let machine = self.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                machine.handle_scan_event(event).await;
            }
        });
    }

    async fn disarm_scanner(&self, inner: &mut MachineInner) {
        if inner.scan_session.take().is_some() {
            self.scanner.stop().await;
            self.announce_camera(false, None).await;
        }
    }

    async fn announce_camera(&self, running: bool, error: Option<String>) {
        let message = CameraStatusMessage {
            running,
            device_id: self.config.device_id.clone(),
            error,
        };
        self.realtime.broadcast(HubMessage::CameraStatus(message)).await;
    }

    async fn publish(&self, inner: &MachineInner) {
        let view = inner.view(&self.config);
        self.view_tx.send_replace(view.clone());
        self.realtime.broadcast(HubMessage::CheckInUpdate(view)).await;
    }

    fn ensure_alive(inner: &MachineInner) -> Result<()> {
        if inner.torn_down {
            return Err(Error::Internal("Check-in console is shut down".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{settle, MockCamera, ScriptedValidator, TextDecoder};
    use crate::validation_client::CheckInStatus;
    use chrono::NaiveDate;
    use std::time::Duration;

    struct Harness {
        machine: CheckInMachine,
        camera: Arc<MockCamera>,
        validator: Arc<ScriptedValidator>,
    }

    fn harness() -> Harness {
        let camera = Arc::new(MockCamera::with_single_device());
        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let validator = Arc::new(ScriptedValidator::new());
        validator.script(
            "T-VALID-TODAY",
            ValidationOutcome::resolved(CheckInStatus::CheckedIn, true, "ABC123", day, None),
        );
        validator.script(
            "T-USED",
            ValidationOutcome::resolved(CheckInStatus::AlreadyCheckedIn, true, "USD001", day, None),
        );
        validator.script(
            "T-OTHER-DAY",
            ValidationOutcome::resolved(CheckInStatus::CheckedIn, false, "OTH777", day, None),
        );
        validator.script("garbage", ValidationOutcome::failure(FailureReason::InvalidQr));

        let scanner = Arc::new(ScanLoop::new(camera.clone(), Arc::new(TextDecoder)));
        let machine = CheckInMachine::new(
            scanner,
            validator.clone(),
            Arc::new(RealtimeHub::new()),
            CheckInConfig::default(),
        );

        Harness {
            machine,
            camera,
            validator,
        }
    }

    async fn scanning(h: &Harness) {
        h.machine.resume_camera().await.unwrap();
        h.camera.wait_opened(h.camera.open_count() + 1).await;
        assert_eq!(h.machine.view().state, CheckInState::Scanning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_today_shows_overlay_then_resets() {
        let h = harness();
        scanning(&h).await;

        h.camera.show("T-VALID-TODAY");
        settle().await;

        let view = h.machine.view();
        assert_eq!(view.state, CheckInState::SuccessOverlay);
        assert_eq!(view.severity, Some(Severity::Success));
        let overlay = view.overlay.unwrap();
        assert_eq!(overlay.short_code.as_deref(), Some("ABC123"));
        assert_eq!(overlay.event_day.as_deref(), Some("2025-03-01"));
        assert_eq!(h.camera.active_tracks(), 0);

        tokio::time::advance(Duration::from_millis(2999)).await;
        settle().await;
        assert_eq!(h.machine.view().state, CheckInState::SuccessOverlay);

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;

        let view = h.machine.view();
        assert_eq!(view.state, CheckInState::Scanning);
        assert!(view.outcome.is_none());
        assert!(view.message.is_none());
        assert!(view.token.is_empty());
        assert!(view.camera_running);
        assert_eq!(h.camera.active_tracks(), 1);
        assert_eq!(h.validator.calls(), vec!["T-VALID-TODAY".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_used_is_warning_without_reset() {
        let h = harness();
        scanning(&h).await;

        h.camera.show("T-USED");
        settle().await;

        let view = h.machine.view();
        assert_eq!(view.state, CheckInState::Result);
        assert_eq!(view.severity, Some(Severity::Warning));
        assert_eq!(view.message.as_deref(), Some("El boleto ya fue escaneado hoy."));
        assert!(view.overlay.is_none());
        assert_eq!(view.ticket.unwrap().status_label, "Ya escaneado");

        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;
        let view = h.machine.view();
        assert_eq!(view.state, CheckInState::Result);
        assert!(view.outcome.is_some());
        assert!(!view.camera_running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_day_is_warning() {
        let h = harness();
        scanning(&h).await;

        h.camera.show("T-OTHER-DAY");
        settle().await;

        let view = h.machine.view();
        assert_eq!(view.state, CheckInState::Result);
        assert_eq!(view.severity, Some(Severity::Warning));
        assert!(view.overlay.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_garbage_is_error() {
        let h = harness();
        scanning(&h).await;

        h.camera.show("garbage");
        settle().await;

        let view = h.machine.view();
        assert_eq!(view.state, CheckInState::Result);
        assert_eq!(view.severity, Some(Severity::Error));
        assert_eq!(view.message.as_deref(), Some("QR inválido o manipulado."));
        assert!(view.ticket.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_request_for_duplicate_decodes() {
        let h = harness();
        h.validator.hold();
        scanning(&h).await;

        for _ in 0..5 {
            h.camera.show("T-VALID-TODAY");
        }
        settle().await;

        assert_eq!(h.machine.view().state, CheckInState::Submitting);
        assert_eq!(h.camera.active_tracks(), 0);
        assert!(!h.machine.view().can_submit_manual);

        assert_eq!(
            h.machine.submit_manual("T-VALID-TODAY").await.unwrap(),
            SubmitAck::Duplicate
        );
        assert!(matches!(
            h.machine.submit_manual("T-USED").await,
            Err(Error::Conflict(_))
        ));
        assert_eq!(h.validator.calls().len(), 1);

        h.validator.release();
        settle().await;
        assert_eq!(h.machine.view().state, CheckInState::SuccessOverlay);
        assert_eq!(h.validator.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_token_resubmits_after_settle() {
        let h = harness();

        assert_eq!(h.machine.submit_manual("T-USED").await.unwrap(), SubmitAck::Submitted);
        settle().await;
        assert_eq!(h.machine.view().state, CheckInState::Result);

        assert_eq!(h.machine.submit_manual("T-USED").await.unwrap(), SubmitAck::Submitted);
        settle().await;
        assert_eq!(h.validator.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_manual_token_rejected_locally() {
        let h = harness();
        scanning(&h).await;

        assert!(matches!(
            h.machine.submit_manual("   ").await,
            Err(Error::Validation(_))
        ));
        settle().await;

        assert_eq!(h.machine.view().state, CheckInState::Scanning);
        assert!(h.validator.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_during_submit_keeps_request() {
        let h = harness();
        h.validator.hold();
        scanning(&h).await;

        h.camera.show("T-VALID-TODAY");
        settle().await;
        assert_eq!(h.machine.view().state, CheckInState::Submitting);

        h.machine.pause_camera().await.unwrap();
        assert_eq!(h.machine.view().state, CheckInState::Submitting);

        h.validator.release();
        settle().await;
        assert_eq!(h.machine.view().state, CheckInState::SuccessOverlay);

        tokio::time::advance(Duration::from_millis(3000)).await;
        settle().await;

        let view = h.machine.view();
        assert_eq!(view.state, CheckInState::Idle);
        assert!(!view.camera_running);
        assert_eq!(h.camera.active_tracks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_resume() {
        let h = harness();
        scanning(&h).await;

        h.machine.pause_camera().await.unwrap();
        assert_eq!(h.machine.view().state, CheckInState::Idle);
        assert_eq!(h.camera.active_tracks(), 0);

        scanning(&h).await;
        assert_eq!(h.camera.active_tracks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_result_rearms_camera() {
        let h = harness();
        scanning(&h).await;

        h.camera.show("garbage");
        settle().await;
        assert_eq!(h.machine.view().state, CheckInState::Result);

        h.machine.dismiss().await.unwrap();
        h.camera.wait_opened(2).await;

        let view = h.machine.view();
        assert_eq!(view.state, CheckInState::Scanning);
        assert!(view.outcome.is_none());
        assert!(view.token.is_empty());
        assert_eq!(h.camera.active_tracks(), 1);

        // same code again is accepted once the result is gone
        h.camera.show("garbage");
        settle().await;
        assert_eq!(h.validator.calls(), vec!["garbage".to_string(), "garbage".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_from_result_clears_previous_outcome() {
        let h = harness();
        scanning(&h).await;

        h.camera.show("T-USED");
        settle().await;
        let view = h.machine.view();
        assert_eq!(view.state, CheckInState::Result);
        assert!(view.message.is_some());

        scanning(&h).await;

        let view = h.machine.view();
        assert!(view.outcome.is_none());
        assert!(view.severity.is_none());
        assert!(view.message.is_none());
        assert!(view.ticket.is_none());
        assert!(view.token.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_submit_during_overlay_cancels_reset() {
        let h = harness();
        scanning(&h).await;

        h.camera.show("T-VALID-TODAY");
        settle().await;
        assert_eq!(h.machine.view().state, CheckInState::SuccessOverlay);

        h.machine.submit_manual("T-USED").await.unwrap();
        settle().await;
        assert_eq!(h.machine.view().state, CheckInState::Result);

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        let view = h.machine.view();
        assert_eq!(view.state, CheckInState::Result);
        assert_eq!(view.outcome.unwrap().short_code.as_deref(), Some("USD001"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_camera_failure_reported_once() {
        let h = harness();
        h.camera.fail_open("Device or resource busy");

        h.machine.resume_camera().await.unwrap();
        settle().await;

        let view = h.machine.view();
        assert_eq!(view.state, CheckInState::Idle);
        assert!(!view.camera_enabled);
        assert!(view
            .camera_error
            .as_deref()
            .unwrap()
            .contains("Device or resource busy"));
        assert_eq!(h.camera.active_tracks(), 0);

        // operator retries explicitly
        h.camera.clear_failure();
        scanning(&h).await;
        assert!(h.machine.view().camera_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_discards_late_result() {
        let h = harness();
        h.validator.hold();
        scanning(&h).await;

        h.machine.submit_manual("T-VALID-TODAY").await.unwrap();
        settle().await;

        h.machine.shutdown().await;
        assert_eq!(h.camera.active_tracks(), 0);

        h.validator.release();
        settle().await;

        let view = h.machine.view();
        assert_eq!(view.state, CheckInState::Idle);
        assert!(view.outcome.is_none());
        assert!(h.machine.resume_camera().await.is_err());
        assert_eq!(h.camera.active_tracks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_transitions() {
        let h = harness();
        let mut rx = h.machine.subscribe();
        assert_eq!(rx.borrow_and_update().state, CheckInState::Idle);

        h.machine.submit_manual("garbage").await.unwrap();
        assert_eq!(rx.borrow_and_update().state, CheckInState::Submitting);

        settle().await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().state, CheckInState::Result);
    }
}
