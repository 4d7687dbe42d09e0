//! ScanLoop - Continuous QR capture
//!
//! ## Responsibilities
//!
//! - Own at most one capture session per instance
//! - Pick a camera when none is given (DeviceSelector)
//! - Decode frames and emit one event per decoded frame
//! - Release the camera deterministically on stop
//!
//! ## Design
//!
//! - One spawned task per session, cancelled through a watch channel
//! - `stop()` waits for the task, so the camera is free when it returns
//! - Repeated frames of the same code are NOT deduplicated here
//!   (SubmissionGuard owns that)

mod types;
pub mod v4l2;

pub use types::*;

use crate::device_selector::pick_device;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

/// Running capture session
struct ScanSession {
    id: u64,
    device_id: Option<String>,
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// ScanLoop instance
pub struct ScanLoop {
    backend: Arc<dyn CameraBackend>,
    decoder: Arc<dyn FrameDecoder>,
    session: Mutex<Option<ScanSession>>,
    session_counter: AtomicU64,
}

impl ScanLoop {
    /// Create new ScanLoop
    pub fn new(backend: Arc<dyn CameraBackend>, decoder: Arc<dyn FrameDecoder>) -> Self {
        Self {
            backend,
            decoder,
            session: Mutex::new(None),
            session_counter: AtomicU64::new(0),
        }
    }

    /// Start a capture session, stopping the previous one first.
    ///
    /// Returns the session id carried by every emitted event. Camera errors
    /// are reported as `ScanEvent::Fatal` on `events`, not returned here.
    pub async fn start(
        &self,
        device_id: Option<String>,
        events: mpsc::UnboundedSender<ScanEvent>,
    ) -> u64 {
        let mut session = self.session.lock().await;

        if let Some(previous) = session.take() {
            tracing::debug!(session_id = previous.id, "Restarting scan loop");
            Self::shutdown(previous).await;
        }

        let id = self.session_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let task = tokio::spawn(run_session(
            self.backend.clone(),
            self.decoder.clone(),
            id,
            device_id.clone(),
            events,
            cancel_rx,
        ));

        tracing::info!(
            session_id = id,
            device_id = device_id.as_deref().unwrap_or("auto"),
            "Scan loop started"
        );

        *session = Some(ScanSession {
            id,
            device_id,
            cancel: cancel_tx,
            task,
        });

        id
    }

    /// Stop the current session and release the camera.
    ///
    /// Idempotent; safe while the camera is still being acquired.
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;
        if let Some(current) = session.take() {
            Self::shutdown(current).await;
        }
    }

    /// Current status
    pub async fn status(&self) -> ScanLoopStatus {
        let session = self.session.lock().await;
        match session.as_ref() {
            Some(s) => ScanLoopStatus {
                running: !s.task.is_finished(),
                session_id: Some(s.id),
                device_id: s.device_id.clone(),
            },
            None => ScanLoopStatus {
                running: false,
                session_id: None,
                device_id: None,
            },
        }
    }

    /// Camera backend (device enumeration)
    pub fn backend(&self) -> &Arc<dyn CameraBackend> {
        &self.backend
    }

    async fn shutdown(session: ScanSession) {
        let _ = session.cancel.send(true);

        if let Err(e) = session.task.await {
            if e.is_panic() {
                tracing::error!(session_id = session.id, error = %e, "Scan session panicked");
            }
        }

        tracing::info!(session_id = session.id, "Scan loop stopped");
    }
}

/// Body of one capture session
async fn run_session(
    backend: Arc<dyn CameraBackend>,
    decoder: Arc<dyn FrameDecoder>,
    session_id: u64,
    device_id: Option<String>,
    events: mpsc::UnboundedSender<ScanEvent>,
    mut cancel: watch::Receiver<bool>,
) {
    let fatal = |message: String| {
        tracing::warn!(session_id, message = %message, "Camera unavailable");
        let _ = events.send(ScanEvent::Fatal {
            session_id,
            message,
        });
    };

    let device_id = match device_id {
        Some(id) => id,
        None => {
            let listed = tokio::select! {
                biased;
                _ = cancel.changed() => return,
                listed = backend.list_video_inputs() => listed,
            };
            match listed.and_then(|devices| pick_device(&devices)) {
                Ok(id) => id,
                Err(e) => {
                    fatal(e.to_string());
                    return;
                }
            }
        }
    };

    let opened = tokio::select! {
        biased;
        _ = cancel.changed() => {
            tracing::debug!(session_id, device_id = %device_id, "Stopped before camera was acquired");
            return;
        }
        opened = backend.open(&device_id) => opened,
    };

    let mut stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            fatal(e.to_string());
            return;
        }
    };

    tracing::info!(session_id, device_id = %device_id, "Camera acquired");

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.changed() => break,
            next = stream.next_frame() => next,
        };

        let frame = match next {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                fatal(format!("Video stream from {} ended", device_id));
                break;
            }
            Err(e) => {
                fatal(e.to_string());
                break;
            }
        };

        let decoded = tokio::select! {
            biased;
            _ = cancel.changed() => break,
            decoded = decoder.decode(&frame) => decoded,
        };

        let event = match decoded {
            Ok(text) => ScanEvent::Decoded { session_id, text },
            Err(miss) => {
                tracing::trace!(session_id, miss = %miss, "No code in frame");
                ScanEvent::Miss { session_id, miss }
            }
        };

        if events.send(event).is_err() {
            tracing::debug!(session_id, "Scan consumer dropped, ending session");
            break;
        }
    }

    stream.stop().await;
    tracing::info!(
        session_id,
        device_id = %device_id,
        active_tracks = stream.active_tracks(),
        "Camera released"
    );
}
