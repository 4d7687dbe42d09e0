//! Test doubles shared by the unit tests

use crate::device_selector::VideoInputDevice;
use crate::error::{Error, Result};
use crate::scan_loop::{CameraBackend, CaptureStream, DecodeMiss, Frame, FrameDecoder};
use crate::validation_client::{FailureReason, TicketValidator, ValidationOutcome};
use async_trait::async_trait;
use axum::Router;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};

/// Let spawned tasks run to quiescence (works with paused time)
pub(crate) async fn settle() {
    for _ in 0..200 {
        tokio::task::yield_now().await;
    }
}

/// Serve a router on an ephemeral local port, returns the base URL
pub(crate) async fn spawn_http(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// In-memory camera. `show()` puts a frame in front of every open stream.
pub(crate) struct MockCamera {
    devices: Vec<VideoInputDevice>,
    frames: broadcast::Sender<Vec<u8>>,
    tracks: Arc<AtomicUsize>,
    max_tracks: Arc<AtomicUsize>,
    opens: AtomicUsize,
    opened: Mutex<Vec<String>>,
    open_delay: Mutex<Duration>,
    open_error: Mutex<Option<String>>,
}

impl MockCamera {
    pub(crate) fn new(devices: Vec<VideoInputDevice>) -> Self {
        let (frames, _) = broadcast::channel(64);
        Self {
            devices,
            frames,
            tracks: Arc::new(AtomicUsize::new(0)),
            max_tracks: Arc::new(AtomicUsize::new(0)),
            opens: AtomicUsize::new(0),
            opened: Mutex::new(Vec::new()),
            open_delay: Mutex::new(Duration::ZERO),
            open_error: Mutex::new(None),
        }
    }

    pub(crate) fn with_single_device() -> Self {
        Self::new(vec![VideoInputDevice::video("cam-0", "Integrated Camera")])
    }

    pub(crate) fn show(&self, text: &str) {
        let _ = self.frames.send(text.as_bytes().to_vec());
    }

    pub(crate) fn set_open_delay(&self, delay: Duration) {
        *self.open_delay.lock().unwrap() = delay;
    }

    pub(crate) fn fail_open(&self, message: &str) {
        *self.open_error.lock().unwrap() = Some(message.to_string());
    }

    pub(crate) fn clear_failure(&self) {
        *self.open_error.lock().unwrap() = None;
    }

    pub(crate) fn active_tracks(&self) -> usize {
        self.tracks.load(Ordering::SeqCst)
    }

    pub(crate) fn max_concurrent_tracks(&self) -> usize {
        self.max_tracks.load(Ordering::SeqCst)
    }

    /// Successful opens so far
    pub(crate) fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn opened_devices(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    /// Wait until `count` streams have been opened
    pub(crate) async fn wait_opened(&self, count: usize) {
        for _ in 0..1000 {
            if self.open_count() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!(
            "camera opened {} times, expected {}",
            self.open_count(),
            count
        );
    }
}

#[async_trait]
impl CameraBackend for MockCamera {
    async fn list_video_inputs(&self) -> Result<Vec<VideoInputDevice>> {
        Ok(self.devices.clone())
    }

    async fn open(&self, device_id: &str) -> Result<Box<dyn CaptureStream>> {
        let delay = *self.open_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let error = self.open_error.lock().unwrap().clone();
        if let Some(message) = error {
            return Err(Error::CameraUnavailable {
                device_id: device_id.to_string(),
                message,
            });
        }

        let rx = self.frames.subscribe();
        let now = self.tracks.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_tracks.fetch_max(now, Ordering::SeqCst);
        self.opened.lock().unwrap().push(device_id.to_string());
        self.opens.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockStream {
            rx,
            tracks: self.tracks.clone(),
            live: true,
        }))
    }
}

struct MockStream {
    rx: broadcast::Receiver<Vec<u8>>,
    tracks: Arc<AtomicUsize>,
    live: bool,
}

impl MockStream {
    fn release(&mut self) {
        if self.live {
            self.live = false;
            self.tracks.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl CaptureStream for MockStream {
    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.rx.recv().await {
                Ok(data) => return Ok(Some(Frame::new(data))),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return Ok(None),
            }
        }
    }

    async fn stop(&mut self) {
        self.release();
    }

    fn active_tracks(&self) -> usize {
        usize::from(self.live)
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.release();
    }
}

/// Frame bytes are the code text
pub(crate) struct TextDecoder;

#[async_trait]
impl FrameDecoder for TextDecoder {
    async fn decode(&self, frame: &Frame) -> std::result::Result<String, DecodeMiss> {
        let text = std::str::from_utf8(&frame.data)
            .map_err(|e| DecodeMiss::Failed(e.to_string()))?
            .trim();
        if text.is_empty() {
            Err(DecodeMiss::NoCode)
        } else {
            Ok(text.to_string())
        }
    }
}

/// Validator answering from a script; can hold requests in flight
pub(crate) struct ScriptedValidator {
    script: Mutex<HashMap<String, ValidationOutcome>>,
    calls: Mutex<Vec<String>>,
    held: AtomicBool,
    gate: Semaphore,
}

impl ScriptedValidator {
    pub(crate) fn new() -> Self {
        Self {
            script: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            held: AtomicBool::new(false),
            gate: Semaphore::new(0),
        }
    }

    pub(crate) fn script(&self, token: &str, outcome: ValidationOutcome) {
        self.script.lock().unwrap().insert(token.to_string(), outcome);
    }

    /// Tokens received so far, in order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Keep subsequent requests pending until `release()`
    pub(crate) fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub(crate) fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }
}

#[async_trait]
impl TicketValidator for ScriptedValidator {
    async fn validate(&self, token: &str) -> Result<ValidationOutcome> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::Validation("QR token is empty".to_string()));
        }

        self.calls.lock().unwrap().push(token.to_string());

        if self.held.load(Ordering::SeqCst) {
            let _permit = self.gate.acquire().await;
        }

        let outcome = self
            .script
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .unwrap_or_else(|| ValidationOutcome::failure(FailureReason::Generic));
        Ok(outcome)
    }
}
