//! Scan loop types and backend seams

use crate::device_selector::VideoInputDevice;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Captured frame (encoded image bytes)
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            captured_at: Utc::now(),
        }
    }
}

/// Non-fatal decode miss
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeMiss {
    /// No code in frame
    NoCode,
    /// Decoder failed on this frame only
    Failed(String),
}

impl std::fmt::Display for DecodeMiss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeMiss::NoCode => write!(f, "no code in frame"),
            DecodeMiss::Failed(msg) => write!(f, "decode failed: {}", msg),
        }
    }
}

/// Event emitted by a scan session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A frame decoded to text (fires again for every frame showing the same code)
    Decoded { session_id: u64, text: String },
    /// Frame without a readable code
    Miss { session_id: u64, miss: DecodeMiss },
    /// Camera lost or never acquired; the session has ended
    Fatal { session_id: u64, message: String },
}

impl ScanEvent {
    pub fn session_id(&self) -> u64 {
        match self {
            ScanEvent::Decoded { session_id, .. }
            | ScanEvent::Miss { session_id, .. }
            | ScanEvent::Fatal { session_id, .. } => *session_id,
        }
    }
}

/// Scan loop status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanLoopStatus {
    pub running: bool,
    pub session_id: Option<u64>,
    pub device_id: Option<String>,
}

/// Camera hardware access
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Enumerate media devices
    async fn list_video_inputs(&self) -> Result<Vec<VideoInputDevice>>;

    /// Acquire a capture stream for a device.
    ///
    /// Dropping the returned future before it completes must release anything
    /// it already acquired.
    async fn open(&self, device_id: &str) -> Result<Box<dyn CaptureStream>>;
}

/// Live capture stream bound to one device
#[async_trait]
pub trait CaptureStream: Send {
    /// Next frame; `Ok(None)` when the stream ended
    async fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Stop every track. Must be idempotent.
    async fn stop(&mut self);

    /// Number of tracks still holding the hardware
    fn active_tracks(&self) -> usize;
}

/// Frame to text decoder
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    async fn decode(&self, frame: &Frame) -> std::result::Result<String, DecodeMiss>;
}
