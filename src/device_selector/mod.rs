//! DeviceSelector - Camera selection
//!
//! ## Responsibilities
//!
//! - Describe enumerated media devices
//! - Pick the camera most likely to face the ticket holder
//!
//! ## Heuristic
//!
//! Labels that look like a rear/back/environment/main camera win (first match).
//! Without such a label the LAST video input is used, which on most phones and
//! USB docks is the rear module. Labels are vendor- and locale-dependent, so
//! this is a best guess, never a guarantee.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Label fragments that mark a rear-facing camera (en/es/pt)
const REAR_LIKE_TOKENS: &[&str] = &[
    "back",
    "rear",
    "environment",
    "atrás",
    "atras",
    "trás",
    "tras",
    "principal",
    "main",
];

/// Media device kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

/// Enumerated media device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInputDevice {
    pub device_id: String,
    #[serde(default)]
    pub label: String,
    pub kind: DeviceKind,
}

impl VideoInputDevice {
    pub fn video(device_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            label: label.into(),
            kind: DeviceKind::VideoInput,
        }
    }

    /// Whether the label looks like a rear camera
    pub fn is_rear_like(&self) -> bool {
        let label = self.label.to_lowercase();
        REAR_LIKE_TOKENS.iter().any(|token| label.contains(token))
    }
}

/// Pick the best camera from an enumerated device snapshot
pub fn pick_device(devices: &[VideoInputDevice]) -> Result<String> {
    let video: Vec<&VideoInputDevice> = devices
        .iter()
        .filter(|d| d.kind == DeviceKind::VideoInput)
        .collect();

    if let Some(rear) = video.iter().find(|d| d.is_rear_like()) {
        tracing::debug!(
            device_id = %rear.device_id,
            label = %rear.label,
            "Selected rear-like camera"
        );
        return Ok(rear.device_id.clone());
    }

    let last = video.last().ok_or(Error::NoCameraFound)?;
    tracing::debug!(
        device_id = %last.device_id,
        candidates = video.len(),
        "No rear-like label, falling back to last camera"
    );
    Ok(last.device_id.clone())
}
