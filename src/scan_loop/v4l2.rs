//! Production camera backend
//!
//! - Devices: V4L2 capture nodes listed from sysfs
//! - Capture: `ffmpeg` child process emitting MJPEG on stdout
//! - Decode: `zbarimg` on a temp file per frame
//!
//! Child processes are spawned with `kill_on_drop(true)`, so an abandoned
//! stream never keeps the device open. ffmpeg's stderr is drained for the
//! whole life of the capture; only its tail is kept for the exit report.

use super::types::{CameraBackend, CaptureStream, DecodeMiss, Frame, FrameDecoder};
use crate::device_selector::VideoInputDevice;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// sysfs directory listing capture devices
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/video4linux";

/// Pending bytes kept while looking for a frame boundary
const MAX_PENDING_BYTES: usize = 8 * 1024 * 1024;

const READ_CHUNK: usize = 64 * 1024;

/// ffmpeg stderr bytes kept for error reports
const STDERR_TAIL_BYTES: usize = 4 * 1024;

/// Wait for the stderr drain after ffmpeg exited
const STDERR_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// zbarimg exit status when the image holds no symbol
const ZBAR_NO_SYMBOL: i32 = 4;

/// V4L2 + ffmpeg camera backend
pub struct FfmpegCamera {
    ffmpeg_path: String,
    fps: u32,
    sysfs_root: PathBuf,
}

impl FfmpegCamera {
    pub fn new(ffmpeg_path: String, fps: u32) -> Self {
        Self {
            ffmpeg_path,
            fps: fps.max(1),
            sysfs_root: PathBuf::from(DEFAULT_SYSFS_ROOT),
        }
    }

    /// Enumerate from another sysfs root
    pub fn with_sysfs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sysfs_root = root.into();
        self
    }
}

#[async_trait]
impl CameraBackend for FfmpegCamera {
    async fn list_video_inputs(&self) -> Result<Vec<VideoInputDevice>> {
        list_v4l2_devices(&self.sysfs_root).await
    }

    async fn open(&self, device_id: &str) -> Result<Box<dyn CaptureStream>> {
        let fps_filter = format!("fps={}", self.fps);

        let mut child = Command::new(&self.ffmpeg_path)
            .args([
                "-hide_banner",
                "-loglevel", "error",
                "-f", "v4l2",
                "-i", device_id,
                "-vf", fps_filter.as_str(),
                "-f", "image2pipe",
                "-vcodec", "mjpeg",
                "-q:v", "5",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::CameraUnavailable {
                device_id: device_id.to_string(),
                message: format!("ffmpeg spawn failed: {}", e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            Error::Internal("ffmpeg stdout not captured".to_string())
        })?;
        let stderr_tail = child.stderr.take().map(drain_stderr);

        tracing::debug!(device_id = %device_id, fps = self.fps, "ffmpeg capture spawned");

        Ok(Box::new(FfmpegStream {
            device_id: device_id.to_string(),
            child: Some(child),
            stdout,
            stderr_tail,
            pending: Vec::new(),
        }))
    }
}

/// List capture nodes, sorted by node number.
///
/// Only index 0 of each physical camera is a capture node; the other indexes
/// carry metadata and are skipped.
pub async fn list_v4l2_devices(sysfs_root: &Path) -> Result<Vec<VideoInputDevice>> {
    let mut entries = match fs::read_dir(sysfs_root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut nodes = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        let Some(number) = name
            .strip_prefix("video")
            .and_then(|n| n.parse::<u32>().ok())
        else {
            continue;
        };

        let dir = entry.path();
        if let Ok(index) = fs::read_to_string(dir.join("index")).await {
            if index.trim() != "0" {
                continue;
            }
        }

        let label = fs::read_to_string(dir.join("name"))
            .await
            .map(|l| l.trim().to_string())
            .unwrap_or_default();

        nodes.push((number, VideoInputDevice::video(format!("/dev/{}", name), label)));
    }

    nodes.sort_by_key(|(number, _)| *number);
    Ok(nodes.into_iter().map(|(_, device)| device).collect())
}

/// Read ffmpeg stderr until it closes, keeping the last bytes.
///
/// An undrained pipe fills up and blocks ffmpeg before it writes the next
/// frame.
fn drain_stderr(mut pipe: ChildStderr) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut tail = Vec::new();
        let mut chunk = vec![0u8; 4096];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    tail.extend_from_slice(&chunk[..n]);
                    if tail.len() > STDERR_TAIL_BYTES {
                        let excess = tail.len() - STDERR_TAIL_BYTES;
                        tail.drain(..excess);
                    }
                }
            }
        }
        String::from_utf8_lossy(&tail).into_owned()
    })
}

/// Running ffmpeg capture
struct FfmpegStream {
    device_id: String,
    child: Option<Child>,
    stdout: ChildStdout,
    stderr_tail: Option<JoinHandle<String>>,
    pending: Vec<u8>,
}

impl FfmpegStream {
    async fn exit_error(&mut self) -> Result<Option<Frame>> {
        let Some(mut child) = self.child.take() else {
            return Ok(None);
        };

        let status = child.wait().await?;
        let stderr = match self.stderr_tail.take() {
            Some(handle) => match tokio::time::timeout(STDERR_FLUSH_TIMEOUT, handle).await {
                Ok(Ok(tail)) => tail,
                _ => String::new(),
            },
            None => String::new(),
        };

        if status.success() {
            Ok(None)
        } else {
            Err(Error::CameraUnavailable {
                device_id: self.device_id.clone(),
                message: if stderr.trim().is_empty() {
                    format!("ffmpeg exited with {}", status)
                } else {
                    stderr.trim().to_string()
                },
            })
        }
    }
}

#[async_trait]
impl CaptureStream for FfmpegStream {
    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut chunk = vec![0u8; READ_CHUNK];

        loop {
            if let Some(jpeg) = extract_latest_jpeg(&mut self.pending) {
                return Ok(Some(Frame::new(jpeg)));
            }

            if self.child.is_none() {
                return Ok(None);
            }

            let n = self.stdout.read(&mut chunk).await?;
            if n == 0 {
                return self.exit_error().await;
            }

            self.pending.extend_from_slice(&chunk[..n]);
            if self.pending.len() > MAX_PENDING_BYTES {
                tracing::warn!(device_id = %self.device_id, "No frame boundary found, dropping buffer");
                self.pending.clear();
            }
        }
    }

    async fn stop(&mut self) {
        if let Some(handle) = self.stderr_tail.take() {
            handle.abort();
        }
        if let Some(mut child) = self.child.take() {
            let _ = child.start_kill();
            if let Err(e) = child.wait().await {
                tracing::warn!(device_id = %self.device_id, error = %e, "ffmpeg wait failed");
            }
        }
        self.pending.clear();
    }

    fn active_tracks(&self) -> usize {
        usize::from(self.child.is_some())
    }
}

/// Pop the oldest complete JPEG (SOI..EOI) from `buf`
fn extract_jpeg(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    let Some(start) = find_marker(buf, 0, 0xD8) else {
        // keep a trailing 0xFF, it may be half of the next SOI
        let keep = usize::from(buf.last() == Some(&0xFF));
        let cut = buf.len() - keep;
        buf.drain(..cut);
        return None;
    };

    let end = find_marker(buf, start + 2, 0xD9)?;
    let frame = buf[start..end + 2].to_vec();
    buf.drain(..end + 2);
    Some(frame)
}

/// Newest complete JPEG in `buf`, older ones are dropped
fn extract_latest_jpeg(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    let mut latest = None;
    while let Some(frame) = extract_jpeg(buf) {
        latest = Some(frame);
    }
    latest
}

fn find_marker(buf: &[u8], from: usize, marker: u8) -> Option<usize> {
    if buf.len() < from + 2 {
        return None;
    }
    buf[from..]
        .windows(2)
        .position(|w| w[0] == 0xFF && w[1] == marker)
        .map(|p| p + from)
}

/// Frame written for zbarimg, removed when dropped
struct TempFrame {
    path: PathBuf,
}

impl Drop for TempFrame {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove temp frame");
            }
        }
    }
}

/// zbarimg QR decoder
pub struct ZbarDecoder {
    zbarimg_path: String,
    temp_dir: PathBuf,
}

impl ZbarDecoder {
    pub fn new(zbarimg_path: String, temp_dir: PathBuf) -> Self {
        Self {
            zbarimg_path,
            temp_dir,
        }
    }
}

#[async_trait]
impl FrameDecoder for ZbarDecoder {
    async fn decode(&self, frame: &Frame) -> std::result::Result<String, DecodeMiss> {
        // removed on every exit path, cancellation included
        let temp = TempFrame {
            path: self.temp_dir.join(format!("gate-frame-{}.jpg", Uuid::new_v4())),
        };

        fs::write(&temp.path, &frame.data)
            .await
            .map_err(|e| DecodeMiss::Failed(format!("temp write failed: {}", e)))?;

        let output = Command::new(&self.zbarimg_path)
            .args(["--quiet", "--raw", "-Sdisable", "-Sqrcode.enable"])
            .arg(&temp.path)
            .kill_on_drop(true)
            .output()
            .await;
        drop(temp);

        let output = output.map_err(|e| DecodeMiss::Failed(format!("zbarimg spawn failed: {}", e)))?;
        parse_zbar_output(
            output.status.code(),
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
        )
    }
}

fn parse_zbar_output(
    code: Option<i32>,
    stdout: &str,
    stderr: &str,
) -> std::result::Result<String, DecodeMiss> {
    match code {
        Some(0) => stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or(DecodeMiss::NoCode),
        Some(ZBAR_NO_SYMBOL) => Err(DecodeMiss::NoCode),
        Some(other) => Err(DecodeMiss::Failed(format!(
            "zbarimg exited with {}: {}",
            other,
            stderr.trim()
        ))),
        None => Err(DecodeMiss::Failed("zbarimg killed by signal".to_string())),
    }
}
