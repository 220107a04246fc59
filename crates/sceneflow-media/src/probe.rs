//! FFprobe video inspection.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// Video file information.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Video codec name
    pub codec: String,
    /// File size in bytes
    pub size: u64,
    /// Overall bitrate in bits/second
    pub bitrate: u64,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe a video file.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    crate::command::check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("ffprobe failed for {}", path.display()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidVideo("No video stream found".to_string()))?;

    let parse_u64 = |s: &Option<String>| s.as_ref().and_then(|v| v.parse::<u64>().ok());

    Ok(VideoInfo {
        duration: probe
            .format
            .duration
            .as_ref()
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0),
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        codec: video_stream.codec_name.clone().unwrap_or_default(),
        size: parse_u64(&probe.format.size).unwrap_or(0),
        bitrate: parse_u64(&probe.format.bit_rate).unwrap_or(0),
    })
}
