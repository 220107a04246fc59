//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Builder for FFmpeg invocations.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    output_args: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
        }
    }

    /// Add an output argument (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set encoder preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Set target video bitrate in bits/second, with matching maxrate and
    /// buffer so the encoder actually honors the target.
    pub fn video_bitrate(self, bits_per_second: u64) -> Self {
        self.output_arg("-b:v")
            .output_arg(bits_per_second.to_string())
            .output_arg("-maxrate")
            .output_arg(bits_per_second.to_string())
            .output_arg("-bufsize")
            .output_arg((bits_per_second * 2).to_string())
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Write moov atom up front for streamable mp4 output.
    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    /// Build the full argument list.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-i".to_string(),
            self.input.to_string_lossy().to_string(),
        ];
        args.extend(self.output_args.clone());
        args.push(self.output.to_string_lossy().to_string());
        args
    }
}

/// Runner for FFmpeg commands with an optional timeout.
#[derive(Debug, Default)]
pub struct FfmpegRunner {
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the encode if it runs longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an FFmpeg command to completion.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stderr_pipe = child.stderr.take();

        let wait = async {
            let mut stderr = String::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                let _ = pipe.read_to_string(&mut stderr).await;
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, stderr))
        };

        let (status, stderr) = match self.timeout_secs {
            Some(secs) => {
                match tokio::time::timeout(std::time::Duration::from_secs(secs), wait).await {
                    Ok(result) => result?,
                    Err(_) => {
                        warn!("FFmpeg timed out after {}s, killing process", secs);
                        let _ = child.kill().await;
                        return Err(MediaError::Timeout(secs));
                    }
                }
            }
            None => wait.await?,
        };

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(stderr),
                status.code(),
            ))
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
