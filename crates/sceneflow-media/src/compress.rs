//! Size-targeted video compression.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_video;

/// Audio track bitrate reserved out of the size budget.
const AUDIO_BITRATE_BPS: u64 = 128_000;

/// Floor for the computed video bitrate; below this the output is unusable
/// regardless of target size.
const MIN_VIDEO_BITRATE_BPS: u64 = 250_000;

/// Encode timeout. Scene clips are short; anything past this is a hang.
const ENCODE_TIMEOUT_SECS: u64 = 300;

/// Compression parameters.
#[derive(Debug, Clone)]
pub struct CompressionSettings {
    /// Output width cap in pixels; narrower sources keep their width.
    pub max_width: u32,
    /// Target output size in bytes.
    pub target_size_bytes: u64,
}

/// Compress a video toward a target size without exceeding a width cap.
///
/// Returns the path to the compressed file. If the source is already under
/// the target size it is copied unchanged. The output always lands next to
/// the input with a `-compressed.mp4` suffix.
pub async fn compress(
    input: impl AsRef<Path>,
    settings: &CompressionSettings,
) -> MediaResult<PathBuf> {
    let input = input.as_ref();
    let output = output_path(input);

    let source_size = tokio::fs::metadata(input)
        .await
        .map_err(|_| MediaError::FileNotFound(input.to_path_buf()))?
        .len();

    if source_size <= settings.target_size_bytes {
        debug!(
            "Source {} ({} bytes) already under target, copying",
            input.display(),
            source_size
        );
        tokio::fs::copy(input, &output).await?;
        return Ok(output);
    }

    let info = probe_video(input).await?;
    if info.duration <= 0.0 {
        return Err(MediaError::InvalidVideo(format!(
            "Zero-duration video: {}",
            input.display()
        )));
    }

    let video_bitrate = video_bitrate_for(settings.target_size_bytes, info.duration);

    debug!(
        "Compressing {} ({} bytes, {:.1}s) at {} bps video",
        input.display(),
        source_size,
        info.duration,
        video_bitrate
    );

    let cmd = FfmpegCommand::new(input, &output)
        .video_filter(format!("scale='min({},iw)':-2", settings.max_width))
        .video_codec("libx264")
        .preset("medium")
        .video_bitrate(video_bitrate)
        .audio_codec("aac")
        .audio_bitrate("128k")
        .faststart();

    FfmpegRunner::new()
        .with_timeout(ENCODE_TIMEOUT_SECS)
        .run(&cmd)
        .await?;

    let result_size = tokio::fs::metadata(&output).await?.len();
    info!(
        "Compressed {} from {} to {} bytes",
        input.display(),
        source_size,
        result_size
    );

    Ok(output)
}

fn output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "clip".to_string());
    input.with_file_name(format!("{}-compressed.mp4", stem))
}

/// Video bitrate that lands the file near the target size, after reserving
/// the audio track.
fn video_bitrate_for(target_size_bytes: u64, duration_secs: f64) -> u64 {
    let total_bps = ((target_size_bytes * 8) as f64 / duration_secs) as u64;
    total_bps
        .saturating_sub(AUDIO_BITRATE_BPS)
        .max(MIN_VIDEO_BITRATE_BPS)
}
