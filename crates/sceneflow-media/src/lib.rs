//! Local media transforms backed by FFmpeg.
//!
//! The pipeline uses this crate for exactly one job: shrinking a downloaded
//! scene clip toward a target size and width bound before upload. Probing is
//! exposed as well since duration feeds the bitrate calculation.

pub mod command;
pub mod compress;
pub mod error;
pub mod probe;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use compress::{compress, CompressionSettings};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_video, VideoInfo};
