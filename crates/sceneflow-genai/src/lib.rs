//! Clients for the remote generation services.
//!
//! Two asynchronous job APIs (keyframe image generation and image-pair to
//! video generation) plus the video composition service used for the final
//! stitch. All three submit a job and poll until the remote side reports a
//! terminal state; callers only ever see a terminal result.

pub mod client;
pub mod error;
pub mod stitch;
pub mod types;

pub use client::{GenAiConfig, GeneratedImage, GeneratedVideo, GenerationClient};
pub use error::{GenAiError, GenAiResult};
pub use stitch::StitchClient;
