//! Scene video generation pipeline.
//!
//! Drives scripts from draft text to a stitched final video: keyframe
//! generation, per-scene video generation with download, compression, upload
//! and verification, resume from stored artifacts, and final composition.
//!
//! The [`ProjectOrchestrator`] is the entry point; it delegates per-scene work
//! to the [`SceneController`] and talks to collaborators only through the
//! traits in [`traits`], with production implementations in [`adapters`].

pub mod adapters;
pub mod config;
pub mod controller;
pub mod download;
pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod telemetry;
pub mod traits;

pub use adapters::FfmpegTransform;
pub use config::PipelineConfig;
pub use controller::{SceneController, SceneScope};
pub use download::HttpFetcher;
pub use error::{PipelineError, PipelineResult};
pub use orchestrator::{ProjectOrchestrator, SceneDraft};
pub use retry::{retry_async, RetryOutcome, RetryPolicy};
pub use traits::{
    ArtifactStorage, FileFetcher, Generator, MediaTransform, ScriptStore, Stitcher,
};
