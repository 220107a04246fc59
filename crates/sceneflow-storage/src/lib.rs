//! S3-compatible artifact store.
//!
//! Holds keyframe images, per-scene video clips and stitched final videos.
//! Keys are scoped per user, script and scene so recovery can enumerate a
//! scene's artifacts with a single prefix listing.

pub mod client;
pub mod error;
pub mod keys;

pub use client::{ArtifactStore, ObjectInfo, StoreConfig};
pub use error::{StorageError, StorageResult};
