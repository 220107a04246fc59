//! Firestore REST API client for sceneflow.
//!
//! One script document per project holds the ordered scene list, statuses and
//! generated clip references; the orchestrator rewrites it wholesale on every
//! mutation so a crash loses at most one step of progress.

pub mod client;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod script_repo;
pub mod token_cache;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use retry::RetryConfig;
pub use script_repo::ScriptRepository;
pub use types::{Document, Value};
