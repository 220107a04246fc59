//! Generation status shared by keyframes and scene videos.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a single generated artifact (keyframe image or scene video).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// Nothing generated yet
    #[default]
    NotStarted,
    /// A remote generation job is in flight
    Generating,
    /// Generation finished and the artifact URL is resolved
    Completed,
    /// Generation failed for this attempt
    Failed,
}

impl GenerationStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::NotStarted => "not_started",
            GenerationStatus::Generating => "generating",
            GenerationStatus::Completed => "completed",
            GenerationStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state for the attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Completed | GenerationStatus::Failed)
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_not_started() {
        assert_eq!(GenerationStatus::default(), GenerationStatus::NotStarted);
        assert!(!GenerationStatus::default().is_terminal());
    }

    #[test]
    fn test_terminal_states() {
        assert!(GenerationStatus::Completed.is_terminal());
        assert!(GenerationStatus::Failed.is_terminal());
        assert!(!GenerationStatus::Generating.is_terminal());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&GenerationStatus::NotStarted).unwrap();
        assert_eq!(json, "\"not_started\"");
    }
}
