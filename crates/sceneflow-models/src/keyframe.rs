//! Keyframe and reference image models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::status::GenerationStatus;

/// Maximum number of reference images a generation request may carry.
pub const MAX_REFERENCE_IMAGES: usize = 4;

/// Which end of a scene a keyframe marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum KeyframePosition {
    Start,
    End,
}

impl KeyframePosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyframePosition::Start => "start",
            KeyframePosition::End => "end",
        }
    }
}

/// A weighted reference image attached to a generation request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct ReferenceImage {
    /// Source image URL
    pub url: String,

    /// Prompt hint describing what the reference contributes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,

    /// Influence weight, 0.0 (ignored) to 1.0 (dominant)
    #[serde(default = "default_weight")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub weight: f64,
}

fn default_weight() -> f64 {
    0.5
}

impl ReferenceImage {
    /// Create a reference image with the default 0.5 weight.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            hint: None,
            weight: default_weight(),
        }
    }

    /// Create a reference image with an explicit weight.
    pub fn with_weight(url: impl Into<String>, weight: f64) -> Self {
        Self {
            url: url.into(),
            hint: None,
            weight,
        }
    }
}

/// A still image marking the start or end visual state of a scene's clip.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct Keyframe {
    /// Prompt used to generate this keyframe
    pub prompt: String,

    /// Weighted reference images attached to the generation request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_images: Vec<ReferenceImage>,

    /// Resolved image URL once generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Generation status for this slot
    #[serde(default)]
    pub status: GenerationStatus,
}

impl Keyframe {
    /// Create a keyframe with a prompt and no references.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// True once the keyframe has a resolved image URL.
    pub fn is_ready(&self) -> bool {
        self.status == GenerationStatus::Completed && self.image_url.is_some()
    }

    /// Mark the keyframe completed with its resolved URL.
    pub fn complete(&mut self, image_url: impl Into<String>) {
        self.image_url = Some(image_url.into());
        self.status = GenerationStatus::Completed;
    }

    /// Reset the slot for regeneration, keeping the prompt and references.
    pub fn reset(&mut self) {
        self.image_url = None;
        self.status = GenerationStatus::NotStarted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_weight_default() {
        let r = ReferenceImage::new("https://example.com/a.png");
        assert!((r.weight - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reference_weight_bounds() {
        assert!(ReferenceImage::with_weight("u", 0.0).validate().is_ok());
        assert!(ReferenceImage::with_weight("u", 1.0).validate().is_ok());
        assert!(ReferenceImage::with_weight("u", 1.5).validate().is_err());
        assert!(ReferenceImage::with_weight("u", -0.1).validate().is_err());
    }

    #[test]
    fn test_keyframe_readiness() {
        let mut kf = Keyframe::new("a red door");
        assert!(!kf.is_ready());

        kf.status = GenerationStatus::Completed;
        // Completed without a URL is not ready
        assert!(!kf.is_ready());

        kf.complete("https://cdn.example.com/kf.png");
        assert!(kf.is_ready());

        kf.reset();
        assert!(!kf.is_ready());
        assert_eq!(kf.prompt, "a red door");
    }
}
