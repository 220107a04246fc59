//! Identifier newtypes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a script (one project).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ScriptId(pub String);

impl ScriptId {
    /// Generate a new random script ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ScriptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ScriptId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ScriptId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a scene document.
///
/// Distinct from the scene *index*: the index is the stable stitch position,
/// the id is the document identity carried into artifact metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SceneId(pub String);

impl SceneId {
    /// Generate a new random scene ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SceneId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SceneId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SceneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_id_roundtrip() {
        let id = ScriptId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: ScriptId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(ScriptId::new(), ScriptId::new());
        assert_ne!(SceneId::new(), SceneId::new());
    }
}
