//! Prompt composition for video generation.
//!
//! Clips are generated independently per scene and concatenated later, so the
//! downstream prompt always carries a fixed set of visual-consistency
//! constraints. Keeping composition here (not in the HTTP client) makes the
//! template testable and keeps the client a dumb transport.

/// Constraints appended to every video generation prompt so independently
/// generated clips stay visually coherent when stitched.
const CONSISTENCY_CONSTRAINTS: &str = "\
Visual consistency requirements:\n\
- Keep the composition stable; no sudden reframing or camera whips.\n\
- Keep lighting direction and color temperature consistent across the shot.\n\
- Limit the shot to the subjects described; do not introduce new people or objects.";

/// Compose the prompt passed to the image-pair-to-video endpoint.
///
/// Combines the scene narrative with explicit start/end frame descriptions
/// and the fixed consistency block.
pub fn video_prompt(narrative: &str, start_description: &str, end_description: &str) -> String {
    format!(
        "{narrative}\n\n\
         The clip opens on: {start_description}\n\
         The clip ends on: {end_description}\n\n\
         {CONSISTENCY_CONSTRAINTS}",
        narrative = narrative.trim(),
        start_description = start_description.trim(),
        end_description = end_description.trim(),
    )
}
