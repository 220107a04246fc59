//! Object key layout.
//!
//! All artifacts are scoped `users/{user}/scripts/{script}/...` so deleting a
//! script is a single prefix delete, and recovering a scene's clips is a
//! single prefix listing. Upload retries generate a fresh key each attempt so
//! a partially-written object from a failed attempt is never re-read.

use uuid::Uuid;

/// Prefix covering every artifact of a script.
pub fn script_prefix(user_id: &str, script_id: &str) -> String {
    format!("users/{}/scripts/{}/", user_id, script_id)
}

/// Prefix covering every artifact of one scene.
pub fn scene_prefix(user_id: &str, script_id: &str, scene_index: u32) -> String {
    format!(
        "users/{}/scripts/{}/scenes/{}/",
        user_id, script_id, scene_index
    )
}

/// Prefix covering a scene's uploaded video clips only.
pub fn scene_video_prefix(user_id: &str, script_id: &str, scene_index: u32) -> String {
    format!("{}videos/", scene_prefix(user_id, script_id, scene_index))
}

/// Fresh key for a keyframe image. `position` is "start" or "end".
pub fn keyframe_key(user_id: &str, script_id: &str, scene_index: u32, position: &str) -> String {
    format!(
        "{}keyframes/{}-{}.png",
        scene_prefix(user_id, script_id, scene_index),
        position,
        Uuid::new_v4()
    )
}

/// Fresh key for a scene video clip. A new suffix is generated per upload
/// attempt.
pub fn scene_video_key(user_id: &str, script_id: &str, scene_index: u32) -> String {
    format!(
        "{}clip-{}.mp4",
        scene_video_prefix(user_id, script_id, scene_index),
        Uuid::new_v4()
    )
}

/// Fresh key for the stitched final video.
pub fn final_video_key(user_id: &str, script_id: &str) -> String {
    format!(
        "users/{}/scripts/{}/final/video-{}.mp4",
        user_id,
        script_id,
        Uuid::new_v4()
    )
}
