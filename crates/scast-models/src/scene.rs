//! Scene timing types.
//!
//! A scene is a contiguous window of the narration timeline that one
//! generated image covers. Scenes come from either the heuristic planner
//! (word chunking + even timing) or a generative model's proposed
//! breakdown, re-normalized before use.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Minimum duration a scene must cover to be worth an image.
/// Scenes shorter than this are discarded during plan validation.
pub const MIN_SCENE_DURATION_SECS: f64 = 5.0;

/// A planned scene window with its synthesized image prompt.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SceneSpec {
    /// 1-based scene index
    pub index: u32,

    /// Start time in seconds (>= 0)
    #[serde(rename = "startTime")]
    pub start_time: f64,

    /// End time in seconds (> start_time)
    #[serde(rename = "endTime")]
    pub end_time: f64,

    /// Duration in seconds
    pub duration: f64,

    /// The script fragment this scene covers
    #[serde(rename = "sourceText")]
    pub source_text: String,

    /// Synthesized prompt for the image generator
    pub prompt: String,
}

impl SceneSpec {
    /// Whether this scene starts inside the given playback window.
    pub fn starts_within(&self, duration_secs: f64) -> bool {
        self.start_time < duration_secs
    }
}

/// A scene breakdown proposed by a generative text model.
///
/// Timings here are the model's own suggestion and are not trusted:
/// the planner rewrites them from index position before use.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProposedScene {
    /// Short scene title
    pub title: String,

    /// What happens in the scene
    pub description: String,

    /// Model-authored image prompt (sanitized before submission)
    #[serde(rename = "imagePrompt")]
    pub image_prompt: String,

    /// Model-proposed duration in seconds
    #[serde(default)]
    pub duration: f64,

    /// Model-proposed start time in seconds
    #[serde(rename = "startTime", default)]
    pub start_time: f64,
}

/// Diagnostics from validating a model-proposed plan.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanDiagnostics {
    /// Scenes that survived validation
    #[serde(rename = "totalScenes")]
    pub total_scenes: u32,

    /// Average scene duration after the even split
    #[serde(rename = "averageSceneDuration")]
    pub average_scene_duration: f64,

    /// Whether the total planned duration fits the requested duration
    #[serde(rename = "fitsRequestedDuration")]
    pub fits_requested_duration: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(index: u32, start: f64, end: f64) -> SceneSpec {
        SceneSpec {
            index,
            start_time: start,
            end_time: end,
            duration: end - start,
            source_text: String::new(),
            prompt: String::new(),
        }
    }

    #[test]
    fn test_starts_within() {
        assert!(scene(1, 0.0, 12.5).starts_within(50.0));
        assert!(!scene(4, 50.0, 62.5).starts_within(50.0));
        assert!(!scene(5, 62.5, 75.0).starts_within(50.0));
    }

    #[test]
    fn test_scene_spec_wire_names() {
        let json = serde_json::to_string(&scene(1, 0.0, 10.0)).unwrap();
        assert!(json.contains("\"startTime\":0.0"));
        assert!(json.contains("\"endTime\":10.0"));
        assert!(json.contains("\"sourceText\""));
    }

    #[test]
    fn test_proposed_scene_defaults() {
        let json = r#"{"title":"Opening","description":"A quiet street","imagePrompt":"a quiet street at dawn"}"#;
        let scene: ProposedScene = serde_json::from_str(json).unwrap();
        assert_eq!(scene.duration, 0.0);
        assert_eq!(scene.start_time, 0.0);
    }
}
