//! Generated image and run result types.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::scene::SceneSpec;

/// One image produced for a scene. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedImage {
    /// 1-based index of the scene this image covers
    #[serde(rename = "sceneIndex")]
    pub scene_index: u32,

    /// Playback timestamp in seconds (the scene's start time)
    pub timestamp: f64,

    /// Suggested filename for persistence
    pub filename: String,

    /// Base64-encoded image payload
    #[serde(rename = "imageData")]
    pub data: String,

    /// Approximate decoded size in bytes
    #[serde(rename = "sizeBytes")]
    pub size_bytes: u64,

    /// MIME type of the encoded payload
    #[serde(rename = "mimeType")]
    pub mime_type: String,

    /// The prompt submitted to the image generator
    pub prompt: String,

    /// Human-readable scene description
    pub description: String,
}

/// A scene whose image generation failed.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FailedScene {
    /// 1-based scene index
    #[serde(rename = "sceneIndex")]
    pub scene_index: u32,

    /// Playback timestamp in seconds
    pub timestamp: f64,

    /// The prompt that was attempted
    pub prompt: String,

    /// Provider error message
    pub error: String,
}

/// The result of one generation run for a project.
///
/// Partial success is the expected shape: `images` may be sparse and
/// `failed_scenes` non-empty, and the run still counts as a success.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationRun {
    /// Project this run belongs to
    #[serde(rename = "projectId")]
    pub project_id: String,

    /// Planned scenes, in index order
    pub scenes: Vec<SceneSpec>,

    /// Generated images, in scene order (sparse on failures)
    pub images: Vec<GeneratedImage>,

    /// Scenes whose generation failed
    #[serde(rename = "failedScenes")]
    pub failed_scenes: Vec<FailedScene>,

    /// When the run started
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
}

impl GenerationRun {
    /// Create an empty run for the given scene plan.
    pub fn new(project_id: impl Into<String>, scenes: Vec<SceneSpec>) -> Self {
        Self {
            project_id: project_id.into(),
            scenes,
            images: Vec::new(),
            failed_scenes: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Total encoded payload size across all images.
    pub fn total_payload_bytes(&self) -> u64 {
        self.images.iter().map(|i| i.size_bytes).sum()
    }

    /// Whether every planned scene failed.
    pub fn all_failed(&self) -> bool {
        !self.scenes.is_empty() && self.images.is_empty()
    }

    /// Condensed summary for the completion event.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            project_id: self.project_id.clone(),
            total_scenes: self.scenes.len() as u32,
            total_images: self.images.len() as u32,
            failed_count: self.failed_scenes.len() as u32,
            total_payload_bytes: self.total_payload_bytes(),
        }
    }
}

/// Aggregate counts for a completed run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunSummary {
    #[serde(rename = "projectId")]
    pub project_id: String,

    #[serde(rename = "totalScenes")]
    pub total_scenes: u32,

    #[serde(rename = "totalImages")]
    pub total_images: u32,

    #[serde(rename = "failedCount")]
    pub failed_count: u32,

    #[serde(rename = "totalPayloadBytes")]
    pub total_payload_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(scene_index: u32, size_bytes: u64) -> GeneratedImage {
        GeneratedImage {
            scene_index,
            timestamp: 0.0,
            filename: format!("scene_{}.png", scene_index),
            data: String::new(),
            size_bytes,
            mime_type: "image/png".to_string(),
            prompt: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn test_total_payload_bytes() {
        let mut run = GenerationRun::new("proj-1", Vec::new());
        run.images.push(image(1, 1000));
        run.images.push(image(2, 2500));
        assert_eq!(run.total_payload_bytes(), 3500);
    }

    #[test]
    fn test_summary_counts_failures() {
        let scenes = vec![
            crate::SceneSpec {
                index: 1,
                start_time: 0.0,
                end_time: 10.0,
                duration: 10.0,
                source_text: String::new(),
                prompt: String::new(),
            },
            crate::SceneSpec {
                index: 2,
                start_time: 10.0,
                end_time: 20.0,
                duration: 10.0,
                source_text: String::new(),
                prompt: String::new(),
            },
        ];
        let mut run = GenerationRun::new("proj-1", scenes);
        run.images.push(image(1, 100));
        run.failed_scenes.push(FailedScene {
            scene_index: 2,
            timestamp: 10.0,
            prompt: String::new(),
            error: "rate limited".to_string(),
        });

        let summary = run.summary();
        assert_eq!(summary.total_scenes, 2);
        assert_eq!(summary.total_images, 1);
        assert_eq!(summary.failed_count, 1);
        assert!(!run.all_failed());
    }
}
