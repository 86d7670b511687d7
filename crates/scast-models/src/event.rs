//! SSE stream event types.
//!
//! Every event crosses the wire as one `data: <JSON>\n\n` record. The
//! vocabulary matches the original streaming API so existing clients keep
//! working.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::image::{GeneratedImage, RunSummary};

/// Stream event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventType {
    /// Stream opened, run accepted
    Init,
    /// Pre-run expectations
    Estimates,
    /// Per-scene progress update
    Progress,
    /// One generated image, delivered as soon as it is ready
    Image,
    /// Per-scene or fatal error
    Error,
    /// Final summary
    Complete,
    /// Keep-alive with liveness metadata
    Heartbeat,
}

impl StreamEventType {
    /// Wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamEventType::Init => "init",
            StreamEventType::Estimates => "estimates",
            StreamEventType::Progress => "progress",
            StreamEventType::Image => "image",
            StreamEventType::Error => "error",
            StreamEventType::Complete => "complete",
            StreamEventType::Heartbeat => "heartbeat",
        }
    }
}

/// Estimated download time at three bandwidth tiers, in seconds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema)]
pub struct DownloadTiers {
    /// ~50 Mbps
    pub fast: f64,
    /// ~10 Mbps
    pub medium: f64,
    /// ~2 Mbps
    pub slow: f64,
}

/// Aggregate metadata attached to the completion event and the legacy
/// non-streaming response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CompletionMeta {
    /// Words in the input script
    #[serde(rename = "wordCount")]
    pub word_count: u32,

    /// Seconds of narration each scene covers
    #[serde(rename = "chunkDuration")]
    pub chunk_duration: f64,

    /// Average encoded image size in bytes
    #[serde(rename = "averageImageBytes")]
    pub average_image_bytes: u64,

    /// Estimated client download time for the full payload
    #[serde(rename = "estimatedDownloadSecs")]
    pub estimated_download_secs: DownloadTiers,

    /// Image count before the audio-duration filter
    #[serde(rename = "imagesBeforeFilter")]
    pub images_before_filter: u32,

    /// Image count after the audio-duration filter
    #[serde(rename = "imagesAfterFilter")]
    pub images_after_filter: u32,

    /// Images dropped because they started past the audio end
    #[serde(rename = "droppedByFilter")]
    pub dropped_by_filter: u32,
}

/// Stream event envelope.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Stream opened for a session
    Init {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "projectId")]
        project_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Pre-run expectations, sent before the first generation call
    Estimates {
        #[serde(rename = "expectedImages")]
        expected_images: u32,
        #[serde(rename = "estimatedSeconds")]
        estimated_seconds: f64,
    },

    /// Progress before each scene attempt
    Progress {
        /// 1-based scene index being attempted
        current: u32,
        /// Total planned scenes
        total: u32,
        /// Human-readable stage message
        stage: String,
        /// Scene playback timestamp in seconds
        #[serde(rename = "sceneTimestamp")]
        scene_timestamp: f64,
    },

    /// One completed image
    Image { image: GeneratedImage },

    /// Per-scene or fatal error
    Error {
        message: String,
        #[serde(rename = "sceneIndex", skip_serializing_if = "Option::is_none")]
        scene_index: Option<u32>,
        /// Fatal errors end the stream; per-scene errors do not
        fatal: bool,
        timestamp: DateTime<Utc>,
    },

    /// Final summary; the stream closes after this
    Complete {
        summary: RunSummary,
        metadata: CompletionMeta,
    },

    /// Keep-alive with liveness metadata
    Heartbeat {
        #[serde(rename = "activeSessions")]
        active_sessions: u32,
        #[serde(rename = "rssBytes", skip_serializing_if = "Option::is_none")]
        rss_bytes: Option<u64>,
        timestamp: DateTime<Utc>,
    },
}

impl StreamEvent {
    /// Create an init event.
    pub fn init(session_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        StreamEvent::Init {
            session_id: session_id.into(),
            project_id: project_id.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an estimates event.
    pub fn estimates(expected_images: u32, estimated_seconds: f64) -> Self {
        StreamEvent::Estimates {
            expected_images,
            estimated_seconds,
        }
    }

    /// Create a progress event.
    pub fn progress(current: u32, total: u32, stage: impl Into<String>, scene_timestamp: f64) -> Self {
        StreamEvent::Progress {
            current,
            total,
            stage: stage.into(),
            scene_timestamp,
        }
    }

    /// Create an image event.
    pub fn image(image: GeneratedImage) -> Self {
        StreamEvent::Image { image }
    }

    /// Create a non-fatal per-scene error event.
    pub fn scene_error(scene_index: u32, message: impl Into<String>) -> Self {
        StreamEvent::Error {
            message: message.into(),
            scene_index: Some(scene_index),
            fatal: false,
            timestamp: Utc::now(),
        }
    }

    /// Create a fatal error event.
    pub fn fatal_error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            message: message.into(),
            scene_index: None,
            fatal: true,
            timestamp: Utc::now(),
        }
    }

    /// Create a completion event.
    pub fn complete(summary: RunSummary, metadata: CompletionMeta) -> Self {
        StreamEvent::Complete { summary, metadata }
    }

    /// Create a heartbeat event.
    pub fn heartbeat(active_sessions: u32, rss_bytes: Option<u64>) -> Self {
        StreamEvent::Heartbeat {
            active_sessions,
            rss_bytes,
            timestamp: Utc::now(),
        }
    }

    /// Get the event type.
    pub fn event_type(&self) -> StreamEventType {
        match self {
            StreamEvent::Init { .. } => StreamEventType::Init,
            StreamEvent::Estimates { .. } => StreamEventType::Estimates,
            StreamEvent::Progress { .. } => StreamEventType::Progress,
            StreamEvent::Image { .. } => StreamEventType::Image,
            StreamEvent::Error { .. } => StreamEventType::Error,
            StreamEvent::Complete { .. } => StreamEventType::Complete,
            StreamEvent::Heartbeat { .. } => StreamEventType::Heartbeat,
        }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamEvent::Complete { .. } | StreamEvent::Error { fatal: true, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = StreamEvent::progress(3, 10, "Generating image 3 of 10", 25.0);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"progress\""));
        assert!(json.contains("\"current\":3"));
        assert!(json.contains("\"sceneTimestamp\":25.0"));
    }

    #[test]
    fn test_scene_error_is_not_terminal() {
        let event = StreamEvent::scene_error(2, "provider timeout");
        assert!(!event.is_terminal());
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"fatal\":false"));
        assert!(json.contains("\"sceneIndex\":2"));
    }

    #[test]
    fn test_fatal_error_is_terminal() {
        let event = StreamEvent::fatal_error("scene breakdown unparsable");
        assert!(event.is_terminal());
        // No scene index on fatal errors
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("sceneIndex"));
    }

    #[test]
    fn test_complete_is_terminal() {
        let summary = RunSummary {
            project_id: "p1".to_string(),
            total_scenes: 4,
            total_images: 4,
            failed_count: 0,
            total_payload_bytes: 4096,
        };
        let event = StreamEvent::complete(summary, CompletionMeta::default());
        assert!(event.is_terminal());
        assert_eq!(event.event_type(), StreamEventType::Complete);
    }

    #[test]
    fn test_heartbeat_omits_missing_rss() {
        let json = serde_json::to_string(&StreamEvent::heartbeat(2, None)).unwrap();
        assert!(json.contains("\"activeSessions\":2"));
        assert!(!json.contains("rssBytes"));
    }
}
