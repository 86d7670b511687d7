//! Generation request shape and boundary validation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Minimum words a script must contain.
pub const MIN_SCRIPT_WORDS: usize = 10;

/// Allowed duration range in seconds.
pub const MIN_DURATION_SECS: f64 = 10.0;
pub const MAX_DURATION_SECS: f64 = 3600.0;

/// Allowed images-per-minute range.
pub const MIN_IMAGES_PER_MIN: u32 = 1;
pub const MAX_IMAGES_PER_MIN: u32 = 10;

/// Duration above which a high image rate draws a performance warning.
const LONG_RUN_WARNING_SECS: f64 = 600.0;
const LONG_RUN_WARNING_RATE: u32 = 4;

/// Request to generate timed images for a narration script.
///
/// Used for both the session bootstrap POST and (field-for-field, as query
/// parameters) the streaming GET leg.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerateRequest {
    /// Narration script
    pub script: String,

    /// Nominal narration duration in seconds
    pub duration: f64,

    /// Target images per minute of narration
    #[serde(rename = "maxImagesPerMin", default = "default_images_per_min")]
    pub max_images_per_min: u32,

    /// Project this run belongs to
    #[serde(rename = "projectId")]
    pub project_id: String,

    /// Authoritative audio duration in seconds, when known.
    /// May disagree with `duration`; the audio wins.
    #[serde(rename = "audioDuration", default)]
    pub audio_duration: Option<f64>,
}

fn default_images_per_min() -> u32 {
    4
}

/// A single validation failure.
///
/// Serialize-only: reports flow outward in responses and are never read
/// back, and the static field names cannot borrow from a deserializer.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ValidationIssue {
    /// Field the issue applies to
    pub field: &'static str,
    /// Human-readable message
    pub message: String,
}

/// Outcome of boundary validation: hard errors plus soft warnings.
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl GenerateRequest {
    /// Validate the request at the API boundary.
    ///
    /// Errors are fatal and reported before any generation work starts.
    /// Warnings are advisory only.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        let word_count = self.script.split_whitespace().count();
        if self.script.trim().is_empty() {
            report.errors.push(ValidationIssue {
                field: "script",
                message: "Script must not be empty".to_string(),
            });
        } else if word_count < MIN_SCRIPT_WORDS {
            report.errors.push(ValidationIssue {
                field: "script",
                message: format!(
                    "Script must contain at least {} words (got {})",
                    MIN_SCRIPT_WORDS, word_count
                ),
            });
        }

        if !self.duration.is_finite()
            || self.duration < MIN_DURATION_SECS
            || self.duration > MAX_DURATION_SECS
        {
            report.errors.push(ValidationIssue {
                field: "duration",
                message: format!(
                    "Duration must be between {} and {} seconds",
                    MIN_DURATION_SECS, MAX_DURATION_SECS
                ),
            });
        }

        if self.max_images_per_min < MIN_IMAGES_PER_MIN
            || self.max_images_per_min > MAX_IMAGES_PER_MIN
        {
            report.errors.push(ValidationIssue {
                field: "maxImagesPerMin",
                message: format!(
                    "maxImagesPerMin must be between {} and {}",
                    MIN_IMAGES_PER_MIN, MAX_IMAGES_PER_MIN
                ),
            });
        }

        if self.project_id.trim().is_empty() {
            report.errors.push(ValidationIssue {
                field: "projectId",
                message: "projectId must not be empty".to_string(),
            });
        }

        if self.duration > LONG_RUN_WARNING_SECS && self.max_images_per_min > LONG_RUN_WARNING_RATE
        {
            report.warnings.push(ValidationIssue {
                field: "maxImagesPerMin",
                message: format!(
                    "Durations over {}s with more than {} images per minute generate slowly; consider a lower rate",
                    LONG_RUN_WARNING_SECS as u32, LONG_RUN_WARNING_RATE
                ),
            });
        }

        report
    }

    /// Word count of the script.
    pub fn word_count(&self) -> u32 {
        self.script.split_whitespace().count() as u32
    }

    /// The duration generation should plan against.
    pub fn effective_duration(&self) -> f64 {
        effective_duration(self.duration, self.audio_duration)
    }
}

/// Resolve the authoritative duration for a run.
///
/// The nominal duration is what the caller asked for; the audio duration is
/// what the narration actually measures. When both are present the shorter
/// of the two wins, so images are never planned past the real audio end.
pub fn effective_duration(nominal: f64, audio: Option<f64>) -> f64 {
    match audio {
        Some(a) if a.is_finite() && a > 0.0 => a.min(nominal),
        _ => nominal,
    }
}
