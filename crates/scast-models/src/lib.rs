//! Shared data models for the SceneCast backend.
//!
//! This crate provides Serde-serializable types for:
//! - Scene plans and timing windows
//! - Generated images and per-scene failures
//! - Generation run summaries
//! - SSE stream event schemas
//! - Request validation at the API boundary

pub mod event;
pub mod image;
pub mod request;
pub mod scene;

// Re-export common types
pub use event::{CompletionMeta, DownloadTiers, StreamEvent, StreamEventType};
pub use image::{FailedScene, GeneratedImage, GenerationRun, RunSummary};
pub use request::{effective_duration, GenerateRequest, ValidationIssue, ValidationReport};
pub use scene::{PlanDiagnostics, ProposedScene, SceneSpec, MIN_SCENE_DURATION_SECS};
