//! The SceneCast generation pipeline.
//!
//! Turns a narration script plus a target duration into timed,
//! AI-generated scene images:
//!
//! 1. [`planner`] computes scene windows (heuristic word chunking, or
//!    re-normalization of a generative model's proposed breakdown).
//! 2. [`prompt`] synthesizes an image prompt per scene.
//! 3. [`worker`] generates one image per scene sequentially, reporting
//!    progress through an observer.
//! 4. [`filter`] drops images that would play past the real audio end.
//! 5. [`estimate`] computes payload/download aggregates for reporting.

pub mod error;
pub mod estimate;
pub mod filter;
pub mod planner;
pub mod prompt;
pub mod worker;

pub use error::{PipelineError, PipelineResult};
pub use estimate::{completion_meta, download_tiers, pre_run_estimate_secs};
pub use filter::{filter_by_audio_duration, FilterReport};
pub use planner::{plan_scenes, target_scene_count, validate_model_plan, MAX_SCENES_PER_RUN};
pub use worker::{GenerationWorker, NullObserver, RunObserver};
