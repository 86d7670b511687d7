//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The generative planner returned no scenes that survive timing
    /// validation. Fatal to the generative path.
    #[error("No valid scenes after timing validation")]
    NoValidScenes,

    /// Upstream AI failure.
    #[error("AI provider error: {0}")]
    Ai(#[from] scast_ai::AiError),
}
