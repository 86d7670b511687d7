//! Clients for the external AI capabilities SceneCast depends on.
//!
//! Two capabilities are modeled as injectable traits so the pipeline never
//! touches a concrete provider:
//! - [`ScenePlannerModel`]: script -> structured scene breakdown
//! - [`ImageGenerator`]: prompt -> encoded image
//!
//! [`OpenAiClient`] implements both against the OpenAI API.

pub mod client;
pub mod error;
pub mod traits;

pub use client::{OpenAiClient, OpenAiConfig};
pub use error::{AiError, AiResult};
pub use traits::{EncodedImage, ImageGenerator, ScenePlannerModel};
