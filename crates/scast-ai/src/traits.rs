//! Capability traits the pipeline is written against.

use async_trait::async_trait;

use scast_models::ProposedScene;

use crate::error::AiResult;

/// An encoded image payload as returned by a provider.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Base64-encoded image data
    pub data: String,
    /// MIME type of the decoded payload
    pub mime_type: String,
}

impl EncodedImage {
    /// Approximate decoded size from the base64 payload length.
    pub fn approx_size_bytes(&self) -> u64 {
        // 4 base64 chars encode 3 bytes
        (self.data.len() as u64 / 4) * 3
    }
}

/// Generates one image per prompt with fixed output parameters
/// (vertical aspect, standard quality).
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> AiResult<EncodedImage>;
}

/// Breaks a script into described scenes via a generative text model.
#[async_trait]
pub trait ScenePlannerModel: Send + Sync {
    async fn propose_scenes(
        &self,
        script: &str,
        scene_count: u32,
        total_duration_secs: f64,
    ) -> AiResult<Vec<ProposedScene>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approx_size_from_base64_length() {
        let image = EncodedImage {
            data: "A".repeat(4000),
            mime_type: "image/png".to_string(),
        };
        assert_eq!(image.approx_size_bytes(), 3000);
    }
}
