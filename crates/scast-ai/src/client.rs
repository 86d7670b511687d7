//! OpenAI HTTP client implementing both AI capabilities.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use scast_models::ProposedScene;

use crate::error::{AiError, AiResult};
use crate::traits::{EncodedImage, ImageGenerator, ScenePlannerModel};

/// Configuration for the OpenAI client.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key
    pub api_key: String,
    /// Base URL (overridable for tests)
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries for retryable failures
    pub max_retries: u32,
    /// Text models to try in order for scene breakdown
    pub text_models: Vec<String>,
    /// Image model
    pub image_model: String,
    /// Image output size (vertical 9:16)
    pub image_size: String,
    /// Image quality tier
    pub image_quality: String,
}

impl OpenAiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> AiResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AiError::MissingApiKey("OPENAI_API_KEY".to_string()))?;

        Ok(Self {
            api_key,
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            timeout: Duration::from_secs(
                std::env::var("OPENAI_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            max_retries: std::env::var("OPENAI_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            text_models: vec!["gpt-4o-mini".to_string(), "gpt-4o".to_string()],
            image_model: "dall-e-3".to_string(),
            image_size: "1024x1792".to_string(),
            image_quality: "standard".to_string(),
        })
    }
}

/// OpenAI API client.
pub struct OpenAiClient {
    http: Client,
    config: OpenAiConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    quality: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: String,
}

/// Envelope the scene-breakdown prompt asks the model to return.
#[derive(Debug, Deserialize)]
struct PlanEnvelope {
    scenes: Vec<ProposedScene>,
}

impl OpenAiClient {
    /// Create a new client.
    pub fn new(config: OpenAiConfig) -> AiResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AiError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> AiResult<Self> {
        Self::new(OpenAiConfig::from_env()?)
    }

    /// Call the chat completions endpoint with one model.
    async fn call_chat(&self, model: &str, prompt: String) -> AiResult<String> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let response = self
            .with_retry(|| async {
                self.http
                    .post(&url)
                    .bearer_auth(&self.config.api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(AiError::Network)
            })
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::RequestFailed(format!(
                "chat completions returned {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response.json().await?;
        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(AiError::EmptyResponse)
    }

    /// Execute with retry and exponential backoff.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> AiResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = AiResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "AI request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(AiError::RequestFailed("Unknown error".to_string())))
    }
}

/// Strip markdown code fences some models wrap JSON output in.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

/// Build the scene-breakdown prompt.
fn build_breakdown_prompt(script: &str, scene_count: u32, total_duration_secs: f64) -> String {
    format!(
        r#"Break the following narration script into exactly {count} visual scenes for a {duration:.0}-second vertical video.

SCRIPT:
{script}

IMPORTANT: You must strictly follow this output format.
Return ONLY a single JSON object with this schema:
{{
  "scenes": [
    {{
      "title": "Short scene title",
      "description": "What the viewer sees",
      "imagePrompt": "Detailed image generation prompt for this scene",
      "duration": 0,
      "startTime": 0
    }}
  ]
}}

Each scene must cover a contiguous part of the script, in order."#,
        count = scene_count,
        duration = total_duration_secs,
        script = script
    )
}

#[async_trait]
impl ScenePlannerModel for OpenAiClient {
    async fn propose_scenes(
        &self,
        script: &str,
        scene_count: u32,
        total_duration_secs: f64,
    ) -> AiResult<Vec<ProposedScene>> {
        let prompt = build_breakdown_prompt(script, scene_count, total_duration_secs);

        let mut last_error = None;
        for model in &self.config.text_models {
            info!("Requesting scene breakdown from {}", model);
            match self.call_chat(model, prompt.clone()).await {
                Ok(content) => {
                    let json = strip_code_fences(&content);
                    let envelope: PlanEnvelope = serde_json::from_str(json)
                        .map_err(|e| AiError::MalformedPlan(e.to_string()))?;
                    debug!(
                        "Model {} proposed {} scenes",
                        model,
                        envelope.scenes.len()
                    );
                    return Ok(envelope.scenes);
                }
                Err(e @ AiError::MalformedPlan(_)) => {
                    // A model that answers with unparsable JSON will keep
                    // doing so; fail the generative path instead of burning
                    // tokens on fallbacks.
                    return Err(e);
                }
                Err(e) => {
                    warn!("Scene breakdown failed with {}: {}", model, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AiError::RequestFailed("All text models failed".to_string())))
    }
}

#[async_trait]
impl ImageGenerator for OpenAiClient {
    async fn generate_image(&self, prompt: &str) -> AiResult<EncodedImage> {
        let url = format!("{}/images/generations", self.config.base_url);

        let request = ImageRequest {
            model: &self.config.image_model,
            prompt,
            n: 1,
            size: &self.config.image_size,
            quality: &self.config.image_quality,
            response_format: "b64_json",
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(AiError::Network)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::RequestFailed(format!(
                "image generation returned {}: {}",
                status, body
            )));
        }

        let image: ImageResponse = response.json().await?;
        let datum = image.data.into_iter().next().ok_or(AiError::EmptyResponse)?;

        Ok(EncodedImage {
            data: datum.b64_json,
            mime_type: "image/png".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> OpenAiConfig {
        OpenAiConfig {
            api_key: "test-key".to_string(),
            base_url,
            timeout: Duration::from_secs(5),
            max_retries: 0,
            text_models: vec!["gpt-4o-mini".to_string()],
            image_model: "dall-e-3".to_string(),
            image_size: "1024x1792".to_string(),
            image_quality: "standard".to_string(),
        }
    }

    fn chat_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_propose_scenes_parses_fenced_json() {
        let server = MockServer::start().await;
        let content = "```json\n{\"scenes\":[{\"title\":\"T\",\"description\":\"D\",\"imagePrompt\":\"P\",\"duration\":11.25,\"startTime\":0}]}\n```";
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(content)))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(test_config(server.uri())).unwrap();
        let scenes = client.propose_scenes("a script", 1, 90.0).await.unwrap();
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].title, "T");
        assert_eq!(scenes[0].duration, 11.25);
    }

    #[tokio::test]
    async fn test_propose_scenes_malformed_json_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("not json at all")))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(test_config(server.uri())).unwrap();
        let err = client.propose_scenes("a script", 4, 60.0).await.unwrap_err();
        assert!(matches!(err, AiError::MalformedPlan(_)));
    }

    #[tokio::test]
    async fn test_propose_scenes_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(test_config(server.uri())).unwrap();
        let err = client.propose_scenes("a script", 4, 60.0).await.unwrap_err();
        assert!(matches!(err, AiError::RequestFailed(_)));
    }

    #[tokio::test]
    async fn test_generate_image_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"b64_json": "aGVsbG8="}]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(test_config(server.uri())).unwrap();
        let image = client.generate_image("a quiet street at dawn").await.unwrap();
        assert_eq!(image.data, "aGVsbG8=");
        assert_eq!(image.mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_generate_image_empty_data_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})),
            )
            .mount(&server)
            .await;

        let client = OpenAiClient::new(test_config(server.uri())).unwrap();
        let err = client.generate_image("prompt").await.unwrap_err();
        assert!(matches!(err, AiError::EmptyResponse));
    }
}
