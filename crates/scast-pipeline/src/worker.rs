//! Sequential image generation worker.
//!
//! Scenes are processed strictly in index order with a fixed delay between
//! provider calls. A failure for one scene is recorded and does not stop
//! the rest; partial success is the expected shape of a run.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use scast_ai::ImageGenerator;
use scast_models::{FailedScene, GeneratedImage, GenerationRun, SceneSpec};

/// Delay between successive generation calls (provider rate limits).
const INTER_REQUEST_DELAY: Duration = Duration::from_millis(800);

/// Receives worker notifications as the run progresses.
///
/// This is the delivery channel's streaming hook: `on_image` fires the
/// moment an image is ready, before the next scene is attempted. Returning
/// `false` from `on_progress` or `on_image` tells the worker the consumer
/// is gone and further scene processing should stop.
#[async_trait]
pub trait RunObserver: Send + Sync {
    /// Called before each scene attempt.
    async fn on_progress(&self, current: u32, total: u32, stage: &str, scene_timestamp: f64)
        -> bool;

    /// Called immediately after each successful generation.
    async fn on_image(&self, image: &GeneratedImage) -> bool;

    /// Called after a per-scene failure. Informational only.
    async fn on_scene_error(&self, scene_index: u32, error: &str);
}

/// Observer that discards all notifications (legacy non-streaming path).
pub struct NullObserver;

#[async_trait]
impl RunObserver for NullObserver {
    async fn on_progress(&self, _: u32, _: u32, _: &str, _: f64) -> bool {
        true
    }

    async fn on_image(&self, _: &GeneratedImage) -> bool {
        true
    }

    async fn on_scene_error(&self, _: u32, _: &str) {}
}

/// Runs a scene plan against an image generation capability.
pub struct GenerationWorker {
    generator: Arc<dyn ImageGenerator>,
    delay: Duration,
}

impl GenerationWorker {
    /// Create a worker with the standard inter-request delay.
    pub fn new(generator: Arc<dyn ImageGenerator>) -> Self {
        Self {
            generator,
            delay: INTER_REQUEST_DELAY,
        }
    }

    /// Override the inter-request delay (tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Execute the run, one scene at a time.
    pub async fn run(
        &self,
        project_id: &str,
        scenes: Vec<SceneSpec>,
        observer: &dyn RunObserver,
    ) -> GenerationRun {
        let total = scenes.len() as u32;
        let mut run = GenerationRun::new(project_id, scenes);

        info!(project_id, scenes = total, "Starting generation run");

        for i in 0..run.scenes.len() {
            let scene = run.scenes[i].clone();
            let stage = format!("Generating image {} of {}", scene.index, total);

            if !observer
                .on_progress(scene.index, total, &stage, scene.start_time)
                .await
            {
                info!(project_id, scene = scene.index, "Consumer gone, stopping run");
                break;
            }

            match self.generator.generate_image(&scene.prompt).await {
                Ok(encoded) => {
                    let image = GeneratedImage {
                        scene_index: scene.index,
                        timestamp: scene.start_time,
                        filename: format!("scene_{:02}.png", scene.index),
                        size_bytes: encoded.approx_size_bytes(),
                        data: encoded.data,
                        mime_type: encoded.mime_type,
                        prompt: scene.prompt.clone(),
                        description: scene.source_text.clone(),
                    };

                    let keep_going = observer.on_image(&image).await;
                    run.images.push(image);
                    if !keep_going {
                        info!(project_id, scene = scene.index, "Consumer gone, stopping run");
                        break;
                    }
                }
                Err(e) => {
                    warn!(
                        project_id,
                        scene = scene.index,
                        "Image generation failed: {}",
                        e
                    );
                    let message = e.to_string();
                    run.failed_scenes.push(FailedScene {
                        scene_index: scene.index,
                        timestamp: scene.start_time,
                        prompt: scene.prompt.clone(),
                        error: message.clone(),
                    });
                    observer.on_scene_error(scene.index, &message).await;
                }
            }

            // No delay after the final scene
            if i + 1 < run.scenes.len() {
                tokio::time::sleep(self.delay).await;
            }
        }

        info!(
            project_id,
            images = run.images.len(),
            failed = run.failed_scenes.len(),
            "Generation run finished"
        );

        run
    }
}
