//! Image generation endpoints: session bootstrap, SSE streaming delivery,
//! and the legacy non-streaming variant.
//!
//! The streaming flow is two-legged because EventSource cannot set request
//! headers: the client first POSTs the generation request with a bearer
//! token and receives a session id, then opens the SSE leg with the token
//! in the query string. Everything after the SSE response headers are
//! committed is reported as `error` events, not HTTP statuses.

use std::convert::Infallible;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, Sse};
use axum::Json;
use futures_util::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{info, warn};
use uuid::Uuid;

use scast_ai::ScenePlannerModel;
use scast_models::{
    CompletionMeta, GenerateRequest, RunSummary, SceneSpec, StreamEvent, ValidationIssue,
};
use scast_pipeline::{
    completion_meta, filter_by_audio_duration, plan_scenes, pre_run_estimate_secs,
    target_scene_count, validate_model_plan, GenerationWorker, NullObserver, RunObserver,
};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::session::SessionRecord;
use crate::state::AppState;

/// Buffered events before the worker blocks on a slow consumer.
const STREAM_BUFFER_SIZE: usize = 32;

/// Global counter for active SSE streams.
static ACTIVE_STREAMS: AtomicI64 = AtomicI64::new(0);

// ---------------------------------------------------------------------------
// Session bootstrap
// ---------------------------------------------------------------------------

/// Response to the session bootstrap POST.
#[derive(Debug, Serialize)]
pub struct InitStreamResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ValidationIssue>,
}

/// `POST /api/images/stream/init` — validate the request and store a
/// session for the SSE leg to pick up.
pub async fn init_stream(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<Json<InitStreamResponse>> {
    let report = request.validate();
    if !report.is_valid() {
        return Err(ApiError::Validation(report.errors));
    }

    let session_id = Uuid::new_v4().to_string();
    info!(
        session_id,
        project_id = %request.project_id,
        user = %user.uid,
        "Generation session created"
    );

    state
        .sessions
        .put(SessionRecord::new(&session_id, &user.uid, request))
        .await;

    Ok(Json(InitStreamResponse {
        session_id,
        warnings: report.warnings,
    }))
}

// ---------------------------------------------------------------------------
// SSE streaming leg
// ---------------------------------------------------------------------------

/// Query parameters for the SSE leg.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Bearer token, passed in the query because EventSource cannot set
    /// headers.
    pub token: Option<String>,
}

/// `GET /api/images/stream/:session_id` — stream generation events.
pub async fn stream_images(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<StreamQuery>,
    headers: axum::http::HeaderMap,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Query token first (the EventSource path), bearer header as fallback
    let token = query.token.or_else(|| {
        headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.to_string())
    });

    let (tx, rx) = mpsc::channel::<StreamEvent>(STREAM_BUFFER_SIZE);

    tokio::spawn(drive_stream(state, session_id, token, tx));

    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (event, rx))
    })
    .map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().data(data))
    });

    Sse::new(stream)
}

/// Send one event, recording it. Returns false when the client is gone.
async fn send_event(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> bool {
    metrics::record_stream_event(event.event_type().as_str());
    tx.send(event).await.is_ok()
}

/// Current process RSS in bytes, when the platform exposes it.
fn read_rss_bytes() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(resident_pages * 4096)
}

/// Drive one SSE stream end to end: auth, session pickup, project lock,
/// generation, completion. All failures after this point are events.
async fn drive_stream(
    state: AppState,
    session_id: String,
    token: Option<String>,
    tx: mpsc::Sender<StreamEvent>,
) {
    let count = ACTIVE_STREAMS.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_active_streams(count);
    metrics::record_stream_opened();

    let _stream_guard = scopeguard::guard((), |_| {
        let count = ACTIVE_STREAMS.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_active_streams(count);
    });

    // Auth happens after headers are committed; failures become events
    let user = match token.as_deref().map(|t| state.jwt.verify(t)) {
        Some(Ok(claims)) => AuthUser::from(claims),
        Some(Err(e)) => {
            warn!(session_id, "SSE auth failed: {}", e);
            send_event(&tx, StreamEvent::fatal_error("Authentication failed")).await;
            return;
        }
        None => {
            send_event(&tx, StreamEvent::fatal_error("Missing token")).await;
            return;
        }
    };

    let Some(session) = state.sessions.get(&session_id).await else {
        send_event(&tx, StreamEvent::fatal_error("Unknown or expired session")).await;
        return;
    };

    if session.user_id != user.uid {
        warn!(session_id, user = %user.uid, "Session owner mismatch");
        send_event(&tx, StreamEvent::fatal_error("Session does not belong to this user")).await;
        return;
    }

    let request = session.request;
    let project_id = request.project_id.clone();

    if let Err(msg) = state.locks.try_acquire(&project_id).await {
        info!(project_id, "Rejected concurrent generation run");
        send_event(&tx, StreamEvent::fatal_error(msg)).await;
        return;
    }

    // Cleanup is idempotent and covers completion, disconnect, and error
    let cleanup_state = state.clone();
    let cleanup_project = project_id.clone();
    let cleanup_session = session_id.clone();
    let _cleanup = scopeguard::guard((), move |_| {
        tokio::spawn(async move {
            cleanup_state.locks.release(&cleanup_project).await;
            cleanup_state.sessions.remove(&cleanup_session).await;
        });
    });

    if !send_event(&tx, StreamEvent::init(&session_id, &project_id)).await {
        return;
    }

    let heartbeat_interval = state.config.heartbeat_interval;
    let heartbeat_tx = tx.clone();
    let heartbeat = tokio::spawn(async move {
        let mut ticker = interval(heartbeat_interval);
        // First tick fires immediately; the init event already went out
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let active = ACTIVE_STREAMS.load(Ordering::SeqCst).max(0) as u32;
            let event = StreamEvent::heartbeat(active, read_rss_bytes());
            if !send_event(&heartbeat_tx, event).await {
                break;
            }
        }
    });

    // A disconnected client surfaces as failed sends inside the run: the
    // worker finishes its in-flight image call, then stops. Only the hard
    // duration cap cancels the run outright.
    let run = run_generation(&state, &request, &tx);
    if tokio::time::timeout(state.config.stream_max_duration, run)
        .await
        .is_err()
    {
        warn!(project_id, "Stream exceeded the maximum duration, closing");
        send_event(
            &tx,
            StreamEvent::fatal_error("Stream exceeded the maximum duration"),
        )
        .await;
    }

    heartbeat.abort();
}

/// Observer that forwards worker notifications onto the SSE channel.
struct StreamObserver {
    tx: mpsc::Sender<StreamEvent>,
}

#[async_trait::async_trait]
impl RunObserver for StreamObserver {
    async fn on_progress(&self, current: u32, total: u32, stage: &str, scene_timestamp: f64) -> bool {
        send_event(
            &self.tx,
            StreamEvent::progress(current, total, stage, scene_timestamp),
        )
        .await
    }

    async fn on_image(&self, image: &scast_models::GeneratedImage) -> bool {
        metrics::record_image_generated();
        send_event(&self.tx, StreamEvent::image(image.clone())).await
    }

    async fn on_scene_error(&self, scene_index: u32, error: &str) {
        metrics::record_image_failed();
        send_event(&self.tx, StreamEvent::scene_error(scene_index, error)).await;
    }
}

/// Plan scenes for a request: generative path first, heuristic fallback.
async fn plan_for_request(
    planner: &Arc<dyn ScenePlannerModel>,
    request: &GenerateRequest,
) -> Vec<SceneSpec> {
    let effective = request.effective_duration();
    let target = target_scene_count(effective, request.max_images_per_min);

    match planner
        .propose_scenes(&request.script, target as u32, effective)
        .await
    {
        Ok(proposed) => match validate_model_plan(&proposed, effective) {
            Ok((scenes, diagnostics)) => {
                info!(
                    scenes = diagnostics.total_scenes,
                    average = diagnostics.average_scene_duration,
                    "Using model scene plan"
                );
                scenes
            }
            Err(e) => {
                warn!("Model plan rejected ({}), using heuristic planner", e);
                plan_scenes(&request.script, effective, request.max_images_per_min)
            }
        },
        Err(e) => {
            warn!("Scene breakdown failed ({}), using heuristic planner", e);
            plan_scenes(&request.script, effective, request.max_images_per_min)
        }
    }
}

/// Run the generation pipeline, emitting events as it goes.
async fn run_generation(state: &AppState, request: &GenerateRequest, tx: &mpsc::Sender<StreamEvent>) {
    let started = Instant::now();
    let effective = request.effective_duration();

    let scenes = plan_for_request(&state.planner, request).await;
    if scenes.is_empty() {
        send_event(tx, StreamEvent::fatal_error("No scenes could be planned for this script")).await;
        metrics::record_run_completed("planning_failed", started.elapsed().as_secs_f64());
        return;
    }

    let chunk_duration = effective / scenes.len() as f64;
    let estimate = StreamEvent::estimates(
        scenes.len() as u32,
        pre_run_estimate_secs(scenes.len() as u32),
    );
    if !send_event(tx, estimate).await {
        return;
    }

    let observer = StreamObserver { tx: tx.clone() };
    let worker = GenerationWorker::new(state.generator.clone());
    let run = worker.run(&request.project_id, scenes, &observer).await;

    if run.all_failed() {
        send_event(tx, StreamEvent::fatal_error("Image generation failed for every scene")).await;
        metrics::record_run_completed("all_failed", started.elapsed().as_secs_f64());
        return;
    }

    let (images, filter) = filter_by_audio_duration(run.images, request.audio_duration);
    metrics::record_images_filtered(filter.dropped as u64);

    let summary = RunSummary {
        project_id: run.project_id.clone(),
        total_scenes: run.scenes.len() as u32,
        total_images: images.len() as u32,
        failed_count: run.failed_scenes.len() as u32,
        total_payload_bytes: images.iter().map(|i| i.size_bytes).sum(),
    };
    let metadata = completion_meta(request.word_count(), chunk_duration, &images, &filter);

    send_event(tx, StreamEvent::complete(summary, metadata)).await;
    metrics::record_run_completed("success", started.elapsed().as_secs_f64());
}

// ---------------------------------------------------------------------------
// Legacy non-streaming endpoint
// ---------------------------------------------------------------------------

/// Response body for the legacy non-streaming endpoint.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub images: Vec<scast_models::GeneratedImage>,
    #[serde(rename = "failedScenes")]
    pub failed_scenes: Vec<scast_models::FailedScene>,
    pub summary: RunSummary,
    pub metadata: CompletionMeta,
}

/// `POST /api/images/generate` — run the full pipeline and return one
/// JSON body. Same project lock as the streaming path.
pub async fn generate(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<Json<GenerateResponse>> {
    let report = request.validate();
    if !report.is_valid() {
        return Err(ApiError::Validation(report.errors));
    }

    let project_id = request.project_id.clone();
    state
        .locks
        .try_acquire(&project_id)
        .await
        .map_err(ApiError::conflict)?;

    let cleanup_state = state.clone();
    let cleanup_project = project_id.clone();
    let _cleanup = scopeguard::guard((), move |_| {
        tokio::spawn(async move {
            cleanup_state.locks.release(&cleanup_project).await;
        });
    });

    info!(project_id, user = %user.uid, "Starting non-streaming generation run");

    let started = Instant::now();
    let effective = request.effective_duration();

    let scenes = plan_for_request(&state.planner, &request).await;
    if scenes.is_empty() {
        metrics::record_run_completed("planning_failed", started.elapsed().as_secs_f64());
        return Err(ApiError::bad_request("No scenes could be planned for this script"));
    }

    let chunk_duration = effective / scenes.len() as f64;
    let worker = GenerationWorker::new(state.generator.clone());
    let run = worker.run(&project_id, scenes, &NullObserver).await;

    if run.all_failed() {
        metrics::record_run_completed("all_failed", started.elapsed().as_secs_f64());
        return Err(ApiError::internal("Image generation failed for every scene"));
    }

    let (images, filter) = filter_by_audio_duration(run.images, request.audio_duration);
    metrics::record_images_filtered(filter.dropped as u64);

    let summary = RunSummary {
        project_id: run.project_id.clone(),
        total_scenes: run.scenes.len() as u32,
        total_images: images.len() as u32,
        failed_count: run.failed_scenes.len() as u32,
        total_payload_bytes: images.iter().map(|i| i.size_bytes).sum(),
    };
    let metadata = completion_meta(request.word_count(), chunk_duration, &images, &filter);

    metrics::record_run_completed("success", started.elapsed().as_secs_f64());

    Ok(Json(GenerateResponse {
        images,
        failed_scenes: run.failed_scenes,
        summary,
        metadata,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    use async_trait::async_trait;
    use scast_ai::{AiError, AiResult, EncodedImage, ImageGenerator};
    use scast_models::ProposedScene;

    use crate::auth::JwtVerifier;
    use crate::config::ApiConfig;
    use crate::session::{InMemorySessionStore, ProjectLocks};

    struct FakePlanner {
        scenes: Vec<ProposedScene>,
    }

    #[async_trait]
    impl ScenePlannerModel for FakePlanner {
        async fn propose_scenes(&self, _: &str, _: u32, _: f64) -> AiResult<Vec<ProposedScene>> {
            if self.scenes.is_empty() {
                Err(AiError::RequestFailed("planner offline".to_string()))
            } else {
                Ok(self.scenes.clone())
            }
        }
    }

    struct FakeGenerator;

    #[async_trait]
    impl ImageGenerator for FakeGenerator {
        async fn generate_image(&self, _prompt: &str) -> AiResult<EncodedImage> {
            Ok(EncodedImage {
                data: "aGVsbG8=".to_string(),
                mime_type: "image/png".to_string(),
            })
        }
    }

    struct SlowCountingGenerator {
        completed: Arc<AtomicU32>,
        delay: Duration,
    }

    #[async_trait]
    impl ImageGenerator for SlowCountingGenerator {
        async fn generate_image(&self, _prompt: &str) -> AiResult<EncodedImage> {
            tokio::time::sleep(self.delay).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(EncodedImage {
                data: "aGVsbG8=".to_string(),
                mime_type: "image/png".to_string(),
            })
        }
    }

    fn test_state(planner_scenes: Vec<ProposedScene>) -> AppState {
        AppState::with_parts(
            ApiConfig {
                heartbeat_interval: Duration::from_secs(45),
                stream_max_duration: Duration::from_secs(900),
                ..ApiConfig::default()
            },
            Arc::new(InMemorySessionStore::new()),
            Arc::new(ProjectLocks::new()),
            Arc::new(JwtVerifier::new(b"test-secret")),
            Arc::new(FakePlanner { scenes: planner_scenes }),
            Arc::new(FakeGenerator),
        )
    }

    fn request() -> GenerateRequest {
        GenerateRequest {
            script: "word ".repeat(150).trim().to_string(),
            duration: 60.0,
            max_images_per_min: 4,
            project_id: "proj-1".to_string(),
            audio_duration: Some(50.0),
        }
    }

    #[tokio::test]
    async fn test_plan_falls_back_when_planner_fails() {
        let state = test_state(Vec::new());
        let scenes = plan_for_request(&state.planner, &request()).await;
        // Heuristic path: 50s effective audio -> 4 scenes
        assert_eq!(scenes.len(), 4);
        for scene in &scenes {
            assert!(scene.start_time < 50.0);
        }
    }

    #[tokio::test]
    async fn test_plan_uses_model_breakdown_when_valid() {
        let proposed: Vec<ProposedScene> = (0..4)
            .map(|i| ProposedScene {
                title: format!("Scene {}", i + 1),
                description: "desc".to_string(),
                image_prompt: "a calm scene".to_string(),
                duration: 1.0,
                start_time: 0.0,
            })
            .collect();
        let state = test_state(proposed);
        let scenes = plan_for_request(&state.planner, &request()).await;
        assert_eq!(scenes.len(), 4);
        // Timings rewritten to an even split of the 50s effective duration
        assert!((scenes[1].start_time - 12.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_stream_without_token_emits_fatal_error() {
        let state = test_state(Vec::new());
        let (tx, mut rx) = mpsc::channel(8);

        drive_stream(state, "missing".to_string(), None, tx).await;

        let event = rx.recv().await.unwrap();
        assert!(event.is_terminal());
        match event {
            StreamEvent::Error { message, fatal, .. } => {
                assert!(fatal);
                assert_eq!(message, "Missing token");
            }
            other => panic!("expected error event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_unknown_session_emits_fatal_error() {
        let state = test_state(Vec::new());
        let token = {
            use jsonwebtoken::{encode, EncodingKey, Header};
            let now = chrono::Utc::now().timestamp();
            let claims = crate::auth::Claims {
                sub: "u1".to_string(),
                email: None,
                iat: now,
                exp: now + 3600,
            };
            encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap()
        };
        let (tx, mut rx) = mpsc::channel(8);

        drive_stream(state, "missing".to_string(), Some(token), tx).await;

        let event = rx.recv().await.unwrap();
        match event {
            StreamEvent::Error { message, fatal, .. } => {
                assert!(fatal);
                assert_eq!(message, "Unknown or expired session");
            }
            other => panic!("expected error event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_happy_path_event_sequence() {
        let state = test_state(Vec::new());
        let token = {
            use jsonwebtoken::{encode, EncodingKey, Header};
            let now = chrono::Utc::now().timestamp();
            let claims = crate::auth::Claims {
                sub: "u1".to_string(),
                email: None,
                iat: now,
                exp: now + 3600,
            };
            encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap()
        };

        state
            .sessions
            .put(SessionRecord::new("s1", "u1", request()))
            .await;

        let (tx, mut rx) = mpsc::channel(64);
        drive_stream(state.clone(), "s1".to_string(), Some(token), tx).await;

        let mut types = Vec::new();
        while let Some(event) = rx.recv().await {
            types.push(event.event_type().as_str());
        }

        assert_eq!(types.first(), Some(&"init"));
        assert_eq!(types.get(1), Some(&"estimates"));
        assert_eq!(types.last(), Some(&"complete"));
        // 4 scenes: one progress + one image each
        assert_eq!(types.iter().filter(|t| **t == "progress").count(), 4);
        assert_eq!(types.iter().filter(|t| **t == "image").count(), 4);

        // Cleanup runs on a spawned task; give it a moment
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!state.locks.is_locked("proj-1").await);
        assert!(state.sessions.get("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_disconnect_lets_in_flight_generation_finish() {
        let completed = Arc::new(AtomicU32::new(0));
        let state = AppState::with_parts(
            ApiConfig {
                heartbeat_interval: Duration::from_millis(10),
                stream_max_duration: Duration::from_secs(900),
                ..ApiConfig::default()
            },
            Arc::new(InMemorySessionStore::new()),
            Arc::new(ProjectLocks::new()),
            Arc::new(JwtVerifier::new(b"test-secret")),
            Arc::new(FakePlanner { scenes: Vec::new() }),
            Arc::new(SlowCountingGenerator {
                completed: completed.clone(),
                delay: Duration::from_millis(200),
            }),
        );
        let token = {
            use jsonwebtoken::{encode, EncodingKey, Header};
            let now = chrono::Utc::now().timestamp();
            let claims = crate::auth::Claims {
                sub: "u1".to_string(),
                email: None,
                iat: now,
                exp: now + 3600,
            };
            encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap()
        };
        state
            .sessions
            .put(SessionRecord::new("s3", "u1", request()))
            .await;

        let (tx, mut rx) = mpsc::channel(8);
        let driver = tokio::spawn(drive_stream(state, "s3".to_string(), Some(token), tx));

        // Wait until the first scene is being generated, then go away
        loop {
            let event = rx.recv().await.unwrap();
            if event.event_type().as_str() == "progress" {
                break;
            }
        }
        drop(rx);

        driver.await.unwrap();
        // The image call that was in flight at disconnect still completed;
        // the run stopped before starting the next scene
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_stream_for_same_project_is_rejected() {
        let state = test_state(Vec::new());
        state.locks.try_acquire("proj-1").await.unwrap();

        let token = {
            use jsonwebtoken::{encode, EncodingKey, Header};
            let now = chrono::Utc::now().timestamp();
            let claims = crate::auth::Claims {
                sub: "u1".to_string(),
                email: None,
                iat: now,
                exp: now + 3600,
            };
            encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap()
        };
        state
            .sessions
            .put(SessionRecord::new("s2", "u1", request()))
            .await;

        let (tx, mut rx) = mpsc::channel(8);
        drive_stream(state.clone(), "s2".to_string(), Some(token), tx).await;

        let event = rx.recv().await.unwrap();
        assert!(event.is_terminal());

        // Releasing the first run admits a new one
        state.locks.release("proj-1").await;
        assert!(state.locks.try_acquire("proj-1").await.is_ok());
    }
}
