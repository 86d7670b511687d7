//! Application state.

use std::sync::Arc;

use scast_ai::{ImageGenerator, OpenAiClient, OpenAiConfig, ScenePlannerModel};

use crate::auth::JwtVerifier;
use crate::config::ApiConfig;
use crate::session::{InMemorySessionStore, ProjectLocks, SessionStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub sessions: Arc<dyn SessionStore>,
    pub locks: Arc<ProjectLocks>,
    pub jwt: Arc<JwtVerifier>,
    pub planner: Arc<dyn ScenePlannerModel>,
    pub generator: Arc<dyn ImageGenerator>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let ai = Arc::new(OpenAiClient::new(OpenAiConfig::from_env()?)?);
        let jwt = Arc::new(JwtVerifier::from_env()?);

        Ok(Self {
            config,
            sessions: Arc::new(InMemorySessionStore::new()),
            locks: Arc::new(ProjectLocks::new()),
            jwt,
            planner: ai.clone(),
            generator: ai,
        })
    }

    /// Build state with explicit collaborators (tests).
    pub fn with_parts(
        config: ApiConfig,
        sessions: Arc<dyn SessionStore>,
        locks: Arc<ProjectLocks>,
        jwt: Arc<JwtVerifier>,
        planner: Arc<dyn ScenePlannerModel>,
        generator: Arc<dyn ImageGenerator>,
    ) -> Self {
        Self {
            config,
            sessions,
            locks,
            jwt,
            planner,
            generator,
        }
    }
}
