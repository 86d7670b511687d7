//! Generation sessions and per-project run locks.
//!
//! A session is created by the bootstrap POST and consumed by the SSE leg.
//! Entries that are never picked up are purged by a background sweeper.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{info, warn};

use scast_models::GenerateRequest;

/// Interval between sweeper passes.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A pending or active generation session.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session_id: String,
    pub user_id: String,
    pub request: GenerateRequest,
    pub created_at: Instant,
    pub last_accessed: Instant,
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>, request: GenerateRequest) -> Self {
        let now = Instant::now();
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            request,
            created_at: now,
            last_accessed: now,
        }
    }
}

/// Session persistence seam.
///
/// The in-memory implementation below is single-instance only; a
/// distributed deployment swaps in a shared store behind this trait.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a session record.
    async fn put(&self, record: SessionRecord);

    /// Fetch a session by id, refreshing its last-accessed time.
    async fn get(&self, session_id: &str) -> Option<SessionRecord>;

    /// Remove a session. Idempotent.
    async fn remove(&self, session_id: &str);

    /// Drop sessions idle longer than `ttl`. Returns the number removed.
    async fn purge_expired(&self, ttl: Duration) -> usize;

    /// Number of live sessions.
    async fn len(&self) -> usize;
}

/// RwLock<HashMap> session store.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, record: SessionRecord) {
        self.sessions
            .write()
            .await
            .insert(record.session_id.clone(), record);
    }

    async fn get(&self, session_id: &str) -> Option<SessionRecord> {
        let mut sessions = self.sessions.write().await;
        let record = sessions.get_mut(session_id)?;
        record.last_accessed = Instant::now();
        Some(record.clone())
    }

    async fn remove(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }

    async fn purge_expired(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let now = Instant::now();
        sessions.retain(|_, r| now.duration_since(r.last_accessed) < ttl);
        before - sessions.len()
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Per-project generation guard.
///
/// One generation run per project at a time; a second concurrent attempt
/// is rejected immediately rather than queued.
#[derive(Default)]
pub struct ProjectLocks {
    active: RwLock<HashMap<String, Instant>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to acquire the generation lock for a project.
    pub async fn try_acquire(&self, project_id: &str) -> Result<(), &'static str> {
        let mut active = self.active.write().await;
        if active.contains_key(project_id) {
            return Err("A generation run is already active for this project");
        }
        active.insert(project_id.to_string(), Instant::now());
        Ok(())
    }

    /// Release the lock for a project. Idempotent.
    pub async fn release(&self, project_id: &str) {
        self.active.write().await.remove(project_id);
    }

    /// Whether a project currently holds the lock.
    pub async fn is_locked(&self, project_id: &str) -> bool {
        self.active.read().await.contains_key(project_id)
    }

    /// Number of active runs.
    pub async fn active_count(&self) -> usize {
        self.active.read().await.len()
    }
}

/// Background task that purges expired sessions.
pub struct SessionSweeper {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
    enabled: bool,
}

impl SessionSweeper {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        let enabled = std::env::var("ENABLE_SESSION_SWEEPER")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        Self { store, ttl, enabled }
    }

    /// Run the sweep loop indefinitely. Spawn as a background task.
    pub async fn run(&self) {
        if !self.enabled {
            info!("Session sweeper is disabled");
            return;
        }

        info!(ttl = ?self.ttl, "Starting session sweeper (interval: {:?})", SWEEP_INTERVAL);

        let mut ticker = interval(SWEEP_INTERVAL);

        loop {
            ticker.tick().await;

            let purged = self.store.purge_expired(self.ttl).await;
            if purged > 0 {
                warn!(purged, "Purged expired generation sessions");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerateRequest {
        GenerateRequest {
            script: "a b c d e f g h i j k".to_string(),
            duration: 60.0,
            max_images_per_min: 4,
            project_id: "proj-1".to_string(),
            audio_duration: None,
        }
    }

    #[tokio::test]
    async fn test_put_get_remove_roundtrip() {
        let store = InMemorySessionStore::new();
        store.put(SessionRecord::new("s1", "u1", request())).await;

        let record = store.get("s1").await.unwrap();
        assert_eq!(record.user_id, "u1");
        assert_eq!(store.len().await, 1);

        store.remove("s1").await;
        assert!(store.get("s1").await.is_none());
        // Removing again is a no-op
        store.remove("s1").await;
    }

    #[tokio::test]
    async fn test_purge_drops_only_idle_sessions() {
        let store = InMemorySessionStore::new();
        store.put(SessionRecord::new("old", "u1", request())).await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        store.put(SessionRecord::new("fresh", "u1", request())).await;

        let purged = store.purge_expired(Duration::from_millis(20)).await;
        assert_eq!(purged, 1);
        assert!(store.get("old").await.is_none());
        assert!(store.get("fresh").await.is_some());
    }

    #[tokio::test]
    async fn test_get_refreshes_last_accessed() {
        let store = InMemorySessionStore::new();
        store.put(SessionRecord::new("s1", "u1", request())).await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        // Touch keeps the session alive past its original window
        store.get("s1").await.unwrap();

        let purged = store.purge_expired(Duration::from_millis(20)).await;
        assert_eq!(purged, 0);
    }

    #[tokio::test]
    async fn test_project_lock_rejects_second_acquire() {
        let locks = ProjectLocks::new();
        assert!(locks.try_acquire("p1").await.is_ok());
        assert!(locks.try_acquire("p1").await.is_err());
        // Other projects are unaffected
        assert!(locks.try_acquire("p2").await.is_ok());
        assert_eq!(locks.active_count().await, 2);
    }

    #[tokio::test]
    async fn test_project_lock_release_readmits() {
        let locks = ProjectLocks::new();
        locks.try_acquire("p1").await.unwrap();
        locks.release("p1").await;
        assert!(!locks.is_locked("p1").await);
        assert!(locks.try_acquire("p1").await.is_ok());
    }

    #[tokio::test]
    async fn test_project_lock_release_is_idempotent() {
        let locks = ProjectLocks::new();
        locks.try_acquire("p1").await.unwrap();
        locks.release("p1").await;
        locks.release("p1").await;
        assert_eq!(locks.active_count().await, 0);
    }
}
