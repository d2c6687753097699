use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::backend::ScanBackend;
use crate::cache::QueryCache;

/// One signed-in session: the client handle and the query cache it feeds.
///
/// The client is absent until [`Session::attach`] is called; queries stay
/// disabled until then. [`Session::logout`] drops both the client and every
/// cached entry.
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    backend: RwLock<Option<Arc<dyn ScanBackend>>>,
    cache: QueryCache,
}

impl Session {
    pub fn new() -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            backend: RwLock::new(None),
            cache: QueryCache::new(),
        };
        info!("Session {} started", session.id);
        session
    }

    pub fn with_backend(backend: Arc<dyn ScanBackend>) -> Self {
        let mut session = Self::new();
        session.backend = RwLock::new(Some(backend));
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Make the client ready. Replacing a different client clears the cache.
    pub async fn attach(&self, backend: Arc<dyn ScanBackend>) {
        let mut slot = self.backend.write().await;
        if let Some(previous) = slot.as_ref() {
            if !Arc::ptr_eq(previous, &backend) {
                info!("Session {}: client replaced, clearing cache", self.id);
                self.cache.clear().await;
            }
        }
        *slot = Some(backend);
        info!("Session {}: client ready", self.id);
    }

    pub async fn backend(&self) -> Option<Arc<dyn ScanBackend>> {
        self.backend.read().await.clone()
    }

    pub async fn logout(&self) {
        self.backend.write().await.take();
        self.cache.clear().await;
        info!("Session {} logged out", self.id);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
