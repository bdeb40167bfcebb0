use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::info;
use uuid::Uuid;

use crate::session::Session;

/// In-memory sessions keyed by id. Nothing outlives the process.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Arc<Session>>>>,
}

impl SessionRegistry {
    pub async fn insert(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        let mut guard = self.inner.write().await;
        guard.insert(session.id, session.clone());
        session
    }

    /// Lookups count as activity for the idle sweep
    pub async fn get(&self, session_id: &Uuid) -> Option<Arc<Session>> {
        let guard = self.inner.read().await;
        let session = guard.get(session_id).cloned();
        if let Some(session) = &session {
            session.touch();
        }
        session
    }

    pub async fn remove(&self, session_id: &Uuid) -> Option<Arc<Session>> {
        self.inner.write().await.remove(session_id)
    }

    /// Drop sessions idle for longer than `ttl`. Sessions with a stage in
    /// flight are kept. Returns how many were dropped.
    pub async fn sweep_idle(&self, ttl: Duration) -> usize {
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|_, session| session.is_busy() || session.idle_for() <= ttl);
        before - guard.len()
    }

    /// Run `sweep_idle` on a fixed period until the handle is aborted
    pub fn spawn_sweeper(&self, ttl: Duration, every: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut interval = time::interval(every);
            loop {
                interval.tick().await;
                let dropped = registry.sweep_idle(ttl).await;
                if dropped > 0 {
                    let remaining = registry.len().await;
                    info!(dropped, remaining, "Idle sessions dropped");
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
