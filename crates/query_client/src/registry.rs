use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{info, warn};

use shared::{domain::SessionKey, error::SessionError};

use crate::session::{SessionSnapshot, ViewSession};

/// Owns the live view sessions, at most one per key.
///
/// The map lock is held across the whole lookup-or-insert, so a second
/// caller can never race a duplicate surface into existence for the same
/// key.
#[derive(Default)]
pub struct ViewSessionRegistry {
    sessions: Mutex<HashMap<SessionKey, Arc<ViewSession>>>,
}

impl ViewSessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live session for `key`, or stores the one produced by
    /// `create`. A stale entry whose session already disposed itself is
    /// replaced rather than reused.
    pub async fn get_or_create<F>(&self, key: &SessionKey, create: F) -> Result<Arc<ViewSession>>
    where
        F: FnOnce() -> Result<Arc<ViewSession>>,
    {
        let mut sessions = self.sessions.lock().await;

        if let Some(existing) = sessions.get(key) {
            let disposed = existing.is_disposed().await;
            if !disposed {
                info!("reusing the live query view session for {key}");
                return Ok(Arc::clone(existing));
            }
            warn!("replacing a disposed session left behind for {key}");
            sessions.remove(key);
        }

        let session = create()?;
        if sessions.insert(key.clone(), Arc::clone(&session)).is_some() {
            // the lock spans check-and-insert, so a displaced entry means
            // the single-session invariant was already broken
            return Err(SessionError::DuplicateSession(key.clone()).into());
        }
        Ok(session)
    }

    /// Idempotent; removing an absent key is a no-op. Does not dispose the
    /// session: disposal is driven by the surface and observed through the
    /// session's dispose event.
    pub async fn remove(&self, key: &SessionKey) {
        if self.sessions.lock().await.remove(key).is_some() {
            info!("removed the query view session for {key}");
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    pub async fn snapshots(&self) -> Vec<SessionSnapshot> {
        let sessions = self.sessions.lock().await;
        let mut snapshots = Vec::with_capacity(sessions.len());
        for session in sessions.values() {
            snapshots.push(session.snapshot().await);
        }
        snapshots
    }

    /// Shutdown teardown: disposes every live session and clears the map.
    pub async fn dispose_all(&self) {
        let drained: Vec<Arc<ViewSession>> = {
            let mut sessions = self.sessions.lock().await;
            sessions.drain().map(|(_, session)| session).collect()
        };
        join_all(drained.iter().map(|session| session.dispose())).await;
    }
}
