// src/exam/registry.rs

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::session::{ExamSession, SessionError};
use crate::models::category::ExamCategory;

pub type SessionHandle = Arc<Mutex<ExamSession>>;

struct Entry {
    owner: i64,
    category: ExamCategory,
    created_at: DateTime<Utc>,
    handle: SessionHandle,
}

/// Live exam sessions, keyed by id. Owner and category sit outside the session
/// lock so lookups never wait on a running submission.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Entry>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `session`, dropping any earlier session the same user had open
    /// for the same category.
    pub fn insert(&self, session: ExamSession) -> SessionHandle {
        let id = session.id();
        let owner = session.user_id();
        let category = session.category();
        let created_at = session.created_at();
        let handle = Arc::new(Mutex::new(session));

        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        map.retain(|_, entry| !(entry.owner == owner && entry.category == category));
        map.insert(
            id,
            Entry {
                owner,
                category,
                created_at,
                handle: Arc::clone(&handle),
            },
        );
        handle
    }

    pub fn get(&self, id: Uuid, user_id: i64) -> Result<SessionHandle, SessionError> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let entry = map.get(&id).ok_or(SessionError::NotFound)?;
        if entry.owner != user_id {
            return Err(SessionError::Forbidden);
        }
        Ok(Arc::clone(&entry.handle))
    }

    pub fn remove(&self, id: Uuid, user_id: i64) -> Result<(), SessionError> {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        match map.get(&id) {
            None => Err(SessionError::NotFound),
            Some(entry) if entry.owner != user_id => Err(SessionError::Forbidden),
            Some(_) => {
                map.remove(&id);
                Ok(())
            }
        }
    }

    /// Drops sessions opened before `now - max_age`. A session whose lock is
    /// held (a submission in flight) survives until the next sweep.
    pub fn sweep(&self, max_age: TimeDelta, now: DateTime<Utc>) -> usize {
        let cutoff = now - max_age;
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let before = map.len();
        map.retain(|_, entry| entry.created_at > cutoff || entry.handle.try_lock().is_err());
        before - map.len()
    }

    /// Runs `sweep` every `interval` for as long as the process lives.
    pub fn spawn_sweeper(&self, interval: Duration, max_age: TimeDelta) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed = registry.sweep(max_age, Utc::now());
                if removed > 0 {
                    tracing::info!(removed, remaining = registry.len(), "Swept stale exam sessions");
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_are_private_to_their_owner() {
        let registry = SessionRegistry::new();
        let session = ExamSession::new(1, ExamCategory::Training, Vec::new(), 5);
        let id = session.id();
        registry.insert(session);

        assert!(registry.get(id, 1).is_ok());
        assert!(matches!(registry.get(id, 2), Err(SessionError::Forbidden)));
        assert!(matches!(registry.remove(id, 2), Err(SessionError::Forbidden)));
        assert!(matches!(registry.get(Uuid::new_v4(), 1), Err(SessionError::NotFound)));

        registry.remove(id, 1).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn reopening_replaces_previous_attempt() {
        let registry = SessionRegistry::new();
        registry.insert(ExamSession::new(1, ExamCategory::Training, Vec::new(), 5));
        registry.insert(ExamSession::new(1, ExamCategory::WorkPermit, Vec::new(), 5));
        let latest = ExamSession::new(1, ExamCategory::Training, Vec::new(), 5);
        let latest_id = latest.id();
        registry.insert(latest);

        assert_eq!(registry.len(), 2);
        assert!(registry.get(latest_id, 1).is_ok());
    }

    #[tokio::test]
    async fn sweep_drops_stale_sessions_but_not_busy_ones() {
        let registry = SessionRegistry::new();
        let stale = ExamSession::new(1, ExamCategory::Training, Vec::new(), 5);
        let stale_id = stale.id();
        let opened = stale.created_at();
        registry.insert(stale);
        let busy = registry.insert(ExamSession::new(2, ExamCategory::Training, Vec::new(), 5));

        let max_age = TimeDelta::hours(12);
        assert_eq!(registry.sweep(max_age, opened + TimeDelta::hours(1)), 0);

        let later = opened + TimeDelta::hours(13);
        let guard = busy.lock().await;
        assert_eq!(registry.sweep(max_age, later), 1);
        assert!(matches!(registry.get(stale_id, 1), Err(SessionError::NotFound)));
        assert_eq!(registry.len(), 1);

        drop(guard);
        assert_eq!(registry.sweep(max_age, later), 1);
        assert!(registry.is_empty());
    }
}
