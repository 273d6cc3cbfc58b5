//! Storage of live refresh sessions.
//!
//! Sessions are indexed two ways: by token id (what the refresh cookie
//! carries) and by subject (used to enforce the per-subject cap). Both
//! backends keep the two indexes consistent under a single atomic step.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::auth::error::SessionError;

/// Maximum number of live refresh sessions per subject.
pub const DEFAULT_MAX_SESSIONS: usize = 5;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Records a refresh session, evicting one existing session of the same
    /// subject first when the subject is already at the cap.
    async fn put(
        &self,
        subject: &str,
        token_id: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<(), SessionError>;

    /// Returns the signed refresh token stored under `token_id`, or
    /// `SessionError::NotFound`.
    async fn get(&self, token_id: &str) -> Result<String, SessionError>;

    /// Removes the session stored under `token_id` and returns how many
    /// records were deleted (0 or 1).
    async fn delete(&self, token_id: &str) -> Result<u64, SessionError>;

    /// Removes every session of `subject` and returns how many live records
    /// were deleted.
    async fn delete_subject(&self, subject: &str) -> Result<u64, SessionError>;
}

struct SessionEntry {
    subject: String,
    token: String,
    expires_at: Instant,
}

#[derive(Default)]
struct MemoryState {
    sessions: HashMap<String, SessionEntry>,
    // Token ids per subject, in insertion order.
    by_subject: HashMap<String, Vec<String>>,
}

impl MemoryState {
    // Drops every expired session, whoever it belongs to.
    fn sweep(&mut self, now: Instant) {
        self.sessions.retain(|_, entry| entry.expires_at > now);
        let sessions = &self.sessions;
        self.by_subject.retain(|_, ids| {
            ids.retain(|id| sessions.contains_key(id));
            !ids.is_empty()
        });
    }

    fn prune_subject(&mut self, subject: &str, now: Instant) {
        let sessions = &mut self.sessions;
        if let Some(ids) = self.by_subject.get_mut(subject) {
            ids.retain(|id| match sessions.get(id) {
                Some(entry) if entry.expires_at > now => true,
                Some(_) => {
                    sessions.remove(id);
                    false
                }
                None => false,
            });
            if ids.is_empty() {
                self.by_subject.remove(subject);
            }
        }
    }

    fn remove(&mut self, token_id: &str) -> Option<SessionEntry> {
        let entry = self.sessions.remove(token_id)?;
        if let Some(ids) = self.by_subject.get_mut(&entry.subject) {
            ids.retain(|id| id != token_id);
            if ids.is_empty() {
                self.by_subject.remove(&entry.subject);
            }
        }
        Some(entry)
    }
}

/// In-process session store.
///
/// Suitable for single-instance deployments and tests; sessions do not
/// survive a restart. Expired sessions are swept on every `put` and dropped
/// on access.
pub struct MemorySessionStore {
    state: Mutex<MemoryState>,
    max_sessions: usize,
}

impl MemorySessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            max_sessions: max_sessions.max(1),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, SessionError> {
        self.state
            .lock()
            .map_err(|_| SessionError::StoreUnavailable("session store lock poisoned".into()))
    }

    /// Number of live sessions currently recorded for `subject`.
    pub fn live_sessions(&self, subject: &str) -> Result<usize, SessionError> {
        let mut state = self.lock()?;
        state.prune_subject(subject, Instant::now());
        Ok(state.by_subject.get(subject).map_or(0, Vec::len))
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(
        &self,
        subject: &str,
        token_id: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<(), SessionError> {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).ok_or_else(|| {
            SessionError::StoreUnavailable(format!("session ttl {:?} out of range", ttl))
        })?;
        let mut state = self.lock()?;
        state.sweep(now);

        let evict = state
            .by_subject
            .get(subject)
            .filter(|ids| ids.len() >= self.max_sessions)
            .and_then(|ids| ids.first().cloned());
        if let Some(evicted) = evict {
            log::debug!("session cap reached for {}, evicting one session", subject);
            state.remove(&evicted);
        }

        // A reused id replaces the previous record instead of duplicating it.
        state.remove(token_id);
        state.sessions.insert(
            token_id.to_owned(),
            SessionEntry {
                subject: subject.to_owned(),
                token: token.to_owned(),
                expires_at,
            },
        );
        state
            .by_subject
            .entry(subject.to_owned())
            .or_default()
            .push(token_id.to_owned());
        Ok(())
    }

    async fn get(&self, token_id: &str) -> Result<String, SessionError> {
        let mut state = self.lock()?;
        let expired = match state.sessions.get(token_id) {
            None => return Err(SessionError::NotFound),
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(entry.token.clone());
            }
            Some(_) => true,
        };
        if expired {
            state.remove(token_id);
        }
        Err(SessionError::NotFound)
    }

    async fn delete(&self, token_id: &str) -> Result<u64, SessionError> {
        let mut state = self.lock()?;
        match state.remove(token_id) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(1),
            _ => Ok(0),
        }
    }

    async fn delete_subject(&self, subject: &str) -> Result<u64, SessionError> {
        let mut state = self.lock()?;
        let now = Instant::now();
        let ids = state.by_subject.remove(subject).unwrap_or_default();
        let mut deleted = 0;
        for id in ids {
            if let Some(entry) = state.sessions.remove(&id) {
                if entry.expires_at > now {
                    deleted += 1;
                }
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
impl MemorySessionStore {
    fn stored_sessions(&self) -> usize {
        self.state.lock().map_or(0, |state| state.sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[actix_rt::test]
    async fn test_put_then_get() {
        let store = MemorySessionStore::default();
        store.put("alice", "t1", "signed-1", TTL).await.unwrap();

        assert_eq!(store.get("t1").await.unwrap(), "signed-1");
        assert_eq!(store.get("missing").await, Err(SessionError::NotFound));
    }

    #[actix_rt::test]
    async fn test_sixth_session_evicts_exactly_one() {
        let store = MemorySessionStore::default();
        for i in 0..5 {
            store
                .put("alice", &format!("a{}", i), "tok", TTL)
                .await
                .unwrap();
        }
        store.put("bob", "b0", "tok", TTL).await.unwrap();
        assert_eq!(store.live_sessions("alice").unwrap(), 5);

        store.put("alice", "a5", "tok", TTL).await.unwrap();

        assert_eq!(store.live_sessions("alice").unwrap(), 5);
        assert_eq!(store.live_sessions("bob").unwrap(), 1);
        assert!(store.get("a5").await.is_ok());
        let mut missing = 0;
        for i in 0..5 {
            if store.get(&format!("a{}", i)).await.is_err() {
                missing += 1;
            }
        }
        assert_eq!(missing, 1);
        assert!(store.get("b0").await.is_ok());
    }

    #[actix_rt::test]
    async fn test_delete_reports_count() {
        let store = MemorySessionStore::default();
        store.put("alice", "t1", "tok", TTL).await.unwrap();

        assert_eq!(store.delete("t1").await.unwrap(), 1);
        assert_eq!(store.delete("t1").await.unwrap(), 0);
        assert_eq!(store.delete("never").await.unwrap(), 0);
        assert_eq!(store.get("t1").await, Err(SessionError::NotFound));
        assert_eq!(store.live_sessions("alice").unwrap(), 0);
    }

    #[actix_rt::test]
    async fn test_expired_sessions_are_invisible_and_free_capacity() {
        let store = MemorySessionStore::new(2);
        store.put("alice", "old", "tok", Duration::ZERO).await.unwrap();
        assert_eq!(store.get("old").await, Err(SessionError::NotFound));
        assert_eq!(store.delete("old").await.unwrap(), 0);

        store.put("alice", "x", "tok", Duration::ZERO).await.unwrap();
        store.put("alice", "y", "tok", TTL).await.unwrap();
        store.put("alice", "z", "tok", TTL).await.unwrap();
        // The expired "x" made room, so neither live session was evicted.
        assert!(store.get("y").await.is_ok());
        assert!(store.get("z").await.is_ok());
    }

    #[actix_rt::test]
    async fn test_put_sweeps_other_subjects() {
        let store = MemorySessionStore::default();
        store.put("gone", "g1", "tok", Duration::ZERO).await.unwrap();
        store.put("gone", "g2", "tok", Duration::ZERO).await.unwrap();
        store.put("alice", "a1", "tok", TTL).await.unwrap();

        // Only alice's session is left; nobody touched "gone" again.
        assert_eq!(store.stored_sessions(), 1);
        let state = store.state.lock().unwrap();
        assert!(!state.by_subject.contains_key("gone"));
    }

    #[actix_rt::test]
    async fn test_oversized_ttl_is_an_error() {
        let store = MemorySessionStore::default();
        let result = store
            .put("alice", "t", "tok", Duration::from_secs(u64::MAX / 2))
            .await;

        assert!(matches!(result, Err(SessionError::StoreUnavailable(_))));
        assert_eq!(store.get("t").await, Err(SessionError::NotFound));
    }

    #[actix_rt::test]
    async fn test_delete_subject_leaves_other_subjects() {
        let store = MemorySessionStore::default();
        store.put("alice", "a1", "tok", TTL).await.unwrap();
        store.put("alice", "a2", "tok", TTL).await.unwrap();
        store.put("alice", "stale", "tok", Duration::ZERO).await.unwrap();
        store.put("bob", "b1", "tok", TTL).await.unwrap();

        assert_eq!(store.delete_subject("alice").await.unwrap(), 2);
        assert_eq!(store.delete_subject("alice").await.unwrap(), 0);
        assert_eq!(store.get("a1").await, Err(SessionError::NotFound));
        assert_eq!(store.live_sessions("alice").unwrap(), 0);
        assert_eq!(store.get("b1").await.unwrap(), "tok");
    }
}
