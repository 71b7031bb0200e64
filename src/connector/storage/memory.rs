//! In-memory session storage.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::application::SessionStore;
use crate::domain::{DomainError, SessionId};

/// Idle lifetime of a session when none is configured.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Most live sessions held at once when no limit is configured.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

struct SessionEntry {
    values: HashMap<String, String>,
    last_access: Instant,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            values: HashMap::new(),
            last_access: Instant::now(),
        }
    }

    fn is_expired(&self, idle_timeout: Duration, now: Instant) -> bool {
        now.duration_since(self.last_access) >= idle_timeout
    }
}

/// Process-local session storage with a sliding idle timeout.
///
/// Every read or write of a session pushes its expiry back. Once a session
/// has been idle for longer than the timeout its values are gone: the next
/// access drops it, and [`SessionStore::purge_expired`] sweeps the rest.
/// Starting a session beyond `max_sessions` live ones is a storage error.
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, SessionEntry>>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    /// Number of sessions currently held, expired or not.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    fn live_entry<'a>(
        &self,
        sessions: &'a mut HashMap<SessionId, SessionEntry>,
        session: &SessionId,
    ) -> Option<&'a mut SessionEntry> {
        let now = Instant::now();
        let expired = sessions
            .get(session)
            .is_some_and(|entry| entry.is_expired(self.idle_timeout, now));

        if expired {
            debug!("Session {} expired", session);
            sessions.remove(session);
            return None;
        }

        let entry = sessions.get_mut(session)?;
        entry.last_access = now;
        Some(entry)
    }

    fn insert_entry(
        &self,
        sessions: &mut HashMap<SessionId, SessionEntry>,
        session: &SessionId,
    ) -> Result<(), DomainError> {
        if sessions.len() >= self.max_sessions {
            let now = Instant::now();
            sessions.retain(|_, entry| !entry.is_expired(self.idle_timeout, now));
        }
        if sessions.len() >= self.max_sessions {
            warn!("Refusing session {}: {} sessions live", session, sessions.len());
            return Err(DomainError::storage(format!(
                "session limit of {} reached",
                self.max_sessions
            )));
        }
        sessions.insert(session.clone(), SessionEntry::new());
        Ok(())
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn open(&self, session: &SessionId) -> Result<(), DomainError> {
        let mut sessions = self.sessions.lock().await;
        if self.live_entry(&mut sessions, session).is_none() {
            self.insert_entry(&mut sessions, session)?;
        }
        Ok(())
    }

    async fn contains(&self, session: &SessionId) -> Result<bool, DomainError> {
        let mut sessions = self.sessions.lock().await;
        Ok(self.live_entry(&mut sessions, session).is_some())
    }

    async fn get_string(
        &self,
        session: &SessionId,
        key: &str,
    ) -> Result<Option<String>, DomainError> {
        let mut sessions = self.sessions.lock().await;
        Ok(self
            .live_entry(&mut sessions, session)
            .and_then(|entry| entry.values.get(key).cloned()))
    }

    async fn set_string(
        &self,
        session: &SessionId,
        key: &str,
        value: String,
    ) -> Result<(), DomainError> {
        let mut sessions = self.sessions.lock().await;
        if self.live_entry(&mut sessions, session).is_none() {
            self.insert_entry(&mut sessions, session)?;
        }
        if let Some(entry) = sessions.get_mut(session) {
            entry.values.insert(key.to_string(), value);
        }
        Ok(())
    }

    async fn remove(&self, session: &SessionId, key: &str) -> Result<(), DomainError> {
        let mut sessions = self.sessions.lock().await;
        if let Some(entry) = self.live_entry(&mut sessions, session) {
            entry.values.remove(key);
        }
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, DomainError> {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(self.idle_timeout, now));
        let purged = before - sessions.len();
        if purged > 0 {
            debug!("Purged {} expired sessions", purged);
        }
        Ok(purged)
    }
}
