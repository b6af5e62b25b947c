//! In-memory session provider.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::error::{SessionError, SessionResult};
use crate::provider::{SessionProvider, SessionTimeouts};
use crate::user_session::UserSession;

/// Session provider backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemorySessionProvider {
    sessions: DashMap<String, UserSession>,
    timeouts: SessionTimeouts,
}

impl InMemorySessionProvider {
    /// Creates an empty provider with the given timeouts.
    #[must_use]
    pub fn new(timeouts: SessionTimeouts) -> Self {
        Self {
            sessions: DashMap::new(),
            timeouts,
        }
    }

    /// Returns the number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no sessions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionProvider for InMemorySessionProvider {
    async fn create(&self, session: UserSession) -> SessionResult<()> {
        tracing::debug!(subject = %session.subject_id, "Session created");
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get_active(&self, session_id: &str) -> SessionResult<UserSession> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or(SessionError::NotFound)?;

        if !entry.is_active() {
            return Err(SessionError::LoggedOut);
        }
        if entry.is_expired_at(Utc::now(), self.timeouts.idle, self.timeouts.max_lifespan) {
            drop(entry);
            self.sessions.remove(session_id);
            return Err(SessionError::Expired);
        }

        entry.touch();
        Ok(entry.clone())
    }

    async fn update(&self, session: UserSession) -> SessionResult<()> {
        let mut entry = self
            .sessions
            .get_mut(&session.id)
            .ok_or(SessionError::NotFound)?;
        *entry = session;
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> SessionResult<UserSession> {
        self.sessions
            .remove(session_id)
            .map(|(_, session)| session)
            .ok_or(SessionError::NotFound)
    }

    async fn remove_by_note(&self, key: &str, value: &str) -> SessionResult<usize> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.get_note(key) != Some(value));
        Ok(before.saturating_sub(self.sessions.len()))
    }

    async fn remove_expired(&self) -> SessionResult<usize> {
        let now = Utc::now();
        let SessionTimeouts { idle, max_lifespan } = self.timeouts;
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| s.is_active() && !s.is_expired_at(now, idle, max_lifespan));
        Ok(before.saturating_sub(self.sessions.len()))
    }
}
