//! User session model.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of a user session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Session is active and valid.
    #[default]
    Active,
    /// Session is logged out but not yet purged.
    LoggedOut,
}

/// A cookie-bound session for one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    /// Opaque session identifier, also the cookie value.
    pub id: String,
    /// Subject who owns this session.
    pub subject_id: String,
    /// Current state of the session.
    pub state: SessionState,
    /// When the subject authenticated.
    pub auth_time: DateTime<Utc>,
    /// Last activity timestamp.
    pub last_activity: DateTime<Utc>,
    /// Clients that received codes during this session.
    pub clients: BTreeSet<String>,
    /// Session notes.
    pub notes: HashMap<String, String>,
}

impl UserSession {
    /// Creates a new active session with a random identifier.
    #[must_use]
    pub fn new(subject_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: sso_crypto::random::generate_session_id(),
            subject_id: subject_id.into(),
            state: SessionState::Active,
            auth_time: now,
            last_activity: now,
            clients: BTreeSet::new(),
            notes: HashMap::new(),
        }
    }

    /// Sets a session note.
    pub fn set_note(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.notes.insert(key.into(), value.into());
    }

    /// Gets a session note.
    #[must_use]
    pub fn get_note(&self, key: &str) -> Option<&str> {
        self.notes.get(key).map(String::as_str)
    }

    /// Records that `client_id` took part in this session.
    pub fn add_client(&mut self, client_id: impl Into<String>) {
        self.clients.insert(client_id.into());
    }

    /// Updates the last activity timestamp.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Checks if the session is active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active)
    }

    /// Checks if the session has expired at `now`.
    ///
    /// ## Arguments
    ///
    /// * `idle_timeout` - Maximum idle time in seconds
    /// * `max_lifespan` - Maximum session lifespan in seconds
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>, idle_timeout: i64, max_lifespan: i64) -> bool {
        (now - self.last_activity).num_seconds() > idle_timeout
            || (now - self.auth_time).num_seconds() > max_lifespan
    }

    /// Marks the session as logged out.
    pub fn logout(&mut self) {
        self.state = SessionState::LoggedOut;
    }

    /// Returns `auth_time` as Unix seconds.
    #[must_use]
    pub fn auth_time_unix(&self) -> i64 {
        self.auth_time.timestamp()
    }
}

/// Well-known session note keys used by relying parties.
pub mod notes {
    /// Access token obtained at sign-in.
    pub const ACCESS_TOKEN: &str = "access_token";
    /// Identity token obtained at sign-in.
    pub const ID_TOKEN: &str = "id_token";
    /// Refresh token obtained at sign-in.
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Access token expiry as Unix seconds.
    pub const EXPIRES_AT: &str = "expires_at";
    /// Subject claims as a JSON object.
    pub const CLAIMS: &str = "claims";
    /// Provider session id (`sid`) from the identity token.
    pub const PROVIDER_SESSION_ID: &str = "sid";
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn new_session_is_active() {
        let session = UserSession::new("1");
        assert!(session.is_active());
        assert_eq!(session.id.len(), 32);
    }

    #[test]
    fn session_notes() {
        let mut session = UserSession::new("1");
        session.set_note(notes::ID_TOKEN, "eyJ...");
        assert_eq!(session.get_note(notes::ID_TOKEN), Some("eyJ..."));
        assert_eq!(session.get_note("missing"), None);
    }

    #[test]
    fn idle_and_absolute_expiry() {
        let session = UserSession::new("1");
        let now = session.auth_time;
        assert!(!session.is_expired_at(now, 60, 3600));
        assert!(session.is_expired_at(now + Duration::seconds(61), 60, 3600));
        assert!(session.is_expired_at(now + Duration::seconds(3601), 7200, 3600));
    }

    #[test]
    fn logout_deactivates() {
        let mut session = UserSession::new("1");
        session.add_client("WebSite1");
        session.logout();
        assert!(!session.is_active());
        assert!(session.clients.contains("WebSite1"));
    }
}
