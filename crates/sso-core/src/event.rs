//! Security event logging.
//!
//! Events are structured records of authentication and token activity. They
//! are written through `tracing` under the `audit` target so a subscriber can
//! route them separately from operational logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Interactive login succeeded.
    Login,
    /// Interactive login failed.
    LoginError,
    /// Session ended.
    Logout,
    /// Authorization code issued.
    CodeIssued,
    /// Authorization request rejected.
    AuthorizeError,
    /// Code exchanged for tokens.
    CodeToToken,
    /// Code exchange failed.
    CodeToTokenError,
    /// Tokens refreshed.
    RefreshToken,
    /// Token refresh failed.
    RefreshTokenError,
    /// Userinfo served.
    UserInfoRequest,
    /// Userinfo request rejected.
    UserInfoRequestError,
    /// Signing key rotated.
    KeyRotated,
}

impl EventType {
    /// Returns the wire name of the event type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::LoginError => "LOGIN_ERROR",
            Self::Logout => "LOGOUT",
            Self::CodeIssued => "CODE_ISSUED",
            Self::AuthorizeError => "AUTHORIZE_ERROR",
            Self::CodeToToken => "CODE_TO_TOKEN",
            Self::CodeToTokenError => "CODE_TO_TOKEN_ERROR",
            Self::RefreshToken => "REFRESH_TOKEN",
            Self::RefreshTokenError => "REFRESH_TOKEN_ERROR",
            Self::UserInfoRequest => "USER_INFO_REQUEST",
            Self::UserInfoRequestError => "USER_INFO_REQUEST_ERROR",
            Self::KeyRotated => "KEY_ROTATED",
        }
    }
}

/// Outcome of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
}

/// A security event for audit logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: EventType,
    /// Outcome of the event.
    pub outcome: EventOutcome,
    /// Subject identifier associated with the event.
    pub subject: Option<String>,
    /// Client identifier associated with the event.
    pub client_id: Option<String>,
    /// IdP session identifier.
    pub session_id: Option<String>,
    /// Error code (for failure events).
    pub error: Option<String>,
    /// Additional details as key-value pairs.
    pub details: Vec<(String, String)>,
}

impl Event {
    /// Creates a new event builder.
    #[must_use]
    pub const fn builder(event_type: EventType) -> EventBuilder {
        EventBuilder::new(event_type)
    }

    /// Writes the event to the `audit` tracing target.
    pub fn emit(&self) {
        let details = self
            .details
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");

        match self.outcome {
            EventOutcome::Success => tracing::info!(
                target: "audit",
                event_id = %self.id,
                event_type = self.event_type.as_str(),
                subject = self.subject.as_deref(),
                client_id = self.client_id.as_deref(),
                session_id = self.session_id.as_deref(),
                details = %details,
                "security event"
            ),
            EventOutcome::Failure => tracing::warn!(
                target: "audit",
                event_id = %self.id,
                event_type = self.event_type.as_str(),
                subject = self.subject.as_deref(),
                client_id = self.client_id.as_deref(),
                session_id = self.session_id.as_deref(),
                error = self.error.as_deref(),
                details = %details,
                "security event"
            ),
        }
    }
}

/// Builder for creating events.
pub struct EventBuilder {
    event_type: EventType,
    outcome: EventOutcome,
    subject: Option<String>,
    client_id: Option<String>,
    session_id: Option<String>,
    error: Option<String>,
    details: Vec<(String, String)>,
}

impl EventBuilder {
    /// Creates a new event builder.
    #[must_use]
    pub const fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            outcome: EventOutcome::Success,
            subject: None,
            client_id: None,
            session_id: None,
            error: None,
            details: Vec::new(),
        }
    }

    /// Sets the outcome to failure with an error code.
    #[must_use]
    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.outcome = EventOutcome::Failure;
        self.error = Some(error.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the client ID.
    #[must_use]
    pub fn client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the session ID.
    #[must_use]
    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Adds a detail key-value pair.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }

    /// Builds the event.
    #[must_use]
    pub fn build(self) -> Event {
        Event {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            event_type: self.event_type,
            outcome: self.outcome,
            subject: self.subject,
            client_id: self.client_id,
            session_id: self.session_id,
            error: self.error,
            details: self.details,
        }
    }

    /// Builds and emits the event.
    pub fn emit(self) {
        self.build().emit();
    }
}
