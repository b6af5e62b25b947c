//! Background maintenance.
//!
//! Expired codes, sessions and retired keys are purged on a fixed interval.
//! When rotation is configured a new signing key is promoted periodically;
//! the previous key keeps verifying for the configured overlap.

use std::time::Duration;

use sso_core::{Event, EventType};
use sso_protocol_oidc::{OidcState, SigningKey};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handles of the running background tasks.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Spawns the purge task and, when `rotation` is set, the key rotation
    /// task.
    #[must_use]
    pub fn spawn(state: &OidcState, purge: Duration, rotation: Option<Duration>) -> Self {
        let mut handles = vec![tokio::spawn(purge_loop(state.clone(), purge))];
        if let Some(interval) = rotation {
            handles.push(tokio::spawn(rotation_loop(state.clone(), interval)));
        }
        Self { handles }
    }

    /// Stops every task.
    pub fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

async fn purge_loop(state: OidcState, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        purge_expired(&state).await;
    }
}

/// Drops expired authorization codes, sessions and retired signing keys.
pub async fn purge_expired(state: &OidcState) {
    let now = OidcState::now();
    let codes = match state.codes.remove_expired(now).await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to purge authorization codes");
            0
        }
    };
    let sessions = match state.sessions.remove_expired().await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to purge sessions");
            0
        }
    };
    let keys = state.keys().prune(now);
    if codes + sessions + keys > 0 {
        tracing::debug!(codes, sessions, keys, "Purged expired entries");
    }
}

async fn rotation_loop(state: OidcState, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        rotate_signing_key(&state);
    }
}

/// Promotes a freshly generated signing key.
pub fn rotate_signing_key(state: &OidcState) {
    let next = match SigningKey::generate() {
        Ok(key) => key,
        Err(e) => {
            tracing::error!(error = %e, "Key rotation skipped");
            return;
        }
    };
    let kid = next.kid().to_string();
    let keys = state.keys();
    let previous = keys.active().kid().to_string();
    keys.rotate(next, state.policy.key_overlap_secs, OidcState::now());
    Event::builder(EventType::KeyRotated)
        .detail("kid", kid)
        .detail("previous_kid", previous)
        .emit();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::state::AppState;

    fn state() -> OidcState {
        AppState::build(ServerConfig::for_testing(), "http://localhost:5000")
            .unwrap()
            .oidc
    }

    #[test]
    fn rotation_keeps_previous_key_published() {
        let state = state();
        let before = state.keys().active().kid().to_string();

        rotate_signing_key(&state);

        let keys = state.keys();
        assert_ne!(keys.active().kid(), before);
        let jwks = keys.jwks(OidcState::now());
        assert_eq!(jwks.keys.len(), 2);
        assert!(keys.decoding_key(&before, OidcState::now()).is_some());
    }

    #[tokio::test]
    async fn purge_runs_on_empty_stores() {
        let state = state();
        purge_expired(&state).await;
        assert_eq!(state.keys().jwks(OidcState::now()).keys.len(), 1);
    }

    #[tokio::test]
    async fn tasks_stop_on_shutdown() {
        let state = state();
        let tasks = BackgroundTasks::spawn(
            &state,
            Duration::from_millis(10),
            Some(Duration::from_secs(3600)),
        );
        assert_eq!(tasks.handles.len(), 2);
        tokio::time::sleep(Duration::from_millis(30)).await;
        tasks.shutdown();
    }
}
