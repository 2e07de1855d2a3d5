//! Auth state shared by backend implementations

use tokio::sync::{broadcast, RwLock};

use crate::models::{AuthUser, Session};

/// Auth-state change published to subscribers
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn { session: Session, user: AuthUser },
    SignedOut,
    UserUpdated(AuthUser),
}

impl AuthEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SignedIn { .. } => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::UserUpdated(_) => "USER_UPDATED",
        }
    }
}

const EVENT_CAPACITY: usize = 16;

/// Current session plus the auth event channel
pub struct AuthState {
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthState {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            session: RwLock::new(None),
            events,
        }
    }

    pub async fn access_token(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.access_token.clone())
    }

    pub async fn set_session(&self, session: Option<Session>) {
        *self.session.write().await = session;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Publish an event; having no subscribers is fine
    pub fn emit(&self, event: AuthEvent) {
        tracing::debug!("Auth state change: {}", event.name());
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_lifecycle_and_events() {
        let state = AuthState::new();
        let mut rx = state.subscribe();

        assert!(state.access_token().await.is_none());

        state.set_session(Some(Session::new("token-1", None))).await;
        assert_eq!(state.access_token().await.as_deref(), Some("token-1"));

        state.emit(AuthEvent::SignedOut);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "SIGNED_OUT");

        state.set_session(None).await;
        assert!(state.access_token().await.is_none());
    }

    #[test]
    fn test_emit_without_subscribers() {
        let state = AuthState::new();
        state.emit(AuthEvent::SignedOut);
    }
}
