//! Authentication service
//!
//! Sign-in is an OAuth redirect: `sign_in` hands back the provider URL to open
//! and a receiver of auth events, and `complete_sign_in` adopts the session
//! returned by the redirect.

use serde_json::json;
use tokio::sync::broadcast;

use crate::backend::{AuthEvent, DynBackend};
use crate::error::Result;
use crate::models::{Administrator, AuthUser, OAuthProvider, Session};

/// A started OAuth sign-in
#[derive(Debug)]
pub struct OAuthSignIn {
    /// Provider URL the user opens
    pub url: String,
    /// Auth events, starting with `SignedIn` once the redirect completes
    pub events: broadcast::Receiver<AuthEvent>,
}

pub struct AuthService {
    backend: DynBackend,
}

impl AuthService {
    pub fn new(backend: DynBackend) -> Self {
        Self { backend }
    }

    /// The signed-in user
    pub async fn get_user_info(&self) -> Result<AuthUser> {
        self.backend
            .current_user()
            .await
            .inspect_err(|e| tracing::error!("Error fetching user info: {}", e))
    }

    pub fn sign_in(&self, provider: OAuthProvider, redirect_to: Option<&str>) -> Result<OAuthSignIn> {
        let events = self.backend.subscribe();
        let url = self
            .backend
            .authorize_url(provider, redirect_to)
            .inspect_err(|e| tracing::error!("Error signing in: {}", e))?;
        tracing::debug!("OAuth sign-in started with {}", provider);
        Ok(OAuthSignIn { url, events })
    }

    /// Adopt the session produced by the OAuth redirect
    pub async fn complete_sign_in(&self, session: Session) -> Result<AuthUser> {
        let user = self
            .backend
            .set_session(session)
            .await
            .inspect_err(|e| tracing::error!("Error completing sign-in: {}", e))?;
        tracing::info!("User {} signed in", user.id);
        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.backend
            .sign_out()
            .await
            .inspect_err(|e| tracing::error!("Error signing out: {}", e))
    }

    /// Store the administrator profile as the user's metadata
    pub async fn update_user_info(&self, administrator: &Administrator) -> Result<bool> {
        self.backend
            .update_user(json!(administrator))
            .await
            .inspect_err(|e| tracing::error!("Error updating user info: {}", e))?;
        Ok(true)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.backend.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{create_test_backend, MemoryBackend};
    use crate::error::SdkError;
    use crate::models::UserRole;
    use chrono::Utc;
    use std::sync::Arc;

    fn setup_test_service() -> (Arc<MemoryBackend>, AuthService) {
        let backend = create_test_backend();
        backend.register_user(
            "oauth-token",
            AuthUser {
                id: "user-1".to_string(),
                email: Some("asha@example.com".to_string()),
                role: Some("authenticated".to_string()),
                user_metadata: json!({}),
                created_at: None,
            },
        );
        let service = AuthService::new(backend.clone());
        (backend, service)
    }

    #[tokio::test]
    async fn test_user_info_requires_session() {
        let (_backend, service) = setup_test_service();

        let err = service.get_user_info().await.unwrap_err();

        assert!(matches!(err, SdkError::NotSignedIn));
    }

    #[tokio::test]
    async fn test_sign_in_flow_emits_events() {
        let (_backend, service) = setup_test_service();

        let mut sign_in = service
            .sign_in(OAuthProvider::Google, Some("https://esg.example/callback"))
            .unwrap();
        assert!(sign_in.url.contains("provider=google"));
        assert!(sign_in.url.contains("redirect_to=https%3A%2F%2Fesg.example%2Fcallback"));

        let user = service
            .complete_sign_in(Session::new("oauth-token", None))
            .await
            .unwrap();
        assert_eq!(user.id, "user-1");

        match sign_in.events.recv().await.unwrap() {
            AuthEvent::SignedIn { user, .. } => assert_eq!(user.id, "user-1"),
            other => panic!("unexpected event {:?}", other),
        }

        assert_eq!(service.get_user_info().await.unwrap().id, "user-1");

        service.sign_out().await.unwrap();
        assert_eq!(sign_in.events.recv().await.unwrap().name(), "SIGNED_OUT");
    }

    #[tokio::test]
    async fn test_update_user_info() {
        let (_backend, service) = setup_test_service();
        service
            .complete_sign_in(Session::new("oauth-token", None))
            .await
            .unwrap();
        let mut events = service.subscribe();

        let admin = Administrator {
            id: "user-1".to_string(),
            name: "Asha".to_string(),
            avatar_url: "a.png".to_string(),
            role: UserRole::InitiativeWriter,
            created_at: Utc::now(),
        };
        assert!(service.update_user_info(&admin).await.unwrap());

        match events.recv().await.unwrap() {
            AuthEvent::UserUpdated(user) => {
                assert_eq!(user.user_metadata["name"], "Asha");
                assert_eq!(user.user_metadata["role"], "initiative_writer");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_session_is_rejected() {
        let (_backend, service) = setup_test_service();

        let err = service
            .complete_sign_in(Session::new("forged", None))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("invalid JWT"));
        assert!(service.get_user_info().await.is_err());
    }
}
