//! Administrator service

use serde_json::json;

use crate::backend::{DynBackend, Query};
use crate::error::{decode_rows, Result, SdkError};
use crate::models::{Administrator, AdministratorRow, OAuthProvider};
use crate::services::auth::OAuthSignIn;
use crate::services::{current_user_id, is_truthy};

const TABLE: &str = "administrators";

pub struct AdministratorService {
    backend: DynBackend,
}

impl AdministratorService {
    pub fn new(backend: DynBackend) -> Self {
        Self { backend }
    }

    /// Whether the signed-in user holds administrative rights
    pub async fn check_authorization(&self) -> Result<bool> {
        let uid = current_user_id(&self.backend).await?;
        let data = self
            .backend
            .rpc("get_authorization", json!({ "uid": uid }))
            .await
            .inspect_err(|e| tracing::error!("Error checking authorization: {}", e))?;
        Ok(is_truthy(&data))
    }

    /// Every administrator with the name and avatar of its user
    pub async fn get_admins(&self) -> Result<Vec<Administrator>> {
        let rows = self
            .backend
            .select(&Query::table(TABLE).select("*,user:users(*)"))
            .await
            .inspect_err(|e| tracing::error!("Error fetching administrators: {}", e))?;
        let rows: Vec<AdministratorRow> = decode_rows("administrator", rows)?;
        Ok(rows.into_iter().map(Administrator::from).collect())
    }

    /// Send an administrator invitation
    pub async fn invite_admin(&self, email: &str) -> Result<()> {
        self.backend
            .rpc("invite_administrator", json!({ "email": email }))
            .await
            .inspect_err(|e| tracing::error!("Error inviting {}: {}", email, e))?;
        tracing::info!("Administrator invitation sent to {}", email);
        Ok(())
    }

    pub async fn delete_admin(&self, user_id: &str) -> Result<()> {
        self.backend
            .delete(&Query::table(TABLE).eq("user_id", user_id))
            .await
            .inspect_err(|e| tracing::error!("Error deleting administrator {}: {}", user_id, e))
    }

    /// Grant or revoke administrative rights
    pub async fn set_admin_status(&self, user_id: &str, is_admin: bool) -> Result<()> {
        self.backend
            .update(
                &Query::table(TABLE).eq("user_id", user_id),
                json!({ "is_admin": is_admin }),
            )
            .await
            .inspect_err(|e| tracing::error!("Error updating administrator {}: {}", user_id, e))?;
        Ok(())
    }

    /// Validate an invitation token, then begin OAuth sign-in
    pub async fn accept_invitation(
        &self,
        access_token: &str,
        provider: OAuthProvider,
        redirect_to: Option<&str>,
    ) -> Result<OAuthSignIn> {
        let valid = self
            .backend
            .rpc("validate_token", json!({ "access_token": access_token }))
            .await?;
        if !is_truthy(&valid) {
            tracing::warn!("Rejected administrator invitation");
            return Err(SdkError::InvalidInvitation);
        }

        let url = self.backend.authorize_url(provider, redirect_to)?;
        Ok(OAuthSignIn {
            url,
            events: self.backend.subscribe(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{create_test_backend, MemoryBackend};
    use crate::models::{AuthUser, UserRole};
    use serde_json::Value;
    use std::sync::Arc;

    fn setup_test_service() -> (Arc<MemoryBackend>, AdministratorService) {
        let backend = create_test_backend();
        let service = AdministratorService::new(backend.clone());
        (backend, service)
    }

    fn sign_in(backend: &MemoryBackend, id: &str) {
        backend.sign_in(AuthUser {
            id: id.to_string(),
            email: None,
            role: None,
            user_metadata: Value::Null,
            created_at: None,
        });
    }

    #[tokio::test]
    async fn test_check_authorization_uses_current_user() {
        let (backend, service) = setup_test_service();
        sign_in(&backend, "user-7");
        backend.set_rpc_result("get_authorization", json!(true));

        assert!(service.check_authorization().await.unwrap());
        assert_eq!(
            backend.rpc_calls()[0],
            ("get_authorization".to_string(), json!({ "uid": "user-7" }))
        );
    }

    #[tokio::test]
    async fn test_check_authorization_error() {
        let (backend, service) = setup_test_service();
        sign_in(&backend, "user-7");
        backend.fail("rpc:get_authorization", "permission denied for function get_authorization");

        let err = service.check_authorization().await.unwrap_err();

        assert!(err.to_string().contains("permission denied"));
    }

    #[tokio::test]
    async fn test_get_admins_embeds_user() {
        let (backend, service) = setup_test_service();
        backend.seed(
            "users",
            vec![json!({ "id": "u1", "name": "Meera", "avatar_url": "https://cdn.example/m.png" })],
        );
        backend.seed(
            TABLE,
            vec![json!({
                "id": "u1",
                "user_id": "u1",
                "role": "certificate_reviewer",
                "is_admin": true,
                "created_at": "2024-04-02T08:00:00Z"
            })],
        );

        let admins = service.get_admins().await.unwrap();

        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].name, "Meera");
        assert_eq!(admins[0].avatar_url, "https://cdn.example/m.png");
        assert_eq!(admins[0].role, UserRole::CertificateReviewer);
    }

    #[tokio::test]
    async fn test_delete_and_set_status() {
        let (backend, service) = setup_test_service();
        backend.seed(
            TABLE,
            vec![
                json!({ "id": "a1", "user_id": "u1", "is_admin": true }),
                json!({ "id": "a2", "user_id": "u2", "is_admin": true }),
            ],
        );

        service.set_admin_status("u2", false).await.unwrap();
        service.delete_admin("u1").await.unwrap();

        let rows = backend.rows(TABLE);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["is_admin"], false);
    }

    #[tokio::test]
    async fn test_invite_admin() {
        let (backend, service) = setup_test_service();

        service.invite_admin("new.admin@example.com").await.unwrap();

        assert_eq!(
            backend.rpc_calls()[0].1,
            json!({ "email": "new.admin@example.com" })
        );
    }

    #[tokio::test]
    async fn test_accept_invitation() {
        let (backend, service) = setup_test_service();
        backend.set_rpc_result("validate_token", json!(true));

        let sign_in = service
            .accept_invitation("invite-token", OAuthProvider::Google, None)
            .await
            .unwrap();

        assert!(sign_in.url.contains("provider=google"));
    }

    #[tokio::test]
    async fn test_accept_invalid_invitation() {
        let (backend, service) = setup_test_service();
        backend.set_rpc_result("validate_token", json!(false));

        let err = service
            .accept_invitation("stale-token", OAuthProvider::Google, None)
            .await
            .unwrap_err();

        assert!(matches!(err, SdkError::InvalidInvitation));
        assert_eq!(err.to_string(), "Access token is expired or invalid");
    }
}
