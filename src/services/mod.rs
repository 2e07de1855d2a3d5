//! Services layer
//!
//! Each service wraps one area of the backend and maps raw rows into the
//! typed models:
//! - Initiatives (the `pages` table plus the content API)
//! - Comments, administrators, institutions and certificates
//! - Authentication
//! - Initiative statistics
//!
//! Operations issue a single remote call, except the statistics helpers which
//! fan out into independent counts.

pub mod administrator;
pub mod auth;
pub mod comment;
pub mod initiative;
pub mod institution;
pub mod stats;

pub use administrator::AdministratorService;
pub use auth::{AuthService, OAuthSignIn};
pub use comment::CommentService;
pub use initiative::InitiativeService;
pub use institution::InstitutionService;
pub use stats::{CountQuery, DateField, StatsService};

use crate::backend::DynBackend;
use crate::error::Result;

/// Id of the signed-in user
pub(crate) async fn current_user_id(backend: &DynBackend) -> Result<String> {
    Ok(backend.current_user().await?.id)
}

/// Truthiness of a stored procedure result
pub(crate) fn is_truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value;

    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
