//! Backend client layer
//!
//! The hosted backend exposes three services behind one base URL:
//! - table queries and stored procedures (PostgREST)
//! - auth (current user, OAuth sign-in, sign-out, user metadata)
//! - blob storage
//!
//! The `Backend` trait abstracts over them so services work with either the
//! REST implementation or the in-memory one used in tests.
//!
//! # Usage
//!
//! ```ignore
//! use esg_sdk::backend::{create_backend, Query};
//! use esg_sdk::config::BackendConfig;
//!
//! let backend = create_backend(&config.backend)?;
//! let rows = backend.select(&Query::table("pages").eq("status", "completed")).await?;
//! ```

pub mod auth;
pub mod memory;
pub mod query;
pub mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::BackendConfig;
use crate::error::Result;
use crate::models::{AuthUser, OAuthProvider, Session};

pub use auth::{AuthEvent, AuthState};
pub use memory::MemoryBackend;
pub use query::{Filter, FilterOp, Query};
pub use rest::RestBackend;

/// Options of a storage upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// `Cache-Control` max-age in seconds
    pub cache_control: u32,
    /// Overwrite an existing object
    pub upsert: bool,
    pub content_type: String,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            cache_control: 3600,
            upsert: false,
            content_type: "application/octet-stream".to_string(),
        }
    }
}

/// A stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// `bucket/path` key of the object
    #[serde(rename = "Key", alias = "key")]
    pub key: String,
}

/// Client contract of the hosted backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Rows matching the query
    async fn select(&self, query: &Query) -> Result<Vec<Value>>;

    /// Exact number of rows matching the query, without fetching them
    async fn count(&self, query: &Query) -> Result<u64>;

    /// Insert one row (object) or many (array), returning the stored rows
    async fn insert(&self, table: &str, rows: Value) -> Result<Vec<Value>>;

    /// Apply `changes` to every row matching the query, returning the updated rows
    async fn update(&self, query: &Query, changes: Value) -> Result<Vec<Value>>;

    /// Delete every row matching the query
    async fn delete(&self, query: &Query) -> Result<()>;

    /// Insert or merge on primary key, returning the stored rows
    async fn upsert(&self, table: &str, rows: Value) -> Result<Vec<Value>>;

    /// Call a stored procedure
    async fn rpc(&self, function: &str, params: Value) -> Result<Value>;

    /// The signed-in user
    async fn current_user(&self) -> Result<AuthUser>;

    /// URL the user opens to sign in with an OAuth provider
    fn authorize_url(&self, provider: OAuthProvider, redirect_to: Option<&str>) -> Result<String>;

    /// Adopt the session obtained from the OAuth redirect
    async fn set_session(&self, session: Session) -> Result<AuthUser>;

    async fn sign_out(&self) -> Result<()>;

    /// Replace the signed-in user's metadata
    async fn update_user(&self, data: Value) -> Result<AuthUser>;

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        body: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<StoredObject>;
}

/// Type alias for a shared backend handle
pub type DynBackend = Arc<dyn Backend>;

/// Create the REST backend from configuration
pub fn create_backend(config: &BackendConfig) -> Result<DynBackend> {
    let backend = RestBackend::new(config)?;
    tracing::info!("Backend client created for {}", config.url);
    Ok(Arc::new(backend))
}

/// Create an empty in-memory backend (useful for testing)
pub fn create_test_backend() -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::new())
}
