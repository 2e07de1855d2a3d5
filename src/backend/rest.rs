//! REST backend over reqwest
//!
//! Talks to the hosted backend's HTTP services:
//! - `{url}/rest/v1/{table}` and `{url}/rest/v1/rpc/{function}` (PostgREST)
//! - `{url}/auth/v1/...` (auth)
//! - `{url}/storage/v1/object/{bucket}/{path}` (storage)

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::RequestBuilder;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use super::{AuthEvent, AuthState, Backend, Query, StoredObject, UploadOptions};
use crate::config::{BackendConfig, ConfigError};
use crate::error::{decode, Result, SdkError};
use crate::http;
use crate::models::{AuthUser, OAuthProvider, Session};

const PREFER: &str = "Prefer";

pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    auth: AuthState,
}

impl RestBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config.timeout_secs)?,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            auth: AuthState::new(),
        })
    }

    fn rest_url(&self, path: &str) -> String {
        http::join(&self.base_url, &format!("rest/v1/{}", path))
    }

    fn auth_url(&self, path: &str) -> String {
        http::join(&self.base_url, &format!("auth/v1/{}", path))
    }

    /// Attach the API key and the bearer token (session token when signed in)
    async fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let token = self
            .auth
            .access_token()
            .await
            .unwrap_or_else(|| self.api_key.clone());
        builder.header("apikey", &self.api_key).bearer_auth(token)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let response = self.authorized(builder).await.send().await?;
        http::check(response).await
    }

    async fn user_with_token(&self, token: &str) -> Result<AuthUser> {
        let response = self
            .client
            .get(self.auth_url("user"))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await?;
        let body: Value = http::check(response).await?.json().await?;
        decode("user", body)
    }
}

/// Normalize a PostgREST representation into a list of rows
async fn rows(response: reqwest::Response) -> Result<Vec<Value>> {
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(&text).map_err(|e| SdkError::decode("rows", e))?;
    match value {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        Value::Object(_) => Ok(vec![value]),
        other => Err(SdkError::UnexpectedResponse(format!(
            "expected rows, got {}",
            other
        ))),
    }
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`
pub(crate) fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

/// Encode each segment of an object path, keeping the separators
fn encode_object_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl Backend for RestBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        tracing::debug!("select {} {:?}", query.table_name(), query.filters());
        let builder = self
            .client
            .get(self.rest_url(query.table_name()))
            .query(&query.to_params());
        rows(self.send(builder).await?).await
    }

    async fn count(&self, query: &Query) -> Result<u64> {
        tracing::debug!("count {} {:?}", query.table_name(), query.filters());
        let builder = self
            .client
            .head(self.rest_url(query.table_name()))
            .query(&query.to_params())
            .header(PREFER, "count=exact");
        let response = self.send(builder).await?;

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| SdkError::UnexpectedResponse("missing exact count".to_string()))
    }

    async fn insert(&self, table: &str, rows_value: Value) -> Result<Vec<Value>> {
        tracing::debug!("insert into {}", table);
        let builder = self
            .client
            .post(self.rest_url(table))
            .header(PREFER, "return=representation")
            .json(&rows_value);
        rows(self.send(builder).await?).await
    }

    async fn update(&self, query: &Query, changes: Value) -> Result<Vec<Value>> {
        tracing::debug!("update {} {:?}", query.table_name(), query.filters());
        let builder = self
            .client
            .patch(self.rest_url(query.table_name()))
            .query(&query.filter_params())
            .header(PREFER, "return=representation")
            .json(&changes);
        rows(self.send(builder).await?).await
    }

    async fn delete(&self, query: &Query) -> Result<()> {
        tracing::debug!("delete from {} {:?}", query.table_name(), query.filters());
        let builder = self
            .client
            .delete(self.rest_url(query.table_name()))
            .query(&query.filter_params());
        self.send(builder).await?;
        Ok(())
    }

    async fn upsert(&self, table: &str, rows_value: Value) -> Result<Vec<Value>> {
        tracing::debug!("upsert into {}", table);
        let builder = self
            .client
            .post(self.rest_url(table))
            .header(PREFER, "resolution=merge-duplicates,return=representation")
            .json(&rows_value);
        rows(self.send(builder).await?).await
    }

    async fn rpc(&self, function: &str, params: Value) -> Result<Value> {
        tracing::debug!("rpc {}", function);
        let builder = self
            .client
            .post(self.rest_url(&format!("rpc/{}", function)))
            .json(&params);
        let text = self.send(builder).await?.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| SdkError::decode("procedure result", e))
    }

    async fn current_user(&self) -> Result<AuthUser> {
        let token = self.auth.access_token().await.ok_or(SdkError::NotSignedIn)?;
        self.user_with_token(&token).await
    }

    fn authorize_url(&self, provider: OAuthProvider, redirect_to: Option<&str>) -> Result<String> {
        let mut params = vec![("provider", provider.as_str())];
        if let Some(redirect_to) = redirect_to {
            params.push(("redirect_to", redirect_to));
        }
        reqwest::Url::parse_with_params(&self.auth_url("authorize"), &params)
            .map(|url| url.to_string())
            .map_err(|e| {
                SdkError::Config(ConfigError::ValidationError(format!(
                    "invalid backend url '{}': {}",
                    self.base_url, e
                )))
            })
    }

    async fn set_session(&self, session: Session) -> Result<AuthUser> {
        let user = self.user_with_token(&session.access_token).await?;
        self.auth.set_session(Some(session.clone())).await;
        self.auth.emit(AuthEvent::SignedIn {
            session,
            user: user.clone(),
        });
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        if let Some(token) = self.auth.access_token().await {
            let revoked = async {
                let response = self
                    .client
                    .post(self.auth_url("logout"))
                    .header("apikey", &self.api_key)
                    .bearer_auth(token)
                    .send()
                    .await?;
                http::check(response).await.map(|_| ())
            }
            .await;
            if let Err(e) = revoked {
                // The local session is dropped regardless
                tracing::warn!("Failed to revoke session: {}", e);
            }
        }
        self.auth.set_session(None).await;
        self.auth.emit(AuthEvent::SignedOut);
        Ok(())
    }

    async fn update_user(&self, data: Value) -> Result<AuthUser> {
        let token = self.auth.access_token().await.ok_or(SdkError::NotSignedIn)?;
        let response = self
            .client
            .put(self.auth_url("user"))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .json(&json!({ "data": data }))
            .send()
            .await?;
        let body: Value = http::check(response).await?.json().await?;
        let user: AuthUser = decode("user", body)?;
        self.auth.emit(AuthEvent::UserUpdated(user.clone()));
        Ok(user)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth.subscribe()
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        body: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<StoredObject> {
        tracing::debug!("upload {}/{} ({} bytes)", bucket, path, body.len());
        let url = http::join(
            &self.base_url,
            &format!(
                "storage/v1/object/{}/{}",
                urlencoding::encode(bucket),
                encode_object_path(path)
            ),
        );
        let content_type = HeaderValue::from_str(&options.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
        let builder = self
            .client
            .post(url)
            .header(CACHE_CONTROL, format!("max-age={}", options.cache_control))
            .header("x-upsert", options.upsert.to_string())
            .header(CONTENT_TYPE, content_type)
            .body(body);
        let body: Value = self.send(builder).await?.json().await?;
        decode("stored object", body)
    }
}
