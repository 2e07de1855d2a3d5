//! Shared HTTP plumbing for the reqwest-based clients

use std::time::Duration;

use serde_json::Value;

use crate::error::{Result, SdkError};

const USER_AGENT: &str = concat!("esg-sdk/", env!("CARGO_PKG_VERSION"));

/// Build an HTTP client with the SDK user agent and the given timeout
pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(SdkError::Transport)
}

/// Pull a human-readable message out of an error body.
///
/// PostgREST uses `message`, the auth service `msg` / `error_description`,
/// storage and most other services `error`.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Turn a non-success response into an error carrying the remote detail
pub(crate) async fn error_from_response(response: reqwest::Response) -> SdkError {
    let status = response.status().as_u16();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return SdkError::Transport(e),
    };

    match error_message(&body) {
        Some(message) => SdkError::Remote { message },
        None => SdkError::Status {
            status,
            message: body.trim().to_string(),
        },
    }
}

/// Return the response when successful, the remote error otherwise
pub(crate) async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(error_from_response(response).await)
    }
}

/// Join a base URL and a path without doubling slashes
pub(crate) fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_keys() {
        assert_eq!(
            error_message(r#"{"code":"23505","message":"duplicate key value"}"#).as_deref(),
            Some("duplicate key value")
        );
        assert_eq!(error_message(r#"{"msg":"Invalid JWT"}"#).as_deref(), Some("Invalid JWT"));
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Refresh token revoked"}"#)
                .as_deref(),
            Some("Refresh token revoked")
        );
        assert_eq!(error_message(r#"{"statusCode":"404","error":"Bucket not found"}"#).as_deref(), Some("Bucket not found"));
        assert_eq!(error_message("Internal Server Error"), None);
    }

    #[test]
    fn test_join() {
        assert_eq!(join("https://x.supabase.co/", "/rest/v1/pages"), "https://x.supabase.co/rest/v1/pages");
        assert_eq!(join("https://x.supabase.co", "auth/v1/user"), "https://x.supabase.co/auth/v1/user");
    }
}
