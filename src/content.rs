//! Content API client
//!
//! Initiative bodies live as `.mdx` documents in a git repository behind the
//! content API. Reads address a document by directory and initiative id,
//! writes by path and the blob sha being replaced.

use reqwest::StatusCode;
use serde_json::json;

use crate::config::ContentConfig;
use crate::error::{decode, Result, ResultExt, SdkError};
use crate::http;
use crate::models::{Directory, InitiativeContent, InitiativeModel};

pub struct ContentClient {
    client: reqwest::Client,
    url: String,
}

impl ContentClient {
    pub fn new(config: &ContentConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config.timeout_secs)?,
            url: config.url.trim_end_matches('/').to_string(),
        })
    }

    /// Raw body of an initiative's document
    pub async fn get_file_content(
        &self,
        dir: Directory,
        initiative: &InitiativeModel,
    ) -> Result<InitiativeContent> {
        let document = format!("{}/{}.mdx", dir, initiative.id);
        tracing::debug!("Fetching document {}", document);

        let result = async {
            let response = self
                .client
                .post(&self.url)
                .query(&[("get_content", document.as_str())])
                .send()
                .await?;
            let body = http::check(response).await?.json().await?;
            decode("document", body)
        }
        .await;

        if let Err(e) = &result {
            tracing::error!("Error fetching document {}: {}", document, e);
        }
        result
    }

    /// Replace a document's body; `true` when the API answered 200
    pub async fn update_file(&self, content: &InitiativeContent) -> Result<bool> {
        let path = format!("{}.mdx", content.path);
        tracing::debug!("Updating document {}", path);

        let result = async {
            let response = self
                .client
                .post(http::join(&self.url, "update"))
                .query(&[
                    ("type", "update"),
                    ("path", path.as_str()),
                    ("sha", content.sha.as_str()),
                ])
                .json(&json!({ "content": content.content }))
                .send()
                .await?;
            let response = http::check(response).await?;
            Ok::<_, SdkError>(response.status() == StatusCode::OK)
        }
        .await
        .context("File update failed");

        if let Err(e) = &result {
            tracing::error!("Error updating document {}: {}", path, e);
        }
        result
    }
}
