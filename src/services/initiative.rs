//! Initiative service

use serde_json::{json, Value};
use std::sync::Arc;

use crate::backend::{DynBackend, Query};
use crate::content::ContentClient;
use crate::error::{decode, decode_rows, Result, ResultExt, SdkError};
use crate::models::{
    CompositeFilter, CreateInitiativeInput, Directory, InitiativeContent, InitiativeModel,
};
use crate::services::{current_user_id, is_truthy};

const TABLE: &str = "pages";

pub struct InitiativeService {
    backend: DynBackend,
    content: Arc<ContentClient>,
}

impl InitiativeService {
    pub fn new(backend: DynBackend, content: Arc<ContentClient>) -> Self {
        Self { backend, content }
    }

    /// Every initiative
    pub async fn fetch_files(&self) -> Result<Vec<InitiativeModel>> {
        let rows = self
            .backend
            .select(&Query::table(TABLE))
            .await
            .inspect_err(|e| tracing::error!("Error fetching file models: {}", e))?;
        decode_rows("initiative", rows)
    }

    /// Initiatives whose field contains the filter key, case-insensitively.
    ///
    /// Without a filter the `name` field is searched for the empty string,
    /// which matches every row.
    pub async fn search_files(&self, filter: Option<&CompositeFilter>) -> Result<Vec<InitiativeModel>> {
        let filter = filter.cloned().unwrap_or_default();
        let query = Query::table(TABLE).ilike(filter.field_name.column(), filter.pattern());
        let rows = self
            .backend
            .select(&query)
            .await
            .inspect_err(|e| tracing::error!("Error searching file models: {}", e))?;
        decode_rows("initiative", rows)
    }

    /// Create an initiative and its document for the signed-in user
    pub async fn create_file(&self, input: CreateInitiativeInput) -> Result<bool> {
        let result = async {
            let user_id = current_user_id(&self.backend).await?;
            let data = self
                .backend
                .rpc("create_file", input.to_rpc_params(&user_id))
                .await?;
            Ok::<_, SdkError>(data.as_bool() == Some(true))
        }
        .await
        .context("File creation failed");

        if let Err(e) = &result {
            tracing::error!("Error creating initiative: {}", e);
        }
        result
    }

    /// Write an initiative's columns back and return the stored record
    pub async fn update_initiative(&self, initiative: &InitiativeModel) -> Result<InitiativeModel> {
        let rows = self
            .backend
            .update(&Query::table(TABLE).eq("id", &initiative.id), initiative.to_row())
            .await
            .inspect_err(|e| tracing::error!("Error updating initiative {}: {}", initiative.id, e))?;

        let row = rows.into_iter().next().ok_or_else(|| {
            SdkError::UnexpectedResponse(format!("initiative {} was not updated", initiative.id))
        })?;
        decode("initiative", row)
    }

    /// Delete an initiative together with its document
    pub async fn delete_file(&self, initiative: &InitiativeModel) -> Result<bool> {
        let params = json!({
            "file_id": initiative.id,
            "file_path": initiative.document_path(),
            "file_sha": initiative.sha,
        });
        let data: Value = self
            .backend
            .rpc("delete_file", params)
            .await
            .inspect_err(|e| tracing::error!("Error deleting file: {}", e))?;
        Ok(is_truthy(&data))
    }

    pub async fn get_file_content(
        &self,
        dir: Directory,
        initiative: &InitiativeModel,
    ) -> Result<InitiativeContent> {
        self.content.get_file_content(dir, initiative).await
    }

    pub async fn update_file(&self, content: &InitiativeContent) -> Result<bool> {
        self.content.update_file(content).await
    }
}
