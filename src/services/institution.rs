//! Institution service
//!
//! Institutions, their certificates and the uploaded certificate documents.

use crate::backend::{DynBackend, Query, StoredObject, UploadOptions};
use crate::error::{decode, decode_rows, Result, ResultExt, SdkError};
use crate::models::{CertificateModel, InstitutionModel, RegisterInstitutionInput};
use crate::services::current_user_id;

const INSTITUTIONS: &str = "institutions";
const CERTIFICATES: &str = "certifications";

pub struct InstitutionService {
    backend: DynBackend,
}

impl InstitutionService {
    pub fn new(backend: DynBackend) -> Self {
        Self { backend }
    }

    pub async fn register_institution(&self, input: &RegisterInstitutionInput) -> Result<InstitutionModel> {
        let row = serde_json::to_value(input).map_err(|e| SdkError::decode("institution", e))?;
        let rows = self
            .backend
            .insert(INSTITUTIONS, row)
            .await
            .inspect_err(|e| tracing::error!("Error registering institution: {}", e))?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| SdkError::UnexpectedResponse("no institution returned".to_string()))?;
        decode("institution", row)
    }

    /// Institutions handled by the signed-in user
    pub async fn fetch_institutions(&self) -> Result<Vec<InstitutionModel>> {
        let result = async {
            let handler_id = current_user_id(&self.backend).await?;
            let rows = self
                .backend
                .select(&Query::table(INSTITUTIONS).eq("handler_id", handler_id))
                .await?;
            decode_rows("institution", rows)
        }
        .await
        .context("Error fetching institutions");

        if let Err(e) = &result {
            tracing::error!("{}", e);
        }
        result
    }

    pub async fn delete_institution(&self, institution_id: &str) -> Result<bool> {
        self.backend
            .delete(&Query::table(INSTITUTIONS).eq("id", institution_id))
            .await
            .inspect_err(|e| tracing::error!("Error deleting institution {}: {}", institution_id, e))?;
        Ok(true)
    }

    /// Store a batch of certificates in one request
    pub async fn add_certificates(&self, certificates: &[CertificateModel]) -> Result<bool> {
        let result = async {
            let rows = serde_json::to_value(certificates)
                .map_err(|e| SdkError::decode("certificate", e))?;
            let stored = self.backend.upsert(CERTIFICATES, rows).await?;
            if stored.is_empty() {
                return Err(SdkError::remote("Failed to add certificate to the database."));
            }
            Ok::<_, SdkError>(true)
        }
        .await
        .context("Error adding certificate");

        if let Err(e) = &result {
            tracing::error!("{}", e);
        }
        result
    }

    pub async fn remove_certificate(&self, certificate_id: &str) -> Result<()> {
        let result = self
            .backend
            .delete(&Query::table(CERTIFICATES).eq("id", certificate_id))
            .await
            .context("Error removing certificate");

        if let Err(e) = &result {
            tracing::error!("{}", e);
        }
        result
    }

    /// Upload a certificate document without overwriting an existing one
    pub async fn upload_document(&self, bucket: &str, name: &str, body: Vec<u8>) -> Result<StoredObject> {
        let options = UploadOptions::default();
        self.backend
            .upload(bucket, name, body, &options)
            .await
            .inspect_err(|e| tracing::error!("Error uploading {} to {}: {}", name, bucket, e))
    }
}
