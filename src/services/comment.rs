//! Comment service

use crate::backend::{DynBackend, Query};
use crate::error::{decode, decode_rows, Result, SdkError};
use crate::models::FileComment;

const TABLE: &str = "comments";

pub struct CommentService {
    backend: DynBackend,
}

impl CommentService {
    pub fn new(backend: DynBackend) -> Self {
        Self { backend }
    }

    /// Store a comment and return the stored row
    pub async fn create_comment(&self, comment: &FileComment) -> Result<FileComment> {
        let rows = self
            .backend
            .insert(TABLE, serde_json::Value::Array(vec![comment.to_row()]))
            .await
            .inspect_err(|e| tracing::error!("Error creating comment: {}", e))?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| SdkError::UnexpectedResponse("no comment returned".to_string()))?;
        decode("comment", row)
    }

    /// Comments of a page; empty when there are none
    pub async fn get_comments(&self, page_id: &str) -> Result<Vec<FileComment>> {
        let rows = self
            .backend
            .select(&Query::table(TABLE).eq("page_id", page_id))
            .await
            .inspect_err(|e| tracing::error!("Error fetching comments for {}: {}", page_id, e))?;
        decode_rows("comment", rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{create_test_backend, MemoryBackend};
    use serde_json::json;
    use std::sync::Arc;

    fn setup_test_service() -> (Arc<MemoryBackend>, CommentService) {
        let backend = create_test_backend();
        let service = CommentService::new(backend.clone());
        (backend, service)
    }

    #[tokio::test]
    async fn test_get_comments_empty_table() {
        let (_backend, service) = setup_test_service();

        let comments = service.get_comments("page-123").await.unwrap();

        assert!(comments.is_empty());
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let (backend, service) = setup_test_service();
        let comment = FileComment::new("page-123", "Inspiring work", Some("10.0.0.7".to_string()));

        let stored = service.create_comment(&comment).await.unwrap();
        assert_eq!(stored.id, comment.id);
        assert_eq!(stored.text, "Inspiring work");

        service
            .create_comment(&FileComment::new("page-456", "Elsewhere", None))
            .await
            .unwrap();

        let comments = service.get_comments("page-123").await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].ip_address.as_deref(), Some("10.0.0.7"));
        assert_eq!(backend.rows(TABLE).len(), 2);
    }

    #[tokio::test]
    async fn test_rows_map_field_for_field() {
        let (backend, service) = setup_test_service();
        backend.seed(
            TABLE,
            vec![json!({
                "id": "c1",
                "page_id": "page-1",
                "text": "Well documented",
                "time": "2024-05-01T12:30:00Z",
                "ip_address": null
            })],
        );

        let comments = service.get_comments("page-1").await.unwrap();

        assert_eq!(comments[0].id, "c1");
        assert_eq!(comments[0].time.to_rfc3339(), "2024-05-01T12:30:00+00:00");
        assert!(comments[0].ip_address.is_none());
    }

    #[tokio::test]
    async fn test_insert_error_is_propagated() {
        let (backend, service) = setup_test_service();
        backend.fail("insert:comments", "new row violates row-level security policy");

        let err = service
            .create_comment(&FileComment::new("page-1", "Hi", None))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("row-level security"));
    }
}
