//! Initiative model (rows of the remote `pages` table)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::serde_helpers::null_as_default;

/// Initiative progress status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitiativeStatus {
    Completed,
    Undergoing,
    Stopped,
    Delayed,
    Neverending,
}

impl Default for InitiativeStatus {
    fn default() -> Self {
        Self::Undergoing
    }
}

impl InitiativeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Undergoing => "undergoing",
            Self::Stopped => "stopped",
            Self::Delayed => "delayed",
            Self::Neverending => "neverending",
        }
    }
}

impl std::fmt::Display for InitiativeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InitiativeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "completed" => Ok(Self::Completed),
            "undergoing" => Ok(Self::Undergoing),
            "stopped" => Ok(Self::Stopped),
            "delayed" => Ok(Self::Delayed),
            "neverending" => Ok(Self::Neverending),
            _ => Err(format!("Invalid initiative status: {}", s)),
        }
    }
}

/// Content directory an initiative document lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Directory {
    Environment,
    Social,
    Governance,
}

impl Directory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::Social => "social",
            Self::Governance => "governance",
        }
    }
}

impl std::fmt::Display for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Directory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "environment" => Ok(Self::Environment),
            "social" => Ok(Self::Social),
            "governance" => Ok(Self::Governance),
            _ => Err(format!("Invalid directory: {}", s)),
        }
    }
}

/// An initiative record.
///
/// The completion date is stored in the `doc` column remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitiativeModel {
    pub id: String,
    /// Path of the document, without the `.mdx` extension
    pub path: String,
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: InitiativeStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_by: String,
    #[serde(rename = "doc", default)]
    pub date_of_completion: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

impl InitiativeModel {
    /// Columns written back to the `pages` table on update
    pub fn to_row(&self) -> Value {
        json!({
            "path": self.path,
            "closed_at": self.closed_at,
            "name": self.name,
            "id": self.id,
            "status": self.status,
            "created_at": self.created_at,
            "created_by": self.created_by,
            "doc": self.date_of_completion,
            "location": self.location,
            "description": self.description,
        })
    }

    /// Path of the backing document, including its extension
    pub fn document_path(&self) -> String {
        format!("{}.mdx", self.path)
    }

    /// A copy of this initiative with the given changes applied
    pub fn copy_with(&self, changes: UpdateInitiativeInput) -> Self {
        Self {
            id: changes.id.unwrap_or_else(|| self.id.clone()),
            path: changes.path.unwrap_or_else(|| self.path.clone()),
            name: changes.name.unwrap_or_else(|| self.name.clone()),
            kind: changes.kind.unwrap_or_else(|| self.kind.clone()),
            description: changes.description.or_else(|| self.description.clone()),
            status: changes.status.unwrap_or(self.status),
            created_at: changes.created_at.unwrap_or(self.created_at),
            created_by: changes.created_by.unwrap_or_else(|| self.created_by.clone()),
            date_of_completion: changes.date_of_completion.or(self.date_of_completion),
            location: changes.location.unwrap_or_else(|| self.location.clone()),
            sha: changes.sha.or_else(|| self.sha.clone()),
            updated_at: changes.updated_at.or(self.updated_at),
            closed_at: changes.closed_at.or(self.closed_at),
        }
    }
}

/// Partial changes for `InitiativeModel::copy_with`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInitiativeInput {
    pub id: Option<String>,
    pub path: Option<String>,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub description: Option<String>,
    pub status: Option<InitiativeStatus>,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub date_of_completion: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub sha: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Raw document body of an initiative.
///
/// Use an empty `sha` for a document that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeContent {
    #[serde(default)]
    pub sha: String,
    pub path: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub content: String,
}

/// Input for creating an initiative
#[derive(Debug, Clone)]
pub struct CreateInitiativeInput {
    pub dir: Directory,
    pub date_of_completion: DateTime<Utc>,
    /// Defaults to "India"
    pub location: Option<String>,
    pub description: Option<String>,
    pub content: String,
    pub initiative_name: Option<String>,
}

impl CreateInitiativeInput {
    pub fn new(dir: Directory, content: impl Into<String>, date_of_completion: DateTime<Utc>) -> Self {
        Self {
            dir,
            date_of_completion,
            location: None,
            description: None,
            content: content.into(),
            initiative_name: None,
        }
    }

    /// Parameters of the `create_file` procedure
    pub fn to_rpc_params(&self, user_id: &str) -> Value {
        json!({
            "body": self.content,
            "file_path": self.dir.as_str(),
            "i_name": self.initiative_name,
            "byuid": user_id,
            "date_oc": self.date_of_completion.to_rfc3339(),
            "loc": self.location.as_deref().unwrap_or("India"),
            "file_desc": self.description.as_deref().unwrap_or(""),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_row() -> Value {
        json!({
            "id": "5b0e6f3c-0c8a-4b0a-9d55-6c1f0b9ad001",
            "path": "environment/tree-plantation",
            "name": "Tree plantation",
            "type": "file",
            "description": "Planting 500 saplings",
            "status": "delayed",
            "created_at": "2024-01-05T10:00:00+00:00",
            "created_by": "user-1",
            "doc": "2024-06-30T00:00:00+00:00",
            "location": "Pune",
            "sha": "abc123",
            "updated_at": null,
            "closed_at": null
        })
    }

    #[test]
    fn test_decode_maps_every_field() {
        let model: InitiativeModel = serde_json::from_value(sample_row()).unwrap();

        assert_eq!(model.id, "5b0e6f3c-0c8a-4b0a-9d55-6c1f0b9ad001");
        assert_eq!(model.path, "environment/tree-plantation");
        assert_eq!(model.name, "Tree plantation");
        assert_eq!(model.kind, "file");
        assert_eq!(model.description.as_deref(), Some("Planting 500 saplings"));
        assert_eq!(model.status, InitiativeStatus::Delayed);
        assert_eq!(model.created_at, Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap());
        assert_eq!(model.created_by, "user-1");
        assert_eq!(model.date_of_completion, Some(Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap()));
        assert_eq!(model.location, "Pune");
        assert_eq!(model.sha.as_deref(), Some("abc123"));
        assert!(model.updated_at.is_none());
        assert!(model.closed_at.is_none());
    }

    #[test]
    fn test_decode_rejects_unknown_status() {
        let mut row = sample_row();
        row["status"] = json!("abandoned");
        assert!(serde_json::from_value::<InitiativeModel>(row).is_err());
    }

    #[test]
    fn test_to_row_uses_doc_column() {
        let model: InitiativeModel = serde_json::from_value(sample_row()).unwrap();
        let row = model.to_row();

        assert_eq!(row["doc"], json!(model.date_of_completion));
        assert_eq!(row["status"], json!("delayed"));
        assert!(row.get("date_of_completion").is_none());
        assert!(row.get("sha").is_none());
    }

    #[test]
    fn test_decode_tolerates_null_columns() {
        let mut row = sample_row();
        row["location"] = Value::Null;
        row["created_by"] = Value::Null;
        row["type"] = Value::Null;
        row["doc"] = Value::Null;

        let model: InitiativeModel = serde_json::from_value(row).unwrap();

        assert_eq!(model.location, "");
        assert_eq!(model.created_by, "");
        assert_eq!(model.kind, "");
        assert!(model.date_of_completion.is_none());
    }

    #[test]
    fn test_copy_with_overrides_only_given_fields() {
        let model: InitiativeModel = serde_json::from_value(sample_row()).unwrap();
        let closed = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();

        let updated = model.copy_with(UpdateInitiativeInput {
            status: Some(InitiativeStatus::Completed),
            closed_at: Some(closed),
            ..Default::default()
        });

        assert_eq!(updated.status, InitiativeStatus::Completed);
        assert_eq!(updated.closed_at, Some(closed));
        assert_eq!(updated.name, model.name);
        assert_eq!(updated.sha, model.sha);
        // The original is untouched
        assert_eq!(model.status, InitiativeStatus::Delayed);
    }

    #[test]
    fn test_status_parse_and_display() {
        for status in [
            InitiativeStatus::Completed,
            InitiativeStatus::Undergoing,
            InitiativeStatus::Stopped,
            InitiativeStatus::Delayed,
            InitiativeStatus::Neverending,
        ] {
            assert_eq!(status.to_string().parse::<InitiativeStatus>().unwrap(), status);
        }
        assert!("done".parse::<InitiativeStatus>().is_err());
    }

    #[test]
    fn test_create_params_defaults() {
        let doc = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let input = CreateInitiativeInput::new(Directory::Social, "# Body", doc);
        let params = input.to_rpc_params("user-9");

        assert_eq!(params["body"], "# Body");
        assert_eq!(params["file_path"], "social");
        assert_eq!(params["byuid"], "user-9");
        assert_eq!(params["loc"], "India");
        assert_eq!(params["file_desc"], "");
        assert_eq!(params["i_name"], Value::Null);
        assert_eq!(params["date_oc"], "2025-03-01T00:00:00+00:00");
    }
}
