//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A comment attached to an initiative page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileComment {
    pub id: String,
    pub page_id: String,
    pub text: String,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub ip_address: Option<String>,
}

impl FileComment {
    /// A new comment with a fresh id, timestamped now
    pub fn new(page_id: impl Into<String>, text: impl Into<String>, ip_address: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            page_id: page_id.into(),
            text: text.into(),
            time: Utc::now(),
            ip_address,
        }
    }

    /// Columns inserted into the `comments` table
    pub fn to_row(&self) -> Value {
        json!({
            "ip_address": self.ip_address,
            "text": self.text,
            "id": self.id,
            "time": self.time,
            "page_id": self.page_id,
        })
    }
}
