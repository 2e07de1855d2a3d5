//! Administrator model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role granted to a user of the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Full system privileges
    SuperAdmin,
    /// Reviews initiatives
    InitiativeReviewer,
    /// Reviews certificates
    CertificateReviewer,
    Institution,
    Corporate,
    /// Writes initiatives
    InitiativeWriter,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::InitiativeReviewer => "initiative_reviewer",
            Self::CertificateReviewer => "certificate_reviewer",
            Self::Institution => "institution",
            Self::Corporate => "corporate",
            Self::InitiativeWriter => "initiative_writer",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "super_admin" => Ok(Self::SuperAdmin),
            "initiative_reviewer" => Ok(Self::InitiativeReviewer),
            "certificate_reviewer" => Ok(Self::CertificateReviewer),
            "institution" => Ok(Self::Institution),
            "corporate" => Ok(Self::Corporate),
            "initiative_writer" => Ok(Self::InitiativeWriter),
            _ => Err(format!("Invalid user role: {}", s)),
        }
    }
}

/// A privileged user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Administrator {
    pub id: String,
    pub name: String,
    pub avatar_url: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Row of `administrators` joined with its `users` record
#[derive(Debug, Deserialize)]
pub(crate) struct AdministratorRow {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub role: UserRole,
    pub user: AdministratorUser,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdministratorUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar_url: String,
}

impl From<AdministratorRow> for Administrator {
    fn from(row: AdministratorRow) -> Self {
        Self {
            id: row.id,
            name: row.user.name,
            avatar_url: row.user.avatar_url,
            role: row.role,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_roundtrip() {
        for role in [
            UserRole::SuperAdmin,
            UserRole::InitiativeReviewer,
            UserRole::CertificateReviewer,
            UserRole::Institution,
            UserRole::Corporate,
            UserRole::InitiativeWriter,
        ] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
            assert_eq!(serde_json::to_value(role).unwrap(), json!(role.as_str()));
        }
        assert!("admin".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_row_flattens_embedded_user() {
        let row: AdministratorRow = serde_json::from_value(json!({
            "id": "adm-1",
            "created_at": "2024-02-01T09:00:00Z",
            "role": "initiative_reviewer",
            "is_admin": true,
            "user": { "name": "Asha", "avatar_url": "https://cdn/a.png" }
        }))
        .unwrap();

        let admin = Administrator::from(row);
        assert_eq!(admin.id, "adm-1");
        assert_eq!(admin.name, "Asha");
        assert_eq!(admin.avatar_url, "https://cdn/a.png");
        assert_eq!(admin.role, UserRole::InitiativeReviewer);
    }
}
