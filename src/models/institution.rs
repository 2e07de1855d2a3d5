//! Institution and certificate models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::serde_helpers;

/// A registered organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionModel {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub city: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "serde_helpers::optional_date")]
    pub established_in: Option<NaiveDate>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub employee_size: Option<i64>,
    /// User handling the institution
    #[serde(default)]
    pub handler_id: Option<String>,
}

/// Input for registering an institution
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterInstitutionInput {
    /// Generated by the backend when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub city: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub established_in: Option<NaiveDate>,
    pub website: Option<String>,
    pub employee_size: Option<i64>,
    pub handler_id: Option<String>,
}

impl RegisterInstitutionInput {
    pub fn new(name: impl Into<String>, city: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            city: city.into(),
            email: email.into(),
            ..Default::default()
        }
    }
}

/// Certificate held by an institution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateModel {
    pub id: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    pub institution_id: String,
    pub name: String,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub uri: Option<String>,
}

impl CertificateModel {
    pub fn new(id: impl Into<String>, institution_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            institution_id: institution_id.into(),
            name: name.into(),
            valid_until: None,
            uri: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_institution_decode() {
        let institution: InstitutionModel = serde_json::from_value(json!({
            "id": "inst-1",
            "created_at": "2024-03-10T12:00:00Z",
            "name": "Green School",
            "city": "Nagpur",
            "email": "office@green.edu",
            "phone_number": null,
            "address": "12 Ring Road",
            "established_in": "1998-07-01",
            "website": "https://green.edu",
            "employee_size": 120,
            "handler_id": "user-7"
        }))
        .unwrap();

        assert_eq!(institution.name, "Green School");
        assert_eq!(institution.city, "Nagpur");
        assert_eq!(institution.phone_number, None);
        assert_eq!(institution.address.as_deref(), Some("12 Ring Road"));
        assert_eq!(institution.established_in, NaiveDate::from_ymd_opt(1998, 7, 1));
        assert_eq!(institution.employee_size, Some(120));
        assert_eq!(institution.handler_id.as_deref(), Some("user-7"));
    }

    #[test]
    fn test_institution_optional_fields_absent() {
        let institution: InstitutionModel = serde_json::from_value(json!({
            "id": "inst-2",
            "created_at": "2024-03-10T12:00:00Z",
            "name": "Blue Corp",
            "city": "Delhi",
            "email": "hi@blue.example"
        }))
        .unwrap();

        assert!(institution.established_in.is_none());
        assert!(institution.website.is_none());
        assert!(institution.handler_id.is_none());
    }

    #[test]
    fn test_register_input_omits_missing_id() {
        let input = RegisterInstitutionInput::new("Green School", "Nagpur", "office@green.edu");
        let value = serde_json::to_value(&input).unwrap();

        assert!(value.get("id").is_none());
        assert_eq!(value["name"], "Green School");
        assert_eq!(value["established_in"], serde_json::Value::Null);
    }

    #[test]
    fn test_certificate_defaults_created_at() {
        let before = Utc::now();
        let certificate: CertificateModel = serde_json::from_value(json!({
            "id": "cert-1",
            "institution_id": "inst-1",
            "name": "ISO 14001"
        }))
        .unwrap();

        assert!(certificate.created_at >= before);
        assert!(certificate.valid_until.is_none());
        assert!(certificate.uri.is_none());
    }
}
