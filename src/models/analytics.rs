//! Analytics and statistics rows

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::serde_helpers;

/// Views recorded on a single day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewsByDateResponse {
    #[serde(deserialize_with = "serde_helpers::date")]
    pub date: NaiveDate,
    #[serde(deserialize_with = "serde_helpers::count")]
    pub views: u64,
}

/// Views recorded for a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewsByPageResponse {
    pub page_name: String,
    #[serde(deserialize_with = "serde_helpers::count")]
    pub views: u64,
}

/// Views recorded for a page from a city
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewsByCityAndPageResponse {
    pub city_name: String,
    pub page_name: String,
    #[serde(deserialize_with = "serde_helpers::count")]
    pub views: u64,
}

/// Initiatives created in one month of a year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerMonthInitiativeCount {
    /// 1 = January
    pub month: u32,
    pub initiative_count: u64,
}

/// Initiatives created and closed during one year
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerYearCreatedClosedInitiativeCount {
    pub closed_initiatives: u64,
    pub created_initiatives: u64,
}

/// Number of initiatives at a location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeCountByLocation {
    pub location_name: String,
    pub total_initiative_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_views_by_date_decode() {
        let rows: Vec<ViewsByDateResponse> = serde_json::from_value(json!([
            { "date": "20231212", "views": "31" },
            { "date": "2023-12-13", "views": 7 }
        ]))
        .unwrap();

        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2023, 12, 12).unwrap());
        assert_eq!(rows[0].views, 31);
        assert_eq!(rows[1].date, NaiveDate::from_ymd_opt(2023, 12, 13).unwrap());
        assert_eq!(rows[1].views, 7);
    }

    #[test]
    fn test_views_by_city_and_page_decode() {
        let row: ViewsByCityAndPageResponse = serde_json::from_value(json!({
            "city_name": "Mumbai",
            "page_name": "/environment/solar",
            "views": "12"
        }))
        .unwrap();

        assert_eq!(row.city_name, "Mumbai");
        assert_eq!(row.page_name, "/environment/solar");
        assert_eq!(row.views, 12);
    }
}
