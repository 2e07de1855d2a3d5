//! Analytics API client
//!
//! Every report is a `POST {url}?type=<report>` carrying the API key both as
//! an `apiKey` header and in the JSON body. Reports cover the last 30 days.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::fmt;

use crate::config::AnalyticsConfig;
use crate::error::{decode_rows, Result, ResultExt, SdkError};
use crate::http;
use crate::models::{ViewsByCityAndPageResponse, ViewsByDateResponse, ViewsByPageResponse};

/// Report selector of the analytics API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsReport {
    ViewsByDay,
    PerPageViews,
    ViewsByCityAndPage,
}

impl AnalyticsReport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewsByDay => "views-by-day",
            Self::PerPageViews => "per-page-views",
            Self::ViewsByCityAndPage => "views-by-city-and-page",
        }
    }

    /// Prefix of errors raised while fetching this report
    fn failure(&self) -> &'static str {
        match self {
            Self::ViewsByDay => "Failed to fetch views by date",
            Self::PerPageViews => "Failed to fetch per-page views",
            Self::ViewsByCityAndPage => "Failed to fetch views by city and page",
        }
    }
}

impl fmt::Display for AnalyticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct AnalyticsClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl AnalyticsClient {
    pub fn new(config: &AnalyticsConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config.timeout_secs)?,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Daily view counts
    pub async fn views_by_date(&self) -> Result<Vec<ViewsByDateResponse>> {
        self.report(AnalyticsReport::ViewsByDay).await
    }

    /// View counts per page
    pub async fn views_by_page(&self) -> Result<Vec<ViewsByPageResponse>> {
        self.report(AnalyticsReport::PerPageViews).await
    }

    /// View counts per page and visitor city
    pub async fn views_by_city_and_page(&self) -> Result<Vec<ViewsByCityAndPageResponse>> {
        self.report(AnalyticsReport::ViewsByCityAndPage).await
    }

    async fn report<T: DeserializeOwned>(&self, report: AnalyticsReport) -> Result<Vec<T>> {
        let result = self.fetch(report).await.context(report.failure());
        if let Err(e) = &result {
            tracing::error!("Analytics report {} failed: {}", report, e);
        }
        result
    }

    async fn fetch<T: DeserializeOwned>(&self, report: AnalyticsReport) -> Result<Vec<T>> {
        tracing::debug!("Fetching analytics report {}", report);
        let response = self
            .client
            .post(&self.url)
            .query(&[("type", report.as_str())])
            .header("apiKey", &self.api_key)
            .json(&json!({ "apiKey": self.api_key }))
            .send()
            .await?;
        let body: Value = http::check(response)
            .await?
            .json()
            .await
            .map_err(|_| SdkError::UnexpectedResponse("body is not JSON".to_string()))?;

        match body {
            Value::Array(rows) => decode_rows("analytics row", rows),
            _ => Err(SdkError::UnexpectedResponse(
                "expected a JSON array".to_string(),
            )),
        }
    }
}
