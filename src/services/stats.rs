//! Initiative statistics
//!
//! Counts over the `pages` table. Counting uses exact head-only requests, so
//! no rows are transferred; the per-month and per-year helpers fan out into
//! independent counts run concurrently.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use futures::future::try_join_all;
use std::collections::HashMap;
use std::fmt;

use crate::backend::{DynBackend, Query};
use crate::error::{Result, SdkError};
use crate::models::{
    InitiativeCountByLocation, InitiativeStatus, PerMonthInitiativeCount,
    PerYearCreatedClosedInitiativeCount,
};

const TABLE: &str = "pages";

/// Timestamp column an initiative count ranges over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateField {
    #[default]
    CreatedAt,
    UpdatedAt,
    ClosedAt,
    /// Date of completion
    Completion,
}

impl DateField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::ClosedAt => "closed_at",
            Self::Completion => "doc",
        }
    }
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Parameters of an initiative count.
///
/// Bounds are exclusive. `from` defaults to 1980-01-01T00:00:00Z and `to`
/// to the moment the count runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountQuery {
    pub status: Option<InitiativeStatus>,
    pub field: DateField,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl CountQuery {
    pub fn status(mut self, status: InitiativeStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn field(mut self, field: DateField) -> Self {
        self.field = field;
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    fn to_query(&self) -> Query {
        let from = self.from.unwrap_or_else(default_from);
        let to = self.to.unwrap_or_else(Utc::now);
        let column = self.field.column();

        let mut query = Query::table(TABLE);
        if let Some(status) = self.status {
            query = query.eq("status", status);
        }
        query
            .gt(column, timestamp(from))
            .lt(column, timestamp(to))
    }
}

fn default_from() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1980, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Midnight UTC on the first day of the month
fn month_start(year: i32, month: u32) -> Result<DateTime<Utc>> {
    let (year, month) = if month > 12 { (year.saturating_add(1), month - 12) } else { (year, month) };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| SdkError::InvalidArgument(format!("year {} is out of range", year)))
}

pub struct StatsService {
    backend: DynBackend,
}

impl StatsService {
    pub fn new(backend: DynBackend) -> Self {
        Self { backend }
    }

    /// Number of initiatives matching the query
    pub async fn count_initiatives(&self, query: &CountQuery) -> Result<u64> {
        self.backend
            .count(&query.to_query())
            .await
            .inspect_err(|e| tracing::error!("Error counting initiatives by {}: {}", query.field, e))
    }

    /// Initiatives with a status, created inside the range
    pub async fn count_by_status(
        &self,
        status: InitiativeStatus,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        self.count_initiatives(&CountQuery::default().status(status).between(from, to))
            .await
    }

    /// Initiatives created in each month of `year`
    pub async fn per_month_count(&self, year: i32) -> Result<Vec<PerMonthInitiativeCount>> {
        let mut queries = Vec::with_capacity(12);
        for month in 1..=12u32 {
            let query = CountQuery::default().between(month_start(year, month)?, month_start(year, month + 1)?);
            queries.push((month, query));
        }

        try_join_all(queries.iter().map(|(month, query)| async move {
            let initiative_count = self.count_initiatives(query).await?;
            Ok::<_, SdkError>(PerMonthInitiativeCount {
                month: *month,
                initiative_count,
            })
        }))
        .await
    }

    /// Initiatives created and closed during `year`
    pub async fn per_year_created_closed(&self, year: i32) -> Result<PerYearCreatedClosedInitiativeCount> {
        let from = month_start(year, 1)?;
        let to = month_start(year.saturating_add(1), 1)?;
        let created = CountQuery::default().between(from, to);
        let closed = CountQuery::default().field(DateField::ClosedAt).between(from, to);

        let (created_initiatives, closed_initiatives) =
            futures::try_join!(self.count_initiatives(&created), self.count_initiatives(&closed))?;

        Ok(PerYearCreatedClosedInitiativeCount {
            closed_initiatives,
            created_initiatives,
        })
    }

    /// Initiatives per location, most first
    pub async fn count_by_location(&self) -> Result<Vec<InitiativeCountByLocation>> {
        let rows = self
            .backend
            .select(&Query::table(TABLE).select("location"))
            .await
            .inspect_err(|e| tracing::error!("Error fetching initiative locations: {}", e))?;

        let mut tally: HashMap<String, u64> = HashMap::new();
        for row in &rows {
            if let Some(location) = row.get("location").and_then(|v| v.as_str()) {
                *tally.entry(location.to_string()).or_default() += 1;
            }
        }

        let mut counts: Vec<InitiativeCountByLocation> = tally
            .into_iter()
            .map(|(location_name, total_initiative_count)| InitiativeCountByLocation {
                location_name,
                total_initiative_count,
            })
            .collect();
        counts.sort_by(|a, b| {
            b.total_initiative_count
                .cmp(&a.total_initiative_count)
                .then_with(|| a.location_name.cmp(&b.location_name))
        });
        Ok(counts)
    }
}
