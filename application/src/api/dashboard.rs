//! Dashboard API definitions.

use axum::{extract::Query, routing::get, Json, Router};
use axum_extra::extract::WithRejection;
use common::pagination::MAX_LIMIT;
use serde::Deserialize;
use serde_json::{json, Value};
use service::{
    query::{self, Query as _},
    read::activity::Recent,
};

use crate::{
    api::{self, QueryOf},
    AsError, Context, Error,
};

/// Builds the [`Router`] of the dashboard API.
pub fn router() -> Router {
    Router::new()
        .route("/stats", get(stats))
        .route("/recent-activity", get(recent_activity))
        .route("/projects-by-status", get(projects_by_status))
        .route("/monthly-revenue", get(monthly_revenue))
        .route("/upcoming-deadlines", get(upcoming_deadlines))
        .route("/financial-summary", get(financial_summary))
}

/// Returns the overview of the whole business.
pub async fn stats(ctx: Context) -> Result<Json<Value>, Error> {
    let stats = ctx
        .service()
        .execute(query::dashboard::Overview)
        .await
        .map_err(AsError::into_error)?;

    api::to_json(&stats).map(Json)
}

/// Query parameters of a [`recent_activity`] request.
#[derive(Debug, Default, Deserialize)]
pub struct ActivityParams {
    /// Number of entries to return.
    ///
    /// Unparsable or non-positive values fall back to the default.
    pub limit: Option<String>,
}

impl ActivityParams {
    /// Converts these [`ActivityParams`] into a [`Recent`] selector.
    fn recent(&self) -> Recent {
        self.limit
            .as_deref()
            .and_then(|l| l.trim().parse::<u32>().ok())
            .filter(|l| *l > 0)
            .map_or_else(Recent::default, |limit| Recent {
                limit: limit.min(MAX_LIMIT),
            })
    }
}

/// Returns the merged feed of the most recent events.
pub async fn recent_activity(
    ctx: Context,
    WithRejection(Query(params), _): QueryOf<ActivityParams>,
) -> Result<Json<Value>, Error> {
    let activities = ctx
        .service()
        .execute(query::dashboard::RecentActivity(params.recent()))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(json!({
        "count": activities.len(),
        "activities": api::to_json(&activities)?,
    })))
}

/// Returns the number of projects per status.
pub async fn projects_by_status(ctx: Context) -> Result<Json<Value>, Error> {
    let data = ctx
        .service()
        .execute(query::dashboard::ProjectsByStatus)
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(json!({ "data": api::to_json(&data)? })))
}

/// Returns the accepted quotes revenue of the last 12 months.
pub async fn monthly_revenue(ctx: Context) -> Result<Json<Value>, Error> {
    let data = ctx
        .service()
        .execute(query::dashboard::MonthlyRevenue)
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(json!({ "data": api::to_json(&data)? })))
}

/// Returns the ongoing projects due within the next 30 days.
pub async fn upcoming_deadlines(ctx: Context) -> Result<Json<Value>, Error> {
    let projects = ctx
        .service()
        .execute(query::dashboard::UpcomingDeadlines)
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(json!({
        "count": projects.len(),
        "projects": api::to_json(&projects)?,
    })))
}

/// Compares the revenue of the current month with the previous one.
pub async fn financial_summary(ctx: Context) -> Result<Json<Value>, Error> {
    let summary = ctx
        .service()
        .execute(query::dashboard::FinancialSummary)
        .await
        .map_err(AsError::into_error)?;

    api::to_json(&summary).map(Json)
}

#[cfg(test)]
mod spec {
    use super::ActivityParams;

    fn limit(raw: Option<&str>) -> u32 {
        ActivityParams {
            limit: raw.map(ToOwned::to_owned),
        }
        .recent()
        .limit
    }

    #[test]
    fn defaults_to_ten_entries() {
        assert_eq!(limit(None), 10);
        assert_eq!(limit(Some("abc")), 10);
        assert_eq!(limit(Some("0")), 10);
    }

    #[test]
    fn caps_requested_entries() {
        assert_eq!(limit(Some("7")), 7);
        assert_eq!(limit(Some("5000")), 100);
    }
}
