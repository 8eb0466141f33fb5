//! Reports API definitions.

use axum::{extract::Query, routing::get, Json, Router};
use axum_extra::extract::WithRejection;
use common::DateTime;
use serde::Deserialize;
use serde_json::Value;
use service::{
    domain::{client, project, quote, text::Line},
    query::{self, Query as _},
    read,
};

use crate::{
    api::{self, QueryOf},
    AsError, Context, Error,
};

/// Builds the [`Router`] of the reports API.
pub fn router() -> Router {
    Router::new()
        .route("/clients", get(clients))
        .route("/projects", get(projects))
        .route("/quotes", get(quotes))
        .route("/materials", get(materials))
        .route("/financial", get(financial))
}

/// Activity state of reported clients.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    /// Only active clients.
    Active,

    /// Only inactive clients.
    Inactive,
}

/// Query parameters of a [`clients`] report request.
#[derive(Debug, Default, Deserialize)]
pub struct ClientsParams {
    /// First day of the reported period.
    pub start_date: Option<DateTime>,

    /// Last day of the reported period, inclusive.
    pub end_date: Option<DateTime>,

    /// [`Activity`] to filter by.
    pub status: Option<Activity>,
}

/// Reports clients created within a period along with their activity.
pub async fn clients(
    ctx: Context,
    WithRejection(Query(params), _): QueryOf<ClientsParams>,
) -> Result<Json<Value>, Error> {
    let ClientsParams {
        start_date,
        end_date,
        status,
    } = params;

    let report = ctx
        .service()
        .execute(query::report::Clients(read::client::report::Filter {
            period: read::Period::between(start_date, end_date, DateTime::now()),
            active: status.map(|s| s == Activity::Active),
        }))
        .await
        .map_err(AsError::into_error)?;

    api::to_json(&report).map(Json)
}

/// Query parameters of a [`projects`] report request.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectsParams {
    /// First day of the reported period.
    pub start_date: Option<DateTime>,

    /// Last day of the reported period, inclusive.
    pub end_date: Option<DateTime>,

    /// [`project::Status`] to filter by.
    pub status: Option<project::Status>,

    /// ID of the client to filter by.
    pub client_id: Option<client::Id>,
}

/// Reports projects created within a period along with their costs.
pub async fn projects(
    ctx: Context,
    WithRejection(Query(params), _): QueryOf<ProjectsParams>,
) -> Result<Json<Value>, Error> {
    let ProjectsParams {
        start_date,
        end_date,
        status,
        client_id,
    } = params;

    let report = ctx
        .service()
        .execute(query::report::Projects(read::project::report::Filter {
            period: read::Period::between(start_date, end_date, DateTime::now()),
            status,
            client_id,
        }))
        .await
        .map_err(AsError::into_error)?;

    api::to_json(&report).map(Json)
}

/// Query parameters of a [`quotes`] report request.
#[derive(Debug, Default, Deserialize)]
pub struct QuotesParams {
    /// First day of the reported period.
    pub start_date: Option<DateTime>,

    /// Last day of the reported period, inclusive.
    pub end_date: Option<DateTime>,

    /// [`quote::Status`] to filter by.
    pub status: Option<quote::Status>,

    /// ID of the client to filter by.
    pub client_id: Option<client::Id>,
}

/// Reports quotes created within a period along with their conversion.
pub async fn quotes(
    ctx: Context,
    WithRejection(Query(params), _): QueryOf<QuotesParams>,
) -> Result<Json<Value>, Error> {
    let QuotesParams {
        start_date,
        end_date,
        status,
        client_id,
    } = params;

    let report = ctx
        .service()
        .execute(query::report::Quotes(read::quote::report::Filter {
            period: read::Period::between(start_date, end_date, DateTime::now()),
            status,
            client_id,
        }))
        .await
        .map_err(AsError::into_error)?;

    api::to_json(&report).map(Json)
}

/// Query parameters of a [`materials`] report request.
#[derive(Debug, Default, Deserialize)]
pub struct MaterialsParams {
    /// Category to filter by.
    pub category: Option<String>,

    /// Whether to report only materials at or below their minimum stock.
    #[serde(default)]
    pub low_stock: bool,
}

/// Reports the inventory grouped by category.
pub async fn materials(
    ctx: Context,
    WithRejection(Query(params), _): QueryOf<MaterialsParams>,
) -> Result<Json<Value>, Error> {
    let MaterialsParams {
        category,
        low_stock,
    } = params;

    let report = ctx
        .service()
        .execute(query::report::Materials(read::material::report::Filter {
            category: category.and_then(Line::new),
            low_stock,
        }))
        .await
        .map_err(AsError::into_error)?;

    api::to_json(&report).map(Json)
}

/// Query parameters of a [`financial`] report request.
#[derive(Debug, Default, Deserialize)]
pub struct FinancialParams {
    /// First day of the reported period.
    pub start_date: Option<DateTime>,

    /// Last day of the reported period, inclusive.
    pub end_date: Option<DateTime>,
}

/// Reports revenue, costs and profit within a period, the last month by
/// default.
pub async fn financial(
    ctx: Context,
    WithRejection(Query(params), _): QueryOf<FinancialParams>,
) -> Result<Json<Value>, Error> {
    let FinancialParams {
        start_date,
        end_date,
    } = params;

    let report = ctx
        .service()
        .execute(query::report::Financial {
            start: start_date,
            end: end_date,
        })
        .await
        .map_err(AsError::into_error)?;

    api::to_json(&report).map(Json)
}

#[cfg(test)]
mod spec {
    use super::{Activity, ClientsParams};

    #[test]
    fn parses_client_activity() {
        let params: ClientsParams = serde_json::from_str(
            r#"{"start_date": "2024-03-01", "status": "inactive"}"#,
        )
        .unwrap();

        assert_eq!(params.status, Some(Activity::Inactive));
        assert!(params.start_date.is_some());
        assert!(params.end_date.is_none());
    }
}
