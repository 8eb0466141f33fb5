//! HTTP JSON API definitions.

pub mod admin;
pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod invoices;
pub mod materials;
pub mod projects;
pub mod quotes;
pub mod reports;

use axum::{
    extract::{Path, Query},
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use common::pagination::{Arguments, Page};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{define_error, Error};

/// Name of this API.
pub const NAME: &str = "Construction CRM API";

/// [`Path`] extractor rejecting with an [`Error`].
pub type PathOf<T> = WithRejection<Path<T>, Error>;

/// [`Query`] extractor rejecting with an [`Error`].
pub type QueryOf<T> = WithRejection<Query<T>, Error>;

/// [`Json`] extractor rejecting with an [`Error`].
pub type JsonOf<T> = WithRejection<Json<T>, Error>;

/// Builds the [`Router`] of all the versioned API routes.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/clients", clients::router())
        .nest("/projects", projects::router())
        .nest("/quotes", quotes::router())
        .nest("/materials", materials::router())
        .nest("/invoices", invoices::router())
        .nest("/reports", reports::router())
        .nest("/dashboard", dashboard::router())
        .nest("/admin", admin::router())
}

/// Builds the [`Router`] of the whole HTTP server: the versioned API under
/// `/api/v1` along with the public health and info endpoints.
#[must_use]
pub fn app() -> Router {
    Router::new()
        .nest("/api/v1", router())
        .route("/health", get(health))
        .route("/api/info", get(info))
}

/// Reports the liveness of the server.
#[expect(clippy::unused_async, reason = "`async` is required by `axum`")]
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Describes this API and its entry points.
#[expect(clippy::unused_async, reason = "`async` is required by `axum`")]
pub async fn info() -> Json<Value> {
    Json(json!({
        "name": NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "description": "API of the construction business CRM",
        "endpoints": {
            "auth": "/api/v1/auth",
            "clients": "/api/v1/clients",
            "projects": "/api/v1/projects",
            "quotes": "/api/v1/quotes",
            "invoices": "/api/v1/invoices",
            "materials": "/api/v1/materials",
            "reports": "/api/v1/reports",
            "dashboard": "/api/v1/dashboard",
            "admin": "/api/v1/admin",
        },
    }))
}

/// Pagination part of a list request.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct Pagination {
    /// 1-indexed number of the requested page.
    pub page: Option<u32>,

    /// Number of items per page.
    pub limit: Option<u32>,
}

impl From<Pagination> for Arguments {
    fn from(p: Pagination) -> Self {
        Self::new(p.page, p.limit)
    }
}

/// Serializes the provided `value` into a JSON [`Value`].
///
/// # Errors
///
/// Errors if the `value` cannot be represented as JSON.
pub fn to_json(value: &impl Serialize) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(|e| Error::internal(&e))
}

/// Renders a response of a mutation: `{"message": .., "<key>": ..}`.
///
/// # Errors
///
/// Errors if the `value` cannot be represented as JSON.
pub fn mutated(
    message: &str,
    key: &str,
    value: &impl Serialize,
) -> Result<Json<Value>, Error> {
    let mut body = Map::new();
    _ = body.insert("message".to_owned(), Value::from(message));
    _ = body.insert(key.to_owned(), to_json(value)?);
    Ok(Json(Value::Object(body)))
}

/// Renders a response of a list request:
/// `{"<key>": [..], "total", "page", "limit", "pages"}`.
///
/// # Errors
///
/// Errors if the items cannot be represented as JSON.
pub fn listed<T: Serialize>(
    key: &str,
    page: &Page<T>,
) -> Result<Json<Value>, Error> {
    let mut body = Map::new();
    _ = body.insert(key.to_owned(), to_json(&page.items)?);
    _ = body.insert("total".to_owned(), Value::from(page.total));
    _ = body.insert("page".to_owned(), Value::from(page.arguments.page()));
    _ = body.insert("limit".to_owned(), Value::from(page.arguments.limit()));
    _ = body.insert("pages".to_owned(), Value::from(page.pages()));
    Ok(Json(Value::Object(body)))
}

/// Renders a plain `{"message": ..}` response.
#[must_use]
pub fn message(message: &str) -> Json<Value> {
    Json(json!({ "message": message }))
}

define_error! {
    enum NotFound {
        #[code = "CLIENT_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Client not found"]
        Client,

        #[code = "PROJECT_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Project not found"]
        Project,

        #[code = "QUOTE_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Quote not found"]
        Quote,

        #[code = "MATERIAL_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Material not found"]
        Material,

        #[code = "INVOICE_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Invoice not found"]
        Invoice,

        #[code = "USER_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "User not found"]
        User,
    }
}

#[cfg(test)]
mod spec {
    use axum::{
        body::{to_bytes, Body},
        Extension,
    };
    use common::pagination::{Arguments, Page};
    use serde_json::Value;
    use service::infra::{postgres, Postgres};
    use tower::ServiceExt as _;

    use crate::{config, Service};

    use super::{app, listed};

    fn service() -> Service {
        let db = Postgres::new(&postgres::Config::from(
            config::Postgres::default(),
        ))
        .unwrap();
        Service::new(config::Service::default().into(), db)
    }

    async fn call(uri: &str, token: Option<&str>) -> (http::StatusCode, Value) {
        let mut req = http::Request::builder().uri(uri);
        if let Some(token) = token {
            req = req.header(http::header::AUTHORIZATION, token);
        }
        let resp = app()
            .layer(Extension(service()))
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn health_is_public() {
        let (status, body) = call("/health", None).await;

        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn requires_bearer_token() {
        let (status, body) = call("/api/v1/clients", None).await;

        assert_eq!(status, http::StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authorization required");
    }

    #[tokio::test]
    async fn rejects_malformed_token() {
        let (status, body) =
            call("/api/v1/dashboard/stats", Some("Bearer not-a-jwt")).await;

        assert_eq!(status, http::StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid or expired token");
    }

    #[test]
    fn lists_with_pagination_meta() {
        let page = Page {
            items: (1..=10).collect::<Vec<u32>>(),
            total: 25,
            arguments: Arguments::new(Some(1), Some(10)),
        };

        let body = listed("clients", &page).unwrap().0;

        assert_eq!(body["clients"].as_array().map(Vec::len), Some(10));
        assert_eq!(body["total"], 25);
        assert_eq!(body["page"], 1);
        assert_eq!(body["limit"], 10);
        assert_eq!(body["pages"], 3);
    }
}
