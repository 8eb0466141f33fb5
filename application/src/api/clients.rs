//! [`Client`] API definitions.

use axum::{
    extract::{Path, Query},
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use common::DateTime;
use http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use service::{
    command::{self, Command as _},
    domain::{
        client,
        text::{Line, Text},
        Client, Email,
    },
    query, read,
};

use crate::{
    api::{self, JsonOf, NotFound, PathOf, QueryOf},
    define_error, AsError, Context, Error,
};

/// Builds the [`Router`] of the [`Client`]s API.
pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/stats", get(stats))
        .route("/:id", get(by_id).put(update).delete(delete))
}

/// Query parameters of a [`list`] request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Search term over name, email and company.
    pub search: Option<String>,

    /// Whether to list only active or only inactive [`Client`]s.
    pub active: Option<bool>,

    /// 1-indexed number of the requested page.
    pub page: Option<u32>,

    /// Number of [`Client`]s per page.
    pub limit: Option<u32>,
}

/// Lists [`Client`]s, newest first.
pub async fn list(
    ctx: Context,
    WithRejection(Query(params), _): QueryOf<ListParams>,
) -> Result<Json<Value>, Error> {
    let ListParams {
        search,
        active,
        page,
        limit,
    } = params;

    let page = ctx
        .service()
        .execute(query::clients::List::by(read::client::list::Selector {
            arguments: api::Pagination { page, limit }.into(),
            filter: read::client::list::Filter {
                search: search.as_deref().and_then(read::Search::new),
                active,
            },
        }))
        .await
        .map_err(AsError::into_error)?;

    api::listed("clients", &page)
}

/// Returns aggregated statistics of [`Client`]s.
pub async fn stats(ctx: Context) -> Result<Json<Value>, Error> {
    let stats = ctx
        .service()
        .execute(query::clients::Stats::by(query::month_start(
            DateTime::now(),
        )))
        .await
        .map_err(AsError::into_error)?;

    api::to_json(&stats).map(Json)
}

/// Returns a single [`Client`].
pub async fn by_id(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<client::Id>,
) -> Result<Json<Value>, Error> {
    let client = ctx
        .service()
        .execute(query::client::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| Error::from(NotFound::Client))?;

    api::to_json(&client).map(Json)
}

/// Body of [`create`] and [`update`] requests.
///
/// Omitted fields are left untouched on update.
#[derive(Debug, Default, Deserialize)]
pub struct Fields {
    /// Name of the [`Client`], required on creation.
    pub name: Option<Line>,

    /// [`Email`] of the [`Client`].
    pub email: Option<Email>,

    /// Phone of the [`Client`].
    pub phone: Option<Line>,

    /// Street address of the [`Client`].
    pub address: Option<Line>,

    /// City of the [`Client`].
    pub city: Option<Line>,

    /// State of the [`Client`].
    pub state: Option<Line>,

    /// ZIP code of the [`Client`].
    pub zip_code: Option<Line>,

    /// Company of the [`Client`].
    pub company: Option<Line>,

    /// Tax ID of the [`Client`].
    pub tax_id: Option<Line>,

    /// [`client::ContactType`] of the [`Client`].
    pub contact_type: Option<client::ContactType>,

    /// Free-form notes.
    pub notes: Option<Text>,

    /// Whether the [`Client`] is active. Ignored on creation.
    pub is_active: Option<bool>,
}

/// Creates a new [`Client`].
///
/// # Errors
///
/// Possible error codes:
/// - `NO_CLIENT_NAME` - name is not provided;
/// - `CLIENT_EMAIL_OCCUPIED` - provided [`Email`] belongs to another
///                             [`Client`].
#[tracing::instrument(skip_all)]
pub async fn create(
    ctx: Context,
    WithRejection(Json(body), _): JsonOf<Fields>,
) -> Result<(StatusCode, Json<Value>), Error> {
    let Fields {
        name,
        email,
        phone,
        address,
        city,
        state,
        zip_code,
        company,
        tax_id,
        contact_type,
        notes,
        is_active: _,
    } = body;

    let client = ctx
        .service()
        .execute(command::CreateClient {
            name,
            email,
            phone,
            address,
            city,
            state,
            zip_code,
            company,
            tax_id,
            contact_type,
            notes,
        })
        .await
        .map_err(AsError::into_error)?;

    api::mutated("Client created successfully", "client", &client)
        .map(|body| (StatusCode::CREATED, body))
}

/// Updates the provided fields of a [`Client`].
///
/// # Errors
///
/// Possible error codes:
/// - `CLIENT_NOT_FOUND` - [`Client`] doesn't exist;
/// - `CLIENT_EMAIL_OCCUPIED` - provided [`Email`] belongs to another
///                             [`Client`].
#[tracing::instrument(skip_all, fields(client_id = %id))]
pub async fn update(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<client::Id>,
    WithRejection(Json(body), _): JsonOf<Fields>,
) -> Result<Json<Value>, Error> {
    let Fields {
        name,
        email,
        phone,
        address,
        city,
        state,
        zip_code,
        company,
        tax_id,
        contact_type,
        notes,
        is_active,
    } = body;

    let client = ctx
        .service()
        .execute(command::UpdateClient {
            client_id: id,
            name,
            email,
            phone,
            address,
            city,
            state,
            zip_code,
            company,
            tax_id,
            contact_type,
            notes,
            is_active,
        })
        .await
        .map_err(AsError::into_error)?;

    api::mutated("Client updated successfully", "client", &client)
}

/// Soft-deletes a [`Client`] without ongoing projects.
///
/// # Errors
///
/// Possible error codes:
/// - `CLIENT_NOT_FOUND` - [`Client`] doesn't exist;
/// - `CLIENT_HAS_ONGOING_PROJECTS` - [`Client`] has projects in progress.
#[tracing::instrument(skip_all, fields(client_id = %id))]
pub async fn delete(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<client::Id>,
) -> Result<Json<Value>, Error> {
    let _: Client = ctx
        .service()
        .execute(command::DeleteClient { client_id: id })
        .await
        .map_err(AsError::into_error)?;

    Ok(api::message("Client deleted successfully"))
}

impl AsError for command::create_client::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EmailOccupied(_) => Some(ClientError::EmailOccupied.into()),
            Self::NoName => Some(ClientError::NoName.into()),
        }
    }
}

impl AsError for command::update_client::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ClientNotExists(_) => Some(NotFound::Client.into()),
            Self::EmailOccupied(_) => Some(ClientError::EmailOccupied.into()),
        }
    }
}

impl AsError for command::delete_client::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ClientNotExists(_) => Some(NotFound::Client.into()),
            Self::HasOngoingProjects(_) => {
                Some(ClientError::HasOngoingProjects.into())
            }
        }
    }
}

define_error! {
    enum ClientError {
        #[code = "NO_CLIENT_NAME"]
        #[status = BAD_REQUEST]
        #[message = "Client name is required"]
        NoName,

        #[code = "CLIENT_EMAIL_OCCUPIED"]
        #[status = BAD_REQUEST]
        #[message = "Email is already used by another client"]
        EmailOccupied,

        #[code = "CLIENT_HAS_ONGOING_PROJECTS"]
        #[status = BAD_REQUEST]
        #[message = "Client has active projects and cannot be deleted"]
        HasOngoingProjects,
    }
}
