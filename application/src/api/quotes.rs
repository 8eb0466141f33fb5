//! [`Quote`] API definitions.

use axum::{
    extract::{Path, Query},
    routing::{get, patch},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use common::{DateTime, Money, Percent};
use http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use service::{
    command::{self, Command as _},
    domain::{
        client, item, project, quote,
        text::{Line, Text},
        Quote,
    },
    query, read,
};

use crate::{
    api::{self, JsonOf, NotFound, PathOf, QueryOf},
    define_error, AsError, Context, Error,
};

/// Builds the [`Router`] of the [`Quote`]s API.
pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/stats", get(stats))
        .route("/:id", get(by_id).put(update).delete(delete))
        .route("/:id/status", patch(change_status))
}

/// Query parameters of a [`list`] request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Search term over title and number.
    pub search: Option<String>,

    /// [`quote::Status`] to filter by.
    pub status: Option<quote::Status>,

    /// ID of the [`Client`] to filter by.
    ///
    /// [`Client`]: service::domain::Client
    pub client_id: Option<client::Id>,

    /// ID of the [`Project`] to filter by.
    ///
    /// [`Project`]: service::domain::Project
    pub project_id: Option<project::Id>,

    /// 1-indexed number of the requested page.
    pub page: Option<u32>,

    /// Number of [`Quote`]s per page.
    pub limit: Option<u32>,
}

/// Lists [`Quote`]s, newest first.
pub async fn list(
    ctx: Context,
    WithRejection(Query(params), _): QueryOf<ListParams>,
) -> Result<Json<Value>, Error> {
    let ListParams {
        search,
        status,
        client_id,
        project_id,
        page,
        limit,
    } = params;

    let page = ctx
        .service()
        .execute(query::quotes::List(read::quote::list::Selector {
            arguments: api::Pagination { page, limit }.into(),
            filter: read::quote::list::Filter {
                search: search.as_deref().and_then(read::Search::new),
                status,
                client_id,
                project_id,
            },
        }))
        .await
        .map_err(AsError::into_error)?;

    api::listed("quotes", &page)
}

/// Returns aggregated statistics of [`Quote`]s.
pub async fn stats(ctx: Context) -> Result<Json<Value>, Error> {
    let stats = ctx
        .service()
        .execute(query::quotes::Stats::by(query::month_start(DateTime::now())))
        .await
        .map_err(AsError::into_error)?;

    api::to_json(&stats).map(Json)
}

/// Returns a single [`Quote`] along with its items.
pub async fn by_id(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<quote::Id>,
) -> Result<Json<Value>, Error> {
    let quote = ctx
        .service()
        .execute(query::quote::ById(id))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| Error::from(NotFound::Quote))?;

    api::to_json(&quote).map(Json)
}

/// Body of a [`create`] request.
#[derive(Debug, Deserialize)]
pub struct Creation {
    /// ID of the quoted [`Client`].
    ///
    /// [`Client`]: service::domain::Client
    pub client_id: client::Id,

    /// ID of the quoted [`Project`], if any.
    ///
    /// [`Project`]: service::domain::Project
    pub project_id: Option<project::Id>,

    /// Title of the [`Quote`].
    pub title: Line,

    /// Description of the [`Quote`].
    pub description: Option<Text>,

    /// Day the [`Quote`] stays valid until.
    pub valid_until: Option<quote::ExpirationDateTime>,

    /// Tax rate applied to the discounted subtotal.
    pub tax_rate: Option<Percent>,

    /// Absolute discount subtracted from the subtotal.
    pub discount: Option<Money>,

    /// Free-form notes.
    pub notes: Option<Text>,

    /// Terms and conditions.
    pub terms: Option<Text>,

    /// Line items of the [`Quote`].
    #[serde(default)]
    pub items: Vec<item::Draft>,
}

/// Creates a new [`Quote`] in the `draft` status.
///
/// # Errors
///
/// Possible error codes:
/// - `NO_ITEMS` - no line items are provided;
/// - `INVALID_ITEM` - some line item has a non-positive quantity or a
///                    negative price;
/// - `NEGATIVE_DISCOUNT` - discount is negative;
/// - `CLIENT_NOT_EXISTS` - referenced client doesn't exist;
/// - `PROJECT_NOT_EXISTS` - referenced project doesn't exist.
#[tracing::instrument(skip_all)]
pub async fn create(
    ctx: Context,
    WithRejection(Json(body), _): JsonOf<Creation>,
) -> Result<(StatusCode, Json<Value>), Error> {
    let Creation {
        client_id,
        project_id,
        title,
        description,
        valid_until,
        tax_rate,
        discount,
        notes,
        terms,
        items,
    } = body;

    let quote = ctx
        .service()
        .execute(command::CreateQuote {
            client_id,
            project_id,
            title,
            description,
            valid_until,
            tax_rate,
            discount,
            notes,
            terms,
            items,
        })
        .await
        .map_err(AsError::into_error)?;

    api::mutated("Quote created successfully", "quote", &quote)
        .map(|body| (StatusCode::CREATED, body))
}

/// Body of an [`update`] request.
///
/// Omitted fields are left untouched. Provided `items` replace the existing
/// ones.
#[derive(Debug, Default, Deserialize)]
pub struct Changes {
    /// New title.
    pub title: Option<Line>,

    /// New description.
    pub description: Option<Text>,

    /// New [`quote::Status`].
    pub status: Option<quote::Status>,

    /// New validity day.
    pub valid_until: Option<quote::ExpirationDateTime>,

    /// New tax rate.
    pub tax_rate: Option<Percent>,

    /// New discount.
    pub discount: Option<Money>,

    /// New notes.
    pub notes: Option<Text>,

    /// New terms.
    pub terms: Option<Text>,

    /// New line items.
    pub items: Option<Vec<item::Draft>>,
}

/// Updates the provided fields of a [`Quote`], recalculating its totals.
///
/// # Errors
///
/// Possible error codes:
/// - `QUOTE_NOT_FOUND` - [`Quote`] doesn't exist;
/// - `WRONG_STATUS_TRANSITION` - requested status is unreachable;
/// - `NO_ITEMS`, `INVALID_ITEM`, `NEGATIVE_DISCOUNT` - as in [`create`].
#[tracing::instrument(skip_all, fields(quote_id = %id))]
pub async fn update(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<quote::Id>,
    WithRejection(Json(body), _): JsonOf<Changes>,
) -> Result<Json<Value>, Error> {
    let Changes {
        title,
        description,
        status,
        valid_until,
        tax_rate,
        discount,
        notes,
        terms,
        items,
    } = body;

    let quote = ctx
        .service()
        .execute(command::UpdateQuote {
            quote_id: id,
            title,
            description,
            status,
            valid_until,
            tax_rate,
            discount,
            notes,
            terms,
            items,
        })
        .await
        .map_err(AsError::into_error)?;

    api::mutated("Quote updated successfully", "quote", &quote)
}

/// Soft-deletes a non-accepted [`Quote`].
///
/// # Errors
///
/// Possible error codes:
/// - `QUOTE_NOT_FOUND` - [`Quote`] doesn't exist;
/// - `QUOTE_FINALIZED` - [`Quote`] is accepted already.
#[tracing::instrument(skip_all, fields(quote_id = %id))]
pub async fn delete(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<quote::Id>,
) -> Result<Json<Value>, Error> {
    let _: Quote = ctx
        .service()
        .execute(command::DeleteQuote { quote_id: id })
        .await
        .map_err(AsError::into_error)?;

    Ok(api::message("Quote deleted successfully"))
}

/// Body of a [`change_status`] request.
#[derive(Debug, Deserialize)]
pub struct StatusChange {
    /// Requested [`quote::Status`].
    pub status: quote::Status,
}

/// Moves a [`Quote`] into another [`quote::Status`].
///
/// # Errors
///
/// Possible error codes:
/// - `QUOTE_NOT_FOUND` - [`Quote`] doesn't exist;
/// - `EXPIRED_IS_DERIVED` - `expired` status is requested explicitly;
/// - `WRONG_STATUS_TRANSITION` - requested status is unreachable.
#[tracing::instrument(skip_all, fields(quote_id = %id))]
pub async fn change_status(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<quote::Id>,
    WithRejection(Json(body), _): JsonOf<StatusChange>,
) -> Result<Json<Value>, Error> {
    let quote = ctx
        .service()
        .execute(command::ChangeQuoteStatus {
            quote_id: id,
            status: body.status,
        })
        .await
        .map_err(AsError::into_error)?;

    api::mutated("Quote status updated successfully", "quote", &quote)
}

/// Renders an error of an invalid line item.
pub(crate) fn invalid_item(index: usize, field: &str) -> Error {
    Error {
        code: "INVALID_ITEM",
        ..Error::bad_request(&format!("Item {}: invalid {field}", index + 1))
    }
}

/// Renders an error of an unreachable status.
pub(crate) fn wrong_transition(
    from: impl std::fmt::Display,
    to: impl std::fmt::Display,
) -> Error {
    Error {
        code: "WRONG_STATUS_TRANSITION",
        ..Error::bad_request(&format!("Cannot change status from {from} to {to}"))
    }
}

impl AsError for command::create_quote::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ClientNotExists(_) => {
                Some(DocumentError::ClientNotExists.into())
            }
            Self::InvalidItem { index, field } => {
                Some(invalid_item(*index, field))
            }
            Self::NegativeDiscount => {
                Some(DocumentError::NegativeDiscount.into())
            }
            Self::NoItems => Some(DocumentError::NoItems.into()),
            Self::NumberOccupied(n) => Some(Error::conflict(&format!(
                "Quote number {n} is already taken",
            ))),
            Self::ProjectNotExists(_) => {
                Some(DocumentError::ProjectNotExists.into())
            }
        }
    }
}

impl AsError for command::update_quote::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ExpiredIsDerived => Some(QuoteError::ExpiredIsDerived.into()),
            Self::InvalidItem { index, field } => {
                Some(invalid_item(*index, field))
            }
            Self::NegativeDiscount => {
                Some(DocumentError::NegativeDiscount.into())
            }
            Self::NoItems => Some(DocumentError::NoItems.into()),
            Self::QuoteNotExists(_) => Some(NotFound::Quote.into()),
            Self::WrongTransition { from, to } => {
                Some(wrong_transition(from, to))
            }
        }
    }
}

impl AsError for command::change_quote_status::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ExpiredIsDerived => Some(QuoteError::ExpiredIsDerived.into()),
            Self::QuoteNotExists(_) => Some(NotFound::Quote.into()),
            Self::WrongTransition { from, to } => {
                Some(wrong_transition(from, to))
            }
        }
    }
}

impl AsError for command::delete_quote::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Finalized(_) => Some(QuoteError::Finalized.into()),
            Self::QuoteNotExists(_) => Some(NotFound::Quote.into()),
        }
    }
}

define_error! {
    enum QuoteError {
        #[code = "EXPIRED_IS_DERIVED"]
        #[status = BAD_REQUEST]
        #[message = "Expired status is derived from the validity date"]
        ExpiredIsDerived,

        #[code = "QUOTE_FINALIZED"]
        #[status = BAD_REQUEST]
        #[message = "Accepted quote cannot be deleted"]
        Finalized,
    }
}

define_error! {
    enum DocumentError {
        #[code = "CLIENT_NOT_EXISTS"]
        #[status = BAD_REQUEST]
        #[message = "Client not found"]
        ClientNotExists,

        #[code = "PROJECT_NOT_EXISTS"]
        #[status = BAD_REQUEST]
        #[message = "Project not found"]
        ProjectNotExists,

        #[code = "QUOTE_NOT_EXISTS"]
        #[status = BAD_REQUEST]
        #[message = "Quote not found"]
        QuoteNotExists,

        #[code = "NO_ITEMS"]
        #[status = BAD_REQUEST]
        #[message = "At least one item is required"]
        NoItems,

        #[code = "NEGATIVE_DISCOUNT"]
        #[status = BAD_REQUEST]
        #[message = "Discount cannot be negative"]
        NegativeDiscount,
    }
}

#[cfg(test)]
mod spec {
    use service::domain::quote::Status;

    use super::{invalid_item, wrong_transition};

    #[test]
    fn names_invalid_item_one_based() {
        let err = invalid_item(0, "quantity");

        assert_eq!(err.code, "INVALID_ITEM");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Item 1: invalid quantity");
    }

    #[test]
    fn names_both_statuses_of_transition() {
        let err = wrong_transition(Status::Accepted, Status::Draft);

        assert_eq!(err.code, "WRONG_STATUS_TRANSITION");
        assert_eq!(
            err.message,
            "Cannot change status from accepted to draft",
        );
    }
}
