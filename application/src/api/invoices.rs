//! [`Invoice`] API definitions.

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
        client, invoice, item, project, quote,
        text::{Line, Text},
        Invoice,
    },
    query, read,
};

use crate::{
    api::{
        self,
        quotes::{invalid_item, wrong_transition, DocumentError},
        JsonOf, NotFound, PathOf, QueryOf,
    },
    define_error, AsError, Context, Error,
};

/// Builds the [`Router`] of the [`Invoice`]s API.
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

    /// [`invoice::Status`] to filter by.
    pub status: Option<invoice::Status>,

    /// ID of the [`Client`] to filter by.
    ///
    /// [`Client`]: service::domain::Client
    pub client_id: Option<client::Id>,

    /// 1-indexed number of the requested page.
    pub page: Option<u32>,

    /// Number of [`Invoice`]s per page.
    pub limit: Option<u32>,
}

/// Lists [`Invoice`]s, newest first.
pub async fn list(
    ctx: Context,
    WithRejection(Query(params), _): QueryOf<ListParams>,
) -> Result<Json<Value>, Error> {
    let ListParams {
        search,
        status,
        client_id,
        page,
        limit,
    } = params;

    let page = ctx
        .service()
        .execute(query::invoices::List(read::invoice::list::Selector {
            arguments: api::Pagination { page, limit }.into(),
            filter: read::invoice::list::Filter {
                search: search.as_deref().and_then(read::Search::new),
                status,
                client_id,
            },
        }))
        .await
        .map_err(AsError::into_error)?;

    api::listed("invoices", &page)
}

/// Returns aggregated statistics of [`Invoice`]s.
pub async fn stats(ctx: Context) -> Result<Json<Value>, Error> {
    let stats = ctx
        .service()
        .execute(query::invoices::Stats::by(query::month_start(
            DateTime::now(),
        )))
        .await
        .map_err(AsError::into_error)?;

    api::to_json(&stats).map(Json)
}

/// Returns a single [`Invoice`] along with its items.
pub async fn by_id(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<invoice::Id>,
) -> Result<Json<Value>, Error> {
    let invoice = ctx
        .service()
        .execute(query::invoice::ById(id))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| Error::from(NotFound::Invoice))?;

    api::to_json(&invoice).map(Json)
}

/// Body of a [`create`] request.
#[derive(Debug, Deserialize)]
pub struct Creation {
    /// ID of the billed [`Client`].
    ///
    /// [`Client`]: service::domain::Client
    pub client_id: client::Id,

    /// ID of the billed [`Project`], if any.
    ///
    /// [`Project`]: service::domain::Project
    pub project_id: Option<project::Id>,

    /// ID of the [`Quote`] this [`Invoice`] originates from, if any.
    ///
    /// [`Quote`]: service::domain::Quote
    pub quote_id: Option<quote::Id>,

    /// Title of the [`Invoice`].
    pub title: Line,

    /// Description of the [`Invoice`].
    pub description: Option<Text>,

    /// Day the [`Invoice`] is issued, defaulting to today.
    pub issue_date: Option<invoice::IssueDateTime>,

    /// Day the [`Invoice`] is due.
    pub due_date: invoice::DueDateTime,

    /// Tax rate applied to the discounted subtotal.
    pub tax_rate: Option<Percent>,

    /// Absolute discount subtracted from the subtotal.
    pub discount: Option<Money>,

    /// Free-form notes.
    pub notes: Option<Text>,

    /// Payment terms.
    pub terms: Option<Text>,

    /// Line items of the [`Invoice`].
    #[serde(default)]
    pub items: Vec<item::Draft>,
}

/// Issues a new [`Invoice`] in the `draft` status.
///
/// # Errors
///
/// Possible error codes:
/// - `NO_ITEMS` - no line items are provided;
/// - `INVALID_ITEM` - some line item has a non-positive quantity or a
///                    negative price;
/// - `NEGATIVE_DISCOUNT` - discount is negative;
/// - `CLIENT_NOT_EXISTS`, `PROJECT_NOT_EXISTS`, `QUOTE_NOT_EXISTS` -
///   referenced entity doesn't exist.
#[tracing::instrument(skip_all)]
pub async fn create(
    ctx: Context,
    WithRejection(Json(body), _): JsonOf<Creation>,
) -> Result<(StatusCode, Json<Value>), Error> {
    let Creation {
        client_id,
        project_id,
        quote_id,
        title,
        description,
        issue_date,
        due_date,
        tax_rate,
        discount,
        notes,
        terms,
        items,
    } = body;

    let invoice = ctx
        .service()
        .execute(command::CreateInvoice {
            client_id,
            project_id,
            quote_id,
            title,
            description,
            issue_date,
            due_date,
            tax_rate,
            discount,
            notes,
            terms,
            items,
        })
        .await
        .map_err(AsError::into_error)?;

    api::mutated("Invoice created successfully", "invoice", &invoice)
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

    /// New [`invoice::Status`].
    pub status: Option<invoice::Status>,

    /// New due day.
    pub due_date: Option<invoice::DueDateTime>,

    /// Day the [`Invoice`] was paid.
    pub paid_date: Option<invoice::PaymentDateTime>,

    /// New tax rate.
    pub tax_rate: Option<Percent>,

    /// New discount.
    pub discount: Option<Money>,

    /// Amount paid so far.
    pub paid_amount: Option<Money>,

    /// New notes.
    pub notes: Option<Text>,

    /// New terms.
    pub terms: Option<Text>,

    /// New line items.
    pub items: Option<Vec<item::Draft>>,
}

/// Updates the provided fields of an [`Invoice`], recalculating its totals.
///
/// # Errors
///
/// Possible error codes:
/// - `INVOICE_NOT_FOUND` - [`Invoice`] doesn't exist;
/// - `WRONG_STATUS_TRANSITION` - requested status is unreachable;
/// - `NEGATIVE_PAID_AMOUNT` - paid amount is negative;
/// - `NO_ITEMS`, `INVALID_ITEM`, `NEGATIVE_DISCOUNT` - as in [`create`].
#[tracing::instrument(skip_all, fields(invoice_id = %id))]
pub async fn update(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<invoice::Id>,
    WithRejection(Json(body), _): JsonOf<Changes>,
) -> Result<Json<Value>, Error> {
    let Changes {
        title,
        description,
        status,
        due_date,
        paid_date,
        tax_rate,
        discount,
        paid_amount,
        notes,
        terms,
        items,
    } = body;

    let invoice = ctx
        .service()
        .execute(command::UpdateInvoice {
            invoice_id: id,
            title,
            description,
            status,
            due_date,
            paid_date,
            tax_rate,
            discount,
            paid_amount,
            notes,
            terms,
            items,
        })
        .await
        .map_err(AsError::into_error)?;

    api::mutated("Invoice updated successfully", "invoice", &invoice)
}

/// Soft-deletes a non-paid [`Invoice`].
///
/// # Errors
///
/// Possible error codes:
/// - `INVOICE_NOT_FOUND` - [`Invoice`] doesn't exist;
/// - `INVOICE_FINALIZED` - [`Invoice`] is paid already.
#[tracing::instrument(skip_all, fields(invoice_id = %id))]
pub async fn delete(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<invoice::Id>,
) -> Result<Json<Value>, Error> {
    let _: Invoice = ctx
        .service()
        .execute(command::DeleteInvoice { invoice_id: id })
        .await
        .map_err(AsError::into_error)?;

    Ok(api::message("Invoice deleted successfully"))
}

/// Body of a [`change_status`] request.
#[derive(Debug, Deserialize)]
pub struct StatusChange {
    /// Requested [`invoice::Status`].
    pub status: invoice::Status,
}

/// Moves an [`Invoice`] into another [`invoice::Status`].
///
/// # Errors
///
/// Possible error codes:
/// - `INVOICE_NOT_FOUND` - [`Invoice`] doesn't exist;
/// - `WRONG_STATUS_TRANSITION` - requested status is unreachable.
#[tracing::instrument(skip_all, fields(invoice_id = %id))]
pub async fn change_status(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<invoice::Id>,
    WithRejection(Json(body), _): JsonOf<StatusChange>,
) -> Result<Json<Value>, Error> {
    let invoice = ctx
        .service()
        .execute(command::ChangeInvoiceStatus {
            invoice_id: id,
            status: body.status,
        })
        .await
        .map_err(AsError::into_error)?;

    api::mutated("Invoice status updated successfully", "invoice", &invoice)
}

impl AsError for command::create_invoice::ExecutionError {
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
                "Invoice number {n} is already taken",
            ))),
            Self::ProjectNotExists(_) => {
                Some(DocumentError::ProjectNotExists.into())
            }
            Self::QuoteNotExists(_) => {
                Some(DocumentError::QuoteNotExists.into())
            }
        }
    }
}

impl AsError for command::update_invoice::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::InvalidItem { index, field } => {
                Some(invalid_item(*index, field))
            }
            Self::InvoiceNotExists(_) => Some(NotFound::Invoice.into()),
            Self::NegativeDiscount => {
                Some(DocumentError::NegativeDiscount.into())
            }
            Self::NegativePaidAmount => {
                Some(InvoiceError::NegativePaidAmount.into())
            }
            Self::NoItems => Some(DocumentError::NoItems.into()),
            Self::WrongTransition { from, to } => {
                Some(wrong_transition(from, to))
            }
        }
    }
}

impl AsError for command::change_invoice_status::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::InvoiceNotExists(_) => Some(NotFound::Invoice.into()),
            Self::WrongTransition { from, to } => {
                Some(wrong_transition(from, to))
            }
        }
    }
}

impl AsError for command::delete_invoice::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Finalized(_) => Some(InvoiceError::Finalized.into()),
            Self::InvoiceNotExists(_) => Some(NotFound::Invoice.into()),
        }
    }
}

define_error! {
    enum InvoiceError {
        #[code = "NEGATIVE_PAID_AMOUNT"]
        #[status = BAD_REQUEST]
        #[message = "Paid amount cannot be negative"]
        NegativePaidAmount,

        #[code = "INVOICE_FINALIZED"]
        #[status = BAD_REQUEST]
        #[message = "Paid invoice cannot be deleted"]
        Finalized,
    }
}
