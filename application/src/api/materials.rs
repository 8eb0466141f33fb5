//! [`Material`] API definitions.

use axum::{
    extract::{Path, Query},
    routing::{get, patch},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use common::{
    pagination::{Arguments, MAX_LIMIT},
    Money, Quantity,
};
use http::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use service::{
    command::{self, Command as _},
    domain::{
        material::{self, Movement, Sku},
        text::{Line, Text},
        Material,
    },
    query, read,
};

use crate::{
    api::{self, JsonOf, NotFound, PathOf, QueryOf},
    define_error, AsError, Context, Error,
};

/// Builds the [`Router`] of the [`Material`]s API.
pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/stats", get(stats))
        .route("/low-stock", get(low_stock))
        .route("/categories", get(categories))
        .route("/:id", get(by_id).put(update).delete(delete))
        .route("/:id/stock", patch(adjust_stock))
}

/// Query parameters of a [`list`] request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Search term over name, description and SKU.
    pub search: Option<String>,

    /// Category to filter by.
    pub category: Option<String>,

    /// Whether to list only active or only inactive [`Material`]s.
    pub active: Option<bool>,

    /// Whether to list only [`Material`]s at or below their minimum stock.
    #[serde(default)]
    pub low_stock: bool,

    /// 1-indexed number of the requested page.
    pub page: Option<u32>,

    /// Number of [`Material`]s per page.
    pub limit: Option<u32>,
}

/// Lists [`Material`]s ordered by name.
pub async fn list(
    ctx: Context,
    WithRejection(Query(params), _): QueryOf<ListParams>,
) -> Result<Json<Value>, Error> {
    let ListParams {
        search,
        category,
        active,
        low_stock,
        page,
        limit,
    } = params;

    let page = ctx
        .service()
        .execute(query::materials::List::by(read::material::list::Selector {
            arguments: api::Pagination { page, limit }.into(),
            filter: read::material::list::Filter {
                search: search.as_deref().and_then(read::Search::new),
                category: category.and_then(Line::new),
                active,
                low_stock,
            },
        }))
        .await
        .map_err(AsError::into_error)?;

    api::listed("materials", &page)
}

/// Returns aggregated statistics of the inventory.
pub async fn stats(ctx: Context) -> Result<Json<Value>, Error> {
    let stats = ctx
        .service()
        .execute(query::materials::Stats::by(()))
        .await
        .map_err(AsError::into_error)?;

    api::to_json(&stats).map(Json)
}

/// Lists active [`Material`]s whose stock is at or below the minimum.
pub async fn low_stock(ctx: Context) -> Result<Json<Value>, Error> {
    let page = ctx
        .service()
        .execute(query::materials::List::by(read::material::list::Selector {
            arguments: Arguments::new(Some(1), Some(MAX_LIMIT)),
            filter: read::material::list::Filter {
                search: None,
                category: None,
                active: Some(true),
                low_stock: true,
            },
        }))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(json!({
        "count": page.items.len(),
        "materials": api::to_json(&page.items)?,
    })))
}

/// Lists distinct non-empty categories of [`Material`]s.
pub async fn categories(ctx: Context) -> Result<Json<Value>, Error> {
    let read::material::Categories(categories) = ctx
        .service()
        .execute(query::materials::Categories::by(()))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(json!({ "categories": api::to_json(&categories)? })))
}

/// Returns a single [`Material`].
pub async fn by_id(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<material::Id>,
) -> Result<Json<Value>, Error> {
    let material = ctx
        .service()
        .execute(query::material::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| Error::from(NotFound::Material))?;

    api::to_json(&material).map(Json)
}

/// Body of a [`create`] request.
#[derive(Debug, Deserialize)]
pub struct Creation {
    /// Name of the [`Material`].
    pub name: Line,

    /// Description of the [`Material`].
    pub description: Option<Text>,

    /// Category of the [`Material`].
    pub category: Line,

    /// Unit the [`Material`] is measured in.
    pub unit: Line,

    /// Price of a single unit.
    pub unit_price: Money,

    /// Supplier of the [`Material`].
    pub supplier: Option<Line>,

    /// Unique [`Sku`] of the [`Material`].
    pub sku: Option<Sku>,

    /// Initial stock.
    pub stock: Option<Quantity>,

    /// Stock level considered low.
    pub min_stock: Option<Quantity>,

    /// Free-form notes.
    pub notes: Option<Text>,
}

/// Registers a new [`Material`].
///
/// # Errors
///
/// Possible error codes:
/// - `NEGATIVE_PRICE` - unit price is negative;
/// - `SKU_OCCUPIED` - provided [`Sku`] belongs to another [`Material`].
#[tracing::instrument(skip_all)]
pub async fn create(
    ctx: Context,
    WithRejection(Json(body), _): JsonOf<Creation>,
) -> Result<(StatusCode, Json<Value>), Error> {
    let Creation {
        name,
        description,
        category,
        unit,
        unit_price,
        supplier,
        sku,
        stock,
        min_stock,
        notes,
    } = body;

    let material = ctx
        .service()
        .execute(command::CreateMaterial {
            name,
            description,
            category,
            unit,
            unit_price,
            supplier,
            sku,
            stock,
            min_stock,
            notes,
        })
        .await
        .map_err(AsError::into_error)?;

    api::mutated("Material created successfully", "material", &material)
        .map(|body| (StatusCode::CREATED, body))
}

/// Body of an [`update`] request.
///
/// Omitted fields are left untouched. Stock is changed only via
/// [`adjust_stock`].
#[derive(Debug, Default, Deserialize)]
pub struct Changes {
    /// New name.
    pub name: Option<Line>,

    /// New description.
    pub description: Option<Text>,

    /// New category.
    pub category: Option<Line>,

    /// New unit.
    pub unit: Option<Line>,

    /// New unit price.
    pub unit_price: Option<Money>,

    /// New supplier.
    pub supplier: Option<Line>,

    /// New [`Sku`].
    pub sku: Option<Sku>,

    /// New minimum stock.
    pub min_stock: Option<Quantity>,

    /// Whether the [`Material`] is active.
    pub is_active: Option<bool>,

    /// New notes.
    pub notes: Option<Text>,
}

/// Updates the provided fields of a [`Material`].
///
/// # Errors
///
/// Possible error codes:
/// - `MATERIAL_NOT_FOUND` - [`Material`] doesn't exist;
/// - `NEGATIVE_PRICE` - unit price is negative;
/// - `SKU_OCCUPIED` - provided [`Sku`] belongs to another [`Material`].
#[tracing::instrument(skip_all, fields(material_id = %id))]
pub async fn update(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<material::Id>,
    WithRejection(Json(body), _): JsonOf<Changes>,
) -> Result<Json<Value>, Error> {
    let Changes {
        name,
        description,
        category,
        unit,
        unit_price,
        supplier,
        sku,
        min_stock,
        is_active,
        notes,
    } = body;

    let material = ctx
        .service()
        .execute(command::UpdateMaterial {
            material_id: id,
            name,
            description,
            category,
            unit,
            unit_price,
            supplier,
            sku,
            min_stock,
            is_active,
            notes,
        })
        .await
        .map_err(AsError::into_error)?;

    api::mutated("Material updated successfully", "material", &material)
}

/// Soft-deletes a [`Material`] not allocated to any project.
///
/// # Errors
///
/// Possible error codes:
/// - `MATERIAL_NOT_FOUND` - [`Material`] doesn't exist;
/// - `MATERIAL_IN_USE` - [`Material`] is allocated to some project.
#[tracing::instrument(skip_all, fields(material_id = %id))]
pub async fn delete(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<material::Id>,
) -> Result<Json<Value>, Error> {
    let _: Material = ctx
        .service()
        .execute(command::DeleteMaterial { material_id: id })
        .await
        .map_err(AsError::into_error)?;

    Ok(api::message("Material deleted successfully"))
}

/// Body of an [`adjust_stock`] request.
#[derive(Debug, Deserialize)]
pub struct StockMovement {
    /// Moved [`Quantity`].
    pub quantity: Quantity,

    /// Direction of the movement.
    #[serde(rename = "type")]
    pub movement: Movement,

    /// Why the stock moves.
    pub reason: Option<Text>,
}

/// Moves the stock of a [`Material`] in or out.
///
/// # Errors
///
/// Possible error codes:
/// - `MATERIAL_NOT_FOUND` - [`Material`] doesn't exist;
/// - `ZERO_QUANTITY` - moved quantity is zero;
/// - `INSUFFICIENT_STOCK` - outgoing quantity exceeds the stock.
#[tracing::instrument(skip_all, fields(material_id = %id))]
pub async fn adjust_stock(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<material::Id>,
    WithRejection(Json(body), _): JsonOf<StockMovement>,
) -> Result<Json<Value>, Error> {
    let StockMovement {
        quantity,
        movement,
        reason,
    } = body;

    let material = ctx
        .service()
        .execute(command::AdjustMaterialStock {
            material_id: id,
            movement,
            quantity,
            reason,
        })
        .await
        .map_err(AsError::into_error)?;

    api::mutated("Stock updated successfully", "material", &material)
}

impl AsError for command::create_material::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NegativePrice => Some(MaterialError::NegativePrice.into()),
            Self::SkuOccupied(_) => Some(MaterialError::SkuOccupied.into()),
        }
    }
}

impl AsError for command::update_material::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::MaterialNotExists(_) => Some(NotFound::Material.into()),
            Self::NegativePrice => Some(MaterialError::NegativePrice.into()),
            Self::SkuOccupied(_) => Some(MaterialError::SkuOccupied.into()),
        }
    }
}

impl AsError for command::delete_material::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::InUse(_) => Some(MaterialError::InUse.into()),
            Self::MaterialNotExists(_) => Some(NotFound::Material.into()),
        }
    }
}

impl AsError for command::adjust_material_stock::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::InsufficientStock { .. } => Some(Error {
                code: "INSUFFICIENT_STOCK",
                ..Error::conflict(self)
            }),
            Self::MaterialNotExists(_) => Some(NotFound::Material.into()),
            Self::ZeroQuantity => Some(MaterialError::ZeroQuantity.into()),
        }
    }
}

define_error! {
    enum MaterialError {
        #[code = "NEGATIVE_PRICE"]
        #[status = BAD_REQUEST]
        #[message = "Unit price cannot be negative"]
        NegativePrice,

        #[code = "SKU_OCCUPIED"]
        #[status = BAD_REQUEST]
        #[message = "Material with such SKU already exists"]
        SkuOccupied,

        #[code = "MATERIAL_IN_USE"]
        #[status = BAD_REQUEST]
        #[message = "Material is used in projects and cannot be deleted"]
        InUse,

        #[code = "ZERO_QUANTITY"]
        #[status = BAD_REQUEST]
        #[message = "Quantity must be positive"]
        ZeroQuantity,
    }
}

#[cfg(test)]
mod spec {
    use common::Quantity;
    use service::command::adjust_material_stock::ExecutionError;

    use crate::AsError as _;

    #[test]
    fn insufficient_stock_is_conflict() {
        let err = ExecutionError::InsufficientStock {
            available: Quantity::new(3.into()).unwrap(),
            requested: Quantity::new(5.into()).unwrap(),
        }
        .into_error();

        assert_eq!(err.code, "INSUFFICIENT_STOCK");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(
            err.message,
            "Insufficient stock: 3 available, 5 requested",
        );
    }

    #[test]
    fn parses_stock_movement_type() {
        let body: super::StockMovement = serde_json::from_str(
            r#"{"quantity": 2.5, "type": "out", "reason": "site 4"}"#,
        )
        .unwrap();

        assert_eq!(body.movement, service::domain::material::Movement::Out);
    }
}
