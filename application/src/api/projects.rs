//! [`Project`] API definitions.

use axum::{
    extract::{Path, Query},
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use common::{DateTime, Money, Quantity};
use http::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use service::{
    command::{self, Command as _},
    domain::{
        client, material, project,
        project::material as project_material,
        text::{Line, Text},
        Project,
    },
    query, read,
};

use crate::{
    api::{self, JsonOf, NotFound, PathOf, QueryOf},
    define_error, AsError, Context, Error,
};

/// Builds the [`Router`] of the [`Project`]s API.
pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/stats", get(stats))
        .route("/:id", get(by_id).put(update).delete(delete))
        .route("/:id/materials", get(materials).post(add_material))
}

/// Query parameters of a [`list`] request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Search term over name, code and description.
    pub search: Option<String>,

    /// [`project::Status`] to filter by.
    pub status: Option<project::Status>,

    /// ID of the [`Client`] to filter by.
    ///
    /// [`Client`]: service::domain::Client
    pub client_id: Option<client::Id>,

    /// [`project::Priority`] to filter by.
    pub priority: Option<project::Priority>,

    /// 1-indexed number of the requested page.
    pub page: Option<u32>,

    /// Number of [`Project`]s per page.
    pub limit: Option<u32>,
}

/// Lists [`Project`]s, newest first.
pub async fn list(
    ctx: Context,
    WithRejection(Query(params), _): QueryOf<ListParams>,
) -> Result<Json<Value>, Error> {
    let ListParams {
        search,
        status,
        client_id,
        priority,
        page,
        limit,
    } = params;

    let page = ctx
        .service()
        .execute(query::projects::List::by(read::project::list::Selector {
            arguments: api::Pagination { page, limit }.into(),
            filter: read::project::list::Filter {
                search: search.as_deref().and_then(read::Search::new),
                status,
                client_id,
                priority,
            },
        }))
        .await
        .map_err(AsError::into_error)?;

    api::listed("projects", &page)
}

/// Returns aggregated statistics of [`Project`]s.
pub async fn stats(ctx: Context) -> Result<Json<Value>, Error> {
    let stats = ctx
        .service()
        .execute(query::projects::Stats::by(query::month_start(
            DateTime::now(),
        )))
        .await
        .map_err(AsError::into_error)?;

    api::to_json(&stats).map(Json)
}

/// Returns a single [`Project`].
pub async fn by_id(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<project::Id>,
) -> Result<Json<Value>, Error> {
    let project = find(&ctx, id).await?;

    api::to_json(&project).map(Json)
}

/// Returns the existing [`Project`] with the provided ID.
async fn find(ctx: &Context, id: project::Id) -> Result<Project, Error> {
    ctx.service()
        .execute(query::project::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| NotFound::Project.into())
}

/// Body of [`create`] and [`update`] requests.
///
/// Omitted fields are left untouched on update.
#[derive(Debug, Default, Deserialize)]
pub struct Fields {
    /// ID of the owning [`Client`]. Required on creation, ignored on update.
    ///
    /// [`Client`]: service::domain::Client
    pub client_id: Option<client::Id>,

    /// Name of the [`Project`], required on creation.
    pub name: Option<Line>,

    /// Description of the [`Project`].
    pub description: Option<Text>,

    /// [`project::Status`] of the [`Project`]. Ignored on creation.
    pub status: Option<project::Status>,

    /// [`project::Priority`] of the [`Project`].
    pub priority: Option<project::Priority>,

    /// [`project::Kind`] of the [`Project`].
    #[serde(rename = "type")]
    pub kind: Option<project::Kind>,

    /// Street address of the construction site.
    pub address: Option<Line>,

    /// City of the construction site.
    pub city: Option<Line>,

    /// State of the construction site.
    pub state: Option<Line>,

    /// ZIP code of the construction site.
    pub zip_code: Option<Line>,

    /// Day the [`Project`] starts.
    pub start_date: Option<project::StartDateTime>,

    /// Day the [`Project`] is due.
    pub end_date: Option<project::EndDateTime>,

    /// Budget of the [`Project`].
    pub budget: Option<Money>,

    /// Estimated cost of the [`Project`].
    pub estimated_cost: Option<Money>,

    /// Actual cost of the [`Project`].
    pub actual_cost: Option<Money>,

    /// Completion percentage. Ignored on creation.
    pub progress: Option<project::Progress>,

    /// Free-form notes.
    pub notes: Option<Text>,
}

/// Creates a new [`Project`] with a freshly generated code.
///
/// # Errors
///
/// Possible error codes:
/// - `NO_PROJECT_CLIENT` - client ID is not provided;
/// - `NO_PROJECT_NAME` - name is not provided;
/// - `PROJECT_CLIENT_NOT_EXISTS` - referenced client doesn't exist.
#[tracing::instrument(skip_all)]
pub async fn create(
    ctx: Context,
    WithRejection(Json(body), _): JsonOf<Fields>,
) -> Result<(StatusCode, Json<Value>), Error> {
    let Fields {
        client_id,
        name,
        description,
        status: _,
        priority,
        kind,
        address,
        city,
        state,
        zip_code,
        start_date,
        end_date,
        budget,
        estimated_cost,
        actual_cost,
        progress: _,
        notes,
    } = body;
    let client_id = client_id.ok_or(ProjectError::NoClient)?;
    let name = name.ok_or(ProjectError::NoName)?;

    let project = ctx
        .service()
        .execute(command::CreateProject {
            client_id,
            name,
            description,
            priority,
            kind,
            address,
            city,
            state,
            zip_code,
            start_date,
            end_date,
            budget,
            estimated_cost,
            actual_cost,
            notes,
        })
        .await
        .map_err(AsError::into_error)?;

    api::mutated("Project created successfully", "project", &project)
        .map(|body| (StatusCode::CREATED, body))
}

/// Updates the provided fields of a [`Project`].
///
/// # Errors
///
/// Possible error codes:
/// - `PROJECT_NOT_FOUND` - [`Project`] doesn't exist.
#[tracing::instrument(skip_all, fields(project_id = %id))]
pub async fn update(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<project::Id>,
    WithRejection(Json(body), _): JsonOf<Fields>,
) -> Result<Json<Value>, Error> {
    let Fields {
        client_id: _,
        name,
        description,
        status,
        priority,
        kind,
        address,
        city,
        state,
        zip_code,
        start_date,
        end_date,
        budget,
        estimated_cost,
        actual_cost,
        progress,
        notes,
    } = body;

    let project = ctx
        .service()
        .execute(command::UpdateProject {
            project_id: id,
            name,
            description,
            status,
            priority,
            kind,
            address,
            city,
            state,
            zip_code,
            start_date,
            end_date,
            budget,
            estimated_cost,
            actual_cost,
            progress,
            notes,
        })
        .await
        .map_err(AsError::into_error)?;

    api::mutated("Project updated successfully", "project", &project)
}

/// Soft-deletes a [`Project`].
///
/// # Errors
///
/// Possible error codes:
/// - `PROJECT_NOT_FOUND` - [`Project`] doesn't exist.
#[tracing::instrument(skip_all, fields(project_id = %id))]
pub async fn delete(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<project::Id>,
) -> Result<Json<Value>, Error> {
    let _: Project = ctx
        .service()
        .execute(command::DeleteProject { project_id: id })
        .await
        .map_err(AsError::into_error)?;

    Ok(api::message("Project deleted successfully"))
}

/// Lists the materials allocated to a [`Project`].
pub async fn materials(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<project::Id>,
) -> Result<Json<Value>, Error> {
    let project = find(&ctx, id).await?;
    let materials = ctx
        .service()
        .execute(query::project::Materials::by(read::project::Materials(
            project.id,
        )))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(json!({ "materials": api::to_json(&materials)? })))
}

/// Body of an [`add_material`] request.
#[derive(Debug, Deserialize)]
pub struct Allocation {
    /// ID of the allocated [`Material`].
    ///
    /// [`Material`]: service::domain::Material
    pub material_id: material::Id,

    /// Planned [`Quantity`].
    pub quantity_planned: Quantity,

    /// Already consumed [`Quantity`].
    pub quantity_used: Option<Quantity>,

    /// Unit price, defaulting to the current price of the material.
    pub unit_price: Option<Money>,

    /// [`project_material::Status`] of the allocation.
    pub status: Option<project_material::Status>,

    /// Day the material is delivered.
    pub delivery_date: Option<project_material::DeliveryDateTime>,

    /// Free-form notes.
    pub notes: Option<Text>,
}

/// Allocates a material to a [`Project`].
///
/// # Errors
///
/// Possible error codes:
/// - `PROJECT_NOT_FOUND` - [`Project`] doesn't exist;
/// - `MATERIAL_NOT_FOUND` - material doesn't exist;
/// - `ZERO_QUANTITY` - planned quantity is not positive.
#[tracing::instrument(skip_all, fields(project_id = %id))]
pub async fn add_material(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<project::Id>,
    WithRejection(Json(body), _): JsonOf<Allocation>,
) -> Result<(StatusCode, Json<Value>), Error> {
    let Allocation {
        material_id,
        quantity_planned,
        quantity_used,
        unit_price,
        status,
        delivery_date,
        notes,
    } = body;

    let allocated = ctx
        .service()
        .execute(command::AddProjectMaterial {
            project_id: id,
            material_id,
            quantity_planned,
            quantity_used,
            unit_price,
            status,
            delivery_date,
            notes,
        })
        .await
        .map_err(AsError::into_error)?;

    api::mutated("Material added to project successfully", "material", &allocated)
        .map(|body| (StatusCode::CREATED, body))
}

impl AsError for command::create_project::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ClientNotExists(_) => {
                Some(ProjectError::ClientNotExists.into())
            }
            Self::CodeOccupied(_) => Some(ProjectError::CodeOccupied.into()),
        }
    }
}

impl AsError for command::update_project::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ProjectNotExists(_) => Some(NotFound::Project.into()),
        }
    }
}

impl AsError for command::delete_project::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ProjectNotExists(_) => Some(NotFound::Project.into()),
        }
    }
}

impl AsError for command::add_project_material::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::MaterialNotExists(_) => Some(NotFound::Material.into()),
            Self::ProjectNotExists(_) => Some(NotFound::Project.into()),
            Self::ZeroQuantity => Some(ProjectError::ZeroQuantity.into()),
            Self::CostOutOfRange => Some(ProjectError::CostOutOfRange.into()),
        }
    }
}

define_error! {
    enum ProjectError {
        #[code = "NO_PROJECT_CLIENT"]
        #[status = BAD_REQUEST]
        #[message = "Project client is required"]
        NoClient,

        #[code = "NO_PROJECT_NAME"]
        #[status = BAD_REQUEST]
        #[message = "Project name is required"]
        NoName,

        #[code = "PROJECT_CLIENT_NOT_EXISTS"]
        #[status = BAD_REQUEST]
        #[message = "Client not found"]
        ClientNotExists,

        #[code = "PROJECT_CODE_OCCUPIED"]
        #[status = BAD_REQUEST]
        #[message = "Project code is already taken"]
        CodeOccupied,

        #[code = "ZERO_QUANTITY"]
        #[status = BAD_REQUEST]
        #[message = "Quantity must be positive"]
        ZeroQuantity,

        #[code = "COST_OUT_OF_RANGE"]
        #[status = BAD_REQUEST]
        #[message = "Invalid unit price or total cost out of range"]
        CostOutOfRange,
    }
}
