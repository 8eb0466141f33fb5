//! Administration API definitions.
//!
//! Every route requires a [`Session`] of an administrator.
//!
//! [`Session`]: crate::Session

use axum::{
    extract::{Path, Query},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use common::pagination::Arguments;
use serde::Deserialize;
use serde_json::{json, Value};
use service::{
    command::{self, Command as _},
    domain::{text::Line, user, User},
    query, read,
};
use tracing as log;

use crate::{
    api::{self, JsonOf, NotFound, PathOf, QueryOf},
    AsError, Context, Error,
};

/// Builds the [`Router`] of the administration API.
pub fn router() -> Router {
    Router::new()
        .route("/users", get(users))
        .route(
            "/users/:id",
            get(user_by_id).put(update_user).delete(delete_user),
        )
        .route("/users/:id/activate", post(activate_user))
        .route("/users/:id/deactivate", post(deactivate_user))
        .route("/system/health", get(system_health))
        .route("/system/info", get(system_info))
}

/// Query parameters of a [`users`] request.
#[derive(Debug, Default, Deserialize)]
pub struct UsersParams {
    /// Search term over email, first and last names.
    pub search: Option<String>,

    /// Whether to list only active or only inactive [`User`]s.
    pub active: Option<bool>,

    /// 1-indexed number of the requested page.
    pub page: Option<u32>,

    /// Number of [`User`]s per page.
    pub limit: Option<u32>,
}

/// Lists [`User`]s, newest first.
pub async fn users(
    ctx: Context,
    WithRejection(Query(params), _): QueryOf<UsersParams>,
) -> Result<Json<Value>, Error> {
    _ = ctx.admin()?;
    let UsersParams {
        search,
        active,
        page,
        limit,
    } = params;

    let page = ctx
        .service()
        .execute(query::users::List::by(read::user::list::Selector {
            arguments: api::Pagination { page, limit }.into(),
            filter: read::user::list::Filter {
                search: search.as_deref().and_then(read::Search::new),
                active,
            },
        }))
        .await
        .map_err(AsError::into_error)?;

    api::listed("users", &page)
}

/// Returns a single [`User`].
pub async fn user_by_id(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<user::Id>,
) -> Result<Json<Value>, Error> {
    _ = ctx.admin()?;

    let user = ctx
        .service()
        .execute(query::user::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| Error::from(NotFound::User))?;

    api::to_json(&user).map(Json)
}

/// Body of an [`update_user`] request.
#[derive(Debug, Default, Deserialize)]
pub struct UserChanges {
    /// New first name.
    pub first_name: Option<Line>,

    /// New last name.
    pub last_name: Option<Line>,

    /// New [`user::Role`].
    pub role: Option<user::Role>,
}

/// Updates names or the role of a [`User`].
///
/// # Errors
///
/// Possible error codes:
/// - `ADMIN_REQUIRED` - current session is not an administrator one;
/// - `USER_NOT_FOUND` - [`User`] doesn't exist.
#[tracing::instrument(skip_all, fields(user_id = %id))]
pub async fn update_user(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<user::Id>,
    WithRejection(Json(body), _): JsonOf<UserChanges>,
) -> Result<Json<Value>, Error> {
    _ = ctx.admin()?;
    let UserChanges {
        first_name,
        last_name,
        role,
    } = body;

    let user = ctx
        .service()
        .execute(command::UpdateUser {
            user_id: id,
            first_name,
            last_name,
            role,
        })
        .await
        .map_err(AsError::into_error)?;

    api::mutated("User updated successfully", "user", &user)
}

/// Soft-deletes a [`User`].
///
/// # Errors
///
/// Possible error codes:
/// - `ADMIN_REQUIRED` - current session is not an administrator one;
/// - `USER_NOT_FOUND` - [`User`] doesn't exist.
#[tracing::instrument(skip_all, fields(user_id = %id))]
pub async fn delete_user(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<user::Id>,
) -> Result<Json<Value>, Error> {
    _ = ctx.admin()?;

    let _: User = ctx
        .service()
        .execute(command::DeleteUser { user_id: id })
        .await
        .map_err(AsError::into_error)?;

    Ok(api::message("User deleted successfully"))
}

/// Allows a [`User`] to sign in again.
pub async fn activate_user(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<user::Id>,
) -> Result<Json<Value>, Error> {
    set_activity(ctx, id, true).await
}

/// Forbids a [`User`] to sign in, invalidating the issued tokens.
pub async fn deactivate_user(
    ctx: Context,
    WithRejection(Path(id), _): PathOf<user::Id>,
) -> Result<Json<Value>, Error> {
    set_activity(ctx, id, false).await
}

/// Executes the [`command::SetUserActivity`] on behalf of an administrator.
#[tracing::instrument(skip(ctx))]
async fn set_activity(
    ctx: Context,
    id: user::Id,
    is_active: bool,
) -> Result<Json<Value>, Error> {
    _ = ctx.admin()?;

    let user = ctx
        .service()
        .execute(command::SetUserActivity {
            user_id: id,
            is_active,
        })
        .await
        .map_err(AsError::into_error)?;

    let message = if is_active {
        "User activated successfully"
    } else {
        "User deactivated successfully"
    };
    api::mutated(message, "user", &user)
}

/// Checks whether the database answers.
pub async fn system_health(ctx: Context) -> Result<Json<Value>, Error> {
    _ = ctx.admin()?;

    let database = match ctx
        .service()
        .execute(query::users::List::by(read::user::list::Selector {
            arguments: Arguments::new(Some(1), Some(1)),
            filter: read::user::list::Filter::default(),
        }))
        .await
    {
        Ok(_) => "connected",
        Err(e) => {
            log::warn!("database health check failed: {e}");
            "unavailable"
        }
    };

    Ok(Json(json!({
        "status": if database == "connected" { "ok" } else { "degraded" },
        "database": database,
    })))
}

/// Describes the running server.
pub async fn system_info(ctx: Context) -> Result<Json<Value>, Error> {
    _ = ctx.admin()?;

    Ok(Json(json!({
        "name": api::NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "os": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
    })))
}

impl AsError for command::update_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotExists(_) => Some(NotFound::User.into()),
        }
    }
}

impl AsError for command::delete_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotExists(_) => Some(NotFound::User.into()),
        }
    }
}

impl AsError for command::set_user_activity::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotExists(_) => Some(NotFound::User.into()),
        }
    }
}
