//! Authentication API definitions.

use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use http::StatusCode;
use secrecy::SecretBox;
use serde::Deserialize;
use serde_json::{json, Value};
use service::{
    command::{self, Command as _},
    domain::{text::Line, user, Email},
    query,
};

use crate::{
    api::{self, JsonOf, NotFound},
    define_error, AsError, Context, Error, Service,
};

/// Builds the [`Router`] of the authentication API.
pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(profile).put(update_profile))
        .route("/change-password", post(change_password))
        .route("/verify", get(verify))
}

/// Body of a [`register`] request.
#[derive(Debug, Deserialize)]
pub struct Registration {
    /// [`Email`] to sign in with.
    pub email: Email,

    /// Password to sign in with.
    pub password: user::Password,

    /// First name of the new user.
    pub first_name: Line,

    /// Last name of the new user.
    pub last_name: Line,

    /// Role of the new user.
    #[serde(default)]
    pub role: Option<user::Role>,
}

/// Registers a new user and signs them in.
///
/// # Errors
///
/// Possible error codes:
/// - `EMAIL_OCCUPIED` - provided [`Email`] is taken by another user.
#[tracing::instrument(skip_all)]
pub async fn register(
    Extension(service): Extension<Service>,
    WithRejection(Json(body), _): JsonOf<Registration>,
) -> Result<(StatusCode, Json<Value>), Error> {
    let Registration {
        email,
        password,
        first_name,
        last_name,
        role,
    } = body;

    let user = service
        .execute(command::RegisterUser {
            email,
            password: SecretBox::new(Box::new(password)),
            first_name,
            last_name,
            role,
        })
        .await
        .map_err(AsError::into_error)?;
    let output = service
        .execute(command::CreateUserSession::ByUserId(user.id))
        .await
        .map_err(AsError::into_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "token": output.token.to_string(),
            "expires_at": output.expires_at,
            "user": api::to_json(&output.user)?,
        })),
    ))
}

/// Body of a [`login`] request.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// [`Email`] to sign in with.
    pub email: Email,

    /// Password to sign in with.
    pub password: user::Password,
}

/// Signs a user in with the provided [`Credentials`].
///
/// # Errors
///
/// Possible error codes:
/// - `WRONG_CREDENTIALS` - provided credentials don't match any active user.
#[tracing::instrument(skip_all)]
pub async fn login(
    Extension(service): Extension<Service>,
    WithRejection(Json(body), _): JsonOf<Credentials>,
) -> Result<Json<Value>, Error> {
    let Credentials { email, password } = body;

    let output = service
        .execute(command::CreateUserSession::ByCredentials {
            email,
            password: SecretBox::new(Box::new(password)),
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(json!({
        "token": output.token.to_string(),
        "expires_at": output.expires_at,
        "user": api::to_json(&output.user)?,
    })))
}

/// Acknowledges a sign out.
///
/// Tokens are stateless, so the client just forgets its token.
#[expect(clippy::unused_async, reason = "`async` is required by `axum`")]
pub async fn logout() -> Json<Value> {
    api::message("Logged out successfully")
}

/// Returns the profile of the authenticated user.
pub async fn profile(ctx: Context) -> Result<Json<Value>, Error> {
    let user = ctx
        .service()
        .execute(query::user::ById::by(ctx.session().user_id))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| Error::from(NotFound::User))?;

    api::to_json(&user).map(Json)
}

/// Body of an [`update_profile`] request.
///
/// Only the listed fields can be changed by the user themselves.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    /// New first name.
    pub first_name: Option<Line>,

    /// New last name.
    pub last_name: Option<Line>,

    /// New [`Email`].
    pub email: Option<Email>,
}

/// Updates the profile of the authenticated user.
///
/// # Errors
///
/// Possible error codes:
/// - `EMAIL_OCCUPIED` - provided [`Email`] is taken by another user.
#[tracing::instrument(skip_all, fields(user_id = %ctx.session().user_id))]
pub async fn update_profile(
    ctx: Context,
    WithRejection(Json(body), _): JsonOf<ProfileUpdate>,
) -> Result<Json<Value>, Error> {
    let ProfileUpdate {
        first_name,
        last_name,
        email,
    } = body;

    let user = ctx
        .service()
        .execute(command::UpdateUserProfile {
            user_id: ctx.session().user_id,
            first_name,
            last_name,
            email,
        })
        .await
        .map_err(AsError::into_error)?;

    api::mutated("Profile updated successfully", "user", &user)
}

/// Body of a [`change_password`] request.
#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    /// Password the user signs in with now.
    pub current_password: user::Password,

    /// Password the user will sign in with.
    pub new_password: user::Password,
}

/// Changes the password of the authenticated user.
///
/// # Errors
///
/// Possible error codes:
/// - `WRONG_PASSWORD` - provided current password doesn't match.
#[tracing::instrument(skip_all, fields(user_id = %ctx.session().user_id))]
pub async fn change_password(
    ctx: Context,
    WithRejection(Json(body), _): JsonOf<PasswordChange>,
) -> Result<Json<Value>, Error> {
    let PasswordChange {
        current_password,
        new_password,
    } = body;

    _ = ctx
        .service()
        .execute(command::UpdateUserPassword {
            user_id: ctx.session().user_id,
            current_password: SecretBox::new(Box::new(current_password)),
            new_password: SecretBox::new(Box::new(new_password)),
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(api::message("Password changed successfully"))
}

/// Verifies the provided token, returning the user it belongs to.
pub async fn verify(ctx: Context) -> Result<Json<Value>, Error> {
    let user = ctx
        .service()
        .execute(query::user::ById::by(ctx.session().user_id))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| Error::from(NotFound::User))?;

    Ok(Json(json!({
        "valid": true,
        "expires_at": ctx.session().expires_at,
        "user": api::to_json(&user)?,
    })))
}

impl AsError for command::register_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EmailOccupied(_) => Some(CredentialsError::EmailOccupied.into()),
            Self::PasswordHashing(_) => None,
        }
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::WrongCredentials | Self::UserInactive(_) => {
                Some(CredentialsError::WrongCredentials.into())
            }
            Self::JsonWebTokenEncodeError(_)
            | Self::PasswordHashing(_)
            | Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::update_user_profile::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EmailOccupied(_) => Some(CredentialsError::EmailOccupied.into()),
            Self::UserNotExists(_) => Some(NotFound::User.into()),
        }
    }
}

impl AsError for command::update_user_password::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::WrongPassword => Some(CredentialsError::WrongPassword.into()),
            Self::UserNotExists(_) => Some(NotFound::User.into()),
            Self::PasswordHashing(_) => None,
        }
    }
}

define_error! {
    enum CredentialsError {
        #[code = "EMAIL_OCCUPIED"]
        #[status = BAD_REQUEST]
        #[message = "Email is already registered"]
        EmailOccupied,

        #[code = "WRONG_CREDENTIALS"]
        #[status = UNAUTHORIZED]
        #[message = "Invalid credentials"]
        WrongCredentials,

        #[code = "WRONG_PASSWORD"]
        #[status = BAD_REQUEST]
        #[message = "Current password is incorrect"]
        WrongPassword,
    }
}
