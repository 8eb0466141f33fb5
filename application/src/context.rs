//! [`Context`]-related definitions.

use axum::{async_trait, extract::FromRequestParts, RequestPartsExt as _};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use common::DateTime;
use service::{
    command::{self, Command as _},
    domain::{
        user::{self, session},
        Email,
    },
};

#[cfg(doc)]
use crate::api::admin;
use crate::{define_error, AsError, Error, Service};

/// Context of an authenticated HTTP request.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// Current [`Session`].
    session: Session,
}

impl Context {
    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns the current [`Session`] of this [`Context`].
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the current [`Session`] of this [`Context`] if it belongs to
    /// an administrator.
    ///
    /// # Errors
    ///
    /// Errors if the current [`Session`] doesn't have the
    /// [`user::Role::Admin`].
    pub fn admin(&self) -> Result<&Session, Error> {
        if self.session.role == user::Role::Admin {
            Ok(&self.session)
        } else {
            Err(AuthError::AdminRequired.into())
        }
    }

    /// Performs the [`Session`] authentication of the provided HTTP request
    /// parts.
    ///
    /// # Errors
    ///
    /// Errors if:
    /// - the HTTP request is not authorized;
    /// - the provided authentication token is invalid or expired;
    /// - the [`User`] of the token is deactivated or deleted.
    ///
    /// [`User`]: service::domain::User
    async fn authenticate(
        service: &Service,
        parts: &mut http::request::Parts,
    ) -> Result<Session, Error> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|e| {
                if e.is_missing() {
                    Error::from(AuthError::AuthorizationRequired)
                } else {
                    Error::from(AuthError::InvalidToken)
                }
            })?;

        #[expect(unsafe_code, reason = "specified in correct header")]
        let token =
            unsafe { session::Token::new_unchecked(bearer.token().to_owned()) };
        service
            .execute(command::AuthorizeUserSession {
                token: token.clone(),
            })
            .await
            .map(|s| Session {
                user_id: s.user_id,
                email: s.email,
                role: s.role,
                token,
                expires_at: s.expires_at.coerce(),
            })
            .map_err(AsError::into_error)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let service = parts
            .extensions
            .get::<Service>()
            .cloned()
            .ok_or_else(|| Error::internal(&"missing `Service` extension"))?;

        let session = Self::authenticate(&service, parts).await?;

        Ok(Self { service, session })
    }
}

/// Authenticated user session.
#[derive(Clone, Debug)]
pub struct Session {
    /// ID of the [`User`] associated with this [`Session`].
    ///
    /// [`User`]: service::domain::User
    pub user_id: user::Id,

    /// [`Email`] the [`Session`] was signed in with.
    pub email: Email,

    /// [`user::Role`] the [`Session`] was signed in with.
    ///
    /// Only [`user::Role::Admin`] is allowed to use the [`admin`] API.
    pub role: user::Role,

    /// Authentication token.
    pub token: session::Token,

    /// [`DateTime`] when this [`Session`] expires.
    pub expires_at: DateTime,
}

impl AsError for command::authorize_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenDecodeError(_) => {
                Some(AuthError::InvalidToken.into())
            }
            Self::UserNotExists(_) | Self::UserInactive(_) => {
                Some(AuthError::UserInactive.into())
            }
        }
    }
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,

        #[code = "INVALID_TOKEN"]
        #[status = UNAUTHORIZED]
        #[message = "Invalid or expired token"]
        InvalidToken,

        #[code = "USER_INACTIVE"]
        #[status = UNAUTHORIZED]
        #[message = "User is inactive or does not exist"]
        UserInactive,

        #[code = "ADMIN_REQUIRED"]
        #[status = FORBIDDEN]
        #[message = "Administrator role required"]
        AdminRequired,
    }
}
