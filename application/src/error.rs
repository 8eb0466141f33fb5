//! [`Error`]-related definitions.

use std::fmt;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::typed_header::TypedHeaderRejection;
use derive_more::Error as StdError;
use itertools::Itertools as _;
use serde::Serialize;
use service::infra::database;
use tracerr::{Trace, Traced};
use tracing as log;

/// Defines a new error type.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error type.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        #[repr(u16)]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                match err {
                    $(
                        $name::$variant => Self {
                            code: $code,
                            status_code: ::http::StatusCode::$status_code,
                            message: $message.to_string(),
                            backtrace: None,
                        },
                    )*
                }
            }
        }
    };
}

/// HTTP API [`Error`].
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// Backtrace of this [`Error`].
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// [`Error`] message.
    pub message: String,
}

impl Error {
    /// Create a new [`Error`] representing an internal server error.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self {
            code: "INTERNAL_SERVER_ERROR",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            backtrace: None,
        }
    }

    /// Creates a new [`Error`] of a malformed request.
    #[must_use]
    pub fn bad_request(msg: &impl ToString) -> Self {
        Self {
            code: "BAD_REQUEST",
            status_code: http::StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            backtrace: None,
        }
    }

    /// Creates a new [`Error`] of a missing entity.
    #[must_use]
    pub fn not_found(msg: &impl ToString) -> Self {
        Self {
            code: "NOT_FOUND",
            status_code: http::StatusCode::NOT_FOUND,
            message: msg.to_string(),
            backtrace: None,
        }
    }

    /// Creates a new [`Error`] of a request conflicting with the current
    /// state of the data.
    ///
    /// Conflicts are reported as bad requests.
    #[must_use]
    pub fn conflict(msg: &impl ToString) -> Self {
        Self {
            code: "CONFLICT",
            status_code: http::StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            backtrace: None,
        }
    }

    /// Creates a new [`Error`] of an unauthenticated request.
    #[must_use]
    pub fn unauthorized(msg: &impl ToString) -> Self {
        Self {
            code: "UNAUTHORIZED",
            status_code: http::StatusCode::UNAUTHORIZED,
            message: msg.to_string(),
            backtrace: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            backtrace,
            message,
        } = self;

        write!(
            f,
            "[{code}]: {message}{}",
            backtrace
                .iter()
                .format_with("\n", |trace, f| f(&format_args!("{trace}"))),
        )
    }
}

/// JSON body of an [`Error`] response.
#[derive(Debug, Serialize)]
struct Body {
    /// Human-readable message.
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let message = if self.status_code.is_server_error() {
            log::error!("{self}");
            "Internal server error".to_owned()
        } else {
            self.message
        };
        (self.status_code, Json(Body { error: message })).into_response()
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }

    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error().unwrap_or_else(|| Error {
            backtrace: Some(self.trace().clone()),
            ..Error::internal(&self)
        })
    }
}

impl AsError for TypedHeaderRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request(self))
    }
}

impl AsError for JsonRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request(&self.body_text()))
    }
}

impl AsError for QueryRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request(&self.body_text()))
    }
}

impl AsError for PathRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request(&self.body_text()))
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        self.is_any_unique_violation()
            .then(|| Error::conflict(&"Record with such unique data exists"))
    }
}

impl From<JsonRejection> for Error {
    fn from(e: JsonRejection) -> Self {
        e.into_error()
    }
}

impl From<QueryRejection> for Error {
    fn from(e: QueryRejection) -> Self {
        e.into_error()
    }
}

impl From<PathRejection> for Error {
    fn from(e: PathRejection) -> Self {
        e.into_error()
    }
}

#[cfg(test)]
mod spec {
    use axum::response::IntoResponse as _;

    use super::Error;

    #[test]
    fn hides_internal_message() {
        let resp = Error::internal(&"connection refused").into_response();

        assert_eq!(resp.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn conflict_is_bad_request() {
        let err = Error::conflict(&"taken");

        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "[CONFLICT]: taken");
    }
}
