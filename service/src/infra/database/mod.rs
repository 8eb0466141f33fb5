//! [`Database`]-related implementations.

#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),
}

impl Error {
    /// Checks whether this [`Error`] is a violation of the unique constraint
    /// with the provided name.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: &str) -> bool {
        match *self {
            #[cfg(feature = "postgres")]
            Self::Postgres(ref e) => e.is_unique_violation(Some(constraint)),
        }
    }

    /// Checks whether this [`Error`] is a violation of any unique constraint.
    #[must_use]
    pub fn is_any_unique_violation(&self) -> bool {
        match *self {
            #[cfg(feature = "postgres")]
            Self::Postgres(ref e) => e.is_unique_violation(None),
        }
    }
}
