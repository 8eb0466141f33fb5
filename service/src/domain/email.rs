//! [`Email`] definitions.

use std::sync::LazyLock;

use derive_more::{AsRef, Display, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Email address.
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, Hash, Into, PartialEq, Serialize,
)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[serde(into = "String", try_from = "String")]
pub struct Email(String);

impl Email {
    /// Creates a new [`Email`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `address` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Creates a new [`Email`] if the given `address` is valid.
    ///
    /// Surrounding whitespace is trimmed.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        let address = address.trim();
        Self::check(address).then(|| Self(address.to_owned()))
    }

    /// Checks whether the given `address` is a valid [`Email`].
    fn check(address: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Email`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(
                "^([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                     \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                  |\\x22([^\\x0d\\x22\\x5c\\x80-\\xff]\
                  |\\x5c[\\x00-\\x7f])*\\x22)\
                  (\\x2e([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                           \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                        |\\x22([^\\x0d\\x22\\x5c\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x22))*\\x40\
                  ([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                     \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                  |\\x5b([^\\x0d\\x5b-\\x5d\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x5d)\
                  (\\x2e([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                           \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                        |\\x5b([^\\x0d\\x5b-\\x5d\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x5d))*$",
            )
            .expect("valid regex")
        });

        let address = address.as_ref();
        address.len() <= 254 && REGEX.is_match(address)
    }
}

impl TryFrom<String> for Email {
    type Error = &'static str;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s).ok_or("invalid email address")
    }
}

#[cfg(test)]
mod spec {
    use super::Email;

    #[test]
    fn accepts_valid() {
        for address in [
            "john@example.com",
            "john.doe+crm@mail.example.co",
            "  padded@example.com ",
        ] {
            assert!(Email::new(address).is_some(), "rejected: {address}");
        }
    }

    #[test]
    fn rejects_invalid() {
        for address in ["", "john", "john@", "@example.com", "jo hn@example.com"]
        {
            assert!(Email::new(address).is_none(), "accepted: {address}");
        }
    }
}
