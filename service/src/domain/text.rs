//! Free-form text definitions shared across the domain.

use derive_more::{AsRef, Display, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};

/// Single line of text: trimmed, non-empty and at most
/// [`Line::MAX_LEN`] characters long.
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, Hash, Into, PartialEq, Serialize,
)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[serde(into = "String", try_from = "String")]
pub struct Line(String);

impl Line {
    /// Maximum number of characters in a [`Line`].
    pub const MAX_LEN: usize = 255;

    /// Creates a new [`Line`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `line` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    /// Creates a new [`Line`] out of the given `line`, trimming it first.
    #[must_use]
    pub fn new(line: impl Into<String>) -> Option<Self> {
        let line = line.into();
        let line = line.trim();
        Self::check(line).then(|| Self(line.to_owned()))
    }

    /// Checks whether the given `line` is a valid [`Line`].
    fn check(line: &str) -> bool {
        !line.is_empty()
            && line.chars().count() <= Self::MAX_LEN
            && !line.chars().any(char::is_control)
    }
}

impl TryFrom<String> for Line {
    type Error = &'static str;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s).ok_or("must be a non-empty single line of 255 characters at most")
    }
}

/// Multi-line text: trimmed, non-empty and at most [`Text::MAX_LEN`]
/// characters long.
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, Hash, Into, PartialEq, Serialize,
)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[serde(into = "String", try_from = "String")]
pub struct Text(String);

impl Text {
    /// Maximum number of characters in a [`Text`].
    pub const MAX_LEN: usize = 10_000;

    /// Creates a new [`Text`] out of the given `text`, trimming it first.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let text = text.trim();
        (!text.is_empty() && text.chars().count() <= Self::MAX_LEN)
            .then(|| Self(text.to_owned()))
    }
}

impl TryFrom<String> for Text {
    type Error = &'static str;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s).ok_or("must be a non-empty text of 10000 characters at most")
    }
}

#[cfg(test)]
mod spec {
    use super::{Line, Text};

    #[test]
    fn line_is_trimmed() {
        assert_eq!(
            AsRef::<str>::as_ref(&Line::new("  Acme Corp ").unwrap()),
            "Acme Corp",
        );
    }

    #[test]
    fn line_rejects_empty_and_multiline() {
        assert!(Line::new("").is_none());
        assert!(Line::new("   ").is_none());
        assert!(Line::new("first\nsecond").is_none());
        assert!(Line::new("a".repeat(Line::MAX_LEN)).is_some());
        assert!(Line::new("a".repeat(Line::MAX_LEN + 1)).is_none());
    }

    #[test]
    fn text_allows_newlines() {
        assert_eq!(
            AsRef::<str>::as_ref(&Text::new("first\nsecond\n").unwrap()),
            "first\nsecond",
        );
        assert!(Text::new("\n\t").is_none());
    }
}
