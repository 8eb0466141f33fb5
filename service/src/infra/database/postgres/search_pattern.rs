//! [`SearchPattern`] definition.

use derive_more::Display;
use postgres_types::{FromSql, ToSql};

use crate::read::Search;

/// `ILIKE` pattern matching any value containing a [`Search`] term.
#[derive(Clone, Debug, Display, Eq, FromSql, PartialEq, ToSql)]
#[postgres(transparent)]
pub struct SearchPattern(String);

impl SearchPattern {
    /// Creates a new [`SearchPattern`] out of the given [`Search`] term,
    /// escaping the `LIKE` wildcards it contains.
    #[must_use]
    pub fn new(search: &Search) -> Self {
        let escaped = search
            .as_ref()
            .replace('\\', r"\\")
            .replace('%', r"\%")
            .replace('_', r"\_");
        Self(format!("%{escaped}%"))
    }
}

#[cfg(test)]
mod spec {
    use crate::read::Search;

    use super::SearchPattern;

    #[test]
    fn wraps_and_escapes() {
        let pattern = |s| SearchPattern::new(&Search::new(s).unwrap()).0;

        assert_eq!(pattern(" roof "), "%roof%");
        assert_eq!(pattern("50%_off"), r"%50\%\_off%");
        assert_eq!(pattern(r"a\b"), r"%a\\b%");
    }
}
