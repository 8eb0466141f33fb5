//! Read entities definitions.

pub mod activity;
pub mod client;
pub mod invoice;
pub mod material;
pub mod project;
pub mod quote;
pub mod user;

use common::DateTime;
use derive_more::{AsRef, Display};
use serde::Serialize;

pub use self::activity::Activity;

/// Free-form search term: trimmed and non-empty.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
pub struct Search(String);

impl Search {
    /// Creates a new [`Search`] term, if the provided `input` contains
    /// anything except whitespace.
    #[must_use]
    pub fn new(input: impl AsRef<str>) -> Option<Self> {
        let input = input.as_ref().trim();
        (!input.is_empty()).then(|| Self(input.to_owned()))
    }
}

/// Half-open `[start; end)` period of time.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Period {
    /// Inclusive start of this [`Period`].
    #[serde(rename = "start_date")]
    pub start: DateTime,

    /// Exclusive end of this [`Period`].
    #[serde(rename = "end_date")]
    pub end: DateTime,
}

impl Period {
    /// Creates a new [`Period`] covering the provided dates inclusively.
    #[must_use]
    pub fn of_days(first: DateTime, last: DateTime) -> Self {
        Self {
            start: first,
            end: last.next_day(),
        }
    }

    /// Creates a new [`Period`] out of optional inclusive days.
    ///
    /// A missing `first` day opens the [`Period`] from the Unix epoch, and a
    /// missing `last` one closes it with the `today`.
    #[must_use]
    pub fn between(
        first: Option<DateTime>,
        last: Option<DateTime>,
        today: DateTime,
    ) -> Self {
        Self::of_days(
            first.unwrap_or(DateTime::UNIX_EPOCH),
            last.unwrap_or(today),
        )
    }

    /// Indicates whether the provided moment falls into this [`Period`].
    #[must_use]
    pub fn contains<Of: ?Sized>(&self, at: common::DateTimeOf<Of>) -> bool {
        let at = at.coerce();
        self.start <= at && at < self.end
    }
}

/// Number of entities having some status.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct StatusCount<S> {
    /// Status the entities have.
    pub status: S,

    /// Number of entities.
    pub count: i64,
}

/// Builds a [`StatusCount`] for every one of `all` statuses, in order,
/// filling the missing ones with zeros.
pub fn status_counts<S: Copy + Eq>(
    all: &[S],
    counted: impl IntoIterator<Item = (S, i64)>,
) -> Vec<StatusCount<S>> {
    let counted = counted.into_iter().collect::<Vec<_>>();
    all.iter()
        .map(|&status| StatusCount {
            status,
            count: counted
                .iter()
                .filter(|(s, _)| *s == status)
                .map(|(_, c)| c)
                .sum(),
        })
        .collect()
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::domain::project;

    use super::{status_counts, Period, Search, StatusCount};

    #[test]
    fn search_ignores_blank_input() {
        assert!(Search::new("  ").is_none());
        assert_eq!(Search::new(" roof ").unwrap().as_ref(), "roof");
    }

    #[test]
    fn period_of_days_includes_last_day() {
        let period = Period::of_days(
            DateTime::parse("2024-03-01").unwrap(),
            DateTime::parse("2024-03-31").unwrap(),
        );

        assert!(period.contains(DateTime::parse("2024-03-31T23:59:59Z").unwrap()));
        assert!(!period.contains(DateTime::parse("2024-04-01").unwrap()));
        assert!(!period.contains(DateTime::parse("2024-02-29T23:59:59Z").unwrap()));
    }

    #[test]
    fn open_period_bounds() {
        let today = DateTime::parse("2024-03-15T10:00:00Z").unwrap();
        let period = Period::between(None, None, today);

        assert_eq!(period.start, DateTime::UNIX_EPOCH);
        assert_eq!(period.end, DateTime::parse("2024-03-16").unwrap());
        assert!(period.contains(today));
    }

    #[test]
    fn status_counts_are_zero_filled() {
        use project::Status as S;

        let counts = status_counts(S::ALL, [(S::Completed, 2), (S::Planning, 5)]);

        assert_eq!(counts.len(), S::ALL.len());
        assert_eq!(
            counts.first(),
            Some(&StatusCount {
                status: S::Planning,
                count: 5,
            }),
        );
        assert_eq!(
            counts.iter().find(|c| c.status == S::OnHold).map(|c| c.count),
            Some(0),
        );
    }
}
