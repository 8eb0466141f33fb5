//! [`Quote`] read model definition.

use std::collections::BTreeMap;

use common::{Money, YearMonth};
use serde::Serialize;

#[cfg(doc)]
use crate::domain::Quote;
use crate::{domain::quote, read::StatusCount};

/// Aggregated statistics of [`Quote`]s.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Stats {
    /// Total number of live [`Quote`]s.
    pub total: i64,

    /// Number of [`Quote`]s in every stored [`quote::Status`].
    pub by_status: Vec<StatusCount<quote::Status>>,

    /// Sum of all the [`Quote`] totals.
    pub total_value: Money,

    /// Sum of the [`quote::Status::Accepted`] [`Quote`] totals.
    pub accepted_value: Money,

    /// Sum of the [`quote::Status::PENDING`] [`Quote`] totals.
    pub pending_value: Money,

    /// Number of [`Quote`]s created since the start of the current month.
    pub this_month: i64,
}

impl Stats {
    /// Returns the number of [`Quote`]s in the provided `statuses`.
    #[must_use]
    pub fn count(&self, statuses: &[quote::Status]) -> i64 {
        self.by_status
            .iter()
            .filter(|c| statuses.contains(&c.status))
            .map(|c| c.count)
            .sum()
    }
}

/// Revenue of [`quote::Status::Accepted`] [`Quote`]s grouped by the month
/// they were created in.
///
/// Months without accepted [`Quote`]s are absent.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MonthlyRevenue(pub BTreeMap<YearMonth, Money>);

impl MonthlyRevenue {
    /// Returns the revenue of the provided month.
    #[must_use]
    pub fn of(&self, month: YearMonth) -> Money {
        self.0.get(&month).copied().unwrap_or_default()
    }
}

pub mod list {
    //! [`Quote`]s list definitions.
    //!
    //! [`Quote`]: crate::domain::Quote

    use common::define_pagination;

    use crate::{
        domain::{client, project, quote, Quote},
        read::Search,
    };

    define_pagination!(Quote, Filter);

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// [`Search`] over title and number.
        pub search: Option<Search>,

        /// Effective [`quote::Status`] to select.
        pub status: Option<quote::Status>,

        /// ID of the [`Client`] whose [`Quote`]s to select.
        ///
        /// [`Client`]: crate::domain::Client
        pub client_id: Option<client::Id>,

        /// ID of the [`Project`] whose [`Quote`]s to select.
        ///
        /// [`Project`]: crate::domain::Project
        pub project_id: Option<project::Id>,
    }
}

pub mod report {
    //! [`Quote`]s report selection definitions.
    //!
    //! [`Quote`]: crate::domain::Quote

    #[cfg(doc)]
    use crate::domain::Quote;
    use crate::{
        domain::{client, quote},
        read::Period,
    };

    /// Filter selecting [`Quote`]s for a report.
    #[derive(Clone, Copy, Debug)]
    pub struct Filter {
        /// [`Period`] the [`Quote`]s were created in.
        pub period: Period,

        /// Stored [`quote::Status`] to select.
        pub status: Option<quote::Status>,

        /// ID of the [`Client`] whose [`Quote`]s to select.
        ///
        /// [`Client`]: crate::domain::Client
        pub client_id: Option<client::Id>,
    }
}
