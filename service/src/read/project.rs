//! [`Project`] read model definition.

use common::Money;
use rust_decimal::Decimal;
use serde::Serialize;

#[cfg(doc)]
use crate::domain::Project;
use crate::{domain::project, read::StatusCount};

/// Aggregated statistics of [`Project`]s.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Stats {
    /// Total number of live [`Project`]s.
    pub total: i64,

    /// Number of [`Project`]s in every [`project::Status`].
    pub by_status: Vec<StatusCount<project::Status>>,

    /// Sum of the [`Project`] budgets.
    pub total_budget: Money,

    /// Sum of the [`Project`] estimated costs.
    pub total_estimated_cost: Money,

    /// Sum of the [`Project`] actual costs.
    pub total_actual_cost: Money,

    /// Average progress of the ongoing [`Project`]s, in percents.
    pub average_progress: Decimal,

    /// Number of [`Project`]s created since the start of the current month.
    pub this_month: i64,
}

impl Stats {
    /// Returns the number of [`Project`]s in the provided `statuses`.
    #[must_use]
    pub fn count(&self, statuses: &[project::Status]) -> i64 {
        self.by_status
            .iter()
            .filter(|c| statuses.contains(&c.status))
            .map(|c| c.count)
            .sum()
    }
}

/// Selector of [`Project`]s with a deadline inside a [`Period`].
///
/// Only [`project::Status::SCHEDULED`] [`Project`]s are selected, ordered by
/// their end date.
///
/// [`Period`]: crate::read::Period
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Deadlines(pub crate::read::Period);

/// Selector of materials of a single [`Project`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Materials(pub project::Id);

/// Total cost of the planned materials of [`Project`]s.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MaterialsCost(pub std::collections::HashMap<project::Id, Money>);

pub mod list {
    //! [`Project`]s list definitions.
    //!
    //! [`Project`]: crate::domain::Project

    use common::define_pagination;

    use crate::{
        domain::{client, project, Project},
        read::Search,
    };

    define_pagination!(Project, Filter);

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// [`Search`] over name, description and code.
        pub search: Option<Search>,

        /// [`project::Status`] to select.
        pub status: Option<project::Status>,

        /// ID of the [`Client`] whose [`Project`]s to select.
        ///
        /// [`Client`]: crate::domain::Client
        pub client_id: Option<client::Id>,

        /// [`project::Priority`] to select.
        pub priority: Option<project::Priority>,
    }
}

pub mod report {
    //! [`Project`]s report selection definitions.
    //!
    //! [`Project`]: crate::domain::Project

    #[cfg(doc)]
    use crate::domain::Project;
    use crate::{
        domain::{client, project},
        read::Period,
    };

    /// Filter selecting [`Project`]s for a report.
    #[derive(Clone, Copy, Debug)]
    pub struct Filter {
        /// [`Period`] the [`Project`]s were created in.
        pub period: Period,

        /// [`project::Status`] to select.
        pub status: Option<project::Status>,

        /// ID of the [`Client`] whose [`Project`]s to select.
        ///
        /// [`Client`]: crate::domain::Client
        pub client_id: Option<client::Id>,
    }
}
