//! [`Client`] read model definition.
//!
//! [`Client`]: crate::domain::Client

use common::Money;
use serde::Serialize;

#[cfg(doc)]
use crate::domain::Client;

/// Aggregated statistics of [`Client`]s.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Stats {
    /// Total number of live [`Client`]s.
    pub total: i64,

    /// Number of active [`Client`]s.
    pub active: i64,

    /// Number of inactive [`Client`]s.
    pub inactive: i64,

    /// Number of [`Client`]s of the company contact type.
    pub companies: i64,

    /// Number of [`Client`]s created since the start of the current month.
    pub this_month: i64,
}

/// Business activity of a single [`Client`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Activity {
    /// Number of live projects.
    pub projects: i64,

    /// Number of live quotes.
    pub quotes: i64,

    /// Sum of the live quotes totals.
    pub quote_value: Money,
}

/// Number of a [`Client`]'s projects in a non-terminal status.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct OngoingProjects(pub i64);

pub mod list {
    //! [`Client`]s list definitions.
    //!
    //! [`Client`]: crate::domain::Client

    use common::define_pagination;

    use crate::{domain::Client, read::Search};

    define_pagination!(Client, Filter);

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// [`Search`] over name, email and company.
        pub search: Option<Search>,

        /// Whether to select only active or only inactive [`Client`]s.
        pub active: Option<bool>,
    }
}

pub mod report {
    //! [`Client`]s report selection definitions.
    //!
    //! [`Client`]: crate::domain::Client

    #[cfg(doc)]
    use crate::domain::Client;
    use crate::read::Period;

    /// Filter selecting [`Client`]s for a report.
    #[derive(Clone, Copy, Debug)]
    pub struct Filter {
        /// [`Period`] the [`Client`]s were created in.
        pub period: Period,

        /// Whether to select only active or only inactive [`Client`]s.
        pub active: Option<bool>,
    }
}
