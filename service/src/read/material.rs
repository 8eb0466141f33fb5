//! [`Material`] read model definition.

use common::Money;
use serde::Serialize;

#[cfg(doc)]
use crate::domain::Material;
use crate::domain::text::Line;

/// Aggregated statistics of [`Material`]s.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Stats {
    /// Total number of live [`Material`]s.
    pub total: i64,

    /// Number of active [`Material`]s.
    pub active: i64,

    /// Number of active [`Material`]s low on stock.
    pub low_stock: i64,

    /// Number of distinct categories.
    pub categories: i64,

    /// Value of the stock of active [`Material`]s.
    pub inventory_value: Money,
}

/// Distinct categories of live [`Material`]s, sorted alphabetically.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Categories(pub Vec<Line>);

/// Number of project materials referencing a [`Material`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct References(pub i64);

pub mod list {
    //! [`Material`]s list definitions.
    //!
    //! [`Material`]: crate::domain::Material

    use common::define_pagination;

    use crate::{
        domain::{text::Line, Material},
        read::Search,
    };

    define_pagination!(Material, Filter);

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// [`Search`] over name, description and SKU.
        pub search: Option<Search>,

        /// Category to select.
        pub category: Option<Line>,

        /// Whether to select only active or only inactive [`Material`]s.
        pub active: Option<bool>,

        /// Whether to select only [`Material`]s low on stock.
        pub low_stock: bool,
    }
}

pub mod report {
    //! [`Material`]s report selection definitions.
    //!
    //! [`Material`]: crate::domain::Material

    #[cfg(doc)]
    use crate::domain::Material;
    use crate::domain::text::Line;

    /// Filter selecting live [`Material`]s for a report.
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// Category to select.
        pub category: Option<Line>,

        /// Whether to select only [`Material`]s low on stock.
        pub low_stock: bool,
    }
}
