//! [`Invoice`] read model definition.

use common::Money;
use serde::Serialize;

#[cfg(doc)]
use crate::domain::Invoice;
use crate::{domain::invoice, read::StatusCount};

/// Aggregated statistics of [`Invoice`]s.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Stats {
    /// Total number of live [`Invoice`]s.
    pub total: i64,

    /// Number of [`Invoice`]s in every effective [`invoice::Status`].
    pub by_status: Vec<StatusCount<invoice::Status>>,

    /// Sum of all the non-cancelled [`Invoice`] totals.
    pub total_amount: Money,

    /// Sum of the paid amounts.
    pub paid_amount: Money,

    /// Sum of the [`invoice::Status::OUTSTANDING`] [`Invoice`] balances.
    pub outstanding: Money,
}

pub mod list {
    //! [`Invoice`]s list definitions.
    //!
    //! [`Invoice`]: crate::domain::Invoice

    use common::define_pagination;

    use crate::{
        domain::{client, invoice, Invoice},
        read::Search,
    };

    define_pagination!(Invoice, Filter);

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// [`Search`] over title and number.
        pub search: Option<Search>,

        /// Effective [`invoice::Status`] to select.
        pub status: Option<invoice::Status>,

        /// ID of the [`Client`] whose [`Invoice`]s to select.
        ///
        /// [`Client`]: crate::domain::Client
        pub client_id: Option<client::Id>,
    }
}
