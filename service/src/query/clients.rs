//! [`Query`] collection related to the multiple [`Client`]s.

use common::{operations::By, DateTime};

use crate::read;
#[cfg(doc)]
use crate::{domain::Client, Query};

use super::DatabaseQuery;

/// Queries a list of [`Client`]s.
pub type List =
    DatabaseQuery<By<read::client::list::Page, read::client::list::Selector>>;

/// Queries [`read::client::Stats`] counting the monthly ones since the
/// provided [`DateTime`].
pub type Stats = DatabaseQuery<By<read::client::Stats, DateTime>>;
