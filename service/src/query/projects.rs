//! [`Query`] collection related to the multiple [`Project`]s.

use common::{operations::By, DateTime};

use crate::read;
#[cfg(doc)]
use crate::{domain::Project, Query};

use super::DatabaseQuery;

/// Queries a list of [`Project`]s.
pub type List = DatabaseQuery<
    By<read::project::list::Page, read::project::list::Selector>,
>;

/// Queries [`read::project::Stats`] counting the monthly ones since the
/// provided [`DateTime`].
pub type Stats = DatabaseQuery<By<read::project::Stats, DateTime>>;
