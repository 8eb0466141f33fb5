//! [`Query`] collection related to the multiple [`Material`]s.

use common::operations::By;

use crate::read;
#[cfg(doc)]
use crate::{domain::Material, Query};

use super::DatabaseQuery;

/// Queries a list of [`Material`]s.
///
/// Low-stock [`Material`]s are listed with the
/// [`read::material::list::Filter::low_stock`] flag.
pub type List = DatabaseQuery<
    By<read::material::list::Page, read::material::list::Selector>,
>;

/// Queries [`read::material::Stats`].
pub type Stats = DatabaseQuery<By<read::material::Stats, ()>>;

/// Queries distinct [`read::material::Categories`].
pub type Categories = DatabaseQuery<By<read::material::Categories, ()>>;
