//! [`Query`] collection related to a single [`Material`].

use common::operations::By;

#[cfg(doc)]
use crate::Query;
use crate::domain::{material, Material};

use super::DatabaseQuery;

/// Queries a [`Material`] by its [`material::Id`].
pub type ById = DatabaseQuery<By<Option<Material>, material::Id>>;
