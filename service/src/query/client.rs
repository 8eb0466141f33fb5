//! [`Query`] collection related to a single [`Client`].

use common::operations::By;

#[cfg(doc)]
use crate::Query;
use crate::domain::{client, Client};

use super::DatabaseQuery;

/// Queries a [`Client`] by its [`client::Id`].
pub type ById = DatabaseQuery<By<Option<Client>, client::Id>>;
