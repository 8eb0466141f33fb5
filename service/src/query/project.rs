//! [`Query`] collection related to a single [`Project`].

use common::operations::By;

#[cfg(doc)]
use crate::Query;
use crate::{
    domain::{project, Project, ProjectMaterial},
    read,
};

use super::DatabaseQuery;

/// Queries a [`Project`] by its [`project::Id`].
pub type ById = DatabaseQuery<By<Option<Project>, project::Id>>;

/// Queries [`ProjectMaterial`]s of a [`Project`].
pub type Materials =
    DatabaseQuery<By<Vec<ProjectMaterial>, read::project::Materials>>;
