//! [`Command`] for updating a [`Project`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        project,
        text::{Line, Text},
        Project,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating a [`Project`].
///
/// Only the provided fields are updated. Any [`project::Status`] may be set.
#[derive(Clone, Debug, Default)]
pub struct UpdateProject {
    /// ID of the [`Project`] to update.
    pub project_id: project::Id,

    /// New name.
    pub name: Option<Line>,

    /// New description.
    pub description: Option<Text>,

    /// New [`project::Status`].
    pub status: Option<project::Status>,

    /// New [`project::Priority`].
    pub priority: Option<project::Priority>,

    /// New [`project::Kind`].
    pub kind: Option<project::Kind>,

    /// New street address of the construction site.
    pub address: Option<Line>,

    /// New city of the construction site.
    pub city: Option<Line>,

    /// New state of the construction site.
    pub state: Option<Line>,

    /// New ZIP code of the construction site.
    pub zip_code: Option<Line>,

    /// New planned start of the works.
    pub start_date: Option<project::StartDateTime>,

    /// New planned end of the works.
    pub end_date: Option<project::EndDateTime>,

    /// New budget.
    pub budget: Option<Money>,

    /// New estimated cost.
    pub estimated_cost: Option<Money>,

    /// New actual cost.
    pub actual_cost: Option<Money>,

    /// New [`project::Progress`].
    pub progress: Option<project::Progress>,

    /// New notes.
    pub notes: Option<Text>,
}

impl<Db> Command<UpdateProject> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Project>, project::Id>>,
            Ok = Option<Project>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Project, project::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<Project>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Project;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateProject,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateProject {
            project_id,
            name,
            description,
            status,
            priority,
            kind,
            address,
            city,
            state,
            zip_code,
            start_date,
            end_date,
            budget,
            estimated_cost,
            actual_cost,
            progress,
            notes,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `Project`.
        tx.execute(Lock(By::new(project_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut project = tx
            .execute(Select(By::<Option<Project>, _>::new(project_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ProjectNotExists(project_id))
            .map_err(tracerr::wrap!())?;

        if let Some(name) = name {
            project.name = name;
        }
        if let Some(description) = description {
            project.description = Some(description);
        }
        if let Some(status) = status {
            project.status = status;
        }
        if let Some(priority) = priority {
            project.priority = priority;
        }
        if let Some(kind) = kind {
            project.kind = kind;
        }
        if let Some(address) = address {
            project.address = Some(address);
        }
        if let Some(city) = city {
            project.city = Some(city);
        }
        if let Some(state) = state {
            project.state = Some(state);
        }
        if let Some(zip_code) = zip_code {
            project.zip_code = Some(zip_code);
        }
        if let Some(start_date) = start_date {
            project.start_date = Some(start_date);
        }
        if let Some(end_date) = end_date {
            project.end_date = Some(end_date);
        }
        if let Some(budget) = budget {
            project.budget = budget.round();
        }
        if let Some(estimated_cost) = estimated_cost {
            project.estimated_cost = estimated_cost.round();
        }
        if let Some(actual_cost) = actual_cost {
            project.actual_cost = actual_cost.round();
        }
        if let Some(progress) = progress {
            project.progress = progress;
        }
        if let Some(notes) = notes {
            project.notes = Some(notes);
        }
        project.updated_at = DateTime::now().coerce();

        tx.execute(Update(project.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(project)
    }
}

/// Error of [`UpdateProject`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Project`] doesn't exist.
    #[display("`Project(id: {_0})` does not exist")]
    #[from(ignore)]
    ProjectNotExists(#[error(not(source))] project::Id),
}
