//! [`Command`] for creating a new [`Project`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        client, project,
        text::{Line, Text},
        Client, Project,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Project`].
///
/// A new [`Project`] always starts in [`project::Status::Planning`] with no
/// progress.
#[derive(Clone, Debug)]
pub struct CreateProject {
    /// ID of the [`Client`] the new [`Project`] is done for.
    pub client_id: client::Id,

    /// Name of the new [`Project`].
    pub name: Line,

    /// Description of the new [`Project`].
    pub description: Option<Text>,

    /// [`project::Priority`] of the new [`Project`].
    pub priority: Option<project::Priority>,

    /// [`project::Kind`] of the new [`Project`].
    pub kind: Option<project::Kind>,

    /// Street address of the construction site.
    pub address: Option<Line>,

    /// City of the construction site.
    pub city: Option<Line>,

    /// State of the construction site.
    pub state: Option<Line>,

    /// ZIP code of the construction site.
    pub zip_code: Option<Line>,

    /// Planned start of the works.
    pub start_date: Option<project::StartDateTime>,

    /// Planned end of the works.
    pub end_date: Option<project::EndDateTime>,

    /// Budget agreed with the [`Client`].
    pub budget: Option<Money>,

    /// Estimated cost of the works.
    pub estimated_cost: Option<Money>,

    /// Cost already incurred.
    pub actual_cost: Option<Money>,

    /// Free-form notes.
    pub notes: Option<Text>,
}

impl<Db> Command<CreateProject> for Service<Db>
where
    Db: Database<
            Select<By<Option<Client>, client::Id>>,
            Ok = Option<Client>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<Project>, &'l project::Code>>,
            Ok = Option<Project>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<Project>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Project;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateProject,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateProject {
            client_id,
            name,
            description,
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
            notes,
        } = cmd;

        drop(
            self.database()
                .execute(Select(By::<Option<Client>, _>::new(client_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::ClientNotExists(client_id))
                .map_err(tracerr::wrap!())?,
        );

        let now = DateTime::now();
        let code = project::Code::generate(now.coerce());
        let taken = self
            .database()
            .execute(Select(By::<Option<Project>, _>::new(&code)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if taken.is_some() {
            return Err(tracerr::new!(E::CodeOccupied(code)));
        }

        let project = Project {
            id: project::Id::new(),
            client_id,
            code,
            name,
            description,
            status: project::Status::Planning,
            priority: priority.unwrap_or_default(),
            kind: kind.unwrap_or_default(),
            address,
            city,
            state,
            zip_code,
            start_date,
            end_date,
            budget: budget.unwrap_or(Money::ZERO).round(),
            estimated_cost: estimated_cost.unwrap_or(Money::ZERO).round(),
            actual_cost: actual_cost.unwrap_or(Money::ZERO).round(),
            progress: project::Progress::default(),
            notes,
            created_at: now.coerce(),
            updated_at: now.coerce(),
            deleted_at: None,
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(project.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(|e| {
                if matches!(
                    e.as_ref(),
                    E::Db(db) if db.is_unique_violation("projects_code_key"),
                ) {
                    tracerr::new!(E::CodeOccupied(project.code.clone()))
                } else {
                    e
                }
            })
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(project)
    }
}

/// Error of [`CreateProject`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Client`] doesn't exist.
    #[display("`Client(id: {_0})` does not exist")]
    #[from(ignore)]
    ClientNotExists(#[error(not(source))] client::Id),

    /// Generated [`project::Code`] collided with an existing one.
    #[display("`Project` code `{_0}` is already taken, retry later")]
    #[from(ignore)]
    CodeOccupied(#[error(not(source))] project::Code),
}

#[cfg(test)]
mod spec {
    use common::{DateTime, Money};

    use crate::{
        command::{double::Memory, Command as _},
        domain::{client, project, text::Line},
    };

    use super::{CreateProject, ExecutionError};

    fn warehouse(client_id: client::Id) -> CreateProject {
        CreateProject {
            client_id,
            name: Line::new("Warehouse").unwrap(),
            description: None,
            priority: None,
            kind: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            start_date: None,
            end_date: None,
            budget: Some("1000.005".parse().unwrap()),
            estimated_cost: None,
            actual_cost: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn starts_planning_with_generated_code() {
        let service = Memory::service();
        let client = service.database().client("Acme", None);

        let created = service.execute(warehouse(client.id)).await.unwrap();

        let code = created.code.to_string();
        assert!(code.starts_with("PRJ-"), "unexpected code: {code}");
        assert_eq!(code.len(), "PRJ-20240315-4000".len());
        assert_eq!(created.status, project::Status::Planning);
        assert_eq!(created.budget, "1000.01".parse::<Money>().unwrap());
        assert!(
            service.database().state().projects.contains_key(&created.id),
        );
    }

    #[tokio::test]
    async fn rejects_occupied_code() {
        let service = Memory::service();
        let client = service.database().client("Acme", None);
        let now = DateTime::now().unix_timestamp();
        for at in now..now + 10 {
            let p = service
                .database()
                .project(client.id, project::Status::InProgress);
            service
                .database()
                .state()
                .projects
                .get_mut(&p.id)
                .unwrap()
                .code = project::Code::generate(
                DateTime::from_unix_timestamp(at).unwrap().coerce(),
            );
        }

        let err = service.execute(warehouse(client.id)).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::CodeOccupied(_)));
        assert_eq!(service.database().state().projects.len(), 10);
    }

    #[tokio::test]
    async fn requires_existing_client() {
        let service = Memory::service();

        let err = service
            .execute(warehouse(client::Id::new()))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::ClientNotExists(_),
        ));
    }
}
