//! [`Command`] for deleting a [`Client`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{client, Client},
    infra::{database, Database},
    read::client::OngoingProjects,
    Service,
};

use super::Command;

/// [`Command`] for (softly) deleting a [`Client`].
///
/// A [`Client`] having projects in a non-terminal status cannot be deleted.
#[derive(Clone, Copy, Debug, From)]
pub struct DeleteClient {
    /// ID of the [`Client`] to delete.
    pub client_id: client::Id,
}

impl<Db> Command<DeleteClient> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Client>, client::Id>>,
            Ok = Option<Client>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<OngoingProjects, client::Id>>,
            Ok = OngoingProjects,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Client, client::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<Client>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Client;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteClient) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteClient { client_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `Client`.
        tx.execute(Lock(By::new(client_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut client = tx
            .execute(Select(By::<Option<Client>, _>::new(client_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ClientNotExists(client_id))
            .map_err(tracerr::wrap!())?;

        let OngoingProjects(ongoing) = tx
            .execute(Select(By::<OngoingProjects, _>::new(client_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if ongoing > 0 {
            return Err(tracerr::new!(E::HasOngoingProjects(ongoing)));
        }

        client.deleted_at = Some(DateTime::now().coerce());
        tx.execute(Update(client.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(client)
    }
}

/// Error of [`DeleteClient`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Client`] doesn't exist.
    #[display("`Client(id: {_0})` does not exist")]
    #[from(ignore)]
    ClientNotExists(#[error(not(source))] client::Id),

    /// [`Client`] still has projects in a non-terminal status.
    #[display("`Client` has {_0} ongoing projects")]
    #[from(ignore)]
    HasOngoingProjects(#[error(not(source))] i64),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{double::Memory, Command as _},
        domain::project::Status,
    };

    use super::{DeleteClient, ExecutionError};

    #[tokio::test]
    async fn guarded_by_ongoing_projects() {
        for status in [Status::Planning, Status::InProgress, Status::OnHold] {
            let service = Memory::service();
            let client = service.database().client("ACME", None);
            _ = service.database().project(client.id, status);

            let err = service
                .execute(DeleteClient {
                    client_id: client.id,
                })
                .await
                .unwrap_err();

            assert!(
                matches!(err.as_ref(), ExecutionError::HasOngoingProjects(1)),
                "{status} project must guard the deletion",
            );
            assert!(service.database().state().clients[&client.id]
                .deleted_at
                .is_none());
        }
    }

    #[tokio::test]
    async fn allowed_with_finished_projects() {
        let service = Memory::service();
        let client = service.database().client("ACME", None);
        _ = service.database().project(client.id, Status::Completed);
        _ = service.database().project(client.id, Status::Cancelled);

        let deleted = service
            .execute(DeleteClient {
                client_id: client.id,
            })
            .await
            .unwrap();

        assert!(deleted.deleted_at.is_some());
        assert!(service.database().state().clients[&client.id]
            .deleted_at
            .is_some());
    }
}
