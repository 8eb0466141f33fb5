//! [`Command`] for updating a [`User`] on behalf of an administrator.

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::Role;
use crate::{
    domain::{text::Line, user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating a [`User`] on behalf of an administrator.
#[derive(Clone, Debug)]
pub struct UpdateUser {
    /// ID of the [`User`] to update.
    pub user_id: user::Id,

    /// New first name of the [`User`].
    pub first_name: Option<Line>,

    /// New last name of the [`User`].
    pub last_name: Option<Line>,

    /// New [`Role`] of the [`User`].
    pub role: Option<user::Role>,
}

impl<Db> Command<UpdateUser> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<User, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<User>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UpdateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUser {
            user_id,
            first_name,
            last_name,
            role,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `User`.
        tx.execute(Lock(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut user = tx
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;
        if first_name.is_none() && last_name.is_none() && role.is_none() {
            return Ok(user);
        }

        if let Some(first_name) = first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = last_name {
            user.last_name = last_name;
        }
        if let Some(role) = role {
            user.role = role;
        }
        user.updated_at = DateTime::now().coerce();

        tx.execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(user)
    }
}

/// Error of [`UpdateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
