//! [`Command`] for updating a [`user::Password`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::Password;
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating a [`user::Password`].
#[derive(Clone, Debug)]
pub struct UpdateUserPassword {
    /// ID of the [`User`] whose [`Password`] should be updated.
    pub user_id: user::Id,

    /// Current [`Password`] of the [`User`].
    pub current_password: SecretBox<user::Password>,

    /// New [`Password`] of the [`User`].
    pub new_password: SecretBox<user::Password>,
}

impl<Db> Command<UpdateUserPassword> for Service<Db>
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

    async fn execute(
        &self,
        cmd: UpdateUserPassword,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUserPassword {
            user_id,
            current_password,
            new_password,
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
        let matches = user
            .password_hash
            .matches(current_password.expose_secret().clone())
            .await
            .map_err(tracerr::from_and_wrap!(=> E))?;
        if !matches {
            return Err(tracerr::new!(E::WrongPassword));
        }

        user.password_hash =
            user::PasswordHash::hash(new_password.expose_secret().clone())
                .await
                .map_err(tracerr::from_and_wrap!(=> E))?;
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

/// Error of [`UpdateUserPassword`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Password`] hashing failed.
    #[display("Failed to hash the password: {_0}")]
    PasswordHashing(user::HashingError),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),

    /// Wrong current [`Password`] provided.
    #[display("Wrong current password")]
    #[from(ignore)]
    WrongPassword,
}
