//! [`Command`] for updating a profile of a [`User`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{text::Line, user, Email, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating a profile of a [`User`].
///
/// Only the provided fields are updated.
#[derive(Clone, Debug)]
pub struct UpdateUserProfile {
    /// ID of the [`User`] whose profile should be updated.
    pub user_id: user::Id,

    /// New first name of the [`User`].
    pub first_name: Option<Line>,

    /// New last name of the [`User`].
    pub last_name: Option<Line>,

    /// New [`Email`] of the [`User`].
    pub email: Option<Email>,
}

impl<Db> Command<UpdateUserProfile> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<User>, &'l Email>>,
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
        cmd: UpdateUserProfile,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUserProfile {
            user_id,
            first_name,
            last_name,
            email,
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

        if let Some(email) = email {
            let other = tx
                .execute(Select(By::<Option<User>, _>::new(&email)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if other.is_some_and(|u| u.id != user_id) {
                return Err(tracerr::new!(E::EmailOccupied(email)));
            }
            user.email = email;
        }
        if let Some(first_name) = first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = last_name {
            user.last_name = last_name;
        }
        user.updated_at = DateTime::now().coerce();

        tx.execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(|e| {
                if matches!(
                    e.as_ref(),
                    E::Db(db) if db.is_unique_violation("users_email_key"),
                ) {
                    tracerr::new!(E::EmailOccupied(user.email.clone()))
                } else {
                    e
                }
            })?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(user)
    }
}

/// Error of [`UpdateUserProfile`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Email`] is already occupied by another [`User`].
    #[display("`{_0}` email is occupied")]
    #[from(ignore)]
    EmailOccupied(#[error(not(source))] Email),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
