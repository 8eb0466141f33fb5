//! [`Command`] for registering a new [`User`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Password, Role};
use crate::{
    domain::{text::Line, user, Email, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for registering a new [`User`].
#[derive(Clone, Debug)]
pub struct RegisterUser {
    /// [`Email`] of a new [`User`].
    pub email: Email,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,

    /// First name of a new [`User`].
    pub first_name: Line,

    /// Last name of a new [`User`].
    pub last_name: Line,

    /// [`Role`] of a new [`User`].
    ///
    /// [`Role::User`] if [`None`].
    pub role: Option<user::Role>,
}

impl<Db> Command<RegisterUser> for Service<Db>
where
    Db: for<'l> Database<
            Select<By<Option<User>, &'l Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: RegisterUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RegisterUser {
            email,
            password,
            first_name,
            last_name,
            role,
        } = cmd;

        let u = self
            .database()
            .execute(Select(By::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if u.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }

        let password_hash =
            user::PasswordHash::hash(password.expose_secret().clone())
                .await
                .map_err(tracerr::from_and_wrap!(=> E))?;

        let now = DateTime::now();
        let user = User {
            id: user::Id::new(),
            email,
            password_hash,
            first_name,
            last_name,
            role: role.unwrap_or_default(),
            is_active: true,
            created_at: now.coerce(),
            updated_at: now.coerce(),
            deleted_at: None,
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(user.clone()))
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
            })
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(user)
    }
}

/// Error of [`RegisterUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Email`] is already occupied by another [`User`].
    #[display("`{_0}` email is occupied")]
    #[from(ignore)]
    EmailOccupied(#[error(not(source))] Email),

    /// [`Password`] hashing failed.
    #[display("Failed to hash the password: {_0}")]
    PasswordHashing(user::HashingError),
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{
        command::{double::Memory, Command as _},
        domain::{
            text::Line,
            user::{Password, Role},
            Email,
        },
    };

    use super::{ExecutionError, RegisterUser};

    fn ana(email: &str) -> RegisterUser {
        RegisterUser {
            email: Email::new(email).unwrap(),
            password: SecretBox::new(Box::new(
                Password::new("correct-horse").unwrap(),
            )),
            first_name: Line::new("Ana").unwrap(),
            last_name: Line::new("Builder").unwrap(),
            role: None,
        }
    }

    #[tokio::test]
    async fn registers_active_user_with_hashed_password() {
        let service = Memory::service();

        let user = service.execute(ana("ana@example.com")).await.unwrap();

        assert!(user.is_active);
        assert_eq!(user.role, Role::default());
        assert!(
            user.password_hash
                .verify(&Password::new("correct-horse").unwrap()),
        );
        assert!(
            !user.password_hash
                .verify(&Password::new("wrong-horse").unwrap()),
        );
        assert!(service.database().state().users.contains_key(&user.id));
    }

    #[tokio::test]
    async fn rejects_occupied_email_regardless_of_case() {
        let service = Memory::service();
        _ = service.database().user("ana@example.com", "whatever1", true);

        let err = service.execute(ana("ANA@Example.com")).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::EmailOccupied(_)));
        assert_eq!(service.database().state().users.len(), 1);
    }
}
