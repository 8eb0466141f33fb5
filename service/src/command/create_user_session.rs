//! [`Command`] for creating a [`Session`].

use common::{
    operations::{By, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{session::Token, Password};
use crate::{
    domain::{
        user::{self, session, Session},
        Email, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a [`Session`].
#[derive(Clone, Debug, From)]
pub enum CreateUserSession {
    /// Create a new [`Session`] by [`User`] credentials.
    ByCredentials {
        /// [`Email`] of a [`User`].
        email: Email,

        /// [`Password`] of a [`User`].
        password: SecretBox<user::Password>,
    },

    /// Create a new [`Session`] by [`User`] ID.
    ByUserId(user::Id),
}

/// Output of [`CreateUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// [`Token`] of the created [`Session`].
    pub token: session::Token,

    /// [`User`] whose [`Session`] has been created.
    pub user: User,

    /// [`DateTime`] when the [`Session`] expires.
    pub expires_at: session::ExpirationDateTime,
}

impl<Db> Command<CreateUserSession> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<User>, &'l Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use CreateUserSession as Cmd;
        use ExecutionError as E;

        let user = match cmd {
            Cmd::ByCredentials { email, password } => {
                let user = self
                    .database()
                    .execute(Select(By::new(&email)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or_else(|| E::WrongCredentials)
                    .map_err(tracerr::wrap!())?;

                let matches = user
                    .password_hash
                    .matches(password.expose_secret().clone())
                    .await
                    .map_err(tracerr::from_and_wrap!(=> E))?;
                if !matches {
                    return Err(tracerr::new!(E::WrongCredentials));
                }

                user
            }
            Cmd::ByUserId(user_id) => self
                .database()
                .execute(Select(By::new(user_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or_else(|| E::UserNotExists(user_id))
                .map_err(tracerr::wrap!())?,
        };
        if !user.is_active {
            return Err(tracerr::new!(E::UserInactive(user.id)));
        }

        let now = DateTime::now();
        let expires_at = (now + self.config().token_ttl).coerce();
        let token = jsonwebtoken::encode::<Session>(
            &jsonwebtoken::Header::default(),
            &Session {
                user_id: user.id,
                email: user.email.clone(),
                role: user.role,
                expires_at,
                issued_at: now.coerce(),
            },
            &self.config().jwt_encoding_key,
        )
        .map_err(tracerr::from_and_wrap!(=> E))?;

        // SAFETY: `jsonwebtoken::encode` always returns a valid
        //         `session::Token`.
        #[expect(unsafe_code, reason = "invariants are preserved")]
        let token = unsafe { session::Token::new_unchecked(token) };

        Ok(Output {
            token,
            user,
            expires_at,
        })
    }
}

/// Error of [`CreateUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`jsonwebtoken`] encoding error.
    #[display("Failed to encode a JSON Web Token: {_0}")]
    JsonWebTokenEncodeError(jsonwebtoken::errors::Error),

    /// [`Password`] verification failed to run.
    ///
    /// [`Password`]: user::Password
    #[display("Failed to verify the password: {_0}")]
    PasswordHashing(user::HashingError),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),

    /// [`User`] has been deactivated.
    #[display("`User(id: {_0})` is deactivated")]
    #[from(ignore)]
    UserInactive(#[error(not(source))] user::Id),

    /// [`CreateUserSession::ByCredentials`] contains wrong credentials.
    #[display("Wrong `User` credentials")]
    #[from(ignore)]
    WrongCredentials,
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{
        command::{double::Memory, Command as _},
        domain::{user::Password, Email},
    };

    use super::{CreateUserSession, ExecutionError};

    fn credentials(email: &str, password: &str) -> CreateUserSession {
        CreateUserSession::ByCredentials {
            email: Email::new(email).unwrap(),
            password: SecretBox::new(Box::new(
                Password::new(password).unwrap(),
            )),
        }
    }

    #[tokio::test]
    async fn issues_token_for_valid_credentials() {
        let service = Memory::service();
        let user = service.database().user("ana@example.com", "s3cr3t!", true);

        let out = service
            .execute(credentials("ana@example.com", "s3cr3t!"))
            .await
            .unwrap();

        assert_eq!(out.user.id, user.id);
        assert!(!out.token.to_string().is_empty());
    }

    #[tokio::test]
    async fn rejects_wrong_password() {
        let service = Memory::service();
        _ = service.database().user("ana@example.com", "s3cr3t!", true);

        let err = service
            .execute(credentials("ana@example.com", "s3cr3t?"))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::WrongCredentials));
    }

    #[tokio::test]
    async fn does_not_reveal_unknown_email() {
        let service = Memory::service();

        let err = service
            .execute(credentials("nobody@example.com", "s3cr3t!"))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::WrongCredentials));
    }

    #[tokio::test]
    async fn rejects_inactive_user() {
        let service = Memory::service();
        _ = service.database().user("ana@example.com", "s3cr3t!", false);

        let err = service
            .execute(credentials("ana@example.com", "s3cr3t!"))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UserInactive(_)));
    }
}
