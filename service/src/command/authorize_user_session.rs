//! [`Command`] for authorizing a [`User`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use jsonwebtoken::Validation;
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`].
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

impl<Db> Command<AuthorizeUserSession> for Service<Db>
where
    Db: Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        let session = jsonwebtoken::decode::<Session>(
            token.as_ref(),
            &self.config().jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(tracerr::from_and_wrap!(=> E))?
        .claims;

        // A structurally valid token is not enough: the `User` may have been
        // deactivated or deleted since signing in.
        let user = self
            .database()
            .execute(Select(By::new(session.user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| E::UserNotExists(session.user_id))
            .map_err(tracerr::wrap!())?;
        if !user.is_active {
            return Err(tracerr::new!(E::UserInactive(user.id)));
        }

        Ok(session)
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),

    /// [`User`] the [`Session`] belongs to does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),

    /// [`User`] the [`Session`] belongs to has been deactivated.
    #[display("`User(id: {_0})` is deactivated")]
    #[from(ignore)]
    UserInactive(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{
        command::{double::Memory, Command as _, CreateUserSession},
        domain::user::{self, session::Token},
        Service,
    };

    use super::{AuthorizeUserSession, ExecutionError};

    async fn sign_in(service: &Service<Memory>, user_id: user::Id) -> Token {
        service
            .execute(CreateUserSession::ByUserId(user_id))
            .await
            .unwrap()
            .token
    }

    #[tokio::test]
    async fn accepts_issued_token() {
        let service = Memory::service();
        let user = service.database().user("ana@example.com", "s3cr3t!", true);
        let token = sign_in(&service, user.id).await;

        let session =
            service.execute(AuthorizeUserSession { token }).await.unwrap();

        assert_eq!(session.user_id, user.id);
        assert_eq!(session.email, user.email);
    }

    #[tokio::test]
    async fn rejects_user_deactivated_after_sign_in() {
        let service = Memory::service();
        let user = service.database().user("ana@example.com", "s3cr3t!", true);
        let token = sign_in(&service, user.id).await;
        service
            .database()
            .state()
            .users
            .get_mut(&user.id)
            .unwrap()
            .is_active = false;

        let err = service
            .execute(AuthorizeUserSession { token })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UserInactive(_)));
    }

    #[tokio::test]
    async fn rejects_user_deleted_after_sign_in() {
        let service = Memory::service();
        let user = service.database().user("ana@example.com", "s3cr3t!", true);
        let token = sign_in(&service, user.id).await;
        service
            .database()
            .state()
            .users
            .get_mut(&user.id)
            .unwrap()
            .deleted_at = Some(DateTime::now().coerce());

        let err = service
            .execute(AuthorizeUserSession { token })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UserNotExists(_)));
    }

    #[tokio::test]
    async fn rejects_malformed_token() {
        let service = Memory::service();

        let err = service
            .execute(AuthorizeUserSession {
                token: "not.a.jwt".parse().unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::JsonWebTokenDecodeError(_),
        ));
    }
}
