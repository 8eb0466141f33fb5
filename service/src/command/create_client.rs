//! [`Command`] for creating a new [`Client`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        client,
        text::{Line, Text},
        Client, Email,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Client`].
#[derive(Clone, Debug, Default)]
pub struct CreateClient {
    /// Name of a new [`Client`].
    pub name: Option<Line>,

    /// [`Email`] of a new [`Client`], unique among the live ones.
    pub email: Option<Email>,

    /// Phone of a new [`Client`].
    pub phone: Option<Line>,

    /// Street address of a new [`Client`].
    pub address: Option<Line>,

    /// City of a new [`Client`].
    pub city: Option<Line>,

    /// State of a new [`Client`].
    pub state: Option<Line>,

    /// ZIP code of a new [`Client`].
    pub zip_code: Option<Line>,

    /// Company of a new [`Client`].
    pub company: Option<Line>,

    /// Tax ID of a new [`Client`].
    pub tax_id: Option<Line>,

    /// [`client::ContactType`] of a new [`Client`].
    pub contact_type: Option<client::ContactType>,

    /// Free-form notes about a new [`Client`].
    pub notes: Option<Text>,
}

impl<Db> Command<CreateClient> for Service<Db>
where
    Db: for<'l> Database<
            Select<By<Option<Client>, &'l Email>>,
            Ok = Option<Client>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<Client>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Client;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateClient) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateClient {
            name,
            email,
            phone,
            address,
            city,
            state,
            zip_code,
            company,
            tax_id,
            contact_type,
            notes,
        } = cmd;

        let name = name.ok_or(E::NoName).map_err(tracerr::wrap!())?;

        if let Some(email) = &email {
            let c = self
                .database()
                .execute(Select(By::new(email)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if c.is_some() {
                return Err(tracerr::new!(E::EmailOccupied(email.clone())));
            }
        }

        let now = DateTime::now();
        let client = Client {
            id: client::Id::new(),
            name,
            email,
            phone,
            address,
            city,
            state,
            zip_code,
            company,
            tax_id,
            contact_type: contact_type.unwrap_or_default(),
            notes,
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
        tx.execute(Insert(client.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(|e| match &client.email {
                Some(email)
                    if matches!(
                        e.as_ref(),
                        E::Db(db) if db.is_unique_violation("clients_email_key"),
                    ) =>
                {
                    tracerr::new!(E::EmailOccupied(email.clone()))
                }
                Some(_) | None => e,
            })
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(client)
    }
}

/// Error of [`CreateClient`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Email`] is already occupied by another [`Client`].
    #[display("`{_0}` email is occupied by another `Client`")]
    #[from(ignore)]
    EmailOccupied(#[error(not(source))] Email),

    /// No name provided.
    #[display("`Client` name is required")]
    #[from(ignore)]
    NoName,
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{double::Memory, Command as _},
        domain::{text::Line, Email},
    };

    use super::{CreateClient, ExecutionError};

    fn cmd(name: &str, email: Option<&str>) -> CreateClient {
        CreateClient {
            name: Line::new(name),
            email: email.map(|e| Email::new(e).unwrap()),
            ..CreateClient::default()
        }
    }

    #[tokio::test]
    async fn creates_active_individual() {
        let service = Memory::service();

        let client = service
            .execute(cmd("ACME", Some("acme@example.com")))
            .await
            .unwrap();

        assert!(client.is_active);
        assert_eq!(client.contact_type, Default::default());
        assert!(service.database().state().clients.contains_key(&client.id));
    }

    #[tokio::test]
    async fn rejects_occupied_email() {
        let service = Memory::service();
        _ = service
            .execute(cmd("ACME", Some("acme@example.com")))
            .await
            .unwrap();

        let err = service
            .execute(cmd("Other", Some("ACME@example.com")))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::EmailOccupied(_)));
        assert_eq!(service.database().state().clients.len(), 1);
    }

    #[tokio::test]
    async fn allows_many_without_email() {
        let service = Memory::service();

        _ = service.execute(cmd("First", None)).await.unwrap();
        _ = service.execute(cmd("Second", None)).await.unwrap();

        assert_eq!(service.database().state().clients.len(), 2);
    }

    #[tokio::test]
    async fn requires_name() {
        let service = Memory::service();

        let err = service.execute(CreateClient::default()).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NoName));
    }
}
