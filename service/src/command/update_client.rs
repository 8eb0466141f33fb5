//! [`Command`] for updating a [`Client`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
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

/// [`Command`] for updating a [`Client`].
///
/// Only the provided fields are updated.
#[derive(Clone, Debug, Default)]
pub struct UpdateClient {
    /// ID of the [`Client`] to update.
    pub client_id: client::Id,

    /// New name of the [`Client`].
    pub name: Option<Line>,

    /// New [`Email`] of the [`Client`].
    pub email: Option<Email>,

    /// New phone of the [`Client`].
    pub phone: Option<Line>,

    /// New street address of the [`Client`].
    pub address: Option<Line>,

    /// New city of the [`Client`].
    pub city: Option<Line>,

    /// New state of the [`Client`].
    pub state: Option<Line>,

    /// New ZIP code of the [`Client`].
    pub zip_code: Option<Line>,

    /// New company of the [`Client`].
    pub company: Option<Line>,

    /// New tax ID of the [`Client`].
    pub tax_id: Option<Line>,

    /// New [`client::ContactType`] of the [`Client`].
    pub contact_type: Option<client::ContactType>,

    /// New notes about the [`Client`].
    pub notes: Option<Text>,

    /// Whether the [`Client`] should be active.
    pub is_active: Option<bool>,
}

impl<Db> Command<UpdateClient> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Client>, client::Id>>,
            Ok = Option<Client>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<Client>, &'l Email>>,
            Ok = Option<Client>,
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

    async fn execute(&self, cmd: UpdateClient) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateClient {
            client_id,
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
            is_active,
        } = cmd;

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

        if let Some(email) = email {
            let other = tx
                .execute(Select(By::<Option<Client>, _>::new(&email)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if other.is_some_and(|c| c.id != client_id) {
                return Err(tracerr::new!(E::EmailOccupied(email)));
            }
            client.email = Some(email);
        }
        if let Some(name) = name {
            client.name = name;
        }
        if let Some(phone) = phone {
            client.phone = Some(phone);
        }
        if let Some(address) = address {
            client.address = Some(address);
        }
        if let Some(city) = city {
            client.city = Some(city);
        }
        if let Some(state) = state {
            client.state = Some(state);
        }
        if let Some(zip_code) = zip_code {
            client.zip_code = Some(zip_code);
        }
        if let Some(company) = company {
            client.company = Some(company);
        }
        if let Some(tax_id) = tax_id {
            client.tax_id = Some(tax_id);
        }
        if let Some(contact_type) = contact_type {
            client.contact_type = contact_type;
        }
        if let Some(notes) = notes {
            client.notes = Some(notes);
        }
        if let Some(is_active) = is_active {
            client.is_active = is_active;
        }
        client.updated_at = DateTime::now().coerce();

        tx.execute(Update(client.clone()))
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
            })?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(client)
    }
}

/// Error of [`UpdateClient`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Client`] doesn't exist.
    #[display("`Client(id: {_0})` does not exist")]
    #[from(ignore)]
    ClientNotExists(#[error(not(source))] client::Id),

    /// [`Email`] is already occupied by another [`Client`].
    #[display("`{_0}` email is occupied by another `Client`")]
    #[from(ignore)]
    EmailOccupied(#[error(not(source))] Email),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{double::Memory, Command as _},
        domain::{client, text::Line, Email},
    };

    use super::{ExecutionError, UpdateClient};

    #[tokio::test]
    async fn keeps_own_email() {
        let service = Memory::service();
        let client = service.database().client("ACME", Some("acme@example.com"));

        let updated = service
            .execute(UpdateClient {
                client_id: client.id,
                name: Line::new("ACME Inc."),
                email: Email::new("acme@example.com"),
                ..UpdateClient::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.name.to_string(), "ACME Inc.");
        assert_eq!(updated.email, client.email);
    }

    #[tokio::test]
    async fn rejects_email_of_another_client() {
        let service = Memory::service();
        _ = service.database().client("ACME", Some("acme@example.com"));
        let other = service.database().client("Other", Some("other@example.com"));

        let err = service
            .execute(UpdateClient {
                client_id: other.id,
                email: Email::new("acme@example.com"),
                ..UpdateClient::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::EmailOccupied(_)));
        assert_eq!(
            service.database().state().clients[&other.id].email,
            other.email,
        );
    }

    #[tokio::test]
    async fn unknown_client() {
        let service = Memory::service();

        let err = service
            .execute(UpdateClient {
                client_id: client::Id::new(),
                ..UpdateClient::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::ClientNotExists(_)));
    }
}
