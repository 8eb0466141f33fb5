//! [`Command`] for deleting a [`Quote`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{quote, status::Lifecycle as _, Quote},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for (softly) deleting a [`Quote`].
///
/// Line items of the [`Quote`] are removed physically. Accepted [`Quote`]s
/// cannot be deleted.
#[derive(Clone, Copy, Debug, From)]
pub struct DeleteQuote {
    /// ID of the [`Quote`] to delete.
    pub quote_id: quote::Id,
}

impl<Db> Command<DeleteQuote> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Quote>, quote::Id>>,
            Ok = Option<Quote>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Quote, quote::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<Quote>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Quote;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteQuote) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteQuote { quote_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `Quote`.
        tx.execute(Lock(By::new(quote_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut quote = tx
            .execute(Select(By::<Option<Quote>, _>::new(quote_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::QuoteNotExists(quote_id))
            .map_err(tracerr::wrap!())?;
        if !quote.status.allows_deletion() {
            return Err(tracerr::new!(E::Finalized(quote.status)));
        }

        quote.items.clear();
        quote.deleted_at = Some(DateTime::now().coerce());
        tx.execute(Update(quote.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(quote)
    }
}

/// Error of [`DeleteQuote`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Quote`] is in a [`quote::Status`] forbidding its deletion.
    #[display("`{_0}` quote cannot be deleted")]
    #[from(ignore)]
    Finalized(#[error(not(source))] quote::Status),

    /// [`Quote`] doesn't exist.
    #[display("`Quote(id: {_0})` does not exist")]
    #[from(ignore)]
    QuoteNotExists(#[error(not(source))] quote::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{double::Memory, Command as _},
        domain::quote::Status,
    };

    use super::{DeleteQuote, ExecutionError};

    #[tokio::test]
    async fn accepted_is_kept() {
        let service = Memory::service();
        let quote = service.database().quote(Status::Accepted, "100");

        let err = service
            .execute(DeleteQuote { quote_id: quote.id })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Finalized(Status::Accepted),
        ));
        assert!(service.database().state().quotes[&quote.id]
            .deleted_at
            .is_none());
    }

    #[tokio::test]
    async fn others_are_deleted_with_items() {
        for status in [Status::Draft, Status::Sent, Status::Rejected] {
            let service = Memory::service();
            let quote = service.database().quote(status, "100");

            let deleted = service
                .execute(DeleteQuote { quote_id: quote.id })
                .await
                .unwrap();

            assert!(deleted.deleted_at.is_some());
            assert!(service.database().state().quotes[&quote.id]
                .items
                .is_empty());
        }
    }
}
