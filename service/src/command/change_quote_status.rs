//! [`Command`] for changing a [`quote::Status`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{quote, status::check_transition, Quote},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for changing a [`quote::Status`].
///
/// [`quote::Status::Expired`] is never set explicitly, being derived from
/// the validity deadline instead.
#[derive(Clone, Copy, Debug)]
pub struct ChangeQuoteStatus {
    /// ID of the [`Quote`] to change the [`quote::Status`] of.
    pub quote_id: quote::Id,

    /// New [`quote::Status`].
    pub status: quote::Status,
}

impl<Db> Command<ChangeQuoteStatus> for Service<Db>
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

    async fn execute(
        &self,
        cmd: ChangeQuoteStatus,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ChangeQuoteStatus { quote_id, status } = cmd;

        if status == quote::Status::Expired {
            return Err(tracerr::new!(E::ExpiredIsDerived));
        }

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
        if quote.status == status {
            return Ok(quote);
        }
        check_transition(quote.status, status)
            .map_err(|(from, to)| E::WrongTransition { from, to })
            .map_err(tracerr::wrap!())?;

        quote.status = status;
        quote.updated_at = DateTime::now().coerce();
        tx.execute(Update(quote.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(quote)
    }
}

/// Error of [`ChangeQuoteStatus`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`quote::Status::Expired`] cannot be set explicitly.
    #[display("`expired` status is derived from the validity deadline")]
    #[from(ignore)]
    ExpiredIsDerived,

    /// [`Quote`] doesn't exist.
    #[display("`Quote(id: {_0})` does not exist")]
    #[from(ignore)]
    QuoteNotExists(#[error(not(source))] quote::Id),

    /// [`quote::Status`] cannot be changed this way.
    #[display("`Quote` cannot move from `{from}` to `{to}`")]
    #[from(ignore)]
    WrongTransition {
        /// Current [`quote::Status`].
        from: quote::Status,

        /// Requested [`quote::Status`].
        to: quote::Status,
    },
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{double::Memory, Command as _},
        domain::quote::Status,
    };

    use super::{ChangeQuoteStatus, ExecutionError};

    #[tokio::test]
    async fn sends_and_accepts() {
        let service = Memory::service();
        let quote = service.database().quote(Status::Draft, "100");

        for status in [Status::Sent, Status::Accepted] {
            let changed = service
                .execute(ChangeQuoteStatus {
                    quote_id: quote.id,
                    status,
                })
                .await
                .unwrap();
            assert_eq!(changed.status, status);
        }
        assert_eq!(
            service.database().state().quotes[&quote.id].status,
            Status::Accepted,
        );
    }

    #[tokio::test]
    async fn expired_is_not_settable() {
        let service = Memory::service();
        let quote = service.database().quote(Status::Sent, "100");

        let err = service
            .execute(ChangeQuoteStatus {
                quote_id: quote.id,
                status: Status::Expired,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::ExpiredIsDerived));
    }
}
