//! [`Command`] for changing an [`invoice::Status`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{invoice, status::check_transition, Invoice},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for changing an [`invoice::Status`].
///
/// Moving to [`invoice::Status::Paid`] settles the [`Invoice`] in full.
#[derive(Clone, Copy, Debug)]
pub struct ChangeInvoiceStatus {
    /// ID of the [`Invoice`] to change the [`invoice::Status`] of.
    pub invoice_id: invoice::Id,

    /// New [`invoice::Status`].
    pub status: invoice::Status,
}

impl<Db> Command<ChangeInvoiceStatus> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Invoice>, invoice::Id>>,
            Ok = Option<Invoice>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Invoice, invoice::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<Invoice>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Invoice;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ChangeInvoiceStatus,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ChangeInvoiceStatus { invoice_id, status } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `Invoice`.
        tx.execute(Lock(By::new(invoice_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut invoice = tx
            .execute(Select(By::<Option<Invoice>, _>::new(invoice_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::InvoiceNotExists(invoice_id))
            .map_err(tracerr::wrap!())?;
        if invoice.status == status {
            return Ok(invoice);
        }
        check_transition(invoice.status, status)
            .map_err(|(from, to)| E::WrongTransition { from, to })
            .map_err(tracerr::wrap!())?;

        let now = DateTime::now();
        if status == invoice::Status::Paid {
            invoice.settle(now.coerce());
        } else {
            invoice.status = status;
        }
        invoice.updated_at = now.coerce();
        tx.execute(Update(invoice.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(invoice)
    }
}

/// Error of [`ChangeInvoiceStatus`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Invoice`] doesn't exist.
    #[display("`Invoice(id: {_0})` does not exist")]
    #[from(ignore)]
    InvoiceNotExists(#[error(not(source))] invoice::Id),

    /// [`invoice::Status`] cannot be changed this way.
    #[display("`Invoice` cannot move from `{from}` to `{to}`")]
    #[from(ignore)]
    WrongTransition {
        /// Current [`invoice::Status`].
        from: invoice::Status,

        /// Requested [`invoice::Status`].
        to: invoice::Status,
    },
}

#[cfg(test)]
mod spec {
    use common::Money;

    use crate::{
        command::{double::Memory, Command as _},
        domain::invoice::Status,
    };

    use super::{ChangeInvoiceStatus, ExecutionError};

    #[tokio::test]
    async fn paying_settles_balance() {
        let service = Memory::service();
        let invoice = service.database().invoice(Status::Sent, "300");

        let paid = service
            .execute(ChangeInvoiceStatus {
                invoice_id: invoice.id,
                status: Status::Paid,
            })
            .await
            .unwrap();

        assert_eq!(paid.status, Status::Paid);
        assert_eq!(paid.paid_amount, paid.total);
        assert_eq!(paid.balance, Money::ZERO);
        assert!(paid.paid_date.is_some());
    }

    #[tokio::test]
    async fn draft_cannot_be_paid() {
        let service = Memory::service();
        let invoice = service.database().invoice(Status::Draft, "300");

        let err = service
            .execute(ChangeInvoiceStatus {
                invoice_id: invoice.id,
                status: Status::Paid,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::WrongTransition { .. },
        ));
    }

    #[tokio::test]
    async fn draft_is_cancellable() {
        let service = Memory::service();
        let invoice = service.database().invoice(Status::Draft, "300");

        let cancelled = service
            .execute(ChangeInvoiceStatus {
                invoice_id: invoice.id,
                status: Status::Cancelled,
            })
            .await
            .unwrap();

        assert_eq!(cancelled.status, Status::Cancelled);
        assert_eq!(cancelled.balance, invoice.balance);
    }
}
