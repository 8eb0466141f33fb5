//! [`Command`] for deleting an [`Invoice`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{invoice, status::Lifecycle as _, Invoice},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for (softly) deleting an [`Invoice`].
///
/// Line items of the [`Invoice`] are removed physically. Paid [`Invoice`]s
/// cannot be deleted.
#[derive(Clone, Copy, Debug, From)]
pub struct DeleteInvoice {
    /// ID of the [`Invoice`] to delete.
    pub invoice_id: invoice::Id,
}

impl<Db> Command<DeleteInvoice> for Service<Db>
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
        cmd: DeleteInvoice,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteInvoice { invoice_id } = cmd;

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
        if !invoice.status.allows_deletion() {
            return Err(tracerr::new!(E::Finalized(invoice.status)));
        }

        invoice.items.clear();
        invoice.deleted_at = Some(DateTime::now().coerce());
        tx.execute(Update(invoice.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(invoice)
    }
}

/// Error of [`DeleteInvoice`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Invoice`] is in an [`invoice::Status`] forbidding its deletion.
    #[display("`{_0}` invoice cannot be deleted")]
    #[from(ignore)]
    Finalized(#[error(not(source))] invoice::Status),

    /// [`Invoice`] doesn't exist.
    #[display("`Invoice(id: {_0})` does not exist")]
    #[from(ignore)]
    InvoiceNotExists(#[error(not(source))] invoice::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{double::Memory, Command as _},
        domain::invoice::Status,
    };

    use super::{DeleteInvoice, ExecutionError};

    #[tokio::test]
    async fn paid_is_kept() {
        let service = Memory::service();
        let invoice = service.database().invoice(Status::Paid, "100");

        let err = service
            .execute(DeleteInvoice {
                invoice_id: invoice.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Finalized(Status::Paid),
        ));
    }

    #[tokio::test]
    async fn cancelled_is_deleted() {
        let service = Memory::service();
        let invoice = service.database().invoice(Status::Cancelled, "100");

        drop(
            service
                .execute(DeleteInvoice {
                    invoice_id: invoice.id,
                })
                .await
                .unwrap(),
        );

        assert!(service.database().state().invoices[&invoice.id]
            .deleted_at
            .is_some());
    }
}
