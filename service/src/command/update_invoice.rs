//! [`Command`] for updating an [`Invoice`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime, Money, Percent,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        finance::Totals,
        invoice,
        item::{self, Draft},
        status::check_transition,
        text::{Line, Text},
        Invoice,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating an [`Invoice`].
///
/// Only the provided fields are updated. Totals are recomputed only when the
/// items, the tax rate or the discount change, while the balance follows
/// both the total and the paid amount.
#[derive(Clone, Debug, Default)]
pub struct UpdateInvoice {
    /// ID of the [`Invoice`] to update.
    pub invoice_id: invoice::Id,

    /// New title.
    pub title: Option<Line>,

    /// New description.
    pub description: Option<Text>,

    /// New [`invoice::Status`].
    pub status: Option<invoice::Status>,

    /// New due date.
    pub due_date: Option<invoice::DueDateTime>,

    /// New payment date.
    pub paid_date: Option<invoice::PaymentDateTime>,

    /// New tax rate.
    pub tax_rate: Option<Percent>,

    /// New flat discount.
    pub discount: Option<Money>,

    /// New amount paid so far.
    pub paid_amount: Option<Money>,

    /// New notes.
    pub notes: Option<Text>,

    /// New terms and conditions.
    pub terms: Option<Text>,

    /// Line items replacing the existing ones.
    pub items: Option<Vec<Draft>>,
}

impl<Db> Command<UpdateInvoice> for Service<Db>
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
        cmd: UpdateInvoice,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateInvoice {
            invoice_id,
            title,
            description,
            status,
            due_date,
            paid_date,
            tax_rate,
            discount,
            paid_amount,
            notes,
            terms,
            items,
        } = cmd;

        if discount.is_some_and(Money::is_negative) {
            return Err(tracerr::new!(E::NegativeDiscount));
        }
        if paid_amount.is_some_and(Money::is_negative) {
            return Err(tracerr::new!(E::NegativePaidAmount));
        }
        let items = items
            .map(|items| {
                if items.is_empty() {
                    return Err(E::NoItems);
                }
                item::build(items)
                    .map_err(|(index, field)| E::InvalidItem { index, field })
            })
            .transpose()
            .map_err(tracerr::wrap!())?;

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

        if let Some(status) = status {
            if status != invoice.status {
                check_transition(invoice.status, status)
                    .map_err(|(from, to)| E::WrongTransition { from, to })
                    .map_err(tracerr::wrap!())?;
                invoice.status = status;
            }
        }
        if let Some(title) = title {
            invoice.title = title;
        }
        if let Some(description) = description {
            invoice.description = Some(description);
        }
        if let Some(due_date) = due_date {
            invoice.due_date = due_date;
        }
        if let Some(paid_date) = paid_date {
            invoice.paid_date = Some(paid_date);
        }
        if let Some(notes) = notes {
            invoice.notes = Some(notes);
        }
        if let Some(terms) = terms {
            invoice.terms = Some(terms);
        }

        let adjusts_totals = tax_rate.is_some() || discount.is_some();
        if let Some(tax_rate) = tax_rate {
            invoice.tax_rate = tax_rate;
        }
        if let Some(discount) = discount {
            invoice.discount = discount.round();
        }
        if let Some(amount) = paid_amount {
            invoice.set_paid_amount(amount);
        }
        if let Some(items) = items {
            invoice.items = items;
            invoice.recompute();
        } else if adjusts_totals {
            invoice.set_totals(Totals::from_subtotal(
                invoice.subtotal,
                invoice.tax_rate,
                invoice.discount,
            ));
        }
        if invoice.status == invoice::Status::Paid && invoice.paid_date.is_none()
        {
            invoice.settle(DateTime::now().coerce());
        }
        invoice.updated_at = DateTime::now().coerce();

        tx.execute(Update(invoice.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(invoice)
    }
}

/// Error of [`UpdateInvoice`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Line item has an invalid field.
    #[display("Item #{index} has invalid `{field}`")]
    #[from(ignore)]
    InvalidItem {
        /// 0-based index of the invalid item.
        index: usize,

        /// Name of the invalid field.
        field: &'static str,
    },

    /// [`Invoice`] doesn't exist.
    #[display("`Invoice(id: {_0})` does not exist")]
    #[from(ignore)]
    InvoiceNotExists(#[error(not(source))] invoice::Id),

    /// Negative discount provided.
    #[display("Discount must not be negative")]
    #[from(ignore)]
    NegativeDiscount,

    /// Negative paid amount provided.
    #[display("Paid amount must not be negative")]
    #[from(ignore)]
    NegativePaidAmount,

    /// Empty line items provided.
    #[display("At least one item is required")]
    #[from(ignore)]
    NoItems,

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

    use super::{ExecutionError, UpdateInvoice};

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn partial_payment_updates_balance() {
        let service = Memory::service();
        let invoice = service.database().invoice(Status::Sent, "250");

        let updated = service
            .execute(UpdateInvoice {
                invoice_id: invoice.id,
                paid_amount: Some(money("100")),
                ..UpdateInvoice::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.total, money("250"));
        assert_eq!(updated.balance, money("150"));
        assert_eq!(updated.status, Status::Sent);
    }

    #[tokio::test]
    async fn discount_keeps_paid_amount() {
        let service = Memory::service();
        let invoice = service.database().invoice(Status::Sent, "250");

        let updated = service
            .execute(UpdateInvoice {
                invoice_id: invoice.id,
                paid_amount: Some(money("50")),
                discount: Some(money("25")),
                ..UpdateInvoice::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.total, money("225"));
        assert_eq!(updated.balance, money("175"));
    }

    #[tokio::test]
    async fn paid_status_settles() {
        let service = Memory::service();
        let invoice = service.database().invoice(Status::Sent, "80");

        let updated = service
            .execute(UpdateInvoice {
                invoice_id: invoice.id,
                status: Some(Status::Paid),
                ..UpdateInvoice::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.status, Status::Paid);
        assert_eq!(updated.balance, Money::ZERO);
        assert!(updated.paid_date.is_some());
    }

    #[tokio::test]
    async fn paid_is_final() {
        let service = Memory::service();
        let invoice = service.database().invoice(Status::Paid, "80");

        let err = service
            .execute(UpdateInvoice {
                invoice_id: invoice.id,
                status: Some(Status::Draft),
                ..UpdateInvoice::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::WrongTransition {
                from: Status::Paid,
                to: Status::Draft,
            },
        ));
    }
}
