//! [`Command`] for issuing a new [`Invoice`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime, Money, Percent,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        client, invoice,
        item::{self, Draft},
        numbering::{Issued, Sequence, Series},
        project, quote,
        text::{Line, Text},
        Client, Invoice, Project, Quote,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for issuing a new [`Invoice`].
///
/// A new [`Invoice`] starts as an unpaid [`invoice::Status::Draft`] and gets
/// the next [`invoice::Number`] of the current month.
#[derive(Clone, Debug)]
pub struct CreateInvoice {
    /// ID of the [`Client`] the [`Invoice`] is issued to.
    pub client_id: client::Id,

    /// ID of the [`Project`] the [`Invoice`] relates to, if any.
    pub project_id: Option<project::Id>,

    /// ID of the [`Quote`] the [`Invoice`] is based on, if any.
    pub quote_id: Option<quote::Id>,

    /// Title of the [`Invoice`].
    pub title: Line,

    /// Description of the [`Invoice`].
    pub description: Option<Text>,

    /// Moment the [`Invoice`] is issued at. Defaults to now.
    pub issue_date: Option<invoice::IssueDateTime>,

    /// Moment the [`Invoice`] is due.
    pub due_date: invoice::DueDateTime,

    /// Tax rate applied to the subtotal.
    pub tax_rate: Option<Percent>,

    /// Flat discount subtracted from the total.
    pub discount: Option<Money>,

    /// Free-form notes.
    pub notes: Option<Text>,

    /// Terms and conditions.
    pub terms: Option<Text>,

    /// Line items, at least one.
    pub items: Vec<Draft>,
}

impl<Db> Command<CreateInvoice> for Service<Db>
where
    Db: Database<
            Select<By<Option<Client>, client::Id>>,
            Ok = Option<Client>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Project>, project::Id>>,
            Ok = Option<Project>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Quote>, quote::Id>>,
            Ok = Option<Quote>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Lock<Series>, Err = Traced<database::Error>>
        + Database<
            Select<By<Issued, Series>>,
            Ok = Issued,
            Err = Traced<database::Error>,
        > + Database<Insert<Invoice>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Invoice;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateInvoice,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateInvoice {
            client_id,
            project_id,
            quote_id,
            title,
            description,
            issue_date,
            due_date,
            tax_rate,
            discount,
            notes,
            terms,
            items,
        } = cmd;

        if items.is_empty() {
            return Err(tracerr::new!(E::NoItems));
        }
        let items = item::build(items)
            .map_err(|(index, field)| E::InvalidItem { index, field })
            .map_err(tracerr::wrap!())?;
        let discount = discount.unwrap_or(Money::ZERO);
        if discount.is_negative() {
            return Err(tracerr::new!(E::NegativeDiscount));
        }

        drop(
            self.database()
                .execute(Select(By::<Option<Client>, _>::new(client_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::ClientNotExists(client_id))
                .map_err(tracerr::wrap!())?,
        );
        if let Some(id) = project_id {
            drop(
                self.database()
                    .execute(Select(By::<Option<Project>, _>::new(id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::ProjectNotExists(id))
                    .map_err(tracerr::wrap!())?,
            );
        }
        if let Some(id) = quote_id {
            drop(
                self.database()
                    .execute(Select(By::<Option<Quote>, _>::new(id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::QuoteNotExists(id))
                    .map_err(tracerr::wrap!())?,
            );
        }

        let now = DateTime::now();
        let series = invoice::Number::series(now.coerce());

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serialize numbering inside the same monthly series.
        tx.execute(Lock(series))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        let issued = tx
            .execute(Select(By::new(series)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut invoice = Invoice {
            id: invoice::Id::new(),
            number: invoice::Number::new(&series, Sequence::after(issued)),
            client_id,
            project_id,
            quote_id,
            title,
            description,
            status: invoice::Status::Draft,
            issue_date: issue_date.unwrap_or_else(|| now.coerce()),
            due_date,
            paid_date: None,
            subtotal: Money::ZERO,
            tax_rate: tax_rate.unwrap_or(Percent::ZERO),
            tax_amount: Money::ZERO,
            discount: discount.round(),
            total: Money::ZERO,
            paid_amount: Money::ZERO,
            balance: Money::ZERO,
            notes,
            terms,
            items,
            created_at: now.coerce(),
            updated_at: now.coerce(),
            deleted_at: None,
        };
        invoice.recompute();

        tx.execute(Insert(invoice.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(|e| {
                if matches!(
                    e.as_ref(),
                    E::Db(db) if db.is_unique_violation("invoices_number_key"),
                ) {
                    tracerr::new!(E::NumberOccupied(invoice.number.clone()))
                } else {
                    e
                }
            })
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(invoice)
    }
}

/// Error of [`CreateInvoice`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Client`] doesn't exist.
    #[display("`Client(id: {_0})` does not exist")]
    #[from(ignore)]
    ClientNotExists(#[error(not(source))] client::Id),

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

    /// Negative discount provided.
    #[display("Discount must not be negative")]
    #[from(ignore)]
    NegativeDiscount,

    /// No line items provided.
    #[display("At least one item is required")]
    #[from(ignore)]
    NoItems,

    /// Generated [`invoice::Number`] is already taken.
    #[display("`Invoice` number `{_0}` is already taken")]
    #[from(ignore)]
    NumberOccupied(#[error(not(source))] invoice::Number),

    /// [`Project`] doesn't exist.
    #[display("`Project(id: {_0})` does not exist")]
    #[from(ignore)]
    ProjectNotExists(#[error(not(source))] project::Id),

    /// [`Quote`] doesn't exist.
    #[display("`Quote(id: {_0})` does not exist")]
    #[from(ignore)]
    QuoteNotExists(#[error(not(source))] quote::Id),
}

#[cfg(test)]
mod spec {
    use common::{DateTime, Money};

    use crate::{
        command::{
            double::{draft, Memory},
            Command as _,
        },
        domain::{
            client, invoice,
            item::Draft,
            numbering::{Document, Series},
            quote,
            text::Line,
        },
    };

    use super::{CreateInvoice, ExecutionError};

    fn cmd(client_id: client::Id, items: Vec<Draft>) -> CreateInvoice {
        CreateInvoice {
            client_id,
            project_id: None,
            quote_id: None,
            title: Line::new("Foundation works").unwrap(),
            description: None,
            issue_date: None,
            due_date: DateTime::parse("2030-01-31").unwrap().coerce(),
            tax_rate: Some("21".parse().unwrap()),
            discount: None,
            notes: None,
            terms: None,
            items,
        }
    }

    #[tokio::test]
    async fn starts_unpaid_draft() {
        let service = Memory::service();
        let client = service.database().client("ACME", None);

        let invoice = service
            .execute(cmd(client.id, vec![draft("4", "25")]))
            .await
            .unwrap();

        let money = |s: &str| s.parse::<Money>().unwrap();
        assert_eq!(invoice.status, invoice::Status::Draft);
        assert_eq!(invoice.subtotal, money("100"));
        assert_eq!(invoice.tax_amount, money("21"));
        assert_eq!(invoice.total, money("121"));
        assert_eq!(invoice.paid_amount, Money::ZERO);
        assert_eq!(invoice.balance, invoice.total);
        assert!(invoice.paid_date.is_none());
    }

    #[tokio::test]
    async fn numbers_apart_from_quotes() {
        let service = Memory::service();
        let client = service.database().client("ACME", None);
        drop(service.database().quote(quote::Status::Draft, "1"));

        let invoice = service
            .execute(cmd(client.id, vec![draft("1", "1")]))
            .await
            .unwrap();

        let series = Series::of(Document::Invoice, DateTime::now());
        assert_eq!(
            invoice.number.to_string(),
            format!("FAC-{}-0001", series.month.compact()),
        );
    }

    #[tokio::test]
    async fn requires_existing_quote() {
        let service = Memory::service();
        let client = service.database().client("ACME", None);

        let err = service
            .execute(CreateInvoice {
                quote_id: Some(Default::default()),
                ..cmd(client.id, vec![draft("1", "1")])
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::QuoteNotExists(_)));
    }
}
