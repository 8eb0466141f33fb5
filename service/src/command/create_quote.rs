//! [`Command`] for creating a new [`Quote`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime, Money, Percent,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        client,
        item::{self, Draft},
        numbering::{Issued, Sequence, Series},
        project, quote,
        text::{Line, Text},
        Client, Project, Quote,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Quote`].
///
/// A new [`Quote`] always starts as a [`quote::Status::Draft`] and gets the
/// next [`quote::Number`] of the current month.
#[derive(Clone, Debug)]
pub struct CreateQuote {
    /// ID of the [`Client`] the [`Quote`] is addressed to.
    pub client_id: client::Id,

    /// ID of the [`Project`] the [`Quote`] relates to, if any.
    pub project_id: Option<project::Id>,

    /// Title of the [`Quote`].
    pub title: Line,

    /// Description of the [`Quote`].
    pub description: Option<Text>,

    /// Moment the [`Quote`] stays valid until.
    pub valid_until: Option<quote::ExpirationDateTime>,

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

impl<Db> Command<CreateQuote> for Service<Db>
where
    Db: Database<
            Select<By<Option<Client>, client::Id>>,
            Ok = Option<Client>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Project>, project::Id>>,
            Ok = Option<Project>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Lock<Series>, Err = Traced<database::Error>>
        + Database<
            Select<By<Issued, Series>>,
            Ok = Issued,
            Err = Traced<database::Error>,
        > + Database<Insert<Quote>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Quote;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateQuote) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateQuote {
            client_id,
            project_id,
            title,
            description,
            valid_until,
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

        let now = DateTime::now();
        let series = quote::Number::series(now.coerce());

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

        let mut quote = Quote {
            id: quote::Id::new(),
            number: quote::Number::new(&series, Sequence::after(issued)),
            client_id,
            project_id,
            title,
            description,
            status: quote::Status::Draft,
            valid_until,
            subtotal: Money::ZERO,
            tax_rate: tax_rate.unwrap_or(Percent::ZERO),
            tax_amount: Money::ZERO,
            discount: discount.round(),
            total: Money::ZERO,
            notes,
            terms,
            items,
            created_at: now.coerce(),
            updated_at: now.coerce(),
            deleted_at: None,
        };
        quote.recompute();

        tx.execute(Insert(quote.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(|e| {
                if matches!(
                    e.as_ref(),
                    E::Db(db) if db.is_unique_violation("quotes_number_key"),
                ) {
                    tracerr::new!(E::NumberOccupied(quote.number.clone()))
                } else {
                    e
                }
            })
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(quote)
    }
}

/// Error of [`CreateQuote`] [`Command`] execution.
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

    /// Generated [`quote::Number`] is already taken.
    #[display("`Quote` number `{_0}` is already taken")]
    #[from(ignore)]
    NumberOccupied(#[error(not(source))] quote::Number),

    /// [`Project`] doesn't exist.
    #[display("`Project(id: {_0})` does not exist")]
    #[from(ignore)]
    ProjectNotExists(#[error(not(source))] project::Id),
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
            client,
            item::Draft,
            numbering::{Document, Series},
            quote,
            text::Line,
        },
    };

    use super::{CreateQuote, ExecutionError};

    fn cmd(client_id: client::Id, items: Vec<Draft>) -> CreateQuote {
        CreateQuote {
            client_id,
            project_id: None,
            title: Line::new("Kitchen renovation").unwrap(),
            description: None,
            valid_until: None,
            tax_rate: Some("16".parse().unwrap()),
            discount: Some("10".parse().unwrap()),
            notes: None,
            terms: None,
            items,
        }
    }

    #[tokio::test]
    async fn computes_totals() {
        let service = Memory::service();
        let client = service.database().client("ACME", None);

        let quote = service
            .execute(cmd(client.id, vec![draft("2", "50"), draft("1.5", "100")]))
            .await
            .unwrap();

        let money = |s: &str| s.parse::<Money>().unwrap();
        assert_eq!(quote.status, quote::Status::Draft);
        assert_eq!(quote.subtotal, money("250"));
        assert_eq!(quote.tax_amount, money("40"));
        assert_eq!(quote.total, money("280"));
        assert_eq!(
            quote.items.iter().map(|i| i.total).sum::<Money>(),
            quote.subtotal,
        );
        assert_eq!(
            quote.items.iter().map(|i| i.position).collect::<Vec<_>>(),
            [0, 1],
        );
    }

    #[tokio::test]
    async fn numbers_sequentially_within_month() {
        let service = Memory::service();
        let client = service.database().client("ACME", None);

        let first = service
            .execute(cmd(client.id, vec![draft("1", "1")]))
            .await
            .unwrap();
        let second = service
            .execute(cmd(client.id, vec![draft("1", "1")]))
            .await
            .unwrap();

        let series = Series::of(Document::Quote, DateTime::now());
        let prefix = format!("COT-{}-", series.month.compact());
        assert_eq!(first.number.to_string(), format!("{prefix}0001"));
        assert_eq!(second.number.to_string(), format!("{prefix}0002"));
    }

    #[tokio::test]
    async fn requires_items() {
        let service = Memory::service();
        let client = service.database().client("ACME", None);

        let err = service.execute(cmd(client.id, vec![])).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NoItems));
    }

    #[tokio::test]
    async fn rejects_zero_quantity_item() {
        let service = Memory::service();
        let client = service.database().client("ACME", None);

        let err = service
            .execute(cmd(client.id, vec![draft("1", "1"), draft("0", "1")]))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidItem {
                index: 1,
                field: "quantity",
            },
        ));
    }

    #[tokio::test]
    async fn rejects_oversized_item_total() {
        let service = Memory::service();
        let client = service.database().client("ACME", None);

        let err = service
            .execute(cmd(
                client.id,
                vec![draft("99999999999.999", "999999999999.99")],
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidItem {
                index: 0,
                field: "total",
            },
        ));
        assert!(service.database().state().quotes.is_empty());
    }

    #[tokio::test]
    async fn requires_existing_client() {
        let service = Memory::service();

        let err = service
            .execute(cmd(Default::default(), vec![draft("1", "1")]))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::ClientNotExists(_)));
    }
}
