//! [`Command`] for updating a [`Quote`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime, Money, Percent,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        finance::Totals,
        item::{self, Draft},
        quote,
        status::check_transition,
        text::{Line, Text},
        Quote,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating a [`Quote`].
///
/// Only the provided fields are updated. Totals are recomputed only when the
/// items, the tax rate or the discount change.
#[derive(Clone, Debug, Default)]
pub struct UpdateQuote {
    /// ID of the [`Quote`] to update.
    pub quote_id: quote::Id,

    /// New title.
    pub title: Option<Line>,

    /// New description.
    pub description: Option<Text>,

    /// New [`quote::Status`].
    pub status: Option<quote::Status>,

    /// New validity deadline.
    pub valid_until: Option<quote::ExpirationDateTime>,

    /// New tax rate.
    pub tax_rate: Option<Percent>,

    /// New flat discount.
    pub discount: Option<Money>,

    /// New notes.
    pub notes: Option<Text>,

    /// New terms and conditions.
    pub terms: Option<Text>,

    /// Line items replacing the existing ones.
    pub items: Option<Vec<Draft>>,
}

impl<Db> Command<UpdateQuote> for Service<Db>
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

    async fn execute(&self, cmd: UpdateQuote) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateQuote {
            quote_id,
            title,
            description,
            status,
            valid_until,
            tax_rate,
            discount,
            notes,
            terms,
            items,
        } = cmd;

        if discount.is_some_and(Money::is_negative) {
            return Err(tracerr::new!(E::NegativeDiscount));
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

        if let Some(status) = status {
            if status == quote::Status::Expired {
                return Err(tracerr::new!(E::ExpiredIsDerived));
            }
            check_transition(quote.status, status)
                .map_err(|(from, to)| E::WrongTransition { from, to })
                .map_err(tracerr::wrap!())?;
            quote.status = status;
        }
        if let Some(title) = title {
            quote.title = title;
        }
        if let Some(description) = description {
            quote.description = Some(description);
        }
        if let Some(valid_until) = valid_until {
            quote.valid_until = Some(valid_until);
        }
        if let Some(notes) = notes {
            quote.notes = Some(notes);
        }
        if let Some(terms) = terms {
            quote.terms = Some(terms);
        }

        let adjusts_totals = tax_rate.is_some() || discount.is_some();
        if let Some(tax_rate) = tax_rate {
            quote.tax_rate = tax_rate;
        }
        if let Some(discount) = discount {
            quote.discount = discount.round();
        }
        if let Some(items) = items {
            quote.items = items;
            quote.recompute();
        } else if adjusts_totals {
            quote.set_totals(Totals::from_subtotal(
                quote.subtotal,
                quote.tax_rate,
                quote.discount,
            ));
        }
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

/// Error of [`UpdateQuote`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`quote::Status::Expired`] cannot be set explicitly.
    #[display("`expired` status is derived from the validity deadline")]
    #[from(ignore)]
    ExpiredIsDerived,

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

    /// Empty line items provided.
    #[display("At least one item is required")]
    #[from(ignore)]
    NoItems,

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
    use common::Money;

    use crate::{
        command::{
            double::{draft, Memory},
            Command as _,
        },
        domain::{quote, text::Line},
    };

    use super::{ExecutionError, UpdateQuote};

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn replacing_items_recomputes_totals() {
        let service = Memory::service();
        let quote = service.database().quote(quote::Status::Draft, "100");

        let updated = service
            .execute(UpdateQuote {
                quote_id: quote.id,
                items: Some(vec![draft("3", "10"), draft("2", "5.5")]),
                tax_rate: Some("10".parse().unwrap()),
                ..UpdateQuote::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.subtotal, money("41"));
        assert_eq!(updated.tax_amount, money("4.1"));
        assert_eq!(updated.total, money("45.1"));
        assert_eq!(
            updated.items.iter().map(|i| i.total).sum::<Money>(),
            updated.subtotal,
        );
    }

    #[tokio::test]
    async fn discount_recomputes_from_subtotal() {
        let service = Memory::service();
        let quote = service.database().quote(quote::Status::Sent, "200");

        let updated = service
            .execute(UpdateQuote {
                quote_id: quote.id,
                discount: Some(money("50")),
                ..UpdateQuote::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.subtotal, money("200"));
        assert_eq!(updated.total, money("150"));
    }

    #[tokio::test]
    async fn metadata_edits_keep_totals() {
        let service = Memory::service();
        let quote = service.database().quote(quote::Status::Accepted, "200");

        let updated = service
            .execute(UpdateQuote {
                quote_id: quote.id,
                title: Line::new("Roof repair"),
                ..UpdateQuote::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.title.to_string(), "Roof repair");
        assert_eq!(updated.totals(), quote.totals());
    }

    #[tokio::test]
    async fn rejects_expired_status() {
        let service = Memory::service();
        let quote = service.database().quote(quote::Status::Sent, "200");

        let err = service
            .execute(UpdateQuote {
                quote_id: quote.id,
                status: Some(quote::Status::Expired),
                ..UpdateQuote::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::ExpiredIsDerived));
    }
}
