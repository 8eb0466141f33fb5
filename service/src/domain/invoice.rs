//! [`Invoice`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money, Percent};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    client,
    finance::{self, Totals},
    item::Item,
    numbering::{Document, Sequence, Series},
    project, quote,
    status::Lifecycle,
    text::{Line, Text},
};

/// Bill issued to a [`Client`].
///
/// [`Client`]: crate::domain::Client
#[derive(Clone, Debug, Serialize)]
pub struct Invoice {
    /// ID of this [`Invoice`].
    pub id: Id,

    /// Unique [`Number`] of this [`Invoice`].
    pub number: Number,

    /// ID of the [`Client`] this [`Invoice`] is issued to.
    ///
    /// [`Client`]: crate::domain::Client
    pub client_id: client::Id,

    /// ID of the [`Project`] this [`Invoice`] relates to, if any.
    ///
    /// [`Project`]: crate::domain::Project
    pub project_id: Option<project::Id>,

    /// ID of the [`Quote`] this [`Invoice`] is based on, if any.
    ///
    /// [`Quote`]: crate::domain::Quote
    pub quote_id: Option<quote::Id>,

    /// Title of this [`Invoice`].
    pub title: Line,

    /// Description of this [`Invoice`].
    pub description: Option<Text>,

    /// Stored [`Status`] of this [`Invoice`].
    pub status: Status,

    /// [`DateTime`] when this [`Invoice`] was issued.
    pub issue_date: IssueDateTime,

    /// [`DateTime`] when this [`Invoice`] is due.
    pub due_date: DueDateTime,

    /// [`DateTime`] when this [`Invoice`] was paid.
    pub paid_date: Option<PaymentDateTime>,

    /// Sum of the [`Item`] totals.
    pub subtotal: Money,

    /// Tax rate applied to the `subtotal`.
    pub tax_rate: Percent,

    /// Tax amount.
    pub tax_amount: Money,

    /// Flat discount.
    pub discount: Money,

    /// `subtotal + tax_amount - discount`.
    pub total: Money,

    /// Amount paid so far.
    pub paid_amount: Money,

    /// `total - paid_amount`.
    pub balance: Money,

    /// Additional notes.
    pub notes: Option<Text>,

    /// Terms and conditions.
    pub terms: Option<Text>,

    /// Line [`Item`]s of this [`Invoice`], ordered by position.
    pub items: Vec<Item>,

    /// [`DateTime`] when this [`Invoice`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Invoice`] was modified last time.
    pub updated_at: ModificationDateTime,

    /// [`DateTime`] when this [`Invoice`] was deleted.
    #[serde(skip)]
    pub deleted_at: Option<DeletionDateTime>,
}

impl Invoice {
    /// Stores the provided [`Totals`] in this [`Invoice`] and recomputes its
    /// balance.
    pub fn set_totals(&mut self, totals: Totals) {
        let Totals {
            subtotal,
            tax_amount,
            total,
        } = totals;
        self.subtotal = subtotal;
        self.tax_amount = tax_amount;
        self.total = total;
        self.balance = finance::balance(total, self.paid_amount);
    }

    /// Recomputes [`Totals`] of this [`Invoice`] out of its [`Item`]s.
    pub fn recompute(&mut self) {
        self.set_totals(Totals::compute(
            &self.items,
            self.tax_rate,
            self.discount,
        ));
    }

    /// Records the provided `amount` as paid, recomputing the balance.
    pub fn set_paid_amount(&mut self, amount: Money) {
        self.paid_amount = amount.round();
        self.balance = finance::balance(self.total, self.paid_amount);
    }

    /// Marks this [`Invoice`] as fully paid at the provided moment.
    pub fn settle(&mut self, at: PaymentDateTime) {
        self.status = Status::Paid;
        self.paid_date = Some(at);
        self.set_paid_amount(self.total);
    }

    /// Returns the [`Status`] of this [`Invoice`] at the provided moment.
    ///
    /// A [`Status::Sent`] [`Invoice`] past its due date with a positive
    /// balance is reported as [`Status::Overdue`], though never stored so.
    #[must_use]
    pub fn effective_status<Of: ?Sized>(&self, now: DateTimeOf<Of>) -> Status {
        if self.status == Status::Sent
            && self.due_date < now.coerce()
            && self.balance > Money::ZERO
        {
            Status::Overdue
        } else {
            self.status
        }
    }

    /// Replaces the stored [`Status`] of this [`Invoice`] with its
    /// [`Invoice::effective_status()`] for presentation.
    #[must_use]
    pub fn classify<Of: ?Sized>(mut self, now: DateTimeOf<Of>) -> Self {
        self.status = self.effective_status(now);
        self
    }
}

/// ID of an [`Invoice`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Unique number of an [`Invoice`] in a `FAC-YYYYMM-NNNN` form.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[serde(transparent)]
pub struct Number(String);

impl Number {
    /// Returns the numbering [`Series`] of an [`Invoice`] created at the
    /// provided moment.
    #[must_use]
    pub fn series(at: CreationDateTime) -> Series {
        Series::of(Document::Invoice, at)
    }

    /// Creates a new [`Number`] with the provided [`Sequence`] inside the
    /// provided [`Series`].
    #[must_use]
    pub fn new(series: &Series, seq: Sequence) -> Self {
        Self(series.format(seq))
    }
}

define_kind! {
    #[doc = "Status of an [`Invoice`]."]
    enum Status {
        #[doc = "The [`Invoice`] is being prepared."]
        Draft,

        #[doc = "The [`Invoice`] has been sent to the client."]
        Sent,

        #[doc = "The [`Invoice`] has been paid."]
        Paid,

        #[doc = "The [`Invoice`] is past its due date."]
        Overdue,

        #[doc = "The [`Invoice`] has been cancelled."]
        Cancelled,
    }
}

impl Status {
    /// [`Status`]es of [`Invoice`]s still awaiting payment.
    pub const OUTSTANDING: [Self; 2] = [Self::Sent, Self::Overdue];
}

impl Lifecycle for Status {
    fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }

    fn allows_deletion(self) -> bool {
        !matches!(self, Self::Paid)
    }

    fn can_transition_to(self, next: Self) -> bool {
        use Status as S;

        match self {
            S::Draft => matches!(next, S::Sent | S::Cancelled),
            S::Sent | S::Overdue => {
                matches!(next, S::Paid | S::Overdue | S::Cancelled)
            }
            S::Paid | S::Cancelled => false,
        }
    }
}

/// [`DateTime`] when an [`Invoice`] was created.
pub type CreationDateTime = DateTimeOf<(Invoice, unit::Creation)>;

/// [`DateTime`] when an [`Invoice`] was modified.
pub type ModificationDateTime = DateTimeOf<(Invoice, unit::Modification)>;

/// [`DateTime`] when an [`Invoice`] was deleted.
pub type DeletionDateTime = DateTimeOf<(Invoice, unit::Deletion)>;

/// [`DateTime`] when an [`Invoice`] was issued.
pub type IssueDateTime = DateTimeOf<(Invoice, unit::Start)>;

/// [`DateTime`] when an [`Invoice`] is due.
pub type DueDateTime = DateTimeOf<(Invoice, unit::Expiration)>;

/// [`DateTime`] when an [`Invoice`] was paid.
pub type PaymentDateTime = DateTimeOf<(Invoice, unit::Payment)>;

#[cfg(test)]
mod spec {
    use common::{DateTime, Money, Percent};

    use crate::domain::{client, text::Line};

    use super::{Id, Invoice, Number, Status};

    fn invoice(status: Status, total: &str, due: &str) -> Invoice {
        let now = DateTime::parse("2024-03-01").unwrap();
        let total = total.parse().unwrap();
        Invoice {
            id: Id::new(),
            number: Number("FAC-202403-0001".into()),
            client_id: client::Id::default(),
            project_id: None,
            quote_id: None,
            title: Line::new("Roof works").unwrap(),
            description: None,
            status,
            issue_date: now.coerce(),
            due_date: DateTime::parse(due).unwrap().coerce(),
            paid_date: None,
            subtotal: total,
            tax_rate: Percent::ZERO,
            tax_amount: Money::ZERO,
            discount: Money::ZERO,
            total,
            paid_amount: Money::ZERO,
            balance: total,
            notes: None,
            terms: None,
            items: vec![],
            created_at: now.coerce(),
            updated_at: now.coerce(),
            deleted_at: None,
        }
    }

    #[test]
    fn overdue_is_classified_at_query_time() {
        let inv = invoice(Status::Sent, "100", "2024-03-15");

        let before = DateTime::parse("2024-03-14").unwrap();
        let after = DateTime::parse("2024-03-16").unwrap();

        assert_eq!(inv.effective_status(before), Status::Sent);
        assert_eq!(inv.effective_status(after), Status::Overdue);
        assert_eq!(inv.status, Status::Sent);
    }

    #[test]
    fn settled_invoice_is_never_overdue() {
        let mut inv = invoice(Status::Sent, "100", "2024-03-15");
        inv.settle(DateTime::parse("2024-03-20").unwrap().coerce());

        assert_eq!(inv.status, Status::Paid);
        assert_eq!(inv.balance, Money::ZERO);
        assert_eq!(inv.paid_amount, inv.total);
        assert_eq!(
            inv.effective_status(DateTime::parse("2024-04-01").unwrap()),
            Status::Paid,
        );
    }

    #[test]
    fn partial_payment_updates_balance() {
        let mut inv = invoice(Status::Sent, "250", "2024-03-15");
        inv.set_paid_amount("100".parse().unwrap());

        assert_eq!(inv.balance, "150".parse().unwrap());
    }
}
