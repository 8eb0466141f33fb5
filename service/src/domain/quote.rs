//! [`Quote`] definitions.

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
    finance::Totals,
    item::Item,
    numbering::{Document, Sequence, Series},
    project,
    status::Lifecycle,
    text::{Line, Text},
};

/// Price offer made to a [`Client`].
///
/// [`Client`]: crate::domain::Client
#[derive(Clone, Debug, Serialize)]
pub struct Quote {
    /// ID of this [`Quote`].
    pub id: Id,

    /// Unique [`Number`] of this [`Quote`].
    pub number: Number,

    /// ID of the [`Client`] this [`Quote`] is made for.
    ///
    /// [`Client`]: crate::domain::Client
    pub client_id: client::Id,

    /// ID of the [`Project`] this [`Quote`] relates to, if any.
    ///
    /// [`Project`]: crate::domain::Project
    pub project_id: Option<project::Id>,

    /// Title of this [`Quote`].
    pub title: Line,

    /// Description of this [`Quote`].
    pub description: Option<Text>,

    /// Stored [`Status`] of this [`Quote`].
    pub status: Status,

    /// [`DateTime`] until which this [`Quote`] is valid.
    pub valid_until: Option<ExpirationDateTime>,

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

    /// Additional notes.
    pub notes: Option<Text>,

    /// Terms and conditions.
    pub terms: Option<Text>,

    /// Line [`Item`]s of this [`Quote`], ordered by position.
    pub items: Vec<Item>,

    /// [`DateTime`] when this [`Quote`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Quote`] was modified last time.
    pub updated_at: ModificationDateTime,

    /// [`DateTime`] when this [`Quote`] was deleted.
    #[serde(skip)]
    pub deleted_at: Option<DeletionDateTime>,
}

impl Quote {
    /// Returns the [`Totals`] stored in this [`Quote`].
    #[must_use]
    pub fn totals(&self) -> Totals {
        Totals {
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            total: self.total,
        }
    }

    /// Stores the provided [`Totals`] in this [`Quote`].
    pub fn set_totals(&mut self, totals: Totals) {
        let Totals {
            subtotal,
            tax_amount,
            total,
        } = totals;
        self.subtotal = subtotal;
        self.tax_amount = tax_amount;
        self.total = total;
    }

    /// Recomputes [`Totals`] of this [`Quote`] out of its [`Item`]s.
    pub fn recompute(&mut self) {
        self.set_totals(Totals::compute(
            &self.items,
            self.tax_rate,
            self.discount,
        ));
    }

    /// Returns the [`Status`] of this [`Quote`] at the provided moment.
    ///
    /// A [`Status::Sent`] [`Quote`] whose validity has passed is reported as
    /// [`Status::Expired`], though never stored so.
    #[must_use]
    pub fn effective_status<Of: ?Sized>(&self, now: DateTimeOf<Of>) -> Status {
        match (self.status, self.valid_until) {
            (Status::Sent, Some(until)) if until < now.coerce() => {
                Status::Expired
            }
            (s, _) => s,
        }
    }

    /// Replaces the stored [`Status`] of this [`Quote`] with its
    /// [`Quote::effective_status()`] for presentation.
    #[must_use]
    pub fn classify<Of: ?Sized>(mut self, now: DateTimeOf<Of>) -> Self {
        self.status = self.effective_status(now);
        self
    }
}

/// ID of a [`Quote`].
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

/// Unique number of a [`Quote`] in a `COT-YYYYMM-NNNN` form.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[serde(transparent)]
pub struct Number(String);

impl Number {
    /// Returns the numbering [`Series`] of a [`Quote`] created at the
    /// provided moment.
    #[must_use]
    pub fn series(at: CreationDateTime) -> Series {
        Series::of(Document::Quote, at)
    }

    /// Creates a new [`Number`] with the provided [`Sequence`] inside the
    /// provided [`Series`].
    #[must_use]
    pub fn new(series: &Series, seq: Sequence) -> Self {
        Self(series.format(seq))
    }
}

define_kind! {
    #[doc = "Status of a [`Quote`]."]
    enum Status {
        #[doc = "The [`Quote`] is being prepared."]
        Draft,

        #[doc = "The [`Quote`] has been sent to the client."]
        Sent,

        #[doc = "The client has accepted the [`Quote`]."]
        Accepted,

        #[doc = "The client has rejected the [`Quote`]."]
        Rejected,

        #[doc = "The [`Quote`] validity has passed."]
        Expired,
    }
}

impl Status {
    /// [`Status`]es of [`Quote`]s still awaiting the client decision.
    pub const PENDING: [Self; 2] = [Self::Draft, Self::Sent];
}

impl Lifecycle for Status {
    fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected | Self::Expired)
    }

    fn allows_deletion(self) -> bool {
        !matches!(self, Self::Accepted)
    }

    fn can_transition_to(self, next: Self) -> bool {
        !matches!(next, Self::Expired)
    }
}

/// [`DateTime`] when a [`Quote`] was created.
pub type CreationDateTime = DateTimeOf<(Quote, unit::Creation)>;

/// [`DateTime`] when a [`Quote`] was modified.
pub type ModificationDateTime = DateTimeOf<(Quote, unit::Modification)>;

/// [`DateTime`] when a [`Quote`] was deleted.
pub type DeletionDateTime = DateTimeOf<(Quote, unit::Deletion)>;

/// [`DateTime`] until which a [`Quote`] is valid.
pub type ExpirationDateTime = DateTimeOf<(Quote, unit::Expiration)>;

#[cfg(test)]
pub(crate) mod spec {
    use common::{DateTime, Money, Percent};

    use crate::domain::{client, text::Line};

    use super::{Id, Number, Quote, Status};

    /// Creates a [`Quote`] fixture without [`Item`]s.
    ///
    /// [`Item`]: crate::domain::item::Item
    pub(crate) fn quote(status: Status, total: &str, created: &str) -> Quote {
        let created = DateTime::parse(created).unwrap();
        Quote {
            id: Id::new(),
            number: Number("COT-000000-0001".into()),
            client_id: client::Id::default(),
            project_id: None,
            title: Line::new("Kitchen renovation").unwrap(),
            description: None,
            status,
            valid_until: None,
            subtotal: total.parse().unwrap(),
            tax_rate: Percent::ZERO,
            tax_amount: Money::ZERO,
            discount: Money::ZERO,
            total: total.parse().unwrap(),
            notes: None,
            terms: None,
            items: vec![],
            created_at: created.coerce(),
            updated_at: created.coerce(),
            deleted_at: None,
        }
    }

    #[test]
    fn sent_quote_expires() {
        let mut q = quote(Status::Sent, "10", "2024-03-01");
        q.valid_until = Some(DateTime::parse("2024-03-10").unwrap().coerce());

        let before = DateTime::parse("2024-03-09").unwrap();
        let after = DateTime::parse("2024-03-11").unwrap();

        assert_eq!(q.effective_status(before), Status::Sent);
        assert_eq!(q.effective_status(after), Status::Expired);

        q.status = Status::Accepted;
        assert_eq!(q.effective_status(after), Status::Accepted);
    }

    #[test]
    fn status_strings() {
        assert_eq!(Status::Accepted.to_string(), "accepted");
        assert_eq!("sent".parse::<Status>().ok(), Some(Status::Sent));
        assert!("unknown".parse::<Status>().is_err());
    }
}
