//! [`Client`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    text::{Line, Text},
    Email,
};

/// Customer of the construction business.
#[derive(Clone, Debug, Serialize)]
pub struct Client {
    /// ID of this [`Client`].
    pub id: Id,

    /// Name of this [`Client`].
    pub name: Line,

    /// [`Email`] of this [`Client`], unique among live [`Client`]s.
    pub email: Option<Email>,

    /// Phone number of this [`Client`].
    pub phone: Option<Line>,

    /// Street address of this [`Client`].
    pub address: Option<Line>,

    /// City of this [`Client`].
    pub city: Option<Line>,

    /// State of this [`Client`].
    pub state: Option<Line>,

    /// ZIP code of this [`Client`].
    pub zip_code: Option<Line>,

    /// Company this [`Client`] represents.
    pub company: Option<Line>,

    /// Tax ID of this [`Client`].
    pub tax_id: Option<Line>,

    /// [`ContactType`] of this [`Client`].
    pub contact_type: ContactType,

    /// Additional notes.
    pub notes: Option<Text>,

    /// Indicator whether this [`Client`] is active.
    pub is_active: bool,

    /// [`DateTime`] when this [`Client`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Client`] was modified last time.
    pub updated_at: ModificationDateTime,

    /// [`DateTime`] when this [`Client`] was deleted.
    #[serde(skip)]
    pub deleted_at: Option<DeletionDateTime>,
}

/// ID of a [`Client`].
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

define_kind! {
    #[doc = "Type of a [`Client`] contact."]
    enum ContactType {
        #[doc = "Private person."]
        Individual,

        #[doc = "Legal entity."]
        Company,
    }
}

impl Default for ContactType {
    fn default() -> Self {
        Self::Individual
    }
}

/// [`DateTime`] when a [`Client`] was created.
pub type CreationDateTime = DateTimeOf<(Client, unit::Creation)>;

/// [`DateTime`] when a [`Client`] was modified.
pub type ModificationDateTime = DateTimeOf<(Client, unit::Modification)>;

/// [`DateTime`] when a [`Client`] was deleted.
pub type DeletionDateTime = DateTimeOf<(Client, unit::Deletion)>;
