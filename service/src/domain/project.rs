//! [`Project`] definitions.

pub mod material;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    client, numbering,
    status::Lifecycle,
    text::{Line, Text},
};

pub use self::material::ProjectMaterial;

/// Construction project of a [`Client`].
///
/// [`Client`]: crate::domain::Client
#[derive(Clone, Debug, Serialize)]
pub struct Project {
    /// ID of this [`Project`].
    pub id: Id,

    /// ID of the [`Client`] this [`Project`] belongs to.
    ///
    /// [`Client`]: crate::domain::Client
    pub client_id: client::Id,

    /// Unique [`Code`] of this [`Project`].
    pub code: Code,

    /// Name of this [`Project`].
    pub name: Line,

    /// Description of this [`Project`].
    pub description: Option<Text>,

    /// [`Status`] of this [`Project`].
    pub status: Status,

    /// [`Priority`] of this [`Project`].
    pub priority: Priority,

    /// [`Kind`] of this [`Project`].
    #[serde(rename = "type")]
    pub kind: Kind,

    /// Street address of the construction site.
    pub address: Option<Line>,

    /// City of the construction site.
    pub city: Option<Line>,

    /// State of the construction site.
    pub state: Option<Line>,

    /// ZIP code of the construction site.
    pub zip_code: Option<Line>,

    /// [`DateTime`] when this [`Project`] starts.
    pub start_date: Option<StartDateTime>,

    /// [`DateTime`] when this [`Project`] is due.
    pub end_date: Option<EndDateTime>,

    /// Budget of this [`Project`].
    pub budget: Money,

    /// Estimated cost of this [`Project`].
    pub estimated_cost: Money,

    /// Actual cost of this [`Project`] so far.
    pub actual_cost: Money,

    /// [`Progress`] of this [`Project`].
    pub progress: Progress,

    /// Additional notes.
    pub notes: Option<Text>,

    /// [`DateTime`] when this [`Project`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Project`] was modified last time.
    pub updated_at: ModificationDateTime,

    /// [`DateTime`] when this [`Project`] was deleted.
    #[serde(skip)]
    pub deleted_at: Option<DeletionDateTime>,
}

impl Project {
    /// Indicates whether this [`Project`] is still being worked on.
    #[must_use]
    pub fn is_ongoing(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// ID of a [`Project`].
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

/// Unique code of a [`Project`] in a `PRJ-YYYYMMDD-NNNN` form.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[serde(transparent)]
pub struct Code(String);

impl Code {
    /// Generates a new [`Code`] for a [`Project`] created at the provided
    /// moment.
    #[must_use]
    pub fn generate(at: CreationDateTime) -> Self {
        Self(numbering::project_code(at))
    }
}

/// Completion percentage of a [`Project`], within `0..=100`.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[serde(into = "i32", try_from = "i32")]
pub struct Progress(i32);

impl Progress {
    /// Creates a new [`Progress`] if the provided `percent` is within
    /// `0..=100`.
    #[must_use]
    pub fn new(percent: i32) -> Option<Self> {
        (0..=100).contains(&percent).then_some(Self(percent))
    }
}

impl TryFrom<i32> for Progress {
    type Error = &'static str;

    fn try_from(percent: i32) -> Result<Self, Self::Error> {
        Self::new(percent).ok_or("progress must be within 0..=100")
    }
}

define_kind! {
    #[doc = "Status of a [`Project`]."]
    enum Status {
        #[doc = "The [`Project`] is being planned."]
        Planning,

        #[doc = "The [`Project`] is being executed."]
        InProgress,

        #[doc = "The [`Project`] has been finished."]
        Completed,

        #[doc = "The [`Project`] has been cancelled."]
        Cancelled,

        #[doc = "The [`Project`] is paused."]
        OnHold,
    }
}

impl Status {
    /// [`Status`]es of [`Project`]s still being worked on.
    pub const ONGOING: [Self; 3] = [Self::Planning, Self::InProgress, Self::OnHold];

    /// [`Status`]es of [`Project`]s whose deadlines are tracked.
    pub const SCHEDULED: [Self; 2] = [Self::Planning, Self::InProgress];
}

impl Lifecycle for Status {
    fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    fn allows_deletion(self) -> bool {
        true
    }

    fn can_transition_to(self, _: Self) -> bool {
        true
    }
}

define_kind! {
    #[doc = "Priority of a [`Project`]."]
    enum Priority {
        #[doc = "Low priority."]
        Low,

        #[doc = "Medium priority."]
        Medium,

        #[doc = "High priority."]
        High,

        #[doc = "Urgent."]
        Urgent,
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

define_kind! {
    #[doc = "Kind of [`Project`] works."]
    enum Kind {
        #[doc = "New construction."]
        Construction,

        #[doc = "Renovation of an existing building."]
        Renovation,

        #[doc = "Maintenance works."]
        Maintenance,
    }
}

impl Default for Kind {
    fn default() -> Self {
        Self::Construction
    }
}

/// [`DateTime`] when a [`Project`] was created.
pub type CreationDateTime = DateTimeOf<(Project, unit::Creation)>;

/// [`DateTime`] when a [`Project`] was modified.
pub type ModificationDateTime = DateTimeOf<(Project, unit::Modification)>;

/// [`DateTime`] when a [`Project`] was deleted.
pub type DeletionDateTime = DateTimeOf<(Project, unit::Deletion)>;

/// [`DateTime`] when a [`Project`] starts.
pub type StartDateTime = DateTimeOf<(Project, unit::Start)>;

/// [`DateTime`] when a [`Project`] is due.
pub type EndDateTime = DateTimeOf<(Project, unit::End)>;

#[cfg(test)]
mod spec {
    use super::Progress;

    #[test]
    fn progress_bounds() {
        assert!(Progress::new(0).is_some());
        assert!(Progress::new(100).is_some());
        assert!(Progress::new(-1).is_none());
        assert!(Progress::new(101).is_none());
    }
}
