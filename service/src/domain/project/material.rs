//! [`ProjectMaterial`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money, Quantity};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{material, project, text::Text};

/// [`Material`] planned for or used by a [`Project`].
///
/// [`Material`]: crate::domain::Material
/// [`Project`]: crate::domain::Project
#[derive(Clone, Debug, Serialize)]
pub struct ProjectMaterial {
    /// ID of this [`ProjectMaterial`].
    pub id: Id,

    /// ID of the [`Project`] this [`ProjectMaterial`] belongs to.
    ///
    /// [`Project`]: crate::domain::Project
    pub project_id: project::Id,

    /// ID of the referenced [`Material`].
    ///
    /// [`Material`]: crate::domain::Material
    pub material_id: material::Id,

    /// Planned [`Quantity`]. Always positive.
    pub quantity_planned: Quantity,

    /// [`Quantity`] used so far.
    pub quantity_used: Quantity,

    /// Price of a single unit.
    pub unit_price: Money,

    /// `quantity_planned × unit_price`.
    pub total_cost: Money,

    /// [`Status`] of this [`ProjectMaterial`].
    pub status: Status,

    /// [`DateTime`] when the material is delivered.
    pub delivery_date: Option<DeliveryDateTime>,

    /// Additional notes.
    pub notes: Option<Text>,

    /// [`DateTime`] when this [`ProjectMaterial`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`ProjectMaterial`] was modified last time.
    pub updated_at: ModificationDateTime,
}

impl ProjectMaterial {
    /// Computes the total cost of the provided planned [`Quantity`].
    ///
    /// [`None`] is returned if the cost goes beyond [`Money::LIMIT`].
    #[must_use]
    pub fn cost(
        quantity_planned: Quantity,
        unit_price: Money,
    ) -> Option<Money> {
        unit_price
            .checked_mul(quantity_planned)
            .map(Money::round)
            .filter(|c| c.is_storable())
    }
}

/// ID of a [`ProjectMaterial`].
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
    #[doc = "Supply status of a [`ProjectMaterial`]."]
    enum Status {
        #[doc = "The material is only planned."]
        Planned,

        #[doc = "The material has been ordered."]
        Ordered,

        #[doc = "The material has been delivered to the site."]
        Delivered,

        #[doc = "The material has been used."]
        Used,
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::Planned
    }
}

/// [`DateTime`] when a [`ProjectMaterial`] was created.
pub type CreationDateTime = DateTimeOf<(ProjectMaterial, unit::Creation)>;

/// [`DateTime`] when a [`ProjectMaterial`] was modified.
pub type ModificationDateTime =
    DateTimeOf<(ProjectMaterial, unit::Modification)>;

/// [`DateTime`] when a [`ProjectMaterial`] is delivered.
pub type DeliveryDateTime = DateTimeOf<(ProjectMaterial, unit::End)>;

#[cfg(test)]
mod spec {
    use common::{Money, Quantity};

    use super::ProjectMaterial;

    fn cost(quantity: &str, price: &str) -> Option<Money> {
        ProjectMaterial::cost(
            quantity.parse::<Quantity>().unwrap(),
            price.parse::<Money>().unwrap(),
        )
    }

    #[test]
    fn rounds_cost() {
        assert_eq!(cost("2.5", "3.333"), Some("8.33".parse().unwrap()));
    }

    #[test]
    fn rejects_oversized_cost() {
        assert_eq!(cost("99999999999.999", "999999999999.99"), None);
        assert!(cost("1", "999999999999.99").is_some());
    }
}
