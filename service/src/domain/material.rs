//! [`Material`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money, Quantity};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::text::{Line, Text};

/// Construction material kept in stock.
#[derive(Clone, Debug, Serialize)]
pub struct Material {
    /// ID of this [`Material`].
    pub id: Id,

    /// Name of this [`Material`].
    pub name: Line,

    /// Description of this [`Material`].
    pub description: Option<Text>,

    /// Category of this [`Material`].
    pub category: Line,

    /// Unit this [`Material`] is measured in.
    pub unit: Line,

    /// Price of a single unit.
    pub unit_price: Money,

    /// Supplier of this [`Material`].
    pub supplier: Option<Line>,

    /// [`Sku`] of this [`Material`], unique among live [`Material`]s.
    pub sku: Option<Sku>,

    /// Current stock.
    pub stock: Quantity,

    /// Stock level at or below which this [`Material`] is low on stock.
    pub min_stock: Quantity,

    /// Indicator whether this [`Material`] is active.
    pub is_active: bool,

    /// Additional notes.
    pub notes: Option<Text>,

    /// [`DateTime`] when this [`Material`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Material`] was modified last time.
    pub updated_at: ModificationDateTime,

    /// [`DateTime`] when this [`Material`] was deleted.
    #[serde(skip)]
    pub deleted_at: Option<DeletionDateTime>,
}

impl Material {
    /// Indicates whether this [`Material`] is active and low on stock.
    #[must_use]
    pub fn is_low_stock(&self) -> bool {
        self.is_active && self.stock <= self.min_stock
    }

    /// Returns the value of the current stock of this [`Material`].
    #[must_use]
    pub fn stock_value(&self) -> Money {
        (self.unit_price * self.stock).round()
    }
}

/// ID of a [`Material`].
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

/// Stock keeping unit of a [`Material`].
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, Hash, Into, PartialEq, Serialize,
)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[serde(into = "String", try_from = "String")]
pub struct Sku(String);

impl Sku {
    /// Creates a new [`Sku`] if the given `sku` is valid.
    ///
    /// Surrounding whitespace is trimmed.
    #[must_use]
    pub fn new(sku: impl Into<String>) -> Option<Self> {
        let sku = sku.into();
        let sku = sku.trim();
        Self::check(sku).then(|| Self(sku.to_owned()))
    }

    /// Checks whether the given `sku` is a valid [`Sku`].
    fn check(sku: &str) -> bool {
        !sku.is_empty()
            && sku.len() <= 64
            && sku
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    }
}

impl TryFrom<String> for Sku {
    type Error = &'static str;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s).ok_or("invalid SKU")
    }
}

define_kind! {
    #[doc = "Direction of a [`Material`] stock movement."]
    enum Movement {
        #[doc = "Stock arrives."]
        In,

        #[doc = "Stock leaves."]
        Out,
    }
}

/// Movement of a [`Material`] stock by some [`Quantity`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StockAdjustment {
    /// ID of the [`Material`] whose stock moves.
    pub material_id: Id,

    /// Direction of the movement.
    pub movement: Movement,

    /// Moved [`Quantity`]. Always positive.
    pub quantity: Quantity,
}

impl StockAdjustment {
    /// Applies this [`StockAdjustment`] to the provided `stock`.
    ///
    /// [`None`] is returned if the stock would become negative.
    #[must_use]
    pub fn apply(&self, stock: Quantity) -> Option<Quantity> {
        match self.movement {
            Movement::In => Some(stock + self.quantity),
            Movement::Out => stock.checked_sub(self.quantity),
        }
    }
}

/// [`DateTime`] when a [`Material`] was created.
pub type CreationDateTime = DateTimeOf<(Material, unit::Creation)>;

/// [`DateTime`] when a [`Material`] was modified.
pub type ModificationDateTime = DateTimeOf<(Material, unit::Modification)>;

/// [`DateTime`] when a [`Material`] was deleted.
pub type DeletionDateTime = DateTimeOf<(Material, unit::Deletion)>;

#[cfg(test)]
pub(crate) mod spec {
    use common::{DateTime, Quantity};

    use crate::domain::text::Line;

    use super::{Id, Material, Movement, Sku, StockAdjustment};

    /// Creates a [`Material`] fixture.
    pub(crate) fn material(stock: &str, min_stock: &str, price: &str) -> Material {
        let now = DateTime::now();
        Material {
            id: Id::new(),
            name: Line::new("Cement").unwrap(),
            description: None,
            category: Line::new("Masonry").unwrap(),
            unit: Line::new("bag").unwrap(),
            unit_price: price.parse().unwrap(),
            supplier: None,
            sku: None,
            stock: stock.parse::<Quantity>().unwrap(),
            min_stock: min_stock.parse::<Quantity>().unwrap(),
            is_active: true,
            notes: None,
            created_at: now.coerce(),
            updated_at: now.coerce(),
            deleted_at: None,
        }
    }

    #[test]
    fn low_stock_is_inclusive() {
        assert!(material("5", "5", "1").is_low_stock());
        assert!(material("4", "5", "1").is_low_stock());
        assert!(!material("6", "5", "1").is_low_stock());

        let mut inactive = material("0", "5", "1");
        inactive.is_active = false;
        assert!(!inactive.is_low_stock());
    }

    #[test]
    fn stock_value() {
        assert_eq!(
            material("12", "0", "7.25").stock_value(),
            "87".parse().unwrap(),
        );
    }

    #[test]
    fn sku_format() {
        assert_eq!(
            AsRef::<str>::as_ref(&Sku::new(" CEM-25kg ").unwrap()),
            "CEM-25kg",
        );
        assert!(Sku::new("").is_none());
        assert!(Sku::new("has space").is_none());
    }

    #[test]
    fn stock_never_goes_negative() {
        let adjust = |movement, quantity: &str| StockAdjustment {
            material_id: Id::new(),
            movement,
            quantity: quantity.parse().unwrap(),
        };
        let stock = "5".parse::<Quantity>().unwrap();

        assert_eq!(
            adjust(Movement::In, "2.5").apply(stock),
            Some("7.5".parse().unwrap()),
        );
        assert_eq!(
            adjust(Movement::Out, "5").apply(stock),
            Some(Quantity::ZERO),
        );
        assert_eq!(adjust(Movement::Out, "5.001").apply(stock), None);
    }
}
