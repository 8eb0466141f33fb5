//! Line [`Item`] of a quote or an invoice.

use common::{Money, Quantity};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::text::{Line, Text};

/// Line item of a document.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Item {
    /// ID of this [`Item`].
    pub id: Id,

    /// Description of this [`Item`].
    pub description: Line,

    /// [`Quantity`] of units. Always positive.
    pub quantity: Quantity,

    /// Unit this [`Item`] is measured in.
    pub unit: Line,

    /// Price of a single unit.
    pub unit_price: Money,

    /// Total price of this [`Item`]: `quantity × unit_price`.
    pub total: Money,

    /// Additional notes.
    pub notes: Option<Text>,

    /// Position of this [`Item`] inside its document.
    pub position: i32,
}

impl Item {
    /// Unit used when none is specified.
    pub const DEFAULT_UNIT: &'static str = "pcs";

    /// Creates a new [`Item`] out of the provided [`Draft`] placed at the
    /// provided `position`.
    ///
    /// # Errors
    ///
    /// Returns the name of the offending field if the [`Draft`] is invalid.
    pub fn new(draft: Draft, position: i32) -> Result<Self, &'static str> {
        let total = draft.total()?;
        let Draft {
            description,
            quantity,
            unit,
            unit_price,
            notes,
        } = draft;
        Ok(Self {
            id: Id::new(),
            description,
            total,
            quantity,
            unit: unit.unwrap_or_else(default_unit),
            unit_price,
            notes,
            position,
        })
    }

    /// Converts this [`Item`] back into a [`Draft`].
    #[must_use]
    pub fn to_draft(&self) -> Draft {
        Draft {
            description: self.description.clone(),
            quantity: self.quantity,
            unit: Some(self.unit.clone()),
            unit_price: self.unit_price,
            notes: self.notes.clone(),
        }
    }
}

/// Returns the [`Item::DEFAULT_UNIT`] as a [`Line`].
#[expect(unsafe_code, reason = "invariants are preserved")]
fn default_unit() -> Line {
    // SAFETY: The constant is a valid `Line`.
    unsafe { Line::new_unchecked(Item::DEFAULT_UNIT) }
}

/// Validated input of a new [`Item`].
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Draft {
    /// Description of the [`Item`].
    pub description: Line,

    /// [`Quantity`] of units.
    pub quantity: Quantity,

    /// Unit the [`Item`] is measured in, [`Item::DEFAULT_UNIT`] if omitted.
    #[serde(default)]
    pub unit: Option<Line>,

    /// Price of a single unit.
    pub unit_price: Money,

    /// Additional notes.
    #[serde(default)]
    pub notes: Option<Text>,
}

impl Draft {
    /// Checks the numeric invariants of this [`Draft`] and computes the
    /// rounded total price of its [`Item`].
    ///
    /// `quantity` must be positive, `unit_price` must not be negative and
    /// the total must stay within [`Money::LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns the name of the offending field.
    pub fn total(&self) -> Result<Money, &'static str> {
        if self.quantity.is_zero() {
            return Err("quantity");
        }
        if self.unit_price.is_negative() || !self.unit_price.is_storable() {
            return Err("unit_price");
        }
        self.unit_price
            .checked_mul(self.quantity)
            .map(Money::round)
            .filter(|t| t.is_storable())
            .ok_or("total")
    }
}

/// ID of an [`Item`].
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

/// Builds [`Item`]s out of the provided [`Draft`]s, numbering their
/// positions in order.
///
/// The running subtotal of the [`Item`]s must stay within
/// [`Money::LIMIT`] too.
///
/// # Errors
///
/// Returns the index and the offending field name of the first invalid
/// [`Draft`].
pub fn build(
    drafts: impl IntoIterator<Item = Draft>,
) -> Result<Vec<Item>, (usize, &'static str)> {
    let mut subtotal = Money::ZERO;
    drafts
        .into_iter()
        .enumerate()
        .map(|(i, d)| {
            let position = i32::try_from(i).map_err(|_| (i, "position"))?;
            let item = Item::new(d, position).map_err(|field| (i, field))?;
            subtotal = subtotal
                .checked_add(item.total)
                .filter(|s| s.is_storable())
                .ok_or((i, "total"))?;
            Ok(item)
        })
        .collect()
}

#[cfg(test)]
mod spec {
    use common::{Money, Quantity};

    use crate::domain::text::Line;

    use super::{build, Draft, Item};

    fn draft(quantity: &str, price: &str) -> Draft {
        Draft {
            description: Line::new("Cement bag").unwrap(),
            quantity: quantity.parse::<Quantity>().unwrap(),
            unit: None,
            unit_price: price.parse::<Money>().unwrap(),
            notes: None,
        }
    }

    #[test]
    fn computes_total_and_defaults_unit() {
        let item = Item::new(draft("3", "12.50"), 0).unwrap();

        assert_eq!(item.total, "37.50".parse().unwrap());
        assert_eq!(AsRef::<str>::as_ref(&item.unit), "pcs");
    }

    #[test]
    fn build_numbers_positions() {
        let items = build([draft("1", "1"), draft("2", "2")]).unwrap();

        assert_eq!(
            items.iter().map(|i| i.position).collect::<Vec<_>>(),
            [0, 1],
        );
    }

    #[test]
    fn build_rejects_invalid_drafts() {
        assert_eq!(
            build([draft("1", "1"), draft("0", "2")]),
            Err((1, "quantity")),
        );
        assert_eq!(build([draft("1", "-2")]), Err((0, "unit_price")));
    }

    #[test]
    fn build_rejects_oversized_totals() {
        let max_quantity = "99999999999.999";
        let max_price = "999999999999.99";

        assert_eq!(
            build([draft("1", "1"), draft(max_quantity, max_price)]),
            Err((1, "total")),
        );
        assert_eq!(
            build([draft("1", "600000000000"), draft("1", "600000000000")]),
            Err((1, "total")),
        );
        assert!(build([draft("1", max_price)]).is_ok());
    }
}
