//! [`Quantity`]-related definitions.

use std::{ops::Add, str::FromStr};

use derive_more::Display;
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;

/// Non-negative amount of something (items, stock units, hours).
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(into = "Decimal", try_from = "Decimal")
)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Zero [`Quantity`].
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Exclusive upper bound of a value fitting the `NUMERIC(14, 3)`
    /// storage: `10^11`.
    pub const LIMIT: Decimal =
        Decimal::from_parts(0x4876_E800, 0x17, 0, false, 0);

    /// Creates a new [`Quantity`] if the provided value is not negative and
    /// is below the [`Quantity::LIMIT`].
    #[must_use]
    pub fn new(val: Decimal) -> Option<Self> {
        (val >= Decimal::ZERO && val < Self::LIMIT).then_some(Self(val))
    }

    /// Returns the underlying value of this [`Quantity`].
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }

    /// Indicates whether this [`Quantity`] is zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Subtracts the `other` [`Quantity`] from this one.
    ///
    /// [`None`] is returned if the result would be negative.
    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        Self::new(self.0 - other.0)
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl FromStr for Quantity {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s)
            .ok()
            .and_then(Self::new)
            .ok_or("invalid quantity")
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = &'static str;

    fn try_from(val: Decimal) -> Result<Self, Self::Error> {
        Self::new(val).ok_or("quantity is negative or out of range")
    }
}

impl From<Quantity> for Decimal {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use super::Quantity;

    fn qty(n: i64) -> Quantity {
        Quantity::new(Decimal::from(n)).unwrap()
    }

    #[test]
    fn rejects_negative() {
        assert!(Quantity::new(Decimal::NEGATIVE_ONE).is_none());
        assert!(Quantity::new(Decimal::ZERO).is_some());
        assert!("-2".parse::<Quantity>().is_err());
    }

    #[test]
    fn rejects_unstorable() {
        assert!(Quantity::new(Quantity::LIMIT).is_none());
        assert!("99999999999.999".parse::<Quantity>().is_ok());
        assert!("100000000000".parse::<Quantity>().is_err());
    }

    #[test]
    fn checked_sub() {
        assert_eq!(qty(10).checked_sub(qty(4)), Some(qty(6)));
        assert_eq!(qty(4).checked_sub(qty(4)), Some(Quantity::ZERO));
        assert_eq!(qty(4).checked_sub(qty(5)), None);
    }

    #[test]
    fn add() {
        assert_eq!(qty(2) + qty(3), qty(5));
    }
}
