//! [`Money`]-related definitions.

use std::{
    fmt, iter,
    ops::{Add, AddAssign, Mul, Neg, Sub},
    str::FromStr,
};

#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{Percent, Quantity};

/// Amount of money.
///
/// May be negative: a discount exceeding the taxed subtotal produces a
/// negative total.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(transparent))]
pub struct Money(Decimal);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Number of fraction digits [`Money`] is stored with.
    pub const SCALE: u32 = 2;

    /// Exclusive bound of an absolute amount fitting the `NUMERIC(14, 2)`
    /// storage: `10^12`.
    pub const LIMIT: Decimal =
        Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

    /// Creates a new [`Money`] out of the provided `amount`.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Creates a new [`Money`] if the provided `amount` is not negative.
    #[must_use]
    pub fn non_negative(amount: Decimal) -> Option<Self> {
        (!amount.is_sign_negative() || amount.is_zero()).then_some(Self(amount))
    }

    /// Creates a new [`Money`] if the provided `amount` is within the
    /// [`Money::LIMIT`].
    #[must_use]
    pub fn storable(amount: Decimal) -> Option<Self> {
        Some(Self(amount)).filter(|m| m.is_storable())
    }

    /// Indicates whether this [`Money`] is within the [`Money::LIMIT`].
    #[must_use]
    pub fn is_storable(self) -> bool {
        self.0.abs() < Self::LIMIT
    }

    /// Multiplies this [`Money`] by the provided [`Quantity`].
    ///
    /// [`None`] is returned on overflow.
    #[must_use]
    pub fn checked_mul(self, rhs: Quantity) -> Option<Self> {
        self.0.checked_mul(rhs.value()).map(Self)
    }

    /// Adds the `other` [`Money`] to this one.
    ///
    /// [`None`] is returned on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Returns the underlying amount.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Indicates whether this [`Money`] is below zero.
    #[must_use]
    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Rounds this [`Money`] to [`Money::SCALE`] fraction digits, with
    /// midpoints rounded away from zero.
    #[must_use]
    pub fn round(self) -> Self {
        Self(self.0.round_dp_with_strategy(
            Self::SCALE,
            RoundingStrategy::MidpointAwayFromZero,
        ))
    }

    /// Returns the percentage of `self` this `part` represents.
    ///
    /// [`None`] is returned if `self` is zero.
    #[must_use]
    pub fn ratio_of(self, part: Self) -> Option<Decimal> {
        if self.0.is_zero() {
            return None;
        }
        Some(part.0 / self.0 * Decimal::ONE_HUNDRED)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .ok()
            .and_then(Self::storable)
            .ok_or("invalid amount")
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let amount =
            <Decimal as serde::Deserialize>::deserialize(deserializer)?;
        Self::storable(amount)
            .ok_or_else(|| serde::de::Error::custom("amount is out of range"))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Mul<Quantity> for Money {
    type Output = Self;

    fn mul(self, rhs: Quantity) -> Self::Output {
        Self(self.0 * rhs.value())
    }
}

impl Mul<Percent> for Money {
    type Output = Self;

    fn mul(self, rhs: Percent) -> Self::Output {
        Self(self.0 * rhs.value() / Decimal::ONE_HUNDRED)
    }
}

impl iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> iter::Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use crate::{Percent, Quantity};

    use super::Money;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn from_str() {
        assert_eq!(money("123.45").amount(), decimal("123.45"));
        assert_eq!(money(" 7 ").amount(), decimal("7"));
        assert_eq!(money("-3.5").amount(), decimal("-3.5"));

        assert!(Money::from_str("").is_err());
        assert!(Money::from_str("12,5").is_err());
        assert!(Money::from_str("12USD").is_err());
    }

    #[test]
    fn to_string() {
        assert_eq!(money("123.45").to_string(), "123.45");
        assert_eq!(money("123").to_string(), "123.00");
        assert_eq!(money("0.5").to_string(), "0.50");
        assert_eq!(money("-10").to_string(), "-10.00");
    }

    #[test]
    fn non_negative() {
        assert!(Money::non_negative(decimal("0")).is_some());
        assert!(Money::non_negative(decimal("0.01")).is_some());
        assert!(Money::non_negative(decimal("-0.01")).is_none());
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(money("1.005").round(), money("1.01"));
        assert_eq!(money("1.004").round(), money("1.00"));
        assert_eq!(money("-1.005").round(), money("-1.01"));
        assert_eq!(money("2.5").round(), money("2.50"));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(money("10.10") + money("0.90"), money("11"));
        assert_eq!(money("10") - money("12.5"), money("-2.5"));
        assert_eq!(-money("4"), money("-4"));
        assert_eq!(
            money("12.50") * Quantity::new(decimal("4")).unwrap(),
            money("50"),
        );
        assert_eq!(
            money("200") * Percent::new(decimal("16")).unwrap(),
            money("32"),
        );
        assert_eq!(
            [money("1"), money("2.5"), money("-0.5")]
                .into_iter()
                .sum::<Money>(),
            money("3"),
        );
    }

    #[test]
    fn rejects_unstorable_amounts() {
        assert!(Money::from_str("999999999999.99").is_ok());
        assert!(Money::from_str("1000000000000").is_err());
        assert!(Money::from_str("-1000000000000").is_err());
        assert_eq!(Money::LIMIT, decimal("1000000000000"));
    }

    #[test]
    fn checked_arithmetic() {
        let huge = Money::new(Decimal::MAX);

        assert_eq!(huge.checked_add(money("1")), None);
        assert_eq!(
            huge.checked_mul(Quantity::new(decimal("2")).unwrap()),
            None,
        );
        assert_eq!(
            money("2.5").checked_mul(Quantity::new(decimal("4")).unwrap()),
            Some(money("10")),
        );
    }

    #[test]
    fn ratio_of() {
        assert_eq!(money("200").ratio_of(money("50")), Some(decimal("25")));
        assert_eq!(money("0").ratio_of(money("50")), None);
    }
}
