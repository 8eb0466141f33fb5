//! [`Percent`]-related definitions.

use std::str::FromStr;

use derive_more::Display;
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;

/// Floating-point percentage in the `[0; 100]` range.
#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(into = "Decimal", try_from = "Decimal")
)]
pub struct Percent(Decimal);

impl Percent {
    /// Zero [`Percent`].
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a new [`Percent`] by checking the provided value is not less
    /// than `0` and not greater than `100`.
    #[must_use]
    pub fn new(val: Decimal) -> Option<Self> {
        if val < Decimal::ZERO || val > Decimal::ONE_HUNDRED {
            None
        } else {
            #[expect(
                clippy::allow_attributes,
                reason = "`#[expect]` doesn't work on blocks"
            )]
            #[allow(unsafe_code, reason = "invariants checked already")]
            Some(unsafe { Self::new_unchecked(val) })
        }
    }

    /// Creates a new [`Percent`] without performing any validation.
    ///
    /// # Safety
    ///
    /// The provided value must not be less than `0` and not greater than
    /// `100`.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(val: Decimal) -> Self {
        Self(val)
    }

    /// Returns the underlying value of this [`Percent`].
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }
}

impl FromStr for Percent {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s)
            .ok()
            .and_then(Self::new)
            .ok_or("invalid percent value")
    }
}

impl TryFrom<Decimal> for Percent {
    type Error = &'static str;

    fn try_from(val: Decimal) -> Result<Self, Self::Error> {
        Self::new(val).ok_or("percent must be within [0; 100] range")
    }
}

impl From<Percent> for Decimal {
    fn from(p: Percent) -> Self {
        p.0
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::Percent;

    #[test]
    fn bounds() {
        assert!(Percent::new(Decimal::ZERO).is_some());
        assert!(Percent::new(Decimal::ONE_HUNDRED).is_some());
        assert!(Percent::new(Decimal::NEGATIVE_ONE).is_none());
        assert!(Percent::new(Decimal::new(10001, 2)).is_none());
    }

    #[test]
    fn from_str() {
        assert_eq!(
            Percent::from_str("16").map(Percent::value),
            Ok(Decimal::from(16)),
        );
        assert_eq!(
            Percent::from_str("12.5").map(Percent::value),
            Ok(Decimal::new(125, 1)),
        );
        assert!(Percent::from_str("101").is_err());
        assert!(Percent::from_str("-1").is_err());
        assert!(Percent::from_str("ten").is_err());
    }
}
