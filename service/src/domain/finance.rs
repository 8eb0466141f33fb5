//! Financial calculations of quotes and invoices.

use common::{Money, Percent};
use serde::Serialize;

use crate::domain::item::Item;

/// Computed totals of a document.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Totals {
    /// Sum of all the line item totals.
    pub subtotal: Money,

    /// Tax applied to the `subtotal`.
    pub tax_amount: Money,

    /// `subtotal + tax_amount - discount`.
    ///
    /// Not clamped, so may be negative.
    pub total: Money,
}

impl Totals {
    /// Computes [`Totals`] of the provided line [`Item`]s.
    #[must_use]
    pub fn compute<'i>(
        items: impl IntoIterator<Item = &'i Item>,
        tax_rate: Percent,
        discount: Money,
    ) -> Self {
        let subtotal = items.into_iter().map(|i| i.total).sum::<Money>();
        Self::from_subtotal(subtotal, tax_rate, discount)
    }

    /// Computes [`Totals`] out of an already known `subtotal`.
    ///
    /// Used when only the tax rate or the discount of a document changes.
    #[must_use]
    pub fn from_subtotal(
        subtotal: Money,
        tax_rate: Percent,
        discount: Money,
    ) -> Self {
        let subtotal = subtotal.round();
        let tax_amount = (subtotal * tax_rate).round();
        Self {
            subtotal,
            tax_amount,
            total: (subtotal + tax_amount - discount).round(),
        }
    }
}

/// Computes the remaining balance of an invoice.
#[must_use]
pub fn balance(total: Money, paid_amount: Money) -> Money {
    (total - paid_amount).round()
}

#[cfg(test)]
mod spec {
    use common::{Money, Percent, Quantity};

    use crate::domain::{
        item::{Draft, Item},
        text::Line,
    };

    use super::{balance, Totals};

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn item(quantity: &str, price: &str) -> Item {
        Item::new(
            Draft {
                description: Line::new("Brick").unwrap(),
                quantity: quantity.parse::<Quantity>().unwrap(),
                unit: None,
                unit_price: money(price),
                notes: None,
            },
            0,
        )
        .unwrap()
    }

    fn percent(s: &str) -> Percent {
        s.parse().unwrap()
    }

    #[test]
    fn computes_totals() {
        let items = [item("10", "2.50"), item("3", "100")];

        let totals = Totals::compute(&items, percent("16"), money("5"));

        assert_eq!(totals.subtotal, money("325"));
        assert_eq!(totals.tax_amount, money("52"));
        assert_eq!(totals.total, money("372"));
    }

    #[test]
    fn totals_identity_holds() {
        let items = [item("1.5", "33.33"), item("7", "0.99")];

        for (rate, discount) in [("0", "0"), ("8.25", "1.10"), ("100", "3")] {
            let t = Totals::compute(&items, percent(rate), money(discount));

            assert_eq!(
                t.subtotal,
                items.iter().map(|i| i.total).sum::<Money>(),
            );
            assert_eq!(t.total, t.subtotal + t.tax_amount - money(discount));
        }
    }

    #[test]
    fn total_may_go_negative() {
        let items = [item("1", "10")];

        let totals = Totals::compute(&items, Percent::ZERO, money("25"));

        assert_eq!(totals.total, money("-15"));
    }

    #[test]
    fn empty_items() {
        let totals =
            Totals::compute(&Vec::<Item>::new(), percent("16"), Money::ZERO);

        assert_eq!(totals, Totals::default());
    }

    #[test]
    fn from_subtotal_rounds_tax() {
        let totals =
            Totals::from_subtotal(money("10.01"), percent("7.5"), Money::ZERO);

        assert_eq!(totals.tax_amount, money("0.75"));
        assert_eq!(totals.total, money("10.76"));
    }

    #[test]
    fn balance_of_partially_paid() {
        assert_eq!(balance(money("100"), money("40.5")), money("59.5"));
        assert_eq!(balance(money("100"), money("100")), Money::ZERO);
    }
}
