//! [`Financial`] report definition.

use common::{
    operations::{By, Select},
    DateTime, Money,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::Material;
use crate::{
    domain::{project, quote, Project, Quote},
    infra::{database, Database},
    read::{self, Period},
    Query, Service,
};

/// [`Query`] reporting revenue, costs and profit of a period.
///
/// Without the explicit days, the last month up to now is reported.
#[derive(Clone, Copy, Debug, Default)]
pub struct Financial {
    /// First day of the period.
    pub start: Option<DateTime>,

    /// Last day of the period, inclusive.
    pub end: Option<DateTime>,
}

impl Financial {
    /// Resolves the reported [`Period`] relatively to the provided `now`.
    #[must_use]
    pub fn period(&self, now: DateTime) -> Period {
        Period {
            start: self.start.unwrap_or_else(|| {
                now.checked_add_months(-1).unwrap_or(DateTime::UNIX_EPOCH)
            }),
            end: self.end.map_or(now, |last| last.next_day()),
        }
    }
}

/// Output of the [`Financial`] [`Query`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Report {
    /// Reported [`Period`].
    pub period: Period,

    /// [`Revenue`] of the [`Period`].
    pub revenue: Revenue,

    /// [`Costs`] of the [`Period`].
    pub costs: Costs,

    /// [`Profit`] of the [`Period`].
    pub profit: Profit,

    /// Current [`Assets`].
    pub assets: Assets,
}

/// Revenue part of a [`Financial`] [`Report`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Revenue {
    /// Sum of the [`quote::Status::Accepted`] [`Quote`] totals.
    pub total: Money,

    /// Sum of the [`quote::Status::PENDING`] [`Quote`] totals.
    pub pending: Money,

    /// Sum of the [`project::Status::SCHEDULED`] [`Project`] budgets.
    pub active_value: Money,
}

/// Costs part of a [`Financial`] [`Report`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Costs {
    /// Sum of the [`Project`] actual costs.
    pub projects: Money,
}

/// Profit part of a [`Financial`] [`Report`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Profit {
    /// Revenue minus costs.
    pub amount: Money,

    /// [`Profit::amount`] as a percentage of the revenue, rounded to 2
    /// decimal places. Zero without a positive revenue.
    pub margin: Decimal,
}

/// Assets part of a [`Financial`] [`Report`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Assets {
    /// Value of the stock of active [`Material`]s.
    pub inventory_value: Money,
}

impl Report {
    /// Builds a new [`Report`] out of the [`Quote`]s and [`Project`]s
    /// created inside the [`Period`].
    #[must_use]
    pub fn new(
        period: Period,
        quotes: &[Quote],
        projects: &[Project],
        inventory_value: Money,
    ) -> Self {
        let quoted = |statuses: &[quote::Status]| {
            quotes
                .iter()
                .filter(|q| statuses.contains(&q.status))
                .map(|q| q.total)
                .sum::<Money>()
        };
        let revenue = Revenue {
            total: quoted(&[quote::Status::Accepted]),
            pending: quoted(&quote::Status::PENDING),
            active_value: projects
                .iter()
                .filter(|p| project::Status::SCHEDULED.contains(&p.status))
                .map(|p| p.budget)
                .sum(),
        };
        let costs = Costs {
            projects: projects.iter().map(|p| p.actual_cost).sum(),
        };

        let amount = revenue.total - costs.projects;
        let margin = if revenue.total > Money::ZERO {
            revenue
                .total
                .ratio_of(amount)
                .map_or(Decimal::ZERO, |r| r.round_dp(2))
        } else {
            Decimal::ZERO
        };

        Self {
            period,
            revenue,
            costs,
            profit: Profit { amount, margin },
            assets: Assets { inventory_value },
        }
    }
}

impl<Db> Query<Financial> for Service<Db>
where
    Db: Database<
            Select<By<Vec<Quote>, read::quote::report::Filter>>,
            Ok = Vec<Quote>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Project>, read::project::report::Filter>>,
            Ok = Vec<Project>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<read::material::Stats, ()>>,
            Ok = read::material::Stats,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Report;
    type Err = Traced<database::Error>;

    async fn execute(&self, query: Financial) -> Result<Self::Ok, Self::Err> {
        let period = query.period(DateTime::now());

        let quotes = self
            .database()
            .execute(Select(By::<Vec<Quote>, _>::new(
                read::quote::report::Filter {
                    period,
                    status: None,
                    client_id: None,
                },
            )))
            .await
            .map_err(tracerr::wrap!())?;
        let projects = self
            .database()
            .execute(Select(By::<Vec<Project>, _>::new(
                read::project::report::Filter {
                    period,
                    status: None,
                    client_id: None,
                },
            )))
            .await
            .map_err(tracerr::wrap!())?;
        let materials = self
            .database()
            .execute(Select(By::<read::material::Stats, _>::new(())))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(Report::new(
            period,
            &quotes,
            &projects,
            materials.inventory_value,
        ))
    }
}

#[cfg(test)]
mod spec {
    use common::{DateTime, Money};
    use rust_decimal::Decimal;

    use crate::{
        command::double::Memory,
        domain::{
            client, project,
            quote::{spec::quote, Status},
        },
        read::Period,
    };

    use super::{Financial, Report};

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[test]
    fn defaults_to_last_month() {
        let now = DateTime::parse("2024-03-31T12:00:00Z").unwrap();

        let period = Financial::default().period(now);

        assert_eq!(
            period.start,
            DateTime::parse("2024-02-29T12:00:00Z").unwrap(),
        );
        assert_eq!(period.end, now);
    }

    #[test]
    fn explicit_days_are_inclusive() {
        let period = Financial {
            start: Some(DateTime::parse("2024-01-01").unwrap()),
            end: Some(DateTime::parse("2024-01-31").unwrap()),
        }
        .period(DateTime::now());

        assert_eq!(period.end, DateTime::parse("2024-02-01").unwrap());
    }

    #[test]
    fn computes_profit() {
        let db = Memory::default();
        let mut active =
            db.project(client::Id::new(), project::Status::Planning);
        active.budget = money("2000");
        active.actual_cost = money("300");
        let mut done =
            db.project(client::Id::new(), project::Status::Completed);
        done.budget = money("900");
        done.actual_cost = money("500");
        let period = Period::of_days(
            DateTime::parse("2024-03-01").unwrap(),
            DateTime::parse("2024-03-31").unwrap(),
        );

        let report = Report::new(
            period,
            &[
                quote(Status::Accepted, "1000", "2024-03-02"),
                quote(Status::Sent, "400", "2024-03-03"),
                quote(Status::Draft, "100", "2024-03-04"),
                quote(Status::Rejected, "700", "2024-03-05"),
            ],
            &[active, done],
            money("55.5"),
        );

        assert_eq!(report.revenue.total, money("1000"));
        assert_eq!(report.revenue.pending, money("500"));
        assert_eq!(report.revenue.active_value, money("2000"));
        assert_eq!(report.costs.projects, money("800"));
        assert_eq!(report.profit.amount, money("200"));
        assert_eq!(report.profit.margin, Decimal::from(20));
        assert_eq!(report.assets.inventory_value, money("55.5"));
    }

    #[test]
    fn no_margin_without_revenue() {
        let report = Report::new(
            Period::of_days(DateTime::now(), DateTime::now()),
            &[quote(Status::Draft, "100", "2024-03-04")],
            &[],
            Money::ZERO,
        );

        assert_eq!(report.profit.amount, Money::ZERO);
        assert_eq!(report.profit.margin, Decimal::ZERO);
    }
}
