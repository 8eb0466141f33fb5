//! [`Query`] collection feeding the dashboard.

use std::{collections::HashMap, time::Duration};

use common::{
    operations::{By, Select},
    DateTime, Money, YearMonth,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracerr::Traced;

use crate::{
    domain::{
        client, project, quote, text::Line, Client, Material, Project, Quote,
    },
    infra::{database, Database},
    read::{
        self,
        activity::{self, Activity, Recent, UNKNOWN_CLIENT},
        Period, StatusCount,
    },
    Query, Service,
};

use super::month_start;

/// Number of days ahead the [`UpcomingDeadlines`] are looked for.
pub const DEADLINES_HORIZON_DAYS: u64 = 30;

/// Number of months in the [`MonthlyRevenue`] series.
pub const REVENUE_MONTHS: i32 = 12;

/// [`Query`] collecting the overall [`Stats`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Overview;

/// Overall statistics of the business.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Stats {
    /// Statistics of clients.
    pub clients: ClientsStats,

    /// Statistics of projects.
    pub projects: ProjectsStats,

    /// Statistics of quotes.
    pub quotes: QuotesStats,

    /// Statistics of materials.
    pub materials: MaterialsStats,

    /// Number of entities created since the start of the current month.
    pub monthly: MonthlyStats,
}

/// Clients part of the [`Stats`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct ClientsStats {
    /// Total number of clients.
    pub total: i64,

    /// Number of active clients.
    pub active: i64,
}

/// Projects part of the [`Stats`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct ProjectsStats {
    /// Total number of projects.
    pub total: i64,

    /// Number of [`project::Status::ONGOING`] projects.
    pub active: i64,

    /// Number of [`project::Status::Completed`] projects.
    pub completed: i64,
}

/// Quotes part of the [`Stats`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct QuotesStats {
    /// Total number of quotes.
    pub total: i64,

    /// Number of pending quotes.
    pub pending: i64,

    /// Number of accepted quotes.
    pub accepted: i64,

    /// Sum of all the quote totals.
    pub total_value: Money,

    /// Sum of the accepted quote totals.
    pub accepted_value: Money,
}

/// Materials part of the [`Stats`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct MaterialsStats {
    /// Number of active materials.
    pub total: i64,

    /// Number of active materials low on stock.
    pub low_stock: i64,

    /// Value of the active stock.
    pub inventory_value: Money,
}

/// Month-to-date part of the [`Stats`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct MonthlyStats {
    /// Number of clients created this month.
    pub clients: i64,

    /// Number of projects created this month.
    pub projects: i64,

    /// Number of quotes created this month.
    pub quotes: i64,
}

impl Stats {
    /// Combines the [`Stats`] out of the per-entity ones.
    #[must_use]
    pub fn new(
        clients: &read::client::Stats,
        projects: &read::project::Stats,
        quotes: &read::quote::Stats,
        materials: &read::material::Stats,
    ) -> Self {
        Self {
            clients: ClientsStats {
                total: clients.total,
                active: clients.active,
            },
            projects: ProjectsStats {
                total: projects.total,
                active: projects.count(&project::Status::ONGOING),
                completed: projects.count(&[project::Status::Completed]),
            },
            quotes: QuotesStats {
                total: quotes.total,
                pending: quotes.count(&quote::Status::PENDING),
                accepted: quotes.count(&[quote::Status::Accepted]),
                total_value: quotes.total_value,
                accepted_value: quotes.accepted_value,
            },
            materials: MaterialsStats {
                total: materials.active,
                low_stock: materials.low_stock,
                inventory_value: materials.inventory_value,
            },
            monthly: MonthlyStats {
                clients: clients.this_month,
                projects: projects.this_month,
                quotes: quotes.this_month,
            },
        }
    }
}

impl<Db> Query<Overview> for Service<Db>
where
    Db: Database<
            Select<By<read::client::Stats, DateTime>>,
            Ok = read::client::Stats,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<read::project::Stats, DateTime>>,
            Ok = read::project::Stats,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<read::quote::Stats, DateTime>>,
            Ok = read::quote::Stats,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<read::material::Stats, ()>>,
            Ok = read::material::Stats,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Stats;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Overview) -> Result<Self::Ok, Self::Err> {
        let since = month_start(DateTime::now());

        let clients = self
            .database()
            .execute(Select(By::<read::client::Stats, _>::new(since)))
            .await
            .map_err(tracerr::wrap!())?;
        let projects = self
            .database()
            .execute(Select(By::<read::project::Stats, _>::new(since)))
            .await
            .map_err(tracerr::wrap!())?;
        let quotes = self
            .database()
            .execute(Select(By::<read::quote::Stats, _>::new(since)))
            .await
            .map_err(tracerr::wrap!())?;
        let materials = self
            .database()
            .execute(Select(By::<read::material::Stats, _>::new(())))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(Stats::new(&clients, &projects, &quotes, &materials))
    }
}

/// [`Query`] collecting the feed of the [`Recent`] [`Activity`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RecentActivity(pub Recent);

impl<Db> Query<RecentActivity> for Service<Db>
where
    Db: Database<
            Select<By<Vec<Client>, Recent>>,
            Ok = Vec<Client>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Project>, Recent>>,
            Ok = Vec<Project>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Quote>, Recent>>,
            Ok = Vec<Quote>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Material>, Recent>>,
            Ok = Vec<Material>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<client::Id, Client>, Vec<client::Id>>>,
            Ok = HashMap<client::Id, Client>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Vec<Activity>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        RecentActivity(recent): RecentActivity,
    ) -> Result<Self::Ok, Self::Err> {
        let clients = self
            .database()
            .execute(Select(By::<Vec<Client>, _>::new(recent)))
            .await
            .map_err(tracerr::wrap!())?;
        let projects = self
            .database()
            .execute(Select(By::<Vec<Project>, _>::new(recent)))
            .await
            .map_err(tracerr::wrap!())?;
        let quotes = self
            .database()
            .execute(Select(By::<Vec<Quote>, _>::new(recent)))
            .await
            .map_err(tracerr::wrap!())?;
        let materials = self
            .database()
            .execute(Select(By::<Vec<Material>, _>::new(recent)))
            .await
            .map_err(tracerr::wrap!())?;

        let owner_ids = projects
            .iter()
            .map(|p| p.client_id)
            .chain(quotes.iter().map(|q| q.client_id))
            .collect::<Vec<_>>();
        let owners = self
            .database()
            .execute(Select(By::<HashMap<client::Id, Client>, _>::new(
                owner_ids,
            )))
            .await
            .map_err(tracerr::wrap!())?;
        let name = |id: client::Id| {
            owners.get(&id).map(|c| AsRef::<str>::as_ref(&c.name))
        };

        let feed = clients
            .iter()
            .map(Activity::client_created)
            .chain(
                projects
                    .iter()
                    .map(|p| Activity::project_created(p, name(p.client_id))),
            )
            .chain(
                quotes
                    .iter()
                    .map(|q| Activity::quote_created(q, name(q.client_id))),
            )
            .chain(materials.iter().map(Activity::low_stock))
            .collect::<Vec<_>>();

        Ok(activity::merge(feed, recent.limit))
    }
}

/// [`Query`] counting projects in every [`project::Status`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ProjectsByStatus;

impl<Db> Query<ProjectsByStatus> for Service<Db>
where
    Db: Database<
        Select<By<read::project::Stats, DateTime>>,
        Ok = read::project::Stats,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Vec<StatusCount<project::Status>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: ProjectsByStatus,
    ) -> Result<Self::Ok, Self::Err> {
        self.database()
            .execute(Select(By::<read::project::Stats, _>::new(month_start(
                DateTime::now(),
            ))))
            .await
            .map(|stats| stats.by_status)
            .map_err(tracerr::wrap!())
    }
}

/// [`Query`] collecting the revenue of the last [`REVENUE_MONTHS`], the
/// current one included.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonthlyRevenue;

/// Revenue of a single month.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct MonthRevenue {
    /// Month the revenue is made in.
    pub month: YearMonth,

    /// Sum of the accepted quote totals of the month.
    pub revenue: Money,
}

/// Builds the series of [`REVENUE_MONTHS`] [`MonthRevenue`]s ending with
/// the `current` month, oldest first.
///
/// Months absent in the `revenue` are reported with zero revenue.
#[must_use]
pub fn revenue_series(
    current: YearMonth,
    revenue: &read::quote::MonthlyRevenue,
) -> Vec<MonthRevenue> {
    (0..REVENUE_MONTHS)
        .rev()
        .filter_map(|ago| current.shift(-ago))
        .map(|month| MonthRevenue {
            month,
            revenue: revenue.of(month),
        })
        .collect()
}

impl<Db> Query<MonthlyRevenue> for Service<Db>
where
    Db: Database<
        Select<By<read::quote::MonthlyRevenue, Period>>,
        Ok = read::quote::MonthlyRevenue,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Vec<MonthRevenue>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: MonthlyRevenue) -> Result<Self::Ok, Self::Err> {
        let current = DateTime::now().year_month();
        let first = current.shift(1 - REVENUE_MONTHS).unwrap_or(current);
        let period = Period {
            start: first.start().unwrap_or(DateTime::UNIX_EPOCH),
            end: current
                .next()
                .and_then(YearMonth::start)
                .unwrap_or_else(DateTime::now),
        };

        let revenue = self
            .database()
            .execute(Select(By::<read::quote::MonthlyRevenue, _>::new(period)))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(revenue_series(current, &revenue))
    }
}

/// [`Query`] collecting the scheduled projects due within the next
/// [`DEADLINES_HORIZON_DAYS`].
#[derive(Clone, Copy, Debug, Default)]
pub struct UpcomingDeadlines;

/// Project approaching its deadline.
#[derive(Clone, Debug, Serialize)]
pub struct Deadline {
    /// ID of the project.
    pub id: project::Id,

    /// Name of the project.
    pub name: Line,

    /// Name of the client owning the project.
    pub client: String,

    /// Deadline of the project.
    pub end_date: Option<project::EndDateTime>,

    /// Number of whole days left until the deadline, never negative.
    pub days_left: i64,

    /// [`project::Status`] of the project.
    pub status: project::Status,

    /// Progress of the project.
    pub progress: project::Progress,
}

impl Deadline {
    /// Creates a new [`Deadline`] of the provided [`Project`] as seen at
    /// `now`.
    #[must_use]
    pub fn new(project: Project, client: Option<&str>, now: DateTime) -> Self {
        Self {
            days_left: project
                .end_date
                .map_or(0, |end| now.days_until(&end).max(0)),
            id: project.id,
            name: project.name,
            client: client.unwrap_or(UNKNOWN_CLIENT).to_owned(),
            end_date: project.end_date,
            status: project.status,
            progress: project.progress,
        }
    }
}

impl<Db> Query<UpcomingDeadlines> for Service<Db>
where
    Db: Database<
            Select<By<Vec<Project>, read::project::Deadlines>>,
            Ok = Vec<Project>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<client::Id, Client>, Vec<client::Id>>>,
            Ok = HashMap<client::Id, Client>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Vec<Deadline>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: UpcomingDeadlines,
    ) -> Result<Self::Ok, Self::Err> {
        let now = DateTime::now();
        let horizon =
            now + Duration::from_secs(DEADLINES_HORIZON_DAYS * 24 * 60 * 60);

        let projects = self
            .database()
            .execute(Select(By::<Vec<Project>, _>::new(
                read::project::Deadlines(Period {
                    start: now,
                    end: horizon,
                }),
            )))
            .await
            .map_err(tracerr::wrap!())?;

        let client_ids =
            projects.iter().map(|p| p.client_id).collect::<Vec<_>>();
        let clients = self
            .database()
            .execute(Select(By::<HashMap<client::Id, Client>, _>::new(
                client_ids,
            )))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(projects
            .into_iter()
            .map(|p| {
                let client = clients
                    .get(&p.client_id)
                    .map(|c| AsRef::<str>::as_ref(&c.name));
                Deadline::new(p, client, now)
            })
            .collect())
    }
}

/// [`Query`] comparing the revenue of the current month with the previous
/// one.
#[derive(Clone, Copy, Debug, Default)]
pub struct FinancialSummary;

/// Output of the [`FinancialSummary`] [`Query`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Summary {
    /// Revenue of the current month.
    pub current_month_revenue: Money,

    /// Revenue of the previous month.
    pub last_month_revenue: Money,

    /// Revenue growth in percents, rounded to 2 decimal places.
    ///
    /// Zero if there was no revenue in the previous month.
    pub growth_percentage: Decimal,

    /// Sum of the pending quote totals.
    pub pending_quotes_value: Money,

    /// Value of the active stock.
    pub inventory_value: Money,
}

/// Calculates the growth of the `current` revenue comparing to the `last`
/// one, in percents.
#[must_use]
pub fn growth(last: Money, current: Money) -> Decimal {
    if last <= Money::ZERO {
        return Decimal::ZERO;
    }
    last.ratio_of(current - last)
        .map_or(Decimal::ZERO, |r| r.round_dp(2))
}

impl<Db> Query<FinancialSummary> for Service<Db>
where
    Db: Database<
            Select<By<read::quote::MonthlyRevenue, Period>>,
            Ok = read::quote::MonthlyRevenue,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<read::quote::Stats, DateTime>>,
            Ok = read::quote::Stats,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<read::material::Stats, ()>>,
            Ok = read::material::Stats,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Summary;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: FinancialSummary,
    ) -> Result<Self::Ok, Self::Err> {
        let now = DateTime::now();
        let current = now.year_month();
        let last = current.prev().unwrap_or(current);
        let period = Period {
            start: last.start().unwrap_or(DateTime::UNIX_EPOCH),
            end: current.next().and_then(YearMonth::start).unwrap_or(now),
        };

        let revenue = self
            .database()
            .execute(Select(By::<read::quote::MonthlyRevenue, _>::new(period)))
            .await
            .map_err(tracerr::wrap!())?;
        let quotes = self
            .database()
            .execute(Select(By::<read::quote::Stats, _>::new(month_start(
                now,
            ))))
            .await
            .map_err(tracerr::wrap!())?;
        let materials = self
            .database()
            .execute(Select(By::<read::material::Stats, _>::new(())))
            .await
            .map_err(tracerr::wrap!())?;

        let current_month_revenue = revenue.of(current);
        let last_month_revenue = revenue.of(last);
        Ok(Summary {
            current_month_revenue,
            last_month_revenue,
            growth_percentage: growth(
                last_month_revenue,
                current_month_revenue,
            ),
            pending_quotes_value: quotes.pending_value,
            inventory_value: materials.inventory_value,
        })
    }
}

#[cfg(test)]
mod spec {
    use std::collections::BTreeMap;

    use common::{DateTime, Money, YearMonth};
    use rust_decimal::Decimal;

    use crate::{
        command::double::Memory,
        domain::{client, project, quote},
        read::{self, status_counts},
    };

    use super::{growth, revenue_series, Deadline, Stats};

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[test]
    fn twelve_months_oldest_first() {
        let current = YearMonth::new(2024, 3).unwrap();
        let revenue = read::quote::MonthlyRevenue(BTreeMap::from([
            (YearMonth::new(2024, 3).unwrap(), money("100")),
            (YearMonth::new(2023, 4).unwrap(), money("40")),
            (YearMonth::new(2023, 3).unwrap(), money("999")),
        ]));

        let series = revenue_series(current, &revenue);

        assert_eq!(series.len(), 12);
        assert_eq!(series[0].month.to_string(), "2023-04");
        assert_eq!(series[0].revenue, money("40"));
        assert_eq!(series[5].month.to_string(), "2023-09");
        assert_eq!(series[5].revenue, Money::ZERO);
        assert_eq!(series[11].month, current);
        assert_eq!(series[11].revenue, money("100"));
        assert_eq!(
            series.iter().map(|m| m.revenue).sum::<Money>(),
            money("140"),
        );
    }

    #[test]
    fn growth_against_last_month() {
        assert_eq!(growth(money("100"), money("150")), Decimal::from(50));
        assert_eq!(growth(money("200"), money("50")), Decimal::from(-75));
        assert_eq!(growth(Money::ZERO, money("150")), Decimal::ZERO);
    }

    #[test]
    fn deadline_days_left() {
        let now = DateTime::parse("2024-03-01T00:00:00Z").unwrap();
        let mut p = Memory::default()
            .project(client::Id::new(), project::Status::InProgress);
        p.end_date = Some(DateTime::parse("2024-03-11").unwrap().coerce());

        let soon = Deadline::new(p.clone(), Some("ACME"), now);
        assert_eq!(soon.days_left, 10);
        assert_eq!(soon.client, "ACME");

        let late = Deadline::new(
            p,
            None,
            DateTime::parse("2024-03-20").unwrap(),
        );
        assert_eq!(late.days_left, 0);
        assert_eq!(late.client, "unknown client");
    }

    #[test]
    fn combines_stats() {
        use project::Status as P;
        use quote::Status as Q;

        let stats = Stats::new(
            &read::client::Stats {
                total: 5,
                active: 4,
                inactive: 1,
                companies: 2,
                this_month: 1,
            },
            &read::project::Stats {
                total: 6,
                by_status: status_counts(
                    P::ALL,
                    [(P::Planning, 1), (P::OnHold, 2), (P::Completed, 3)],
                ),
                this_month: 2,
                ..read::project::Stats::default()
            },
            &read::quote::Stats {
                total: 7,
                by_status: status_counts(
                    Q::ALL,
                    [(Q::Draft, 2), (Q::Sent, 1), (Q::Accepted, 4)],
                ),
                total_value: money("700"),
                accepted_value: money("400"),
                pending_value: money("300"),
                this_month: 3,
            },
            &read::material::Stats {
                total: 9,
                active: 8,
                low_stock: 2,
                categories: 3,
                inventory_value: money("1234.5"),
            },
        );

        assert_eq!(stats.clients.active, 4);
        assert_eq!(stats.projects.active, 3);
        assert_eq!(stats.projects.completed, 3);
        assert_eq!(stats.quotes.pending, 3);
        assert_eq!(stats.quotes.accepted, 4);
        assert_eq!(stats.materials.total, 8);
        assert_eq!(stats.monthly.quotes, 3);
    }
}
