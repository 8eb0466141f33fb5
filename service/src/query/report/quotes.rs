//! [`Quotes`] report definition.

use std::collections::{BTreeMap, HashMap};

use common::{
    operations::{By, Select},
    Money,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracerr::Traced;

use crate::{
    domain::{client, project, quote, text::Line, Client, Project, Quote},
    infra::{database, Database},
    read::{self, activity::UNKNOWN_CLIENT},
    Query, Service,
};

/// [`Query`] reporting the [`Quote`]s created inside a period along with
/// their conversion rate.
#[derive(Clone, Copy, Debug)]
pub struct Quotes(pub read::quote::report::Filter);

/// Output of the [`Quotes`] [`Query`].
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    /// Aggregated [`Summary`] of the [`Row`]s.
    pub summary: Summary,

    /// Reported [`Quote`]s.
    #[serde(rename = "quotes")]
    pub rows: Vec<Row>,
}

/// Summary of a [`Quotes`] [`Report`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Summary {
    /// Number of reported [`Quote`]s.
    pub total_quotes: usize,

    /// Number of reported [`Quote`]s in every present [`quote::Status`].
    pub status_count: BTreeMap<quote::Status, usize>,

    /// Sum of the reported [`Quote`] totals in every present
    /// [`quote::Status`].
    pub status_value: BTreeMap<quote::Status, Money>,

    /// Sum of all the reported [`Quote`] totals.
    pub total_value: Money,

    /// Percentage of [`quote::Status::Accepted`] [`Quote`]s, rounded to
    /// 2 decimal places.
    pub conversion_rate: Decimal,
}

/// Single [`Quote`] of a [`Report`].
#[derive(Clone, Debug, Serialize)]
pub struct Row {
    /// Reported [`Quote`].
    #[serde(flatten)]
    pub quote: Quote,

    /// Name of the [`Client`] the [`Quote`] is made to.
    pub client: String,

    /// Name of the [`Project`] the [`Quote`] relates to, if any.
    pub project: Option<Line>,

    /// Number of line items in the [`Quote`].
    pub items_count: usize,
}

impl Report {
    /// Builds a new [`Report`] out of the provided [`Quote`]s.
    #[must_use]
    pub fn new(
        quotes: Vec<Quote>,
        clients: &HashMap<client::Id, Client>,
        projects: &HashMap<project::Id, Project>,
    ) -> Self {
        let mut summary = Summary {
            total_quotes: quotes.len(),
            ..Summary::default()
        };
        for q in &quotes {
            *summary.status_count.entry(q.status).or_default() += 1;
            *summary.status_value.entry(q.status).or_default() += q.total;
            summary.total_value += q.total;
        }
        summary.conversion_rate = conversion_rate(
            summary
                .status_count
                .get(&quote::Status::Accepted)
                .copied()
                .unwrap_or_default(),
            summary.total_quotes,
        );

        let rows = quotes
            .into_iter()
            .map(|quote| Row {
                client: clients.get(&quote.client_id).map_or_else(
                    || UNKNOWN_CLIENT.to_owned(),
                    |c| c.name.to_string(),
                ),
                project: quote
                    .project_id
                    .and_then(|id| projects.get(&id))
                    .map(|p| p.name.clone()),
                items_count: quote.items.len(),
                quote,
            })
            .collect();

        Self { summary, rows }
    }
}

/// Calculates the percentage of `accepted` among the `total`, being zero
/// for no `total` at all.
fn conversion_rate(accepted: usize, total: usize) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(accepted) * Decimal::ONE_HUNDRED / Decimal::from(total))
        .round_dp(2)
}

impl<Db> Query<Quotes> for Service<Db>
where
    Db: Database<
            Select<By<Vec<Quote>, read::quote::report::Filter>>,
            Ok = Vec<Quote>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<client::Id, Client>, Vec<client::Id>>>,
            Ok = HashMap<client::Id, Client>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<project::Id, Project>, Vec<project::Id>>>,
            Ok = HashMap<project::Id, Project>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Report;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Quotes(filter): Quotes,
    ) -> Result<Self::Ok, Self::Err> {
        let quotes = self
            .database()
            .execute(Select(By::<Vec<Quote>, _>::new(filter)))
            .await
            .map_err(tracerr::wrap!())?;

        let client_ids =
            quotes.iter().map(|q| q.client_id).collect::<Vec<_>>();
        let clients = self
            .database()
            .execute(Select(By::<HashMap<client::Id, Client>, _>::new(
                client_ids,
            )))
            .await
            .map_err(tracerr::wrap!())?;

        let project_ids =
            quotes.iter().filter_map(|q| q.project_id).collect::<Vec<_>>();
        let projects = self
            .database()
            .execute(Select(By::<HashMap<project::Id, Project>, _>::new(
                project_ids,
            )))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(Report::new(quotes, &clients, &projects))
    }
}

#[cfg(test)]
mod spec {
    use std::collections::HashMap;

    use common::Money;
    use rust_decimal::Decimal;

    use crate::{
        command::double::Memory,
        domain::{
            project,
            quote::{spec::quote, Status},
        },
    };

    use super::{conversion_rate, Report};

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[test]
    fn summarizes_by_status() {
        let db = Memory::default();
        let client = db.client("ACME", None);
        let project = db.project(client.id, project::Status::Planning);
        let mut accepted = quote(Status::Accepted, "300", "2024-03-01");
        accepted.client_id = client.id;
        accepted.project_id = Some(project.id);
        let draft = quote(Status::Draft, "100.50", "2024-03-02");
        let other = quote(Status::Draft, "50", "2024-03-03");

        let report = Report::new(
            vec![accepted, draft, other],
            &HashMap::from([(client.id, client)]),
            &HashMap::from([(project.id, project)]),
        );

        let summary = &report.summary;
        assert_eq!(summary.total_quotes, 3);
        assert_eq!(summary.status_count.get(&Status::Draft), Some(&2));
        assert_eq!(
            summary.status_value.get(&Status::Draft),
            Some(&money("150.50")),
        );
        assert_eq!(summary.total_value, money("450.50"));
        assert_eq!(
            summary.conversion_rate,
            "33.33".parse::<Decimal>().unwrap(),
        );

        assert_eq!(report.rows[0].client, "ACME");
        assert_eq!(
            report.rows[0].project.as_ref().map(AsRef::<str>::as_ref),
            Some("House extension"),
        );
        assert_eq!(report.rows[1].client, "unknown client");
        assert_eq!(report.rows[1].project, None);
        assert_eq!(report.rows[1].items_count, 0);
    }

    #[test]
    fn no_conversion_without_quotes() {
        assert_eq!(conversion_rate(0, 0), Decimal::ZERO);
        assert_eq!(conversion_rate(2, 4), Decimal::from(50));
    }
}
