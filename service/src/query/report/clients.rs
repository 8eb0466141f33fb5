//! [`Clients`] report definition.

use std::collections::HashMap;

use common::{
    operations::{By, Select},
    Money,
};
use serde::Serialize;
use tracerr::Traced;

use crate::{
    domain::{client, Client},
    infra::{database, Database},
    read::{self, client::Activity},
    Query, Service,
};

/// [`Query`] reporting the [`Client`]s created inside a period along with
/// their business [`Activity`].
#[derive(Clone, Copy, Debug)]
pub struct Clients(pub read::client::report::Filter);

/// Output of the [`Clients`] [`Query`].
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    /// Aggregated [`Summary`] of the [`Row`]s.
    pub summary: Summary,

    /// Reported [`Client`]s.
    #[serde(rename = "clients")]
    pub rows: Vec<Row>,
}

/// Summary of a [`Clients`] [`Report`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Summary {
    /// Number of reported [`Client`]s.
    pub total_clients: usize,

    /// Number of active reported [`Client`]s.
    pub active_clients: usize,

    /// Number of inactive reported [`Client`]s.
    pub inactive_clients: usize,

    /// Number of projects of the reported [`Client`]s.
    pub total_projects: i64,

    /// Number of quotes of the reported [`Client`]s.
    pub total_quotes: i64,

    /// Sum of the quote totals of the reported [`Client`]s.
    pub total_value: Money,
}

/// Single [`Client`] of a [`Report`].
#[derive(Clone, Debug, Serialize)]
pub struct Row {
    /// Reported [`Client`].
    #[serde(flatten)]
    pub client: Client,

    /// [`Activity`] of the [`Client`].
    #[serde(flatten)]
    pub activity: Activity,
}

impl Report {
    /// Builds a new [`Report`] out of the provided [`Client`]s and their
    /// [`Activity`].
    ///
    /// [`Client`]s missing in the `activity` are reported as idle ones.
    #[must_use]
    pub fn new(
        clients: Vec<Client>,
        mut activity: HashMap<client::Id, Activity>,
    ) -> Self {
        let rows = clients
            .into_iter()
            .map(|client| Row {
                activity: activity.remove(&client.id).unwrap_or_default(),
                client,
            })
            .collect::<Vec<_>>();

        let active_clients = rows.iter().filter(|r| r.client.is_active).count();
        let summary = Summary {
            total_clients: rows.len(),
            active_clients,
            inactive_clients: rows.len() - active_clients,
            total_projects: rows.iter().map(|r| r.activity.projects).sum(),
            total_quotes: rows.iter().map(|r| r.activity.quotes).sum(),
            total_value: rows.iter().map(|r| r.activity.quote_value).sum(),
        };

        Self { summary, rows }
    }
}

impl<Db> Query<Clients> for Service<Db>
where
    Db: Database<
            Select<By<Vec<Client>, read::client::report::Filter>>,
            Ok = Vec<Client>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<client::Id, Activity>, Vec<client::Id>>>,
            Ok = HashMap<client::Id, Activity>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Report;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Clients(filter): Clients,
    ) -> Result<Self::Ok, Self::Err> {
        let clients = self
            .database()
            .execute(Select(By::<Vec<Client>, _>::new(filter)))
            .await
            .map_err(tracerr::wrap!())?;

        let ids = clients.iter().map(|c| c.id).collect::<Vec<_>>();
        let activity = self
            .database()
            .execute(Select(By::<HashMap<client::Id, Activity>, _>::new(ids)))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(Report::new(clients, activity))
    }
}

#[cfg(test)]
mod spec {
    use std::collections::HashMap;

    use common::Money;

    use crate::{command::double::Memory, read::client::Activity};

    use super::Report;

    #[test]
    fn summarizes_activity() {
        let db = Memory::default();
        let busy = db.client("Busy", None);
        let mut idle = db.client("Idle", None);
        idle.is_active = false;

        let report = Report::new(
            vec![busy.clone(), idle],
            HashMap::from([(
                busy.id,
                Activity {
                    projects: 2,
                    quotes: 3,
                    quote_value: "1500.50".parse().unwrap(),
                },
            )]),
        );

        assert_eq!(report.summary.total_clients, 2);
        assert_eq!(report.summary.active_clients, 1);
        assert_eq!(report.summary.inactive_clients, 1);
        assert_eq!(report.summary.total_projects, 2);
        assert_eq!(report.summary.total_quotes, 3);
        assert_eq!(
            report.summary.total_value,
            "1500.50".parse::<Money>().unwrap(),
        );
        assert_eq!(report.rows[1].activity, Activity::default());
    }
}
