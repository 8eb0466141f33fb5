//! [`Projects`] report definition.

use std::collections::{BTreeMap, HashMap};

use common::{
    operations::{By, Select},
    Money,
};
use serde::Serialize;
use tracerr::Traced;

use crate::{
    domain::{client, project, Client, Project},
    infra::{database, Database},
    read::{self, activity::UNKNOWN_CLIENT, project::MaterialsCost},
    Query, Service,
};

/// [`Query`] reporting the [`Project`]s created inside a period along with
/// the cost of their planned materials.
#[derive(Clone, Copy, Debug)]
pub struct Projects(pub read::project::report::Filter);

/// Output of the [`Projects`] [`Query`].
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    /// Aggregated [`Summary`] of the [`Row`]s.
    pub summary: Summary,

    /// Reported [`Project`]s.
    #[serde(rename = "projects")]
    pub rows: Vec<Row>,
}

/// Summary of a [`Projects`] [`Report`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Summary {
    /// Number of reported [`Project`]s.
    pub total_projects: usize,

    /// Number of reported [`Project`]s in every present [`project::Status`].
    pub status_count: BTreeMap<project::Status, usize>,

    /// Sum of the budgets.
    pub total_budget: Money,

    /// Sum of the actual costs.
    pub total_cost: Money,

    /// Difference between the [`Summary::total_budget`] and the
    /// [`Summary::total_cost`].
    pub profit_margin: Money,
}

/// Single [`Project`] of a [`Report`].
#[derive(Clone, Debug, Serialize)]
pub struct Row {
    /// Reported [`Project`].
    #[serde(flatten)]
    pub project: Project,

    /// Name of the [`Client`] owning the [`Project`].
    pub client: String,

    /// Cost of the materials planned for the [`Project`].
    pub materials_cost: Money,
}

impl Report {
    /// Builds a new [`Report`] out of the provided [`Project`]s.
    #[must_use]
    pub fn new(
        projects: Vec<Project>,
        clients: &HashMap<client::Id, Client>,
        MaterialsCost(costs): &MaterialsCost,
    ) -> Self {
        let mut summary = Summary {
            total_projects: projects.len(),
            ..Summary::default()
        };
        for p in &projects {
            *summary.status_count.entry(p.status).or_default() += 1;
            summary.total_budget += p.budget;
            summary.total_cost += p.actual_cost;
        }
        summary.profit_margin = summary.total_budget - summary.total_cost;

        let rows = projects
            .into_iter()
            .map(|project| Row {
                client: clients.get(&project.client_id).map_or_else(
                    || UNKNOWN_CLIENT.to_owned(),
                    |c| c.name.to_string(),
                ),
                materials_cost: costs
                    .get(&project.id)
                    .copied()
                    .unwrap_or_default(),
                project,
            })
            .collect();

        Self { summary, rows }
    }
}

impl<Db> Query<Projects> for Service<Db>
where
    Db: Database<
            Select<By<Vec<Project>, read::project::report::Filter>>,
            Ok = Vec<Project>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<client::Id, Client>, Vec<client::Id>>>,
            Ok = HashMap<client::Id, Client>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<MaterialsCost, Vec<project::Id>>>,
            Ok = MaterialsCost,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Report;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Projects(filter): Projects,
    ) -> Result<Self::Ok, Self::Err> {
        let projects = self
            .database()
            .execute(Select(By::<Vec<Project>, _>::new(filter)))
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

        let ids = projects.iter().map(|p| p.id).collect::<Vec<_>>();
        let costs = self
            .database()
            .execute(Select(By::<MaterialsCost, _>::new(ids)))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(Report::new(projects, &clients, &costs))
    }
}

#[cfg(test)]
mod spec {
    use std::collections::HashMap;

    use common::Money;

    use crate::{
        command::double::Memory,
        domain::{client, project::Status},
        read::project::MaterialsCost,
    };

    use super::Report;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[test]
    fn summarizes_budget_and_costs() {
        let db = Memory::default();
        let client = db.client("ACME", None);
        let mut first = db.project(client.id, Status::InProgress);
        first.budget = money("1000");
        first.actual_cost = money("400");
        let mut second = db.project(client::Id::new(), Status::InProgress);
        second.budget = money("500");
        second.actual_cost = money("650");
        let third = db.project(client.id, Status::Completed);

        let report = Report::new(
            vec![first.clone(), second, third],
            &HashMap::from([(client.id, client)]),
            &MaterialsCost(HashMap::from([(first.id, money("120.40"))])),
        );

        let summary = &report.summary;
        assert_eq!(summary.total_projects, 3);
        assert_eq!(summary.status_count.get(&Status::InProgress), Some(&2));
        assert_eq!(summary.status_count.get(&Status::Completed), Some(&1));
        assert_eq!(summary.status_count.get(&Status::Planning), None);
        assert_eq!(summary.total_budget, money("1500"));
        assert_eq!(summary.total_cost, money("1050"));
        assert_eq!(summary.profit_margin, money("450"));

        assert_eq!(report.rows[0].client, "ACME");
        assert_eq!(report.rows[0].materials_cost, money("120.40"));
        assert_eq!(report.rows[1].client, "unknown client");
        assert_eq!(report.rows[2].materials_cost, Money::ZERO);
    }
}
