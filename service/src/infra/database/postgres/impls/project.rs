//! [`Project`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    operations::{By, Insert, Lock, Select, Update},
    pagination::Page,
    DateTime,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{project, Project, ProjectMaterial},
    infra::{
        database::{
            self,
            postgres::{Connection, SearchPattern},
            Postgres,
        },
        Database,
    },
    read::{self, status_counts},
};

use super::{int8, ordered, Clause};

/// Columns of the `projects` table, in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    id, client_id, code, name, description, \
    status, priority, kind, \
    address, city, state, zip_code, \
    start_date, end_date, \
    budget, estimated_cost, actual_cost, progress, \
    notes, created_at, updated_at, deleted_at";

/// Builds a [`Project`] out of the provided [`Row`] of [`COLUMNS`].
fn from_row(row: &Row) -> Project {
    Project {
        id: row.get("id"),
        client_id: row.get("client_id"),
        code: row.get("code"),
        name: row.get("name"),
        description: row.get("description"),
        status: row.get("status"),
        priority: row.get("priority"),
        kind: row.get("kind"),
        address: row.get("address"),
        city: row.get("city"),
        state: row.get("state"),
        zip_code: row.get("zip_code"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        budget: row.get("budget"),
        estimated_cost: row.get("estimated_cost"),
        actual_cost: row.get("actual_cost"),
        progress: row.get("progress"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

impl<C, IDs> Database<Select<By<HashMap<project::Id, Project>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[project::Id]>,
{
    type Ok = HashMap<project::Id, Project>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<project::Id, Project>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[project::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = int8(ids.len());

        Ok(self
            .query(
                &format!(
                    "SELECT {COLUMNS} \
                     FROM projects \
                     WHERE id IN (SELECT unnest($1::UUID[]) LIMIT $2::INT8) \
                       AND deleted_at IS NULL \
                     LIMIT $2::INT8"
                ),
                &[&ids, &limit],
            )
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                let project = from_row(row);
                (project.id, project)
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Project>, project::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<project::Id, Project>, [project::Id; 1]>>,
        Ok = HashMap<project::Id, Project>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Project>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Project>, project::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<'l, C> Database<Select<By<Option<Project>, &'l project::Code>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Project>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Project>, &'l project::Code>>,
    ) -> Result<Self::Ok, Self::Err> {
        let code = by.into_inner();

        Ok(self
            .query_opt(
                &format!(
                    "SELECT {COLUMNS} \
                     FROM projects \
                     WHERE code = $1::VARCHAR \
                       AND deleted_at IS NULL \
                     LIMIT 1"
                ),
                &[&code],
            )
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Insert<Project>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Project>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(project): Insert<Project>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(project)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Project>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(project): Update<Project>,
    ) -> Result<Self::Ok, Self::Err> {
        let Project {
            id,
            client_id,
            code,
            name,
            description,
            status,
            priority,
            kind,
            address,
            city,
            state,
            zip_code,
            start_date,
            end_date,
            budget,
            estimated_cost,
            actual_cost,
            progress,
            notes,
            created_at,
            updated_at,
            deleted_at,
        } = project;

        const SQL: &str = "\
            INSERT INTO projects (\
                id, client_id, code, name, description, \
                status, priority, kind, \
                address, city, state, zip_code, \
                start_date, end_date, \
                budget, estimated_cost, actual_cost, progress, \
                notes, created_at, updated_at, deleted_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::VARCHAR, $4::VARCHAR, $5::TEXT, \
                $6::VARCHAR, $7::VARCHAR, $8::VARCHAR, \
                $9::VARCHAR, $10::VARCHAR, $11::VARCHAR, $12::VARCHAR, \
                $13::TIMESTAMPTZ, $14::TIMESTAMPTZ, \
                $15::NUMERIC, $16::NUMERIC, $17::NUMERIC, $18::INT4, \
                $19::TEXT, $20::TIMESTAMPTZ, $21::TIMESTAMPTZ, \
                $22::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET client_id = EXCLUDED.client_id, \
                code = EXCLUDED.code, \
                name = EXCLUDED.name, \
                description = EXCLUDED.description, \
                status = EXCLUDED.status, \
                priority = EXCLUDED.priority, \
                kind = EXCLUDED.kind, \
                address = EXCLUDED.address, \
                city = EXCLUDED.city, \
                state = EXCLUDED.state, \
                zip_code = EXCLUDED.zip_code, \
                start_date = EXCLUDED.start_date, \
                end_date = EXCLUDED.end_date, \
                budget = EXCLUDED.budget, \
                estimated_cost = EXCLUDED.estimated_cost, \
                actual_cost = EXCLUDED.actual_cost, \
                progress = EXCLUDED.progress, \
                notes = EXCLUDED.notes, \
                updated_at = EXCLUDED.updated_at, \
                deleted_at = EXCLUDED.deleted_at";
        self.exec(
            SQL,
            &[
                &id,
                &client_id,
                &code,
                &name,
                &description,
                &status,
                &priority,
                &kind,
                &address,
                &city,
                &state,
                &zip_code,
                &start_date,
                &end_date,
                &budget,
                &estimated_cost,
                &actual_cost,
                &progress,
                &notes,
                &created_at,
                &updated_at,
                &deleted_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Project, project::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Project, project::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: project::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM projects \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C>
    Database<
        Select<By<read::project::list::Page, read::project::list::Selector>>,
    > for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<project::Id, Project>, Vec<project::Id>>>,
        Ok = HashMap<project::Id, Project>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = read::project::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::project::list::Page, read::project::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::project::list::Selector {
            arguments,
            filter:
                read::project::list::Filter {
                    search,
                    status,
                    client_id,
                    priority,
                },
        } = by.into_inner();

        let pattern = search.as_ref().map(SearchPattern::new);
        let limit = int8(arguments.limit());
        let offset = int8(arguments.offset());

        let mut clause = Clause::default();
        clause.and_opt(pattern.as_ref(), |idx| {
            format!(
                "(name ILIKE ${idx}::VARCHAR \
                  OR description ILIKE ${idx}::VARCHAR \
                  OR code ILIKE ${idx}::VARCHAR)"
            )
        });
        clause.and_opt(status.as_ref(), |idx| {
            format!("status = ${idx}::VARCHAR")
        });
        clause.and_opt(client_id.as_ref(), |idx| {
            format!("client_id = ${idx}::UUID")
        });
        clause.and_opt(priority.as_ref(), |idx| {
            format!("priority = ${idx}::VARCHAR")
        });
        let filtering = clause.sql();

        let total: i64 = self
            .query_one(
                &format!(
                    "SELECT COUNT(*) \
                     FROM projects \
                     WHERE deleted_at IS NULL {filtering}"
                ),
                clause.params.as_slice(),
            )
            .await
            .map_err(tracerr::wrap!())?
            .get(0);

        let limit_idx = clause.param(&limit);
        let offset_idx = clause.param(&offset);
        let ids = self
            .query(
                &format!(
                    "SELECT id \
                     FROM projects \
                     WHERE deleted_at IS NULL {filtering} \
                     ORDER BY created_at DESC, id \
                     LIMIT ${limit_idx}::INT8 \
                     OFFSET ${offset_idx}::INT8"
                ),
                clause.params.as_slice(),
            )
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| row.get("id"))
            .collect::<Vec<project::Id>>();

        let found = self
            .execute(Select(By::new(ids.clone())))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(Page {
            items: ordered(&ids, found),
            total: u64::try_from(total).unwrap_or_default(),
            arguments,
        })
    }
}

impl<C> Database<Select<By<read::project::Stats, DateTime>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = read::project::Stats;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::project::Stats, DateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let month_start = by.into_inner();
        let ongoing = project::Status::ONGOING
            .map(project::Status::as_str)
            .to_vec();

        const TOTALS_SQL: &str = "\
            SELECT COUNT(*) AS total, \
                   COALESCE(SUM(budget), 0) AS total_budget, \
                   COALESCE(SUM(estimated_cost), 0) AS total_estimated_cost, \
                   COALESCE(SUM(actual_cost), 0) AS total_actual_cost, \
                   ROUND(\
                       COALESCE(\
                           AVG(progress) \
                               FILTER (WHERE status = ANY($2::VARCHAR[])), \
                           0\
                       ), \
                       2\
                   ) AS average_progress, \
                   COUNT(*) FILTER (WHERE created_at >= $1::TIMESTAMPTZ) \
                       AS this_month \
            FROM projects \
            WHERE deleted_at IS NULL";
        let totals = self
            .query_one(TOTALS_SQL, &[&month_start, &ongoing])
            .await
            .map_err(tracerr::wrap!())?;

        const BY_STATUS_SQL: &str = "\
            SELECT status, COUNT(*) AS count \
            FROM projects \
            WHERE deleted_at IS NULL \
            GROUP BY status";
        let counted = self
            .query(BY_STATUS_SQL, &[])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                (
                    row.get::<_, project::Status>("status"),
                    row.get::<_, i64>("count"),
                )
            });

        Ok(read::project::Stats {
            total: totals.get("total"),
            by_status: status_counts(project::Status::ALL, counted),
            total_budget: totals.get("total_budget"),
            total_estimated_cost: totals.get("total_estimated_cost"),
            total_actual_cost: totals.get("total_actual_cost"),
            average_progress: totals.get("average_progress"),
            this_month: totals.get("this_month"),
        })
    }
}

impl<C> Database<Select<By<Vec<Project>, read::project::report::Filter>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Project>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Project>, read::project::report::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::project::report::Filter {
            period,
            status,
            client_id,
        } = by.into_inner();

        let mut clause = Clause::default();
        let start_idx = clause.param(&period.start);
        let end_idx = clause.param(&period.end);
        clause.and(format!(
            "created_at >= ${start_idx}::TIMESTAMPTZ \
             AND created_at < ${end_idx}::TIMESTAMPTZ"
        ));
        clause.and_opt(status.as_ref(), |idx| {
            format!("status = ${idx}::VARCHAR")
        });
        clause.and_opt(client_id.as_ref(), |idx| {
            format!("client_id = ${idx}::UUID")
        });

        Ok(self
            .query(
                &format!(
                    "SELECT {COLUMNS} \
                     FROM projects \
                     WHERE deleted_at IS NULL {} \
                     ORDER BY created_at DESC, id",
                    clause.sql(),
                ),
                clause.params.as_slice(),
            )
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C, IDs> Database<Select<By<read::project::MaterialsCost, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[project::Id]>,
{
    type Ok = read::project::MaterialsCost;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::project::MaterialsCost, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[project::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(read::project::MaterialsCost::default());
        }

        const SQL: &str = "\
            SELECT project_id, SUM(total_cost) AS cost \
            FROM project_materials \
            WHERE project_id = ANY($1::UUID[]) \
            GROUP BY project_id";
        Ok(read::project::MaterialsCost(
            self.query(SQL, &[&ids])
                .await
                .map_err(tracerr::wrap!())?
                .into_iter()
                .map(|row| (row.get("project_id"), row.get("cost")))
                .collect(),
        ))
    }
}

impl<C> Database<Select<By<Vec<Project>, read::project::Deadlines>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Project>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Project>, read::project::Deadlines>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::project::Deadlines(period) = by.into_inner();
        let scheduled = project::Status::SCHEDULED
            .map(project::Status::as_str)
            .to_vec();

        Ok(self
            .query(
                &format!(
                    "SELECT {COLUMNS} \
                     FROM projects \
                     WHERE deleted_at IS NULL \
                       AND status = ANY($1::VARCHAR[]) \
                       AND end_date >= $2::TIMESTAMPTZ \
                       AND end_date < $3::TIMESTAMPTZ \
                     ORDER BY end_date ASC, id"
                ),
                &[&scheduled, &period.start, &period.end],
            )
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Select<By<Vec<Project>, read::activity::Recent>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Project>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Project>, read::activity::Recent>>,
    ) -> Result<Self::Ok, Self::Err> {
        let limit = int8(by.into_inner().per_kind());

        Ok(self
            .query(
                &format!(
                    "SELECT {COLUMNS} \
                     FROM projects \
                     WHERE deleted_at IS NULL \
                     ORDER BY created_at DESC, id \
                     LIMIT $1::INT8"
                ),
                &[&limit],
            )
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Select<By<Vec<ProjectMaterial>, read::project::Materials>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<ProjectMaterial>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<ProjectMaterial>, read::project::Materials>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::project::Materials(project_id) = by.into_inner();

        const SQL: &str = "\
            SELECT id, project_id, material_id, \
                   quantity_planned, quantity_used, \
                   unit_price, total_cost, \
                   status, delivery_date, notes, \
                   created_at, updated_at \
            FROM project_materials \
            WHERE project_id = $1::UUID \
            ORDER BY created_at ASC, id";
        Ok(self
            .query(SQL, &[&project_id])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| ProjectMaterial {
                id: row.get("id"),
                project_id: row.get("project_id"),
                material_id: row.get("material_id"),
                quantity_planned: row.get("quantity_planned"),
                quantity_used: row.get("quantity_used"),
                unit_price: row.get("unit_price"),
                total_cost: row.get("total_cost"),
                status: row.get("status"),
                delivery_date: row.get("delivery_date"),
                notes: row.get("notes"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })
            .collect())
    }
}

impl<C> Database<Insert<ProjectMaterial>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(material): Insert<ProjectMaterial>,
    ) -> Result<Self::Ok, Self::Err> {
        let ProjectMaterial {
            id,
            project_id,
            material_id,
            quantity_planned,
            quantity_used,
            unit_price,
            total_cost,
            status,
            delivery_date,
            notes,
            created_at,
            updated_at,
        } = material;

        const SQL: &str = "\
            INSERT INTO project_materials (\
                id, project_id, material_id, \
                quantity_planned, quantity_used, \
                unit_price, total_cost, \
                status, delivery_date, notes, \
                created_at, updated_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::NUMERIC, $5::NUMERIC, \
                $6::NUMERIC, $7::NUMERIC, \
                $8::VARCHAR, $9::TIMESTAMPTZ, $10::TEXT, \
                $11::TIMESTAMPTZ, $12::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &project_id,
                &material_id,
                &quantity_planned,
                &quantity_used,
                &unit_price,
                &total_cost,
                &status,
                &delivery_date,
                &notes,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}
