//! [`Quote`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    operations::{By, Insert, Lock, Select, Update},
    pagination::Page,
    DateTime, Money, YearMonth,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{quote, Quote},
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

use super::{
    int8,
    item::{self, Owner},
    ordered, Clause,
};

/// Columns of the `quotes` table, in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    id, number, client_id, project_id, title, description, \
    status, valid_until, \
    subtotal, tax_rate, tax_amount, discount, total, \
    notes, terms, created_at, updated_at, deleted_at";

/// Builds a [`Quote`] without items out of the provided [`Row`] of
/// [`COLUMNS`].
fn from_row(row: &Row) -> Quote {
    Quote {
        id: row.get("id"),
        number: row.get("number"),
        client_id: row.get("client_id"),
        project_id: row.get("project_id"),
        title: row.get("title"),
        description: row.get("description"),
        status: row.get("status"),
        valid_until: row.get("valid_until"),
        subtotal: row.get("subtotal"),
        tax_rate: row.get("tax_rate"),
        tax_amount: row.get("tax_amount"),
        discount: row.get("discount"),
        total: row.get("total"),
        notes: row.get("notes"),
        terms: row.get("terms"),
        items: vec![],
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

/// Condition of a [`quote::Status::Sent`] [`Quote`] whose validity has
/// passed.
const EXPIRED: &str = "status = 'sent' AND valid_until < NOW()";

/// Condition of a [`quote::Status::Sent`] [`Quote`] which is still valid.
const STILL_SENT: &str = "\
    status = 'sent' AND (valid_until IS NULL OR valid_until >= NOW())";

impl<C, IDs> Database<Select<By<HashMap<quote::Id, Quote>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[quote::Id]>,
{
    type Ok = HashMap<quote::Id, Quote>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<quote::Id, Quote>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[quote::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = int8(ids.len());

        let mut quotes = self
            .query(
                &format!(
                    "SELECT {COLUMNS} \
                     FROM quotes \
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
                let quote = from_row(row);
                (quote.id, quote)
            })
            .collect::<HashMap<_, _>>();

        let found = quotes.keys().copied().collect::<Vec<_>>();
        for (id, items) in item::select(&**self, Owner::Quote, &found)
            .await
            .map_err(tracerr::wrap!())?
        {
            if let Some(quote) = quotes.get_mut(&id) {
                quote.items = items;
            }
        }
        Ok(quotes)
    }
}

impl<C> Database<Select<By<Option<Quote>, quote::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<quote::Id, Quote>, [quote::Id; 1]>>,
        Ok = HashMap<quote::Id, Quote>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Quote>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Quote>, quote::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Insert<Quote>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Quote>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(quote): Insert<Quote>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(quote)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Quote>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(quote): Update<Quote>,
    ) -> Result<Self::Ok, Self::Err> {
        let Quote {
            id,
            number,
            client_id,
            project_id,
            title,
            description,
            status,
            valid_until,
            subtotal,
            tax_rate,
            tax_amount,
            discount,
            total,
            notes,
            terms,
            items,
            created_at,
            updated_at,
            deleted_at,
        } = quote;

        const SQL: &str = "\
            INSERT INTO quotes (\
                id, number, client_id, project_id, title, description, \
                status, valid_until, \
                subtotal, tax_rate, tax_amount, discount, total, \
                notes, terms, created_at, updated_at, deleted_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::UUID, $4::UUID, \
                $5::VARCHAR, $6::TEXT, \
                $7::VARCHAR, $8::TIMESTAMPTZ, \
                $9::NUMERIC, $10::NUMERIC, $11::NUMERIC, \
                $12::NUMERIC, $13::NUMERIC, \
                $14::TEXT, $15::TEXT, \
                $16::TIMESTAMPTZ, $17::TIMESTAMPTZ, $18::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET number = EXCLUDED.number, \
                client_id = EXCLUDED.client_id, \
                project_id = EXCLUDED.project_id, \
                title = EXCLUDED.title, \
                description = EXCLUDED.description, \
                status = EXCLUDED.status, \
                valid_until = EXCLUDED.valid_until, \
                subtotal = EXCLUDED.subtotal, \
                tax_rate = EXCLUDED.tax_rate, \
                tax_amount = EXCLUDED.tax_amount, \
                discount = EXCLUDED.discount, \
                total = EXCLUDED.total, \
                notes = EXCLUDED.notes, \
                terms = EXCLUDED.terms, \
                updated_at = EXCLUDED.updated_at, \
                deleted_at = EXCLUDED.deleted_at";
        _ = self
            .exec(
                SQL,
                &[
                    &id,
                    &number,
                    &client_id,
                    &project_id,
                    &title,
                    &description,
                    &status,
                    &valid_until,
                    &subtotal,
                    &tax_rate,
                    &tax_amount,
                    &discount,
                    &total,
                    &notes,
                    &terms,
                    &created_at,
                    &updated_at,
                    &deleted_at,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?;

        item::replace(&**self, Owner::Quote, &id, &items)
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Lock<By<Quote, quote::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Quote, quote::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: quote::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM quotes \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C>
    Database<Select<By<read::quote::list::Page, read::quote::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<quote::Id, Quote>, Vec<quote::Id>>>,
        Ok = HashMap<quote::Id, Quote>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = read::quote::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::quote::list::Page, read::quote::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::quote::list::Selector {
            arguments,
            filter:
                read::quote::list::Filter {
                    search,
                    status,
                    client_id,
                    project_id,
                },
        } = by.into_inner();

        let pattern = search.as_ref().map(SearchPattern::new);
        let limit = int8(arguments.limit());
        let offset = int8(arguments.offset());

        let mut clause = Clause::default();
        clause.and_opt(pattern.as_ref(), |idx| {
            format!(
                "(title ILIKE ${idx}::VARCHAR \
                  OR number ILIKE ${idx}::VARCHAR)"
            )
        });
        match status {
            Some(quote::Status::Expired) => clause.and(EXPIRED),
            Some(quote::Status::Sent) => clause.and(STILL_SENT),
            Some(_) | None => clause.and_opt(status.as_ref(), |idx| {
                format!("status = ${idx}::VARCHAR")
            }),
        }
        clause.and_opt(client_id.as_ref(), |idx| {
            format!("client_id = ${idx}::UUID")
        });
        clause.and_opt(project_id.as_ref(), |idx| {
            format!("project_id = ${idx}::UUID")
        });
        let filtering = clause.sql();

        let total: i64 = self
            .query_one(
                &format!(
                    "SELECT COUNT(*) \
                     FROM quotes \
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
                     FROM quotes \
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
            .collect::<Vec<quote::Id>>();

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

impl<C> Database<Select<By<read::quote::Stats, DateTime>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = read::quote::Stats;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::quote::Stats, DateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let month_start = by.into_inner();
        let pending = quote::Status::PENDING
            .map(quote::Status::as_str)
            .to_vec();

        const TOTALS_SQL: &str = "\
            SELECT COUNT(*) AS total, \
                   COALESCE(SUM(total), 0) AS total_value, \
                   COALESCE(SUM(total) FILTER (WHERE status = 'accepted'), 0) \
                       AS accepted_value, \
                   COALESCE(\
                       SUM(total) FILTER (WHERE status = ANY($2::VARCHAR[])), \
                       0\
                   ) AS pending_value, \
                   COUNT(*) FILTER (WHERE created_at >= $1::TIMESTAMPTZ) \
                       AS this_month \
            FROM quotes \
            WHERE deleted_at IS NULL";
        let totals = self
            .query_one(TOTALS_SQL, &[&month_start, &pending])
            .await
            .map_err(tracerr::wrap!())?;

        const BY_STATUS_SQL: &str = "\
            SELECT status, COUNT(*) AS count \
            FROM quotes \
            WHERE deleted_at IS NULL \
            GROUP BY status";
        let counted = self
            .query(BY_STATUS_SQL, &[])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                (
                    row.get::<_, quote::Status>("status"),
                    row.get::<_, i64>("count"),
                )
            });

        Ok(read::quote::Stats {
            total: totals.get("total"),
            by_status: status_counts(quote::Status::ALL, counted),
            total_value: totals.get("total_value"),
            accepted_value: totals.get("accepted_value"),
            pending_value: totals.get("pending_value"),
            this_month: totals.get("this_month"),
        })
    }
}

impl<C> Database<Select<By<read::quote::MonthlyRevenue, read::Period>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::quote::MonthlyRevenue;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::quote::MonthlyRevenue, read::Period>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::Period { start, end } = by.into_inner();

        const SQL: &str = "\
            SELECT EXTRACT(YEAR FROM created_at AT TIME ZONE 'UTC')::INT4 \
                       AS year, \
                   EXTRACT(MONTH FROM created_at AT TIME ZONE 'UTC')::INT4 \
                       AS month, \
                   SUM(total) AS revenue \
            FROM quotes \
            WHERE deleted_at IS NULL \
              AND status = 'accepted' \
              AND created_at >= $1::TIMESTAMPTZ \
              AND created_at < $2::TIMESTAMPTZ \
            GROUP BY year, month";
        Ok(read::quote::MonthlyRevenue(
            self.query(SQL, &[&start, &end])
                .await
                .map_err(tracerr::wrap!())?
                .into_iter()
                .filter_map(|row| {
                    let month = u8::try_from(row.get::<_, i32>("month")).ok()?;
                    let month = YearMonth::new(row.get("year"), month)?;
                    Some((month, row.get::<_, Money>("revenue")))
                })
                .collect(),
        ))
    }
}

impl<C> Database<Select<By<Vec<Quote>, read::quote::report::Filter>>>
    for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<quote::Id, Quote>, Vec<quote::Id>>>,
        Ok = HashMap<quote::Id, Quote>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Vec<Quote>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Quote>, read::quote::report::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::quote::report::Filter {
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

        let ids = self
            .query(
                &format!(
                    "SELECT id \
                     FROM quotes \
                     WHERE deleted_at IS NULL {} \
                     ORDER BY created_at DESC, id",
                    clause.sql(),
                ),
                clause.params.as_slice(),
            )
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| row.get("id"))
            .collect::<Vec<quote::Id>>();

        let found = self
            .execute(Select(By::new(ids.clone())))
            .await
            .map_err(tracerr::wrap!())?;
        Ok(ordered(&ids, found))
    }
}

impl<C> Database<Select<By<Vec<Quote>, read::activity::Recent>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Quote>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Quote>, read::activity::Recent>>,
    ) -> Result<Self::Ok, Self::Err> {
        let limit = int8(by.into_inner().per_kind());

        // Feed entries need no line items.
        Ok(self
            .query(
                &format!(
                    "SELECT {COLUMNS} \
                     FROM quotes \
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
