//! [`Invoice`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    operations::{By, Insert, Lock, Select, Update},
    pagination::Page,
    DateTime,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{invoice, Invoice},
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

/// Columns of the `invoices` table, in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    id, number, client_id, project_id, quote_id, title, description, \
    status, issue_date, due_date, paid_date, \
    subtotal, tax_rate, tax_amount, discount, total, \
    paid_amount, balance, \
    notes, terms, created_at, updated_at, deleted_at";

/// Condition of a [`invoice::Status::Sent`] [`Invoice`] past its due date
/// with a positive balance.
const OVERDUE: &str = "status = 'sent' AND due_date < NOW() AND balance > 0";

/// Builds an [`Invoice`] without items out of the provided [`Row`] of
/// [`COLUMNS`].
fn from_row(row: &Row) -> Invoice {
    Invoice {
        id: row.get("id"),
        number: row.get("number"),
        client_id: row.get("client_id"),
        project_id: row.get("project_id"),
        quote_id: row.get("quote_id"),
        title: row.get("title"),
        description: row.get("description"),
        status: row.get("status"),
        issue_date: row.get("issue_date"),
        due_date: row.get("due_date"),
        paid_date: row.get("paid_date"),
        subtotal: row.get("subtotal"),
        tax_rate: row.get("tax_rate"),
        tax_amount: row.get("tax_amount"),
        discount: row.get("discount"),
        total: row.get("total"),
        paid_amount: row.get("paid_amount"),
        balance: row.get("balance"),
        notes: row.get("notes"),
        terms: row.get("terms"),
        items: vec![],
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

impl<C, IDs> Database<Select<By<HashMap<invoice::Id, Invoice>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[invoice::Id]>,
{
    type Ok = HashMap<invoice::Id, Invoice>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<invoice::Id, Invoice>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[invoice::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = int8(ids.len());

        let mut invoices = self
            .query(
                &format!(
                    "SELECT {COLUMNS} \
                     FROM invoices \
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
                let invoice = from_row(row);
                (invoice.id, invoice)
            })
            .collect::<HashMap<_, _>>();

        let found = invoices.keys().copied().collect::<Vec<_>>();
        for (id, items) in item::select(&**self, Owner::Invoice, &found)
            .await
            .map_err(tracerr::wrap!())?
        {
            if let Some(invoice) = invoices.get_mut(&id) {
                invoice.items = items;
            }
        }
        Ok(invoices)
    }
}

impl<C> Database<Select<By<Option<Invoice>, invoice::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<invoice::Id, Invoice>, [invoice::Id; 1]>>,
        Ok = HashMap<invoice::Id, Invoice>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Invoice>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Invoice>, invoice::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Insert<Invoice>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Invoice>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(invoice): Insert<Invoice>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(invoice)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Invoice>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(invoice): Update<Invoice>,
    ) -> Result<Self::Ok, Self::Err> {
        let Invoice {
            id,
            number,
            client_id,
            project_id,
            quote_id,
            title,
            description,
            status,
            issue_date,
            due_date,
            paid_date,
            subtotal,
            tax_rate,
            tax_amount,
            discount,
            total,
            paid_amount,
            balance,
            notes,
            terms,
            items,
            created_at,
            updated_at,
            deleted_at,
        } = invoice;

        const SQL: &str = "\
            INSERT INTO invoices (\
                id, number, client_id, project_id, quote_id, \
                title, description, \
                status, issue_date, due_date, paid_date, \
                subtotal, tax_rate, tax_amount, discount, total, \
                paid_amount, balance, \
                notes, terms, created_at, updated_at, deleted_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::UUID, $4::UUID, $5::UUID, \
                $6::VARCHAR, $7::TEXT, \
                $8::VARCHAR, $9::TIMESTAMPTZ, $10::TIMESTAMPTZ, \
                $11::TIMESTAMPTZ, \
                $12::NUMERIC, $13::NUMERIC, $14::NUMERIC, $15::NUMERIC, \
                $16::NUMERIC, \
                $17::NUMERIC, $18::NUMERIC, \
                $19::TEXT, $20::TEXT, \
                $21::TIMESTAMPTZ, $22::TIMESTAMPTZ, $23::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET number = EXCLUDED.number, \
                client_id = EXCLUDED.client_id, \
                project_id = EXCLUDED.project_id, \
                quote_id = EXCLUDED.quote_id, \
                title = EXCLUDED.title, \
                description = EXCLUDED.description, \
                status = EXCLUDED.status, \
                issue_date = EXCLUDED.issue_date, \
                due_date = EXCLUDED.due_date, \
                paid_date = EXCLUDED.paid_date, \
                subtotal = EXCLUDED.subtotal, \
                tax_rate = EXCLUDED.tax_rate, \
                tax_amount = EXCLUDED.tax_amount, \
                discount = EXCLUDED.discount, \
                total = EXCLUDED.total, \
                paid_amount = EXCLUDED.paid_amount, \
                balance = EXCLUDED.balance, \
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
                    &quote_id,
                    &title,
                    &description,
                    &status,
                    &issue_date,
                    &due_date,
                    &paid_date,
                    &subtotal,
                    &tax_rate,
                    &tax_amount,
                    &discount,
                    &total,
                    &paid_amount,
                    &balance,
                    &notes,
                    &terms,
                    &created_at,
                    &updated_at,
                    &deleted_at,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?;

        item::replace(&**self, Owner::Invoice, &id, &items)
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Lock<By<Invoice, invoice::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Invoice, invoice::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: invoice::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM invoices \
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
        Select<By<read::invoice::list::Page, read::invoice::list::Selector>>,
    > for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<invoice::Id, Invoice>, Vec<invoice::Id>>>,
        Ok = HashMap<invoice::Id, Invoice>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = read::invoice::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::invoice::list::Page, read::invoice::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::invoice::list::Selector {
            arguments,
            filter:
                read::invoice::list::Filter {
                    search,
                    status,
                    client_id,
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
            Some(invoice::Status::Overdue) => {
                clause.and(format!("(status = 'overdue' OR ({OVERDUE}))"));
            }
            Some(invoice::Status::Sent) => {
                clause.and(format!("status = 'sent' AND NOT ({OVERDUE})"));
            }
            Some(_) | None => clause.and_opt(status.as_ref(), |idx| {
                format!("status = ${idx}::VARCHAR")
            }),
        }
        clause.and_opt(client_id.as_ref(), |idx| {
            format!("client_id = ${idx}::UUID")
        });
        let filtering = clause.sql();

        let total: i64 = self
            .query_one(
                &format!(
                    "SELECT COUNT(*) \
                     FROM invoices \
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
                     FROM invoices \
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
            .collect::<Vec<invoice::Id>>();

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

impl<C> Database<Select<By<read::invoice::Stats, DateTime>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = read::invoice::Stats;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::invoice::Stats, DateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let now = by.into_inner();
        let outstanding = invoice::Status::OUTSTANDING
            .map(invoice::Status::as_str)
            .to_vec();

        const TOTALS_SQL: &str = "\
            SELECT COUNT(*) AS total, \
                   COALESCE(SUM(total) FILTER (WHERE status <> 'cancelled'), 0) \
                       AS total_amount, \
                   COALESCE(SUM(paid_amount), 0) AS paid_amount, \
                   COALESCE(\
                       SUM(balance) FILTER (WHERE status = ANY($1::VARCHAR[])), \
                       0\
                   ) AS outstanding \
            FROM invoices \
            WHERE deleted_at IS NULL";
        let totals = self
            .query_one(TOTALS_SQL, &[&outstanding])
            .await
            .map_err(tracerr::wrap!())?;

        const BY_STATUS_SQL: &str = "\
            SELECT CASE \
                       WHEN status = 'sent' \
                        AND due_date < $1::TIMESTAMPTZ \
                        AND balance > 0 \
                       THEN 'overdue' \
                       ELSE status \
                   END AS effective_status, \
                   COUNT(*) AS count \
            FROM invoices \
            WHERE deleted_at IS NULL \
            GROUP BY effective_status";
        let counted = self
            .query(BY_STATUS_SQL, &[&now])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                (
                    row.get::<_, invoice::Status>("effective_status"),
                    row.get::<_, i64>("count"),
                )
            });

        Ok(read::invoice::Stats {
            total: totals.get("total"),
            by_status: status_counts(invoice::Status::ALL, counted),
            total_amount: totals.get("total_amount"),
            paid_amount: totals.get("paid_amount"),
            outstanding: totals.get("outstanding"),
        })
    }
}
