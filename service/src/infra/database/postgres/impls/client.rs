//! [`Client`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    operations::{By, Insert, Lock, Select, Update},
    pagination::Page,
    DateTime, Money,
};
use tracerr::Traced;

use crate::{
    domain::{client, project, Client, Email},
    infra::{
        database::{
            self,
            postgres::{Connection, SearchPattern},
            Postgres,
        },
        Database,
    },
    read,
};

use super::{int8, ordered, Clause};

impl<C, IDs> Database<Select<By<HashMap<client::Id, Client>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[client::Id]>,
{
    type Ok = HashMap<client::Id, Client>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<client::Id, Client>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[client::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = int8(ids.len());

        const SQL: &str = "\
            SELECT id, name, email, phone, \
                   address, city, state, zip_code, \
                   company, tax_id, contact_type, \
                   notes, is_active, \
                   created_at, updated_at, deleted_at \
            FROM clients \
            WHERE id IN (SELECT unnest($1::UUID[]) LIMIT $2::INT8) \
              AND deleted_at IS NULL \
            LIMIT $2::INT8";
        Ok(self
            .query(SQL, &[&ids, &limit])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let id = row.get("id");
                (
                    id,
                    Client {
                        id,
                        name: row.get("name"),
                        email: row.get("email"),
                        phone: row.get("phone"),
                        address: row.get("address"),
                        city: row.get("city"),
                        state: row.get("state"),
                        zip_code: row.get("zip_code"),
                        company: row.get("company"),
                        tax_id: row.get("tax_id"),
                        contact_type: row.get("contact_type"),
                        notes: row.get("notes"),
                        is_active: row.get("is_active"),
                        created_at: row.get("created_at"),
                        updated_at: row.get("updated_at"),
                        deleted_at: row.get("deleted_at"),
                    },
                )
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Client>, client::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<client::Id, Client>, [client::Id; 1]>>,
        Ok = HashMap<client::Id, Client>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Client>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Client>, client::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<'l, C> Database<Select<By<Option<Client>, &'l Email>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<Option<Client>, client::Id>>,
        Ok = Option<Client>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Client>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Client>, &'l Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM clients \
            WHERE LOWER(email) = LOWER($1::VARCHAR) \
              AND deleted_at IS NULL \
            LIMIT 1";
        let Some(row) = self
            .query_opt(SQL, &[&email])
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        let client_id: client::Id = row.get("id");
        self.execute(Select(By::new(client_id)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Insert<Client>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Client>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(client): Insert<Client>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(client)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Client>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(client): Update<Client>,
    ) -> Result<Self::Ok, Self::Err> {
        let Client {
            id,
            name,
            email,
            phone,
            address,
            city,
            state,
            zip_code,
            company,
            tax_id,
            contact_type,
            notes,
            is_active,
            created_at,
            updated_at,
            deleted_at,
        } = client;

        const SQL: &str = "\
            INSERT INTO clients (\
                id, name, email, phone, \
                address, city, state, zip_code, \
                company, tax_id, contact_type, \
                notes, is_active, \
                created_at, updated_at, deleted_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::VARCHAR, \
                $5::VARCHAR, $6::VARCHAR, $7::VARCHAR, $8::VARCHAR, \
                $9::VARCHAR, $10::VARCHAR, $11::VARCHAR, \
                $12::TEXT, $13::BOOLEAN, \
                $14::TIMESTAMPTZ, $15::TIMESTAMPTZ, $16::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET name = EXCLUDED.name, \
                email = EXCLUDED.email, \
                phone = EXCLUDED.phone, \
                address = EXCLUDED.address, \
                city = EXCLUDED.city, \
                state = EXCLUDED.state, \
                zip_code = EXCLUDED.zip_code, \
                company = EXCLUDED.company, \
                tax_id = EXCLUDED.tax_id, \
                contact_type = EXCLUDED.contact_type, \
                notes = EXCLUDED.notes, \
                is_active = EXCLUDED.is_active, \
                updated_at = EXCLUDED.updated_at, \
                deleted_at = EXCLUDED.deleted_at";
        self.exec(
            SQL,
            &[
                &id,
                &name,
                &email,
                &phone,
                &address,
                &city,
                &state,
                &zip_code,
                &company,
                &tax_id,
                &contact_type,
                &notes,
                &is_active,
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

impl<C> Database<Lock<By<Client, client::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Client, client::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: client::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM clients \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C>
    Database<Select<By<read::client::list::Page, read::client::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<client::Id, Client>, Vec<client::Id>>>,
        Ok = HashMap<client::Id, Client>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = read::client::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::client::list::Page, read::client::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::client::list::Selector {
            arguments,
            filter: read::client::list::Filter { search, active },
        } = by.into_inner();

        let pattern = search.as_ref().map(SearchPattern::new);
        let limit = int8(arguments.limit());
        let offset = int8(arguments.offset());

        let mut clause = Clause::default();
        clause.and_opt(pattern.as_ref(), |idx| {
            format!(
                "(name ILIKE ${idx}::VARCHAR \
                  OR email ILIKE ${idx}::VARCHAR \
                  OR company ILIKE ${idx}::VARCHAR)"
            )
        });
        clause.and_opt(active.as_ref(), |idx| {
            format!("is_active = ${idx}::BOOLEAN")
        });
        let filtering = clause.sql();

        let total: i64 = self
            .query_one(
                &format!(
                    "SELECT COUNT(*) \
                     FROM clients \
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
                     FROM clients \
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
            .collect::<Vec<client::Id>>();

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

impl<C> Database<Select<By<read::client::Stats, DateTime>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = read::client::Stats;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::client::Stats, DateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let month_start = by.into_inner();

        const SQL: &str = "\
            SELECT COUNT(*) AS total, \
                   COUNT(*) FILTER (WHERE is_active) AS active, \
                   COUNT(*) FILTER (WHERE contact_type = 'company') \
                       AS companies, \
                   COUNT(*) FILTER (WHERE created_at >= $1::TIMESTAMPTZ) \
                       AS this_month \
            FROM clients \
            WHERE deleted_at IS NULL";
        let row = self
            .query_one(SQL, &[&month_start])
            .await
            .map_err(tracerr::wrap!())?;

        let total: i64 = row.get("total");
        let active: i64 = row.get("active");
        Ok(read::client::Stats {
            total,
            active,
            inactive: total - active,
            companies: row.get("companies"),
            this_month: row.get("this_month"),
        })
    }
}

impl<C> Database<Select<By<read::client::OngoingProjects, client::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::client::OngoingProjects;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::client::OngoingProjects, client::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        let ongoing = project::Status::ONGOING
            .map(project::Status::as_str)
            .to_vec();

        const SQL: &str = "\
            SELECT COUNT(*) \
            FROM projects \
            WHERE client_id = $1::UUID \
              AND status = ANY($2::VARCHAR[]) \
              AND deleted_at IS NULL";
        Ok(read::client::OngoingProjects(
            self.query_one(SQL, &[&id, &ongoing])
                .await
                .map_err(tracerr::wrap!())?
                .get(0),
        ))
    }
}

impl<C> Database<Select<By<Vec<Client>, read::client::report::Filter>>>
    for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<client::Id, Client>, Vec<client::Id>>>,
        Ok = HashMap<client::Id, Client>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Vec<Client>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Client>, read::client::report::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::client::report::Filter { period, active } = by.into_inner();

        let mut clause = Clause::default();
        let start_idx = clause.param(&period.start);
        let end_idx = clause.param(&period.end);
        clause.and(format!(
            "created_at >= ${start_idx}::TIMESTAMPTZ \
             AND created_at < ${end_idx}::TIMESTAMPTZ"
        ));
        clause.and_opt(active.as_ref(), |idx| {
            format!("is_active = ${idx}::BOOLEAN")
        });

        let ids = self
            .query(
                &format!(
                    "SELECT id \
                     FROM clients \
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
            .collect::<Vec<client::Id>>();

        let found = self
            .execute(Select(By::new(ids.clone())))
            .await
            .map_err(tracerr::wrap!())?;
        Ok(ordered(&ids, found))
    }
}

impl<C, IDs>
    Database<Select<By<HashMap<client::Id, read::client::Activity>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[client::Id]>,
{
    type Ok = HashMap<client::Id, read::client::Activity>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<HashMap<client::Id, read::client::Activity>, IDs>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[client::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT c.id, \
                   (SELECT COUNT(*) \
                    FROM projects p \
                    WHERE p.client_id = c.id \
                      AND p.deleted_at IS NULL) AS projects, \
                   q.quotes, q.quote_value \
            FROM unnest($1::UUID[]) AS c(id) \
            CROSS JOIN LATERAL (\
                SELECT COUNT(*) AS quotes, \
                       COALESCE(SUM(total), 0) AS quote_value \
                FROM quotes \
                WHERE client_id = c.id \
                  AND deleted_at IS NULL\
            ) AS q";
        Ok(self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                (
                    row.get("id"),
                    read::client::Activity {
                        projects: row.get("projects"),
                        quotes: row.get("quotes"),
                        quote_value: row.get::<_, Money>("quote_value"),
                    },
                )
            })
            .collect())
    }
}

impl<C> Database<Select<By<Vec<Client>, read::activity::Recent>>>
    for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<client::Id, Client>, Vec<client::Id>>>,
        Ok = HashMap<client::Id, Client>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Vec<Client>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Client>, read::activity::Recent>>,
    ) -> Result<Self::Ok, Self::Err> {
        let limit = int8(by.into_inner().per_kind());

        const SQL: &str = "\
            SELECT id \
            FROM clients \
            WHERE deleted_at IS NULL \
            ORDER BY created_at DESC, id \
            LIMIT $1::INT8";
        let ids = self
            .query(SQL, &[&limit])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| row.get("id"))
            .collect::<Vec<client::Id>>();

        let found = self
            .execute(Select(By::new(ids.clone())))
            .await
            .map_err(tracerr::wrap!())?;
        Ok(ordered(&ids, found))
    }
}
