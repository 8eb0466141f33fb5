//! [`User`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    operations::{By, Insert, Lock, Select, Update},
    pagination::Page,
};
use tracerr::Traced;

use crate::{
    domain::{user, Email, User},
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

impl<C, IDs> Database<Select<By<HashMap<user::Id, User>, IDs>>> for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[user::Id]>,
{
    type Ok = HashMap<user::Id, User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<user::Id, User>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[user::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = int8(ids.len());

        const SQL: &str = "\
            SELECT id, email, password_hash, \
                   first_name, last_name, \
                   role, is_active, \
                   created_at, updated_at, deleted_at \
            FROM users \
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
                    User {
                        id,
                        email: row.get("email"),
                        password_hash: row.get("password_hash"),
                        first_name: row.get("first_name"),
                        last_name: row.get("last_name"),
                        role: row.get("role"),
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

impl<C> Database<Select<By<Option<User>, user::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<user::Id, User>, [user::Id; 1]>>,
        Ok = HashMap<user::Id, User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<'l, C> Database<Select<By<Option<User>, &'l Email>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM users \
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

        let user_id: user::Id = row.get("id");
        self.execute(Select(By::new(user_id)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Insert<User>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<User>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(user)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<User>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let User {
            id,
            email,
            password_hash,
            first_name,
            last_name,
            role,
            is_active,
            created_at,
            updated_at,
            deleted_at,
        } = user;

        const SQL: &str = "\
            INSERT INTO users (\
                id, email, password_hash, \
                first_name, last_name, \
                role, is_active, \
                created_at, updated_at, deleted_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, \
                $4::VARCHAR, $5::VARCHAR, \
                $6::VARCHAR, $7::BOOLEAN, \
                $8::TIMESTAMPTZ, $9::TIMESTAMPTZ, $10::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET email = EXCLUDED.email, \
                password_hash = EXCLUDED.password_hash, \
                first_name = EXCLUDED.first_name, \
                last_name = EXCLUDED.last_name, \
                role = EXCLUDED.role, \
                is_active = EXCLUDED.is_active, \
                updated_at = EXCLUDED.updated_at, \
                deleted_at = EXCLUDED.deleted_at";
        self.exec(
            SQL,
            &[
                &id,
                &email,
                &password_hash,
                &first_name,
                &last_name,
                &role,
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

impl<C> Database<Lock<By<User, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: user::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM users \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<read::user::list::Page, read::user::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<user::Id, User>, Vec<user::Id>>>,
        Ok = HashMap<user::Id, User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = read::user::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::user::list::Page, read::user::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::user::list::Selector {
            arguments,
            filter: read::user::list::Filter { search, active },
        } = by.into_inner();

        let pattern = search.as_ref().map(SearchPattern::new);
        let limit = int8(arguments.limit());
        let offset = int8(arguments.offset());

        let mut clause = Clause::default();
        clause.and_opt(pattern.as_ref(), |idx| {
            format!(
                "(email ILIKE ${idx}::VARCHAR \
                  OR first_name ILIKE ${idx}::VARCHAR \
                  OR last_name ILIKE ${idx}::VARCHAR)"
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
                     FROM users \
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
                     FROM users \
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
            .collect::<Vec<user::Id>>();

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
