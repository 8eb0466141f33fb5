//! [`Material`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    operations::{Adjust, By, Insert, Lock, Select, Update},
    pagination::Page,
    Quantity,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        material::{self, Movement, Sku, StockAdjustment},
        Material,
    },
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

/// Columns of the `materials` table, in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    id, name, description, category, unit, unit_price, \
    supplier, sku, stock, min_stock, is_active, notes, \
    created_at, updated_at, deleted_at";

/// Condition of an active [`Material`] being low on stock.
const LOW_STOCK: &str = "is_active AND stock <= min_stock";

/// Builds a [`Material`] out of the provided [`Row`] of [`COLUMNS`].
fn from_row(row: &Row) -> Material {
    Material {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        category: row.get("category"),
        unit: row.get("unit"),
        unit_price: row.get("unit_price"),
        supplier: row.get("supplier"),
        sku: row.get("sku"),
        stock: row.get("stock"),
        min_stock: row.get("min_stock"),
        is_active: row.get("is_active"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

impl<C, IDs> Database<Select<By<HashMap<material::Id, Material>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[material::Id]>,
{
    type Ok = HashMap<material::Id, Material>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<material::Id, Material>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[material::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = int8(ids.len());

        Ok(self
            .query(
                &format!(
                    "SELECT {COLUMNS} \
                     FROM materials \
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
                let material = from_row(row);
                (material.id, material)
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Material>, material::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<material::Id, Material>, [material::Id; 1]>>,
        Ok = HashMap<material::Id, Material>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Material>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Material>, material::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<'l, C> Database<Select<By<Option<Material>, &'l Sku>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Material>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Material>, &'l Sku>>,
    ) -> Result<Self::Ok, Self::Err> {
        let sku = by.into_inner();

        Ok(self
            .query_opt(
                &format!(
                    "SELECT {COLUMNS} \
                     FROM materials \
                     WHERE sku = $1::VARCHAR \
                       AND deleted_at IS NULL \
                     LIMIT 1"
                ),
                &[&sku],
            )
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Insert<Material>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Material>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(material): Insert<Material>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(material)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Material>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(material): Update<Material>,
    ) -> Result<Self::Ok, Self::Err> {
        let Material {
            id,
            name,
            description,
            category,
            unit,
            unit_price,
            supplier,
            sku,
            stock,
            min_stock,
            is_active,
            notes,
            created_at,
            updated_at,
            deleted_at,
        } = material;

        const SQL: &str = "\
            INSERT INTO materials (\
                id, name, description, category, unit, unit_price, \
                supplier, sku, stock, min_stock, is_active, notes, \
                created_at, updated_at, deleted_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::TEXT, $4::VARCHAR, $5::VARCHAR, \
                $6::NUMERIC, \
                $7::VARCHAR, $8::VARCHAR, $9::NUMERIC, $10::NUMERIC, \
                $11::BOOLEAN, $12::TEXT, \
                $13::TIMESTAMPTZ, $14::TIMESTAMPTZ, $15::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET name = EXCLUDED.name, \
                description = EXCLUDED.description, \
                category = EXCLUDED.category, \
                unit = EXCLUDED.unit, \
                unit_price = EXCLUDED.unit_price, \
                supplier = EXCLUDED.supplier, \
                sku = EXCLUDED.sku, \
                stock = EXCLUDED.stock, \
                min_stock = EXCLUDED.min_stock, \
                is_active = EXCLUDED.is_active, \
                notes = EXCLUDED.notes, \
                updated_at = EXCLUDED.updated_at, \
                deleted_at = EXCLUDED.deleted_at";
        self.exec(
            SQL,
            &[
                &id,
                &name,
                &description,
                &category,
                &unit,
                &unit_price,
                &supplier,
                &sku,
                &stock,
                &min_stock,
                &is_active,
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

impl<C> Database<Lock<By<Material, material::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Material, material::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: material::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM materials \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Adjust<StockAdjustment>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Quantity>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Adjust(adjustment): Adjust<StockAdjustment>,
    ) -> Result<Self::Ok, Self::Err> {
        let StockAdjustment {
            material_id,
            movement,
            quantity,
        } = adjustment;

        // Stock is checked and written atomically, never going negative.
        let sql = match movement {
            Movement::In => {
                "UPDATE materials \
                 SET stock = stock + $2::NUMERIC, \
                     updated_at = NOW() \
                 WHERE id = $1::UUID \
                   AND deleted_at IS NULL \
                 RETURNING stock"
            }
            Movement::Out => {
                "UPDATE materials \
                 SET stock = stock - $2::NUMERIC, \
                     updated_at = NOW() \
                 WHERE id = $1::UUID \
                   AND deleted_at IS NULL \
                   AND stock >= $2::NUMERIC \
                 RETURNING stock"
            }
        };
        Ok(self
            .query_opt(sql, &[&material_id, &quantity])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| row.get("stock")))
    }
}

impl<C>
    Database<
        Select<By<read::material::list::Page, read::material::list::Selector>>,
    > for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<material::Id, Material>, Vec<material::Id>>>,
        Ok = HashMap<material::Id, Material>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = read::material::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::material::list::Page, read::material::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::material::list::Selector {
            arguments,
            filter:
                read::material::list::Filter {
                    search,
                    category,
                    active,
                    low_stock,
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
                  OR sku ILIKE ${idx}::VARCHAR)"
            )
        });
        clause.and_opt(category.as_ref(), |idx| {
            format!("category = ${idx}::VARCHAR")
        });
        clause.and_opt(active.as_ref(), |idx| {
            format!("is_active = ${idx}::BOOLEAN")
        });
        if low_stock {
            clause.and(LOW_STOCK);
        }
        let filtering = clause.sql();

        let total: i64 = self
            .query_one(
                &format!(
                    "SELECT COUNT(*) \
                     FROM materials \
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
                     FROM materials \
                     WHERE deleted_at IS NULL {filtering} \
                     ORDER BY name ASC, id \
                     LIMIT ${limit_idx}::INT8 \
                     OFFSET ${offset_idx}::INT8"
                ),
                clause.params.as_slice(),
            )
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| row.get("id"))
            .collect::<Vec<material::Id>>();

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

impl<C> Database<Select<By<read::material::Stats, ()>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = read::material::Stats;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<read::material::Stats, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        let sql = format!(
            "SELECT COUNT(*) AS total, \
                    COUNT(*) FILTER (WHERE is_active) AS active, \
                    COUNT(*) FILTER (WHERE {LOW_STOCK}) AS low_stock, \
                    COUNT(DISTINCT category) AS categories, \
                    ROUND(\
                        COALESCE(\
                            SUM(stock * unit_price) FILTER (WHERE is_active), \
                            0\
                        ), \
                        2\
                    ) AS inventory_value \
             FROM materials \
             WHERE deleted_at IS NULL"
        );
        let row = self
            .query_one(&sql, &[])
            .await
            .map_err(tracerr::wrap!())?;

        Ok(read::material::Stats {
            total: row.get("total"),
            active: row.get("active"),
            low_stock: row.get("low_stock"),
            categories: row.get("categories"),
            inventory_value: row.get("inventory_value"),
        })
    }
}

impl<C> Database<Select<By<read::material::Categories, ()>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = read::material::Categories;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<read::material::Categories, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            SELECT DISTINCT category \
            FROM materials \
            WHERE deleted_at IS NULL \
            ORDER BY category ASC";
        Ok(read::material::Categories(
            self.query(SQL, &[])
                .await
                .map_err(tracerr::wrap!())?
                .into_iter()
                .map(|row| row.get("category"))
                .collect(),
        ))
    }
}

impl<C> Database<Select<By<read::material::References, material::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::material::References;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::material::References, material::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT COUNT(*) \
            FROM project_materials \
            WHERE material_id = $1::UUID";
        Ok(read::material::References(
            self.query_one(SQL, &[&id])
                .await
                .map_err(tracerr::wrap!())?
                .get(0),
        ))
    }
}

impl<C> Database<Select<By<Vec<Material>, read::material::report::Filter>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Material>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Material>, read::material::report::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::material::report::Filter {
            category,
            low_stock,
        } = by.into_inner();

        let mut clause = Clause::default();
        clause.and_opt(category.as_ref(), |idx| {
            format!("category = ${idx}::VARCHAR")
        });
        if low_stock {
            clause.and(LOW_STOCK);
        }

        Ok(self
            .query(
                &format!(
                    "SELECT {COLUMNS} \
                     FROM materials \
                     WHERE deleted_at IS NULL {} \
                     ORDER BY category ASC, name ASC, id",
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

impl<C> Database<Select<By<Vec<Material>, read::activity::Recent>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Material>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Material>, read::activity::Recent>>,
    ) -> Result<Self::Ok, Self::Err> {
        let limit = int8(by.into_inner().per_kind());

        Ok(self
            .query(
                &format!(
                    "SELECT {COLUMNS} \
                     FROM materials \
                     WHERE deleted_at IS NULL \
                       AND {LOW_STOCK} \
                     ORDER BY updated_at DESC, id \
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
