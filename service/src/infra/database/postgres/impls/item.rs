//! Line [`Item`]s storage shared by the documents owning them.

use std::{collections::HashMap, hash::Hash};

use itertools::Itertools as _;
use postgres_types::{FromSql, ToSql};
use tracerr::Traced;

use crate::{
    domain::item::Item,
    infra::database::{self, postgres::Connection},
};

/// Kind of a document owning line [`Item`]s.
#[derive(Clone, Copy, Debug)]
pub(super) enum Owner {
    /// `quotes` owning `quote_items`.
    Quote,

    /// `invoices` owning `invoice_items`.
    Invoice,
}

impl Owner {
    /// Returns the table the [`Item`]s are stored in.
    const fn table(self) -> &'static str {
        match self {
            Self::Quote => "quote_items",
            Self::Invoice => "invoice_items",
        }
    }

    /// Returns the column referencing the owning document.
    const fn column(self) -> &'static str {
        match self {
            Self::Quote => "quote_id",
            Self::Invoice => "invoice_id",
        }
    }
}

/// Selects the [`Item`]s of the documents with the provided `ids`, ordered
/// by their position.
pub(super) async fn select<C, Id>(
    conn: &C,
    owner: Owner,
    ids: &[Id],
) -> Result<HashMap<Id, Vec<Item>>, Traced<database::Error>>
where
    C: Connection,
    Id: ToSql + Sync + for<'r> FromSql<'r> + Eq + Hash,
{
    let (table, column) = (owner.table(), owner.column());

    Ok(conn
        .query(
            &format!(
                "SELECT {column} AS owner_id, \
                        id, description, quantity, unit, \
                        unit_price, total, notes, position \
                 FROM {table} \
                 WHERE {column} = ANY($1::UUID[]) \
                 ORDER BY {column}, position ASC, id"
            ),
            &[&ids],
        )
        .await
        .map_err(tracerr::wrap!())?
        .into_iter()
        .map(|row| {
            (
                row.get::<_, Id>("owner_id"),
                Item {
                    id: row.get("id"),
                    description: row.get("description"),
                    quantity: row.get("quantity"),
                    unit: row.get("unit"),
                    unit_price: row.get("unit_price"),
                    total: row.get("total"),
                    notes: row.get("notes"),
                    position: row.get("position"),
                },
            )
        })
        .into_group_map())
}

/// Replaces all the [`Item`]s of the document with the provided `id`.
pub(super) async fn replace<C, Id>(
    conn: &C,
    owner: Owner,
    id: &Id,
    items: &[Item],
) -> Result<(), Traced<database::Error>>
where
    C: Connection,
    Id: ToSql + Sync,
{
    let (table, column) = (owner.table(), owner.column());

    _ = conn
        .exec(&format!("DELETE FROM {table} WHERE {column} = $1::UUID"), &[id])
        .await
        .map_err(tracerr::wrap!())?;

    let insert = format!(
        "INSERT INTO {table} (\
             id, {column}, description, quantity, unit, \
             unit_price, total, notes, position\
         ) \
         VALUES (\
             $1::UUID, $2::UUID, $3::VARCHAR, $4::NUMERIC, $5::VARCHAR, \
             $6::NUMERIC, $7::NUMERIC, $8::TEXT, $9::INT4\
         )"
    );
    for Item {
        id: item_id,
        description,
        quantity,
        unit,
        unit_price,
        total,
        notes,
        position,
    } in items
    {
        _ = conn
            .exec(
                &insert,
                &[
                    item_id,
                    id,
                    description,
                    quantity,
                    unit,
                    unit_price,
                    total,
                    notes,
                    position,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?;
    }
    Ok(())
}
