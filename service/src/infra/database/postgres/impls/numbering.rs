//! Document numbering [`Database`] implementations.

use common::{
    operations::{By, Lock, Select},
    DateTime,
};
use tracerr::Traced;

use crate::{
    domain::numbering::{Document, Issued, Series},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Lock<Series>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(series): Lock<Series>,
    ) -> Result<Self::Ok, Self::Err> {
        let key = series.lock_key();

        // Released automatically on the transaction end.
        const SQL: &str = "SELECT pg_advisory_xact_lock($1::INT8)";
        self.query(SQL, &[&key])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<Issued, Series>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Issued;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Issued, Series>>,
    ) -> Result<Self::Ok, Self::Err> {
        let Series { document, month } = by.into_inner();
        let Some((start, end)): Option<(DateTime, DateTime)> = month.range()
        else {
            return Ok(Issued::default());
        };

        let table = match document {
            Document::Quote => "quotes",
            Document::Invoice => "invoices",
        };

        // Deleted documents keep their numbers, so they are counted too.
        let count: i64 = self
            .query_one(
                &format!(
                    "SELECT COUNT(*) \
                     FROM {table} \
                     WHERE created_at >= $1::TIMESTAMPTZ \
                       AND created_at < $2::TIMESTAMPTZ"
                ),
                &[&start, &end],
            )
            .await
            .map_err(tracerr::wrap!())?
            .get(0);

        Ok(Issued::from(u32::try_from(count).unwrap_or(u32::MAX)))
    }
}
