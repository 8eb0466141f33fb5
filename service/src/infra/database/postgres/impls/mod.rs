//! [`Database`] implementations.

#![allow(
    clippy::items_after_statements,
    reason = "`const SQL` after statements"
)]
#![allow(clippy::too_many_lines, reason = "SQL-related code a bit verbose")]

mod client;
mod invoice;
mod item;
mod material;
mod numbering;
mod project;
mod quote;
mod user;

use std::{collections::HashMap, hash::Hash};

use async_trait::async_trait;
use common::operations::{Commit, Transact};
use itertools::Itertools as _;
use postgres_types::ToSql;
use refinery_core::{
    traits::r#async::{AsyncQuery, AsyncTransaction},
    AsyncMigrate, Migration,
};
use tracerr::Traced;

use crate::infra::{database, postgres, Database};

use super::{NonTx, Postgres, Tx};

/// Dynamically built SQL `WHERE` conditions along with their parameters.
#[derive(Default)]
struct Clause<'p> {
    /// Parameters referenced by the `conditions`.
    params: Vec<&'p (dyn ToSql + Sync)>,

    /// SQL conditions joined with `AND`.
    conditions: Vec<String>,
}

impl<'p> Clause<'p> {
    /// Adds the provided parameter, returning its `$N` index.
    fn param(&mut self, param: &'p (dyn ToSql + Sync)) -> usize {
        self.params.push(param);
        self.params.len()
    }

    /// Adds the provided SQL condition.
    fn and(&mut self, condition: impl Into<String>) {
        self.conditions.push(condition.into());
    }

    /// Adds a condition built out of the provided optional parameter's
    /// `$N` index, if there is any.
    fn and_opt<T: ToSql + Sync>(
        &mut self,
        param: Option<&'p T>,
        condition: impl FnOnce(usize) -> String,
    ) {
        if let Some(p) = param {
            let idx = self.param(p);
            self.and(condition(idx));
        }
    }

    /// Renders the conditions, each one prefixed with `AND`.
    fn sql(&self) -> String {
        self.conditions
            .iter()
            .format_with(" ", |c, f| f(&format_args!("AND {c}")))
            .to_string()
    }
}

/// Converts the provided number of rows into an SQL `INT8` parameter.
fn int8(n: impl TryInto<i64>) -> i64 {
    n.try_into().unwrap_or(i64::MAX)
}

/// Orders the `found` entities in the same way as their `ids` go, skipping
/// the missing ones.
fn ordered<Id: Eq + Hash, T>(ids: &[Id], mut found: HashMap<Id, T>) -> Vec<T> {
    ids.iter().filter_map(|id| found.remove(id)).collect()
}

impl Database<Transact> for Postgres<NonTx> {
    type Ok = Postgres<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(Postgres(Tx::from_non_tx(self.0.clone())))
    }
}

impl Database<Transact> for Postgres<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Postgres<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.commit().await.map_err(tracerr::wrap!())
    }
}

#[async_trait]
impl AsyncTransaction for Postgres {
    type Error = Traced<database::Error>;

    async fn execute(
        &mut self,
        queries: &[&str],
    ) -> Result<usize, Self::Error> {
        let mut conn = self
            .0
            .pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)?;
        AsyncTransaction::execute(&mut **conn, queries)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

#[async_trait]
impl AsyncQuery<Vec<Migration>> for Postgres {
    async fn query(
        &mut self,
        query: &str,
    ) -> Result<Vec<Migration>, <Self as AsyncTransaction>::Error> {
        let mut conn = self
            .0
            .pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)?;
        AsyncQuery::query(&mut **conn, query)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

impl AsyncMigrate for Postgres {}
