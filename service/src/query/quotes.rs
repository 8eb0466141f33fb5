//! [`Query`] collection related to the multiple [`Quote`]s.

use common::{
    operations::{By, Select},
    DateTime,
};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{quote, Quote};
use crate::{
    infra::{database, Database},
    read, Query, Service,
};

use super::DatabaseQuery;

/// Queries a list of [`Quote`]s, reporting their effective
/// [`quote::Status`]es.
#[derive(Clone, Debug)]
pub struct List(pub read::quote::list::Selector);

impl<Db> Query<List> for Service<Db>
where
    Db: Database<
        Select<By<read::quote::list::Page, read::quote::list::Selector>>,
        Ok = read::quote::list::Page,
        Err = Traced<database::Error>,
    >,
{
    type Ok = read::quote::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        List(selector): List,
    ) -> Result<Self::Ok, Self::Err> {
        let now = DateTime::now();
        Ok(self
            .database()
            .execute(Select(By::new(selector)))
            .await
            .map_err(tracerr::wrap!())?
            .map(|q| q.classify(now)))
    }
}

/// Queries [`read::quote::Stats`] counting the monthly ones since the
/// provided [`DateTime`].
pub type Stats = DatabaseQuery<By<read::quote::Stats, DateTime>>;
