//! [`Query`] collection related to the multiple [`Invoice`]s.

use common::{
    operations::{By, Select},
    DateTime,
};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{invoice, Invoice};
use crate::{
    infra::{database, Database},
    read, Query, Service,
};

use super::DatabaseQuery;

/// Queries a list of [`Invoice`]s, reporting their effective
/// [`invoice::Status`]es.
#[derive(Clone, Debug)]
pub struct List(pub read::invoice::list::Selector);

impl<Db> Query<List> for Service<Db>
where
    Db: Database<
        Select<By<read::invoice::list::Page, read::invoice::list::Selector>>,
        Ok = read::invoice::list::Page,
        Err = Traced<database::Error>,
    >,
{
    type Ok = read::invoice::list::Page;
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
            .map(|i| i.classify(now)))
    }
}

/// Queries [`read::invoice::Stats`] counting the monthly ones since the
/// provided [`DateTime`].
pub type Stats = DatabaseQuery<By<read::invoice::Stats, DateTime>>;
