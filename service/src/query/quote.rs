//! [`Query`] collection related to a single [`Quote`].

use common::{
    operations::{By, Select},
    DateTime,
};
use tracerr::Traced;

use crate::{
    domain::{quote, Quote},
    infra::{database, Database},
    Query, Service,
};

/// Queries a [`Quote`] by its [`quote::Id`], reporting its effective
/// [`quote::Status`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ById(pub quote::Id);

impl<Db> Query<ById> for Service<Db>
where
    Db: Database<
        Select<By<Option<Quote>, quote::Id>>,
        Ok = Option<Quote>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Quote>;
    type Err = Traced<database::Error>;

    async fn execute(&self, ById(id): ById) -> Result<Self::Ok, Self::Err> {
        let now = DateTime::now();
        Ok(self
            .database()
            .execute(Select(By::new(id)))
            .await
            .map_err(tracerr::wrap!())?
            .map(|q| q.classify(now)))
    }
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{
        command::double::Memory,
        domain::quote::{self, Status},
        Query as _,
    };

    use super::ById;

    #[tokio::test]
    async fn reports_expired_sent_quote() {
        let service = Memory::service();
        let q = service.database().quote(Status::Sent, "10");
        if let Some(stored) = service.database().state().quotes.get_mut(&q.id)
        {
            stored.valid_until =
                Some(DateTime::parse("2024-03-10").unwrap().coerce());
        }

        let found = service.execute(ById(q.id)).await.unwrap().unwrap();

        assert_eq!(found.status, Status::Expired);
        assert_eq!(
            service.database().state().quotes[&q.id].status,
            Status::Sent,
        );
    }

    #[tokio::test]
    async fn missing_quote() {
        let service = Memory::service();

        let found = service.execute(ById(quote::Id::new())).await.unwrap();

        assert!(found.is_none());
    }
}
