//! [`Query`] collection related to a single [`Invoice`].

use common::{
    operations::{By, Select},
    DateTime,
};
use tracerr::Traced;

use crate::{
    domain::{invoice, Invoice},
    infra::{database, Database},
    Query, Service,
};

/// Queries an [`Invoice`] by its [`invoice::Id`], reporting its effective
/// [`invoice::Status`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ById(pub invoice::Id);

impl<Db> Query<ById> for Service<Db>
where
    Db: Database<
        Select<By<Option<Invoice>, invoice::Id>>,
        Ok = Option<Invoice>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Invoice>;
    type Err = Traced<database::Error>;

    async fn execute(&self, ById(id): ById) -> Result<Self::Ok, Self::Err> {
        let now = DateTime::now();
        Ok(self
            .database()
            .execute(Select(By::new(id)))
            .await
            .map_err(tracerr::wrap!())?
            .map(|i| i.classify(now)))
    }
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{
        command::double::Memory,
        domain::invoice::{self, Status},
        Query as _,
    };

    use super::ById;

    #[tokio::test]
    async fn reports_overdue_sent_invoice() {
        let service = Memory::service();
        let inv = service.database().invoice(Status::Sent, "10");
        if let Some(stored) =
            service.database().state().invoices.get_mut(&inv.id)
        {
            stored.due_date = DateTime::parse("2024-03-10").unwrap().coerce();
        }

        let found = service.execute(ById(inv.id)).await.unwrap().unwrap();

        assert_eq!(found.status, Status::Overdue);
    }

    #[tokio::test]
    async fn paid_invoice_is_never_overdue() {
        let service = Memory::service();
        let inv = service.database().invoice(Status::Paid, "10");

        let found = service.execute(ById(inv.id)).await.unwrap().unwrap();

        assert_eq!(found.status, Status::Paid);
        assert!(service
            .execute(ById(invoice::Id::new()))
            .await
            .unwrap()
            .is_none());
    }
}
