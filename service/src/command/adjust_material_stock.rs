//! [`Command`] for adjusting a stock of a [`Material`].

use common::{
    operations::{Adjust, By, Select},
    DateTime, Quantity,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        material::{self, Movement, StockAdjustment},
        text::Text,
        Material,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for adjusting a stock of a [`Material`].
///
/// The stock never goes negative: an outgoing [`Movement`] exceeding it is
/// rejected and leaves the stock untouched.
#[derive(Clone, Debug)]
pub struct AdjustMaterialStock {
    /// ID of the [`Material`] to adjust the stock of.
    pub material_id: material::Id,

    /// Direction of the stock [`Movement`].
    pub movement: Movement,

    /// Moved [`Quantity`]. Must not be zero.
    pub quantity: Quantity,

    /// Reason of the adjustment, logged only.
    pub reason: Option<Text>,
}

impl<Db> Command<AdjustMaterialStock> for Service<Db>
where
    Db: Database<
            Select<By<Option<Material>, material::Id>>,
            Ok = Option<Material>,
            Err = Traced<database::Error>,
        > + Database<
            Adjust<StockAdjustment>,
            Ok = Option<Quantity>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Material;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AdjustMaterialStock,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AdjustMaterialStock {
            material_id,
            movement,
            quantity,
            reason,
        } = cmd;

        if quantity.is_zero() {
            return Err(tracerr::new!(E::ZeroQuantity));
        }

        let mut material = self
            .database()
            .execute(Select(By::<Option<Material>, _>::new(material_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::MaterialNotExists(material_id))
            .map_err(tracerr::wrap!())?;

        let Some(stock) = self
            .database()
            .execute(Adjust(StockAdjustment {
                material_id,
                movement,
                quantity,
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        else {
            // The `Material` may have been deleted since it was read.
            let available = self
                .database()
                .execute(Select(By::<Option<Material>, _>::new(material_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::MaterialNotExists(material_id))
                .map_err(tracerr::wrap!())?
                .stock;
            return Err(tracerr::new!(E::InsufficientStock {
                available,
                requested: quantity,
            }));
        };

        log::info!(
            material_id = %material_id,
            movement = %movement,
            quantity = %quantity,
            stock = %stock,
            reason = reason.as_ref().map_or("", AsRef::as_ref),
            "`Material` stock adjusted",
        );

        material.stock = stock;
        material.updated_at = DateTime::now().coerce();
        Ok(material)
    }
}

/// Error of [`AdjustMaterialStock`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Outgoing [`Quantity`] exceeds the available stock.
    #[display(
        "Insufficient stock: {available} available, {requested} requested"
    )]
    #[from(ignore)]
    InsufficientStock {
        /// [`Quantity`] available in stock.
        available: Quantity,

        /// Requested outgoing [`Quantity`].
        requested: Quantity,
    },

    /// [`Material`] doesn't exist.
    #[display("`Material(id: {_0})` does not exist")]
    #[from(ignore)]
    MaterialNotExists(#[error(not(source))] material::Id),

    /// Zero [`Quantity`] provided.
    #[display("Quantity must be greater than zero")]
    #[from(ignore)]
    ZeroQuantity,
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{Adjust, By, Select},
        DateTime, Quantity,
    };
    use tracerr::Traced;

    use crate::{
        command::{
            double::{config, Memory},
            Command as _,
        },
        domain::{
            material::{self, Movement, StockAdjustment},
            Material,
        },
        infra::{database, Database},
        Service,
    };

    use super::{AdjustMaterialStock, ExecutionError};

    /// [`Memory`] deleting the adjusted [`Material`] right before adjusting
    /// its stock.
    #[derive(Clone, Debug, Default)]
    struct Vanishing(Memory);

    impl Database<Select<By<Option<Material>, material::Id>>> for Vanishing {
        type Ok = Option<Material>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            op: Select<By<Option<Material>, material::Id>>,
        ) -> Result<Self::Ok, Self::Err> {
            self.0.execute(op).await
        }
    }

    impl Database<Adjust<StockAdjustment>> for Vanishing {
        type Ok = Option<Quantity>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Adjust(adjustment): Adjust<StockAdjustment>,
        ) -> Result<Self::Ok, Self::Err> {
            if let Some(m) =
                self.0.state().materials.get_mut(&adjustment.material_id)
            {
                m.deleted_at = Some(DateTime::now().coerce());
            }
            self.0.execute(Adjust(adjustment)).await
        }
    }

    fn qty(q: &str) -> Quantity {
        q.parse().unwrap()
    }

    #[tokio::test]
    async fn incoming_adds_to_stock() {
        let service = Memory::service();
        let material = service.database().material("10");

        let adjusted = service
            .execute(AdjustMaterialStock {
                material_id: material.id,
                movement: Movement::In,
                quantity: qty("2.5"),
                reason: None,
            })
            .await
            .unwrap();

        assert_eq!(adjusted.stock, qty("12.5"));
        assert_eq!(
            service.database().state().materials[&material.id].stock,
            qty("12.5"),
        );
    }

    #[tokio::test]
    async fn outgoing_may_empty_stock() {
        let service = Memory::service();
        let material = service.database().material("10");

        let adjusted = service
            .execute(AdjustMaterialStock {
                material_id: material.id,
                movement: Movement::Out,
                quantity: qty("10"),
                reason: None,
            })
            .await
            .unwrap();

        assert_eq!(adjusted.stock, Quantity::ZERO);
    }

    #[tokio::test]
    async fn never_goes_negative() {
        let service = Memory::service();
        let material = service.database().material("10");

        let err = service
            .execute(AdjustMaterialStock {
                material_id: material.id,
                movement: Movement::Out,
                quantity: qty("10.01"),
                reason: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::InsufficientStock { .. },
        ));
        assert_eq!(
            service.database().state().materials[&material.id].stock,
            qty("10"),
        );
    }

    #[tokio::test]
    async fn rejects_zero_quantity() {
        let service = Memory::service();
        let material = service.database().material("10");

        let err = service
            .execute(AdjustMaterialStock {
                material_id: material.id,
                movement: Movement::In,
                quantity: Quantity::ZERO,
                reason: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::ZeroQuantity));
    }

    #[tokio::test]
    async fn reports_material_deleted_meanwhile() {
        let db = Vanishing::default();
        let material = db.0.material("10");
        let service = Service::new(config(), db);

        let err = service
            .execute(AdjustMaterialStock {
                material_id: material.id,
                movement: Movement::Out,
                quantity: qty("1"),
                reason: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::MaterialNotExists(id) if *id == material.id,
        ));
    }
}
