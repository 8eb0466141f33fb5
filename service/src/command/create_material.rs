//! [`Command`] for creating a new [`Material`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime, Money, Quantity,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        material::{self, Sku},
        text::{Line, Text},
        Material,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Material`].
#[derive(Clone, Debug)]
pub struct CreateMaterial {
    /// Name of the new [`Material`].
    pub name: Line,

    /// Description of the new [`Material`].
    pub description: Option<Text>,

    /// Category of the new [`Material`].
    pub category: Line,

    /// Measurement unit of the new [`Material`].
    pub unit: Line,

    /// Price per unit of the new [`Material`].
    pub unit_price: Money,

    /// Supplier of the new [`Material`].
    pub supplier: Option<Line>,

    /// [`Sku`] of the new [`Material`], unique among the live ones.
    pub sku: Option<Sku>,

    /// Initial stock of the new [`Material`].
    pub stock: Option<Quantity>,

    /// Stock level at which the new [`Material`] is considered low on stock.
    pub min_stock: Option<Quantity>,

    /// Free-form notes.
    pub notes: Option<Text>,
}

impl<Db> Command<CreateMaterial> for Service<Db>
where
    Db: for<'l> Database<
            Select<By<Option<Material>, &'l Sku>>,
            Ok = Option<Material>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<Material>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Material;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateMaterial,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateMaterial {
            name,
            description,
            category,
            unit,
            unit_price,
            supplier,
            sku,
            stock,
            min_stock,
            notes,
        } = cmd;

        if unit_price.is_negative() {
            return Err(tracerr::new!(E::NegativePrice));
        }

        if let Some(sku) = &sku {
            let m = self
                .database()
                .execute(Select(By::new(sku)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if m.is_some() {
                return Err(tracerr::new!(E::SkuOccupied(sku.clone())));
            }
        }

        let now = DateTime::now();
        let material = Material {
            id: material::Id::new(),
            name,
            description,
            category,
            unit,
            unit_price: unit_price.round(),
            supplier,
            sku,
            stock: stock.unwrap_or(Quantity::ZERO),
            min_stock: min_stock.unwrap_or(Quantity::ZERO),
            is_active: true,
            notes,
            created_at: now.coerce(),
            updated_at: now.coerce(),
            deleted_at: None,
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(material.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(|e| match &material.sku {
                Some(sku)
                    if matches!(
                        e.as_ref(),
                        E::Db(db) if db.is_unique_violation("materials_sku_key"),
                    ) =>
                {
                    tracerr::new!(E::SkuOccupied(sku.clone()))
                }
                Some(_) | None => e,
            })
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(material)
    }
}

/// Error of [`CreateMaterial`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Negative unit price provided.
    #[display("Unit price must not be negative")]
    #[from(ignore)]
    NegativePrice,

    /// [`Sku`] is already occupied by another [`Material`].
    #[display("`{_0}` SKU is occupied by another `Material`")]
    #[from(ignore)]
    SkuOccupied(#[error(not(source))] Sku),
}

#[cfg(test)]
mod spec {
    use common::Money;

    use crate::{
        command::{double::Memory, Command as _},
        domain::{material::Sku, text::Line},
    };

    use super::{CreateMaterial, ExecutionError};

    fn rebar(sku: Option<&str>) -> CreateMaterial {
        CreateMaterial {
            name: Line::new("Rebar 12mm").unwrap(),
            description: None,
            category: Line::new("Steel").unwrap(),
            unit: Line::new("m").unwrap(),
            unit_price: "3.205".parse().unwrap(),
            supplier: None,
            sku: sku.map(|s| Sku::new(s).unwrap()),
            stock: None,
            min_stock: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn creates_active_material_with_empty_stock() {
        let service = Memory::service();

        let material = service.execute(rebar(Some("RB-12"))).await.unwrap();

        assert!(material.is_active);
        assert!(material.stock.is_zero());
        assert_eq!(material.unit_price, "3.21".parse::<Money>().unwrap());
        assert!(
            service.database().state().materials.contains_key(&material.id),
        );
    }

    #[tokio::test]
    async fn rejects_occupied_sku() {
        let service = Memory::service();
        _ = service.execute(rebar(Some("RB-12"))).await.unwrap();

        let err = service.execute(rebar(Some("RB-12"))).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::SkuOccupied(_)));
        assert_eq!(service.database().state().materials.len(), 1);
    }

    #[tokio::test]
    async fn allows_many_materials_without_sku() {
        let service = Memory::service();

        _ = service.execute(rebar(None)).await.unwrap();
        _ = service.execute(rebar(None)).await.unwrap();

        assert_eq!(service.database().state().materials.len(), 2);
    }

    #[tokio::test]
    async fn rejects_negative_price() {
        let service = Memory::service();
        let mut cmd = rebar(None);
        cmd.unit_price = "-1".parse().unwrap();

        let err = service.execute(cmd).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NegativePrice));
    }
}
