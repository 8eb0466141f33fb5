//! [`Command`] for updating a [`Material`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
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

/// [`Command`] for updating a [`Material`].
///
/// Only the provided fields are updated. Stock is changed via
/// [`AdjustMaterialStock`] only.
///
/// [`AdjustMaterialStock`]: super::AdjustMaterialStock
#[derive(Clone, Debug, Default)]
pub struct UpdateMaterial {
    /// ID of the [`Material`] to update.
    pub material_id: material::Id,

    /// New name.
    pub name: Option<Line>,

    /// New description.
    pub description: Option<Text>,

    /// New category.
    pub category: Option<Line>,

    /// New measurement unit.
    pub unit: Option<Line>,

    /// New price per unit.
    pub unit_price: Option<Money>,

    /// New supplier.
    pub supplier: Option<Line>,

    /// New [`Sku`].
    pub sku: Option<Sku>,

    /// New low stock level.
    pub min_stock: Option<Quantity>,

    /// Whether the [`Material`] should be active.
    pub is_active: Option<bool>,

    /// New notes.
    pub notes: Option<Text>,
}

impl<Db> Command<UpdateMaterial> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Material>, material::Id>>,
            Ok = Option<Material>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<Material>, &'l Sku>>,
            Ok = Option<Material>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Material, material::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<Material>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Material;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateMaterial,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateMaterial {
            material_id,
            name,
            description,
            category,
            unit,
            unit_price,
            supplier,
            sku,
            min_stock,
            is_active,
            notes,
        } = cmd;

        if unit_price.is_some_and(Money::is_negative) {
            return Err(tracerr::new!(E::NegativePrice));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `Material`.
        tx.execute(Lock(By::new(material_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut material = tx
            .execute(Select(By::<Option<Material>, _>::new(material_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::MaterialNotExists(material_id))
            .map_err(tracerr::wrap!())?;

        if let Some(sku) = sku {
            let other = tx
                .execute(Select(By::<Option<Material>, _>::new(&sku)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if other.is_some_and(|m| m.id != material_id) {
                return Err(tracerr::new!(E::SkuOccupied(sku)));
            }
            material.sku = Some(sku);
        }
        if let Some(name) = name {
            material.name = name;
        }
        if let Some(description) = description {
            material.description = Some(description);
        }
        if let Some(category) = category {
            material.category = category;
        }
        if let Some(unit) = unit {
            material.unit = unit;
        }
        if let Some(unit_price) = unit_price {
            material.unit_price = unit_price.round();
        }
        if let Some(supplier) = supplier {
            material.supplier = Some(supplier);
        }
        if let Some(min_stock) = min_stock {
            material.min_stock = min_stock;
        }
        if let Some(is_active) = is_active {
            material.is_active = is_active;
        }
        if let Some(notes) = notes {
            material.notes = Some(notes);
        }
        material.updated_at = DateTime::now().coerce();

        tx.execute(Update(material.clone()))
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
            })?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(material)
    }
}

/// Error of [`UpdateMaterial`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Material`] doesn't exist.
    #[display("`Material(id: {_0})` does not exist")]
    #[from(ignore)]
    MaterialNotExists(#[error(not(source))] material::Id),

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
    use crate::{
        command::{double::Memory, Command as _},
        domain::{material::Sku, text::Line},
    };

    use super::{ExecutionError, UpdateMaterial};

    fn sku(s: &str) -> Sku {
        Sku::new(s).unwrap()
    }

    #[tokio::test]
    async fn rejects_sku_of_another_material() {
        let service = Memory::service();
        let taken = service.database().material("1");
        let material = service.database().material("1");
        service
            .database()
            .state()
            .materials
            .get_mut(&taken.id)
            .unwrap()
            .sku = Some(sku("RB-12"));

        let err = service
            .execute(UpdateMaterial {
                material_id: material.id,
                sku: Some(sku("RB-12")),
                ..UpdateMaterial::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::SkuOccupied(_)));
        assert!(
            service.database().state().materials[&material.id].sku.is_none(),
        );
    }

    #[tokio::test]
    async fn keeps_own_sku() {
        let service = Memory::service();
        let material = service.database().material("1");
        service
            .database()
            .state()
            .materials
            .get_mut(&material.id)
            .unwrap()
            .sku = Some(sku("RB-12"));

        let updated = service
            .execute(UpdateMaterial {
                material_id: material.id,
                name: Some(Line::new("Rebar 12mm").unwrap()),
                sku: Some(sku("RB-12")),
                is_active: Some(false),
                ..UpdateMaterial::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.sku, Some(sku("RB-12")));
        assert!(!updated.is_active);
        assert_eq!(
            service.database().state().materials[&material.id].name,
            Line::new("Rebar 12mm").unwrap(),
        );
    }
}
