//! [`Command`] for planning a [`Material`] usage in a [`Project`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime, Money, Quantity,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        material,
        project::{self, material as project_material},
        text::Text,
        Material, Project, ProjectMaterial,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for planning a [`Material`] usage in a [`Project`].
#[derive(Clone, Debug)]
pub struct AddProjectMaterial {
    /// ID of the [`Project`] the [`Material`] is planned for.
    pub project_id: project::Id,

    /// ID of the planned [`Material`].
    pub material_id: material::Id,

    /// Planned [`Quantity`] of the [`Material`]. Must not be zero.
    pub quantity_planned: Quantity,

    /// Already used [`Quantity`] of the [`Material`].
    pub quantity_used: Option<Quantity>,

    /// Agreed price per unit.
    ///
    /// The current [`Material`] price is used if [`None`].
    pub unit_price: Option<Money>,

    /// Supply [`project_material::Status`].
    pub status: Option<project_material::Status>,

    /// Expected delivery to the construction site.
    pub delivery_date: Option<project_material::DeliveryDateTime>,

    /// Free-form notes.
    pub notes: Option<Text>,
}

impl<Db> Command<AddProjectMaterial> for Service<Db>
where
    Db: Database<
            Select<By<Option<Project>, project::Id>>,
            Ok = Option<Project>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Material>, material::Id>>,
            Ok = Option<Material>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Insert<ProjectMaterial>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = ProjectMaterial;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AddProjectMaterial,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AddProjectMaterial {
            project_id,
            material_id,
            quantity_planned,
            quantity_used,
            unit_price,
            status,
            delivery_date,
            notes,
        } = cmd;

        if quantity_planned.is_zero() {
            return Err(tracerr::new!(E::ZeroQuantity));
        }

        drop(
            self.database()
                .execute(Select(By::<Option<Project>, _>::new(project_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::ProjectNotExists(project_id))
                .map_err(tracerr::wrap!())?,
        );
        let material = self
            .database()
            .execute(Select(By::<Option<Material>, _>::new(material_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::MaterialNotExists(material_id))
            .map_err(tracerr::wrap!())?;

        let unit_price = unit_price.unwrap_or(material.unit_price);
        if unit_price.is_negative() {
            return Err(tracerr::new!(E::CostOutOfRange));
        }
        let total_cost = ProjectMaterial::cost(quantity_planned, unit_price)
            .ok_or(E::CostOutOfRange)
            .map_err(tracerr::wrap!())?;
        let now = DateTime::now();
        let planned = ProjectMaterial {
            id: project_material::Id::new(),
            project_id,
            material_id,
            quantity_planned,
            quantity_used: quantity_used.unwrap_or(Quantity::ZERO),
            unit_price,
            total_cost,
            status: status.unwrap_or_default(),
            delivery_date,
            notes,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(planned.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(planned)
    }
}

/// Error of [`AddProjectMaterial`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Negative unit price, or the total cost doesn't fit into
    /// [`Money::LIMIT`].
    #[display("Total cost is out of range")]
    #[from(ignore)]
    CostOutOfRange,

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Material`] doesn't exist.
    #[display("`Material(id: {_0})` does not exist")]
    #[from(ignore)]
    MaterialNotExists(#[error(not(source))] material::Id),

    /// [`Project`] doesn't exist.
    #[display("`Project(id: {_0})` does not exist")]
    #[from(ignore)]
    ProjectNotExists(#[error(not(source))] project::Id),

    /// Zero [`Quantity`] planned.
    #[display("Planned quantity must be greater than zero")]
    #[from(ignore)]
    ZeroQuantity,
}
