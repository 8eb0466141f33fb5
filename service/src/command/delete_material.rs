//! [`Command`] for deleting a [`Material`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{material, Material},
    infra::{database, Database},
    read::material::References,
    Service,
};

use super::Command;

/// [`Command`] for (softly) deleting a [`Material`].
///
/// A [`Material`] planned in any project cannot be deleted.
#[derive(Clone, Copy, Debug, From)]
pub struct DeleteMaterial {
    /// ID of the [`Material`] to delete.
    pub material_id: material::Id,
}

impl<Db> Command<DeleteMaterial> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Material>, material::Id>>,
            Ok = Option<Material>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<References, material::Id>>,
            Ok = References,
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
        cmd: DeleteMaterial,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteMaterial { material_id } = cmd;

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

        let References(count) = tx
            .execute(Select(By::<References, _>::new(material_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if count > 0 {
            return Err(tracerr::new!(E::InUse(count)));
        }

        material.deleted_at = Some(DateTime::now().coerce());
        tx.execute(Update(material.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(material)
    }
}

/// Error of [`DeleteMaterial`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Material`] is planned in some projects.
    #[display("`Material` is used in {_0} projects")]
    #[from(ignore)]
    InUse(#[error(not(source))] i64),

    /// [`Material`] doesn't exist.
    #[display("`Material(id: {_0})` does not exist")]
    #[from(ignore)]
    MaterialNotExists(#[error(not(source))] material::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{double::Memory, AddProjectMaterial, Command as _},
        domain::project,
    };

    use super::{DeleteMaterial, ExecutionError};

    #[tokio::test]
    async fn keeps_material_used_by_project() {
        let service = Memory::service();
        let client = service.database().client("Acme", None);
        let project = service
            .database()
            .project(client.id, project::Status::Planning);
        let material = service.database().material("10");
        _ = service
            .execute(AddProjectMaterial {
                project_id: project.id,
                material_id: material.id,
                quantity_planned: "4".parse().unwrap(),
                quantity_used: None,
                unit_price: None,
                status: None,
                delivery_date: None,
                notes: None,
            })
            .await
            .unwrap();

        let err = service
            .execute(DeleteMaterial { material_id: material.id })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InUse(1)));
        assert!(
            service.database().state().materials[&material.id]
                .deleted_at
                .is_none(),
        );
    }

    #[tokio::test]
    async fn soft_deletes_unused_material() {
        let service = Memory::service();
        let material = service.database().material("10");

        let deleted = service
            .execute(DeleteMaterial { material_id: material.id })
            .await
            .unwrap();

        assert!(deleted.deleted_at.is_some());
        assert!(
            service.database().state().materials[&material.id]
                .deleted_at
                .is_some(),
        );
    }

    #[tokio::test]
    async fn fails_on_unknown_material() {
        let service = Memory::service();

        let err = service
            .execute(DeleteMaterial {
                material_id: crate::domain::material::Id::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::MaterialNotExists(_),
        ));
    }
}
