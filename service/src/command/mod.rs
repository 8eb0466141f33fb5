//! [`Command`] definition.

pub mod add_project_material;
pub mod adjust_material_stock;
pub mod authorize_user_session;
pub mod change_invoice_status;
pub mod change_quote_status;
pub mod create_client;
pub mod create_invoice;
pub mod create_material;
pub mod create_project;
pub mod create_quote;
pub mod create_user_session;
pub mod delete_client;
pub mod delete_invoice;
pub mod delete_material;
pub mod delete_project;
pub mod delete_quote;
pub mod delete_user;
#[cfg(test)]
pub(crate) mod double;
pub mod register_user;
pub mod set_user_activity;
pub mod update_client;
pub mod update_invoice;
pub mod update_material;
pub mod update_project;
pub mod update_quote;
pub mod update_user;
pub mod update_user_password;
pub mod update_user_profile;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    add_project_material::AddProjectMaterial,
    adjust_material_stock::AdjustMaterialStock,
    authorize_user_session::AuthorizeUserSession,
    change_invoice_status::ChangeInvoiceStatus,
    change_quote_status::ChangeQuoteStatus, create_client::CreateClient,
    create_invoice::CreateInvoice, create_material::CreateMaterial,
    create_project::CreateProject, create_quote::CreateQuote,
    create_user_session::CreateUserSession, delete_client::DeleteClient,
    delete_invoice::DeleteInvoice, delete_material::DeleteMaterial,
    delete_project::DeleteProject, delete_quote::DeleteQuote,
    delete_user::DeleteUser, register_user::RegisterUser,
    set_user_activity::SetUserActivity, update_client::UpdateClient,
    update_invoice::UpdateInvoice, update_material::UpdateMaterial,
    update_project::UpdateProject, update_quote::UpdateQuote,
    update_user::UpdateUser, update_user_password::UpdateUserPassword,
    update_user_profile::UpdateUserProfile,
};
