//! Domain definitions.

pub mod client;
pub mod email;
pub mod finance;
pub mod invoice;
pub mod item;
pub mod material;
pub mod numbering;
pub mod project;
pub mod quote;
pub mod status;
pub mod text;
pub mod user;

pub use self::{
    client::Client,
    email::Email,
    invoice::Invoice,
    material::Material,
    project::{Project, ProjectMaterial},
    quote::Quote,
    user::User,
};
