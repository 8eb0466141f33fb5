//! Report [`Query`] collection.
//!
//! Every report selects the entities matching its filter and aggregates
//! them into a `summary` accompanied by per-entity rows.
//!
//! [`Query`]: crate::Query

pub mod clients;
pub mod financial;
pub mod materials;
pub mod projects;
pub mod quotes;

pub use self::{
    clients::Clients, financial::Financial, materials::Materials,
    projects::Projects, quotes::Quotes,
};
