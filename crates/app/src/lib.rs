//! Shared application domain and persistence modules for the Decanter
//! storefront.

pub mod context;
pub mod database;
pub mod domain;

#[cfg(test)]
mod test;

mod uuids;

pub use uuids::TypedUuid;
