//! Decanter Domain Concerns

pub mod carts;
pub mod catalog;
pub mod customers;
pub mod notifications;
pub mod orders;

pub(crate) mod rows;
