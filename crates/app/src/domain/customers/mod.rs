//! Customers

pub mod errors;
pub mod models;
pub(crate) mod repositories;
pub mod service;

pub use errors::CustomersServiceError;
pub use service::*;
