//! Decanter
//!
//! Decanter is the domain engine for an online drinks storefront: catalog
//! entity resolution, shopping-cart aggregation and recalculation, checkout
//! materialisation and back-in-stock notifications.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod price;
pub mod wishlist;

pub use price::Price;
