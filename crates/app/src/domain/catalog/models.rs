//! Catalog Models

use decanter::catalog::{EntityKind, Image, Product};
use jiff::Timestamp;
use uuid::Uuid;

use crate::domain::customers::models::CustomerUuid;
use crate::uuids::TypedUuid;

/// Product UUID
pub type ProductUuid = TypedUuid<ProductRecord>;

/// Product Record
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub uuid: ProductUuid,
    pub slug: String,
    pub name: String,
    pub brand: Option<String>,
    pub price: u64,
    pub stock: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProductRecord {
    /// View of this record as the core catalog entity.
    #[must_use]
    pub fn to_product(&self) -> Product {
        Product {
            id: self.uuid.into_uuid(),
            slug: self.slug.clone(),
            name: self.name.clone(),
            brand: self.brand.clone(),
            price: self.price,
            stock: self.stock,
        }
    }
}

/// New Product Model
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub uuid: ProductUuid,
    pub slug: String,
    pub name: String,
    pub brand: Option<String>,
    pub price: u64,
    pub stock: u32,
}

/// Image Record, a gallery attachment keyed by `(owner kind, owner id)`.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub uuid: Uuid,
    pub owner_kind: EntityKind,
    pub owner_uuid: Uuid,
    pub url: String,
    pub use_in_slider: bool,
    pub sort_order: i32,
}

impl ImageRecord {
    #[must_use]
    pub fn to_image(&self) -> Image {
        Image {
            url: self.url.clone(),
            use_in_slider: self.use_in_slider,
        }
    }
}

/// Outcome of a stock update: the updated product plus the customers
/// notified because the update crossed the back-in-stock edge.
#[derive(Debug, Clone)]
pub struct StockUpdateOutcome {
    pub product: ProductRecord,
    pub notified: Vec<CustomerUuid>,
}
