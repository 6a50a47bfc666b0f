//! Catalog entities and the polymorphic resolution seam.
//!
//! Carts never hold foreign keys into a concrete catalog table. They hold an
//! [`EntityRef`], a `(kind, id)` pair, and go through a [`Resolver`] to
//! reach the concrete entity. New sellable kinds become new [`EntityKind`]
//! and [`Sellable`] variants; the cart code stays untouched.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::price::Price;

/// Errors from resolving a catalog reference.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// No entity of the requested kind matches the key.
    #[error("no {kind} found for {key}")]
    NotFound {
        /// The kind that was looked up.
        kind: EntityKind,
        /// The key that did not match.
        key: EntityKey,
    },

    /// The kind tag was not one of the known sellable kinds.
    #[error("unknown entity kind {0:?}")]
    UnknownKind(String),
}

/// The kind tag of a sellable catalog entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A drinks product.
    Product,
}

impl EntityKind {
    /// The stable tag stored alongside entity ids.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(Self::Product),
            other => Err(ResolveError::UnknownKind(other.to_string())),
        }
    }
}

/// A polymorphic reference to a sellable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Which catalog table the id points into.
    pub kind: EntityKind,
    /// The entity's id within that table.
    pub id: Uuid,
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A lookup key presented at the boundary: detail pages address entities by
/// slug, internal references by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// Lookup by stable numeric id.
    Id(Uuid),
    /// Lookup by URL slug.
    Slug(String),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Slug(slug) => write!(f, "slug {slug:?}"),
        }
    }
}

/// A drinks product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Stable id.
    pub id: Uuid,
    /// Unique URL slug.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Brand name, when the product carries one.
    pub brand: Option<String>,
    /// Unit price in minor units.
    pub price: Price,
    /// Units currently on hand.
    pub stock: u32,
}

impl Product {
    /// Whether at least one unit is on hand.
    pub fn is_in_stock(&self) -> bool {
        self.stock > 0
    }

    /// The polymorphic reference pointing at this product.
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef {
            kind: EntityKind::Product,
            id: self.id,
        }
    }
}

/// A concrete sellable entity, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sellable {
    /// A drinks product.
    Product(Product),
}

impl Sellable {
    /// The kind tag of the wrapped entity.
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Product(_) => EntityKind::Product,
        }
    }

    /// The wrapped entity's id.
    pub fn id(&self) -> Uuid {
        match self {
            Self::Product(product) => product.id,
        }
    }

    /// The polymorphic reference pointing at the wrapped entity.
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef {
            kind: self.kind(),
            id: self.id(),
        }
    }

    /// The wrapped entity's URL slug.
    pub fn slug(&self) -> &str {
        match self {
            Self::Product(product) => &product.slug,
        }
    }

    /// The name shown on cart lines: the product name, joined with the brand
    /// when one is set.
    pub fn display_name(&self) -> String {
        match self {
            Self::Product(product) => match &product.brand {
                Some(brand) => format!("{}-{brand}", product.name),
                None => product.name.clone(),
            },
        }
    }

    /// Unit price in minor units.
    pub fn unit_price(&self) -> Price {
        match self {
            Self::Product(product) => product.price,
        }
    }

    /// Whether the wrapped entity is currently in stock.
    pub fn is_in_stock(&self) -> bool {
        match self {
            Self::Product(product) => product.is_in_stock(),
        }
    }
}

/// The single seam where a kind tag is dispatched to a concrete lookup.
///
/// The cart does not know which concrete entity types exist; everything it
/// needs goes through this trait.
pub trait Resolver {
    /// Resolve a `(kind, key)` pair to a concrete sellable entity.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] when nothing matches.
    fn resolve(&self, kind: EntityKind, key: &EntityKey) -> Result<Sellable, ResolveError>;
}

/// A gallery image attached to a catalog entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Where the image is served from.
    pub url: String,
    /// Whether the image participates in the detail-page slider.
    pub use_in_slider: bool,
}

/// Read interface over gallery attachments keyed by `(owner kind, owner id)`.
pub trait ImageSource {
    /// Images attached to the given entity, in display order.
    fn images_for(&self, entity: &EntityRef) -> Vec<Image>;
}

/// An in-memory catalog, resolvable by id or slug.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    products: Vec<Product>,
}

impl CatalogIndex {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a product, keyed by id.
    pub fn insert(&mut self, product: Product) {
        self.products.retain(|existing| existing.id != product.id);
        self.products.push(product);
    }

    /// Look up a product by id.
    pub fn product(&self, id: Uuid) -> Option<&Product> {
        self.products.iter().find(|product| product.id == id)
    }
}

impl Resolver for CatalogIndex {
    fn resolve(&self, kind: EntityKind, key: &EntityKey) -> Result<Sellable, ResolveError> {
        match kind {
            EntityKind::Product => self
                .products
                .iter()
                .find(|product| match key {
                    EntityKey::Id(id) => product.id == *id,
                    EntityKey::Slug(slug) => product.slug == *slug,
                })
                .cloned()
                .map(Sellable::Product)
                .ok_or_else(|| ResolveError::NotFound {
                    kind,
                    key: key.clone(),
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn rioja() -> Product {
        Product {
            id: Uuid::now_v7(),
            slug: "rioja-reserva".to_string(),
            name: "Rioja Reserva".to_string(),
            brand: Some("Vina Alta".to_string()),
            price: 12_50,
            stock: 4,
        }
    }

    #[test]
    fn kind_round_trips_through_its_tag() -> TestResult {
        let kind: EntityKind = EntityKind::Product.as_str().parse()?;

        assert_eq!(kind, EntityKind::Product);

        Ok(())
    }

    #[test]
    fn unknown_kind_tag_is_rejected() {
        let result = "banner".parse::<EntityKind>();

        assert!(
            matches!(result, Err(ResolveError::UnknownKind(tag)) if tag == "banner"),
            "expected UnknownKind"
        );
    }

    #[test]
    fn resolves_by_id_and_by_slug() -> TestResult {
        let product = rioja();
        let mut catalog = CatalogIndex::new();
        catalog.insert(product.clone());

        let by_id = catalog.resolve(EntityKind::Product, &EntityKey::Id(product.id))?;
        let by_slug = catalog.resolve(
            EntityKind::Product,
            &EntityKey::Slug("rioja-reserva".to_string()),
        )?;

        assert_eq!(by_id, Sellable::Product(product.clone()));
        assert_eq!(by_id, by_slug);

        Ok(())
    }

    #[test]
    fn missing_entity_resolves_to_not_found() {
        let catalog = CatalogIndex::new();

        let result = catalog.resolve(
            EntityKind::Product,
            &EntityKey::Slug("no-such-bottle".to_string()),
        );

        assert!(
            matches!(result, Err(ResolveError::NotFound { .. })),
            "expected NotFound, got {result:?}"
        );
    }

    #[test]
    fn insert_replaces_an_existing_product() {
        let mut product = rioja();
        let mut catalog = CatalogIndex::new();
        catalog.insert(product.clone());

        product.price = 14_00;
        catalog.insert(product.clone());

        assert_eq!(catalog.product(product.id).map(|p| p.price), Some(14_00));
    }

    #[test]
    fn display_name_joins_brand_when_present() {
        let branded = Sellable::Product(rioja());
        let mut plain = rioja();
        plain.brand = None;

        assert_eq!(branded.display_name(), "Rioja Reserva-Vina Alta");
        assert_eq!(Sellable::Product(plain).display_name(), "Rioja Reserva");
    }

    #[test]
    fn stock_flag_follows_units_on_hand() {
        let mut product = rioja();

        assert!(product.is_in_stock());

        product.stock = 0;

        assert!(!product.is_in_stock());
    }
}
