//! Carts service.
//!
//! Every mutation follows the same shape: lock the identity's open cart,
//! change the line items, then rewrite the denormalised totals through
//! [`decanter::cart::recalculate`] before committing. The row lock
//! serialises writers per cart, so the stored totals always match the item
//! set a reader observes.

use async_trait::async_trait;
use decanter::cart::{CartError, LineItem, Quantity, Totals, recalculate};
use decanter::catalog::{EntityKey, EntityKind, EntityRef, Sellable};
use mockall::automock;
use sqlx::{Postgres, Transaction};
use tracing::debug;

use crate::{
    database::Db,
    domain::{
        carts::{
            errors::CartsServiceError,
            models::{CartIdentity, CartItemRecord, CartItemUuid, CartRecord, CartUuid},
            repositories::{PgCartItemsRepository, PgCartsRepository},
        },
        catalog::PgCatalogRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgCartsService {
    db: Db,
    carts_repository: PgCartsRepository,
    items_repository: PgCartItemsRepository,
    catalog_repository: PgCatalogRepository,
}

impl PgCartsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            carts_repository: PgCartsRepository::new(),
            items_repository: PgCartItemsRepository::new(),
            catalog_repository: PgCatalogRepository::new(),
        }
    }

    /// Insert-if-absent then lock: concurrent callers for the same identity
    /// collapse onto the one open cart row.
    async fn find_or_create_open_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        identity: CartIdentity,
    ) -> Result<CartRecord, sqlx::Error> {
        self.carts_repository
            .create_open_cart(tx, CartUuid::generate(), identity)
            .await?;

        self.carts_repository
            .get_open_cart_for_update(tx, identity)
            .await
    }

    async fn resolve_entity(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        kind: EntityKind,
        key: &EntityKey,
    ) -> Result<Sellable, CartsServiceError> {
        self.catalog_repository
            .resolve(tx, kind, key)
            .await
            .map_err(|error| match error {
                sqlx::Error::RowNotFound => CartsServiceError::EntityNotFound,
                other => other.into(),
            })
    }

    /// Recompute and persist the cart's totals from its current line items.
    /// The single place the stored totals are written.
    async fn recalculate_totals(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<Totals, CartsServiceError> {
        let items = self.items_repository.get_cart_items(tx, cart).await?;
        let line_items = items
            .iter()
            .map(CartItemRecord::to_line_item)
            .collect::<Result<Vec<_>, _>>()?;

        let totals = recalculate(&line_items)?;

        self.carts_repository
            .update_totals(tx, cart, totals)
            .await
            .map_err(|error| match error {
                sqlx::Error::RowNotFound => CartsServiceError::CartFrozen,
                other => other.into(),
            })?;

        Ok(totals)
    }

    async fn load_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<CartRecord, sqlx::Error> {
        let mut record = self.carts_repository.get_cart(tx, cart).await?;

        let items = self.items_repository.get_cart_items(tx, cart).await?;
        record.items.extend(items);

        Ok(record)
    }
}

#[async_trait]
impl CartsService for PgCartsService {
    async fn resolve_or_create_cart(
        &self,
        identity: CartIdentity,
    ) -> Result<CartRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self.find_or_create_open_cart(&mut tx, identity).await?;
        let cart = self.load_cart(&mut tx, cart.uuid).await?;

        tx.commit().await?;

        Ok(cart)
    }

    async fn get_cart(&self, cart: CartUuid) -> Result<CartRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self.load_cart(&mut tx, cart).await?;

        tx.commit().await?;

        Ok(cart)
    }

    async fn add_to_cart(
        &self,
        identity: CartIdentity,
        kind: EntityKind,
        key: EntityKey,
        quantity: u32,
    ) -> Result<CartRecord, CartsServiceError> {
        let quantity = Quantity::new(quantity)?;

        let mut tx = self.db.begin().await?;

        let cart = self.find_or_create_open_cart(&mut tx, identity).await?;
        let sellable = self.resolve_entity(&mut tx, kind, &key).await?;
        let entity = sellable.entity_ref();

        // Add-or-increment: a second add of the same reference merges into
        // the existing line instead of creating a sibling.
        match self
            .items_repository
            .find_item(&mut tx, cart.uuid, entity)
            .await?
        {
            Some(existing) => {
                let mut item = existing.to_line_item()?;
                let merged = item.quantity.checked_add(quantity)?;
                item.set_quantity(merged)?;

                self.items_repository
                    .update_item_quantity(&mut tx, existing.uuid, merged, item.subtotal)
                    .await?;
            }
            None => {
                let item = LineItem::new(CartItemUuid::generate().into_uuid(), &sellable, quantity)?;

                self.items_repository
                    .create_item(&mut tx, cart.uuid, &item)
                    .await?;
            }
        }

        self.recalculate_totals(&mut tx, cart.uuid).await?;
        let updated = self.load_cart(&mut tx, cart.uuid).await?;

        tx.commit().await?;

        debug!(cart = %updated.uuid, entity = %entity, "item added to cart");

        Ok(updated)
    }

    async fn set_item_quantity(
        &self,
        identity: CartIdentity,
        entity: EntityRef,
        quantity: u32,
    ) -> Result<CartRecord, CartsServiceError> {
        let quantity = Quantity::new(quantity)?;

        let mut tx = self.db.begin().await?;

        let cart = self
            .carts_repository
            .get_open_cart_for_update(&mut tx, identity)
            .await?;

        let existing = self
            .items_repository
            .find_item(&mut tx, cart.uuid, entity)
            .await?
            .ok_or(CartError::ItemNotFound(entity))?;

        let mut item = existing.to_line_item()?;
        item.set_quantity(quantity)?;

        self.items_repository
            .update_item_quantity(&mut tx, existing.uuid, quantity, item.subtotal)
            .await?;

        self.recalculate_totals(&mut tx, cart.uuid).await?;
        let updated = self.load_cart(&mut tx, cart.uuid).await?;

        tx.commit().await?;

        debug!(cart = %updated.uuid, entity = %entity, quantity = quantity.get(), "item quantity changed");

        Ok(updated)
    }

    async fn remove_from_cart(
        &self,
        identity: CartIdentity,
        entity: EntityRef,
    ) -> Result<CartRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self
            .carts_repository
            .get_open_cart_for_update(&mut tx, identity)
            .await?;

        let existing = self
            .items_repository
            .find_item(&mut tx, cart.uuid, entity)
            .await?
            .ok_or(CartError::ItemNotFound(entity))?;

        // Membership goes first; the totals rewrite below never sees the
        // removed line.
        self.items_repository
            .delete_item(&mut tx, existing.uuid)
            .await?;

        self.recalculate_totals(&mut tx, cart.uuid).await?;
        let updated = self.load_cart(&mut tx, cart.uuid).await?;

        tx.commit().await?;

        debug!(cart = %updated.uuid, entity = %entity, "item removed from cart");

        Ok(updated)
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// The identity's open cart, created on first use.
    async fn resolve_or_create_cart(
        &self,
        identity: CartIdentity,
    ) -> Result<CartRecord, CartsServiceError>;

    /// Retrieve a single cart with its line items.
    async fn get_cart(&self, cart: CartUuid) -> Result<CartRecord, CartsServiceError>;

    /// Add an entity to the identity's open cart, incrementing the existing
    /// line for the same reference instead of duplicating it.
    async fn add_to_cart(
        &self,
        identity: CartIdentity,
        kind: EntityKind,
        key: EntityKey,
        quantity: u32,
    ) -> Result<CartRecord, CartsServiceError>;

    /// Set the quantity of an existing cart line.
    async fn set_item_quantity(
        &self,
        identity: CartIdentity,
        entity: EntityRef,
        quantity: u32,
    ) -> Result<CartRecord, CartsServiceError>;

    /// Remove a cart line.
    async fn remove_from_cart(
        &self,
        identity: CartIdentity,
        entity: EntityRef,
    ) -> Result<CartRecord, CartsServiceError>;
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::carts::models::SessionUuid,
        test::{TestContext, helpers::create_product},
    };

    use super::*;

    fn session_identity() -> CartIdentity {
        CartIdentity::Anonymous(SessionUuid::generate())
    }

    #[tokio::test]
    async fn resolve_or_create_cart_reuses_the_open_cart() {
        let ctx = TestContext::new().await;
        let identity = session_identity();

        let first = ctx
            .carts
            .resolve_or_create_cart(identity)
            .await
            .expect("first resolution should succeed");
        let second = ctx
            .carts
            .resolve_or_create_cart(identity)
            .await
            .expect("second resolution should succeed");

        assert_eq!(first.uuid, second.uuid);
        assert_eq!(second.final_price, 0);
        assert_eq!(second.item_count, 0);
        assert!(second.items.is_empty());
    }

    #[tokio::test]
    async fn concurrent_resolutions_collapse_onto_one_cart() {
        let ctx = TestContext::new().await;
        let identity = session_identity();

        let (left, right) = tokio::join!(
            ctx.carts.resolve_or_create_cart(identity),
            ctx.carts.resolve_or_create_cart(identity),
        );

        let left = left.expect("left resolution should succeed");
        let right = right.expect("right resolution should succeed");

        assert_eq!(left.uuid, right.uuid);
    }

    #[tokio::test]
    async fn repeat_adds_merge_into_one_line() {
        let ctx = TestContext::new().await;
        let identity = session_identity();
        let product = create_product(&ctx, "rioja-reserva", 12_50, 9).await;

        ctx.carts
            .add_to_cart(
                identity,
                EntityKind::Product,
                EntityKey::Slug(product.slug.clone()),
                2,
            )
            .await
            .expect("first add should succeed");

        let cart = ctx
            .carts
            .add_to_cart(
                identity,
                EntityKind::Product,
                EntityKey::Id(product.uuid.into_uuid()),
                3,
            )
            .await
            .expect("second add should succeed");

        assert_eq!(cart.items.len(), 1, "expected one merged line");
        let line = cart.items.first().expect("cart should have a line");
        assert_eq!(line.quantity, 5);
        assert_eq!(line.subtotal, 62_50);
        assert_eq!(cart.final_price, 62_50);
        assert_eq!(cart.item_count, 5);
    }

    #[tokio::test]
    async fn concurrent_adds_serialise_on_the_cart_row() {
        let ctx = TestContext::new().await;
        let identity = session_identity();
        let product = create_product(&ctx, "pinot-noir", 20_00, 9).await;

        let (left, right) = tokio::join!(
            ctx.carts.add_to_cart(
                identity,
                EntityKind::Product,
                EntityKey::Slug(product.slug.clone()),
                1,
            ),
            ctx.carts.add_to_cart(
                identity,
                EntityKind::Product,
                EntityKey::Slug(product.slug.clone()),
                1,
            ),
        );

        left.expect("left add should succeed");
        right.expect("right add should succeed");

        let cart = ctx
            .carts
            .resolve_or_create_cart(identity)
            .await
            .expect("resolution should succeed");

        assert_eq!(cart.items.len(), 1, "expected one merged line");
        let line = cart.items.first().expect("cart should have a line");
        assert_eq!(line.quantity, 2);
        assert_eq!(cart.final_price, 40_00);
        assert_eq!(cart.item_count, 2);
    }

    #[tokio::test]
    async fn removing_the_last_line_zeroes_the_stored_totals() {
        let ctx = TestContext::new().await;
        let identity = session_identity();
        let product = create_product(&ctx, "islay-malt", 55_00, 3).await;

        let cart = ctx
            .carts
            .add_to_cart(
                identity,
                EntityKind::Product,
                EntityKey::Slug(product.slug.clone()),
                1,
            )
            .await
            .expect("add should succeed");
        let entity = cart
            .items
            .first()
            .expect("cart should have a line")
            .entity_ref();

        let cart = ctx
            .carts
            .remove_from_cart(identity, entity)
            .await
            .expect("remove should succeed");

        assert!(cart.items.is_empty());
        assert_eq!(cart.final_price, 0);
        assert_eq!(cart.item_count, 0);
    }

    #[tokio::test]
    async fn adding_an_unknown_entity_is_rejected() {
        let ctx = TestContext::new().await;

        let result = ctx
            .carts
            .add_to_cart(
                session_identity(),
                EntityKind::Product,
                EntityKey::Slug("no-such-bottle".to_string()),
                1,
            )
            .await;

        assert!(
            matches!(result, Err(CartsServiceError::EntityNotFound)),
            "expected EntityNotFound, got {result:?}"
        );
    }
}
