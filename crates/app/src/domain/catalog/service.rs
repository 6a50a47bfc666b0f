//! Catalog service.

use async_trait::async_trait;
use decanter::catalog::{EntityKey, EntityKind, EntityRef, Image, Sellable};
use decanter::wishlist::{back_in_stock, restock_notifications};
use mockall::automock;
use tracing::{debug, info};

use crate::{
    database::Db,
    domain::{
        catalog::{
            errors::CatalogServiceError,
            models::{NewProduct, ProductRecord, ProductUuid, StockUpdateOutcome},
            repository::PgCatalogRepository,
        },
        customers::repositories::PgWishlistsRepository,
        notifications::{models::NotificationUuid, repository::PgNotificationsRepository},
    },
};

#[derive(Debug, Clone)]
pub struct PgCatalogService {
    db: Db,
    repository: PgCatalogRepository,
    wishlists: PgWishlistsRepository,
    notifications: PgNotificationsRepository,
}

impl PgCatalogService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgCatalogRepository::new(),
            wishlists: PgWishlistsRepository::new(),
            notifications: PgNotificationsRepository::new(),
        }
    }
}

#[async_trait]
impl CatalogService for PgCatalogService {
    async fn list_products(&self) -> Result<Vec<ProductRecord>, CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let products = self.repository.list_products(&mut tx).await?;

        tx.commit().await?;

        Ok(products)
    }

    async fn get_product(&self, key: EntityKey) -> Result<ProductRecord, CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let product = match &key {
            EntityKey::Id(id) => {
                self.repository
                    .get_product_by_uuid(&mut tx, ProductUuid::from_uuid(*id))
                    .await?
            }
            EntityKey::Slug(slug) => self.repository.get_product_by_slug(&mut tx, slug).await?,
        };

        tx.commit().await?;

        Ok(product)
    }

    async fn create_product(
        &self,
        product: NewProduct,
    ) -> Result<ProductRecord, CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let created = self.repository.create_product(&mut tx, product).await?;

        tx.commit().await?;

        debug!(product = %created.uuid, slug = %created.slug, "product created");

        Ok(created)
    }

    async fn resolve(
        &self,
        kind: EntityKind,
        key: EntityKey,
    ) -> Result<Sellable, CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let sellable = self.repository.resolve(&mut tx, kind, &key).await?;

        tx.commit().await?;

        Ok(sellable)
    }

    async fn images_for(&self, entity: EntityRef) -> Result<Vec<Image>, CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let images = self
            .repository
            .images_for(&mut tx, entity.kind, entity.id)
            .await?;

        tx.commit().await?;

        Ok(images.iter().map(|image| image.to_image()).collect())
    }

    /// Update a product's stock level. When the update crosses the
    /// out-of-stock → in-stock edge, every customer wishing the product is
    /// notified exactly once and the product leaves their wishlist, all in
    /// the same transaction as the stock write.
    async fn update_stock(
        &self,
        product: ProductUuid,
        stock: u32,
    ) -> Result<StockUpdateOutcome, CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let previous = self.repository.get_product_for_update(&mut tx, product).await?;
        let updated = self.repository.update_stock(&mut tx, product, stock).await?;

        let mut notified = Vec::new();
        if back_in_stock(previous.stock, stock) {
            let entity = updated.to_product();
            let wishers = self
                .wishlists
                .customers_wishing(&mut tx, EntityKind::Product, product.into_uuid())
                .await?;

            let recipients = wishers.iter().map(|customer| customer.into_uuid());
            for notification in restock_notifications(&entity, recipients) {
                self.notifications
                    .create_notification(&mut tx, NotificationUuid::generate(), &notification)
                    .await?;
            }

            self.wishlists
                .remove_entity_everywhere(&mut tx, EntityKind::Product, product.into_uuid())
                .await?;

            notified = wishers;
        }

        tx.commit().await?;

        if !notified.is_empty() {
            info!(
                product = %updated.uuid,
                notified = notified.len(),
                "back-in-stock notifications sent"
            );
        }

        Ok(StockUpdateOutcome {
            product: updated,
            notified,
        })
    }
}

#[automock]
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// List every product in the catalog.
    async fn list_products(&self) -> Result<Vec<ProductRecord>, CatalogServiceError>;

    /// Retrieve a single product by id or slug.
    async fn get_product(&self, key: EntityKey) -> Result<ProductRecord, CatalogServiceError>;

    /// Create a new product.
    async fn create_product(
        &self,
        product: NewProduct,
    ) -> Result<ProductRecord, CatalogServiceError>;

    /// Resolve a polymorphic `(kind, key)` reference to a sellable entity.
    async fn resolve(
        &self,
        kind: EntityKind,
        key: EntityKey,
    ) -> Result<Sellable, CatalogServiceError>;

    /// Gallery images attached to the given entity, in display order.
    async fn images_for(&self, entity: EntityRef) -> Result<Vec<Image>, CatalogServiceError>;

    /// Set a product's stock level, firing back-in-stock notifications when
    /// the update brings it back into stock.
    async fn update_stock(
        &self,
        product: ProductUuid,
        stock: u32,
    ) -> Result<StockUpdateOutcome, CatalogServiceError>;
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::{customers::CustomersService, notifications::NotificationsService},
        test::{
            TestContext,
            helpers::{create_product, register_customer},
        },
    };

    use super::*;

    #[tokio::test]
    async fn restocking_notifies_watchers_and_clears_their_wishlists() {
        let ctx = TestContext::new().await;
        let customer = register_customer(&ctx).await;
        let product = create_product(&ctx, "rioja-reserva", 12_50, 0).await;
        let entity = product.to_product().entity_ref();

        ctx.customers
            .add_to_wishlist(customer.uuid, entity)
            .await
            .expect("add_to_wishlist should succeed");

        let outcome = ctx
            .catalog
            .update_stock(product.uuid, 6)
            .await
            .expect("update_stock should succeed");

        assert_eq!(outcome.product.stock, 6);
        assert_eq!(outcome.notified, vec![customer.uuid]);

        let unread = ctx
            .notifications
            .unread(customer.uuid)
            .await
            .expect("unread should succeed");
        assert_eq!(unread.len(), 1);
        let notification = unread.first().expect("a notification should exist");
        assert_eq!(notification.customer_uuid, customer.uuid);
        assert!(
            notification.text.contains("back in stock"),
            "unexpected text: {}",
            notification.text
        );

        let wishlist = ctx
            .customers
            .wishlist(customer.uuid)
            .await
            .expect("wishlist should succeed");
        assert!(wishlist.is_empty(), "wishlist entry should be consumed");
    }

    #[tokio::test]
    async fn restock_notifications_fire_once_per_wish() {
        let ctx = TestContext::new().await;
        let customer = register_customer(&ctx).await;
        let product = create_product(&ctx, "pet-nat", 18_00, 0).await;
        let entity = product.to_product().entity_ref();

        ctx.customers
            .add_to_wishlist(customer.uuid, entity)
            .await
            .expect("add_to_wishlist should succeed");

        let first = ctx
            .catalog
            .update_stock(product.uuid, 3)
            .await
            .expect("first restock should succeed");
        assert_eq!(first.notified.len(), 1);

        // The wish was consumed, so a later sell-out and restock stays
        // silent.
        ctx.catalog
            .update_stock(product.uuid, 0)
            .await
            .expect("sell-out should succeed");
        let second = ctx
            .catalog
            .update_stock(product.uuid, 4)
            .await
            .expect("second restock should succeed");

        assert!(second.notified.is_empty());
        let unread = ctx
            .notifications
            .unread(customer.uuid)
            .await
            .expect("unread should succeed");
        assert_eq!(unread.len(), 1);
    }

    #[tokio::test]
    async fn stock_updates_off_the_edge_notify_nobody() {
        let ctx = TestContext::new().await;
        let customer = register_customer(&ctx).await;
        let product = create_product(&ctx, "amontillado", 22_00, 2).await;
        let entity = product.to_product().entity_ref();

        ctx.customers
            .add_to_wishlist(customer.uuid, entity)
            .await
            .expect("add_to_wishlist should succeed");

        let outcome = ctx
            .catalog
            .update_stock(product.uuid, 7)
            .await
            .expect("update_stock should succeed");

        assert!(outcome.notified.is_empty());

        let wishlist = ctx
            .customers
            .wishlist(customer.uuid)
            .await
            .expect("wishlist should succeed");
        assert!(wishlist.contains(&entity), "wishlist entry should survive");
    }
}
