//! Orders service.

use async_trait::async_trait;
use decanter::checkout::{self, CheckoutError, OrderStatus};
use jiff::Timestamp;
use mockall::automock;
use tracing::info;

use crate::{
    database::Db,
    domain::{
        carts::{
            models::CartIdentity,
            repositories::{PgCartItemsRepository, PgCartsRepository},
        },
        customers::models::CustomerUuid,
        orders::{
            errors::OrdersServiceError,
            models::{NewOrder, OrderRecord, OrderUuid},
            repository::PgOrdersRepository,
        },
    },
};

#[derive(Debug, Clone)]
pub struct PgOrdersService {
    db: Db,
    orders_repository: PgOrdersRepository,
    carts_repository: PgCartsRepository,
    items_repository: PgCartItemsRepository,
}

impl PgOrdersService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            orders_repository: PgOrdersRepository::new(),
            carts_repository: PgCartsRepository::new(),
            items_repository: PgCartItemsRepository::new(),
        }
    }
}

#[async_trait]
impl OrdersService for PgOrdersService {
    async fn place_order(
        &self,
        customer: CustomerUuid,
        order: NewOrder,
    ) -> Result<OrderRecord, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        // Lock the customer's open cart; a concurrent add and checkout
        // serialise here.
        let mut cart_record = self
            .carts_repository
            .get_open_cart_for_update(&mut tx, CartIdentity::Customer(customer))
            .await
            .map_err(|error| match error {
                sqlx::Error::RowNotFound => OrdersServiceError::NoOpenCart,
                other => other.into(),
            })?;

        let items = self
            .items_repository
            .get_cart_items(&mut tx, cart_record.uuid)
            .await?;
        cart_record.items.extend(items);

        let mut cart = cart_record.to_cart()?;
        let placed = checkout::place_order(
            order.uuid.into_uuid(),
            &mut cart,
            customer.into_uuid(),
            order.details,
            Timestamp::now(),
        )?;

        let record = self.orders_repository.create_order(&mut tx, &placed).await?;

        self.carts_repository
            .mark_in_order(&mut tx, cart_record.uuid)
            .await
            .map_err(|error| match error {
                sqlx::Error::RowNotFound => OrdersServiceError::from(CheckoutError::AlreadyPlaced),
                other => other.into(),
            })?;

        tx.commit().await?;

        info!(
            order = %record.uuid,
            customer = %customer,
            cart = %record.cart_uuid,
            final_price = record.final_price,
            "order placed"
        );

        Ok(record)
    }

    async fn get_order(&self, order: OrderUuid) -> Result<OrderRecord, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let record = self.orders_repository.get_order(&mut tx, order).await?;

        tx.commit().await?;

        Ok(record)
    }

    async fn list_orders(
        &self,
        customer: CustomerUuid,
    ) -> Result<Vec<OrderRecord>, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let orders = self
            .orders_repository
            .list_orders_for_customer(&mut tx, customer)
            .await?;

        tx.commit().await?;

        Ok(orders)
    }

    async fn update_status(
        &self,
        order: OrderUuid,
        status: OrderStatus,
    ) -> Result<OrderRecord, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let record = self
            .orders_repository
            .update_status(&mut tx, order, status)
            .await?;

        tx.commit().await?;

        info!(order = %record.uuid, status = %record.status, "order status changed");

        Ok(record)
    }
}

#[automock]
#[async_trait]
pub trait OrdersService: Send + Sync {
    /// Place an order from the customer's open cart, freezing the cart. The
    /// customer's next cart resolution yields a fresh open cart.
    async fn place_order(
        &self,
        customer: CustomerUuid,
        order: NewOrder,
    ) -> Result<OrderRecord, OrdersServiceError>;

    /// Retrieve a single order.
    async fn get_order(&self, order: OrderUuid) -> Result<OrderRecord, OrdersServiceError>;

    /// The customer's orders, newest first.
    async fn list_orders(
        &self,
        customer: CustomerUuid,
    ) -> Result<Vec<OrderRecord>, OrdersServiceError>;

    /// Set an order's administrative status. Any transition is permitted.
    async fn update_status(
        &self,
        order: OrderUuid,
        status: OrderStatus,
    ) -> Result<OrderRecord, OrdersServiceError>;
}

#[cfg(test)]
mod tests {
    use decanter::catalog::{EntityKey, EntityKind};
    use decanter::checkout::{BuyingType, OrderDetails};

    use crate::{
        domain::carts::CartsService,
        test::{
            TestContext,
            helpers::{create_product, register_customer},
        },
    };

    use super::*;

    fn details() -> OrderDetails {
        OrderDetails {
            first_name: "Nina".to_string(),
            last_name: "Petrova".to_string(),
            phone: "+7 900 000 00 00".to_string(),
            address: Some("12 Harbour Lane".to_string()),
            buying_type: BuyingType::Delivery,
            preferred_date: None,
            comment: None,
        }
    }

    #[tokio::test]
    async fn placing_an_order_freezes_the_cart() {
        let ctx = TestContext::new().await;
        let customer = register_customer(&ctx).await;
        let product = create_product(&ctx, "rioja-reserva", 12_50, 9).await;
        let identity = CartIdentity::Customer(customer.uuid);

        let cart = ctx
            .carts
            .add_to_cart(
                identity,
                EntityKind::Product,
                EntityKey::Slug(product.slug.clone()),
                2,
            )
            .await
            .expect("add should succeed");

        let order = ctx
            .orders
            .place_order(
                customer.uuid,
                NewOrder {
                    uuid: OrderUuid::generate(),
                    details: details(),
                },
            )
            .await
            .expect("place_order should succeed");

        assert_eq!(order.cart_uuid, cart.uuid);
        assert_eq!(order.final_price, 25_00);
        assert_eq!(order.item_count, 2);
        assert_eq!(order.status, OrderStatus::New);

        // The frozen cart is no longer the identity's open cart.
        let result = ctx
            .orders
            .place_order(
                customer.uuid,
                NewOrder {
                    uuid: OrderUuid::generate(),
                    details: details(),
                },
            )
            .await;
        assert!(
            matches!(result, Err(OrdersServiceError::NoOpenCart)),
            "expected NoOpenCart, got {result:?}"
        );

        let fresh = ctx
            .carts
            .resolve_or_create_cart(identity)
            .await
            .expect("resolution should succeed");
        assert_ne!(fresh.uuid, cart.uuid);
        assert_eq!(fresh.final_price, 0);
        assert!(fresh.items.is_empty());
    }
}
