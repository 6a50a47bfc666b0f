//! Orders Models

use decanter::cart::Totals;
use decanter::checkout::{Order, OrderDetails, OrderStatus};
use jiff::Timestamp;

use crate::domain::carts::models::CartUuid;
use crate::domain::customers::models::CustomerUuid;
use crate::uuids::TypedUuid;

/// Order UUID
pub type OrderUuid = TypedUuid<OrderRecord>;

/// Order Record
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub uuid: OrderUuid,
    pub customer_uuid: CustomerUuid,
    pub cart_uuid: CartUuid,
    pub details: OrderDetails,
    pub status: OrderStatus,
    pub final_price: u64,
    pub item_count: u64,
    pub placed_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl OrderRecord {
    /// View of this record as the core order.
    #[must_use]
    pub fn to_order(&self) -> Order {
        Order {
            id: self.uuid.into_uuid(),
            customer: self.customer_uuid.into_uuid(),
            cart_id: self.cart_uuid.into_uuid(),
            details: self.details.clone(),
            status: self.status,
            totals: Totals {
                final_price: self.final_price,
                item_count: self.item_count,
            },
            placed_at: self.placed_at,
        }
    }
}

/// New Order Model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub uuid: OrderUuid,
    pub details: OrderDetails,
}
