//! Carts Models

use decanter::cart::{Cart, CartError, CartOwner, LineItem, Quantity};
use decanter::catalog::{EntityKind, EntityRef};
use jiff::Timestamp;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::customers::models::CustomerUuid;
use crate::uuids::TypedUuid;

/// Marker for anonymous browsing sessions.
#[derive(Debug, Clone, Copy)]
pub struct AnonymousSession;

/// Session UUID
pub type SessionUuid = TypedUuid<AnonymousSession>;

/// Cart UUID
pub type CartUuid = TypedUuid<CartRecord>;

/// Cart Item UUID
pub type CartItemUuid = TypedUuid<CartItemRecord>;

/// Error for a cart row whose owner columns violate the exactly-one rule.
#[derive(Debug, Error)]
#[error("cart owner columns must hold exactly one of customer or session")]
pub struct MalformedIdentity;

/// The identity an open cart is keyed by: an authenticated customer or an
/// anonymous session, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartIdentity {
    Customer(CustomerUuid),
    Anonymous(SessionUuid),
}

impl CartIdentity {
    /// The `(customer_uuid, session_uuid)` column pair this identity binds
    /// to. Exactly one side is set.
    #[must_use]
    pub(crate) fn columns(self) -> (Option<Uuid>, Option<Uuid>) {
        match self {
            Self::Customer(customer) => (Some(customer.into_uuid()), None),
            Self::Anonymous(session) => (None, Some(session.into_uuid())),
        }
    }

    /// Rebuild the identity from its stored column pair.
    pub(crate) fn from_columns(
        customer: Option<Uuid>,
        session: Option<Uuid>,
    ) -> Result<Self, MalformedIdentity> {
        match (customer, session) {
            (Some(customer), None) => Ok(Self::Customer(CustomerUuid::from_uuid(customer))),
            (None, Some(session)) => Ok(Self::Anonymous(SessionUuid::from_uuid(session))),
            _ => Err(MalformedIdentity),
        }
    }

    /// View of this identity as the core cart owner.
    #[must_use]
    pub fn to_owner(self) -> CartOwner {
        match self {
            Self::Customer(customer) => CartOwner::Customer(customer.into_uuid()),
            Self::Anonymous(session) => CartOwner::Anonymous(session.into_uuid()),
        }
    }
}

/// Cart Record
#[derive(Debug, Clone)]
pub struct CartRecord {
    pub uuid: CartUuid,
    pub identity: CartIdentity,
    pub final_price: u64,
    pub item_count: u64,
    pub in_order: bool,
    pub items: Vec<CartItemRecord>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CartRecord {
    /// Rehydrate the core cart aggregate from this record and its items.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] when a stored quantity or subtotal no longer
    /// passes validation.
    pub fn to_cart(&self) -> Result<Cart, CartError> {
        let items = self
            .items
            .iter()
            .map(CartItemRecord::to_line_item)
            .collect::<Result<Vec<_>, _>>()?;

        Cart::from_parts(
            self.uuid.into_uuid(),
            self.identity.to_owner(),
            items,
            self.in_order,
        )
    }
}

/// Cart Item Record
#[derive(Debug, Clone)]
pub struct CartItemRecord {
    pub uuid: CartItemUuid,
    pub cart_uuid: CartUuid,
    pub entity_kind: EntityKind,
    pub entity_uuid: Uuid,
    pub display_name: String,
    pub unit_price: u64,
    pub quantity: u32,
    pub subtotal: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CartItemRecord {
    /// The polymorphic reference this line points at.
    #[must_use]
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef {
            kind: self.entity_kind,
            id: self.entity_uuid,
        }
    }

    /// View of this record as a core line item, revalidating the stored
    /// quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] when the stored quantity is
    /// zero.
    pub fn to_line_item(&self) -> Result<LineItem, CartError> {
        Ok(LineItem {
            id: self.uuid.into_uuid(),
            entity: self.entity_ref(),
            display_name: self.display_name.clone(),
            unit_price: self.unit_price,
            quantity: Quantity::new(self.quantity)?,
            subtotal: self.subtotal,
        })
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn identity_binds_exactly_one_column() {
        let customer = CustomerUuid::generate();
        let session = SessionUuid::generate();

        assert_eq!(
            CartIdentity::Customer(customer).columns(),
            (Some(customer.into_uuid()), None)
        );
        assert_eq!(
            CartIdentity::Anonymous(session).columns(),
            (None, Some(session.into_uuid()))
        );
    }

    #[test]
    fn item_record_round_trips_to_a_line_item() -> TestResult {
        let record = CartItemRecord {
            uuid: CartItemUuid::generate(),
            cart_uuid: CartUuid::generate(),
            entity_kind: EntityKind::Product,
            entity_uuid: Uuid::now_v7(),
            display_name: "Rioja Reserva".to_string(),
            unit_price: 12_50,
            quantity: 2,
            subtotal: 25_00,
            created_at: Timestamp::now(),
            updated_at: Timestamp::now(),
        };

        let item = record.to_line_item()?;

        assert_eq!(item.id, record.uuid.into_uuid());
        assert_eq!(item.entity, record.entity_ref());
        assert_eq!(item.quantity.get(), 2);
        assert_eq!(item.subtotal, 25_00);

        Ok(())
    }

    #[test]
    fn stored_zero_quantity_is_rejected_on_rehydration() {
        let record = CartItemRecord {
            uuid: CartItemUuid::generate(),
            cart_uuid: CartUuid::generate(),
            entity_kind: EntityKind::Product,
            entity_uuid: Uuid::now_v7(),
            display_name: "Rioja Reserva".to_string(),
            unit_price: 12_50,
            quantity: 0,
            subtotal: 0,
            created_at: Timestamp::now(),
            updated_at: Timestamp::now(),
        };

        let result = record.to_line_item();

        assert!(
            matches!(result, Err(CartError::InvalidQuantity(0))),
            "expected InvalidQuantity, got {result:?}"
        );
    }
}
