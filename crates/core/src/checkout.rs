//! Checkout: materialising an immutable order from an open cart.

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::cart::{Cart, Totals};

/// Errors from placing an order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    /// Checkout with zero line items is rejected.
    #[error("cannot place an order for an empty cart")]
    EmptyCart,

    /// The cart already belongs to an order.
    #[error("cart has already been placed into an order")]
    AlreadyPlaced,
}

/// Error from parsing a status or buying-type tag out of storage.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognised {field} tag {value:?}")]
pub struct ParseTagError {
    field: &'static str,
    value: String,
}

/// How the customer receives the order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuyingType {
    /// Courier delivery to the given address.
    #[default]
    Delivery,
    /// Collection from the shop.
    Pickup,
}

impl BuyingType {
    /// The stable tag stored with the order.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::Pickup => "pickup",
        }
    }
}

impl fmt::Display for BuyingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuyingType {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivery" => Ok(Self::Delivery),
            "pickup" => Ok(Self::Pickup),
            other => Err(ParseTagError {
                field: "buying type",
                value: other.to_string(),
            }),
        }
    }
}

/// Where an order stands. Transitions are administrative; any change is
/// permitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Just placed.
    #[default]
    New,
    /// Confirmed by a manager.
    Confirmed,
    /// Being assembled.
    InProgress,
    /// Ready for delivery or pickup.
    Ready,
    /// Received by the customer.
    Completed,
    /// Cancelled.
    Cancelled,
}

impl OrderStatus {
    /// The stable tag stored with the order.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "confirmed" => Ok(Self::Confirmed),
            "in_progress" => Ok(Self::InProgress),
            "ready" => Ok(Self::Ready),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ParseTagError {
                field: "order status",
                value: other.to_string(),
            }),
        }
    }
}

/// Point-in-time contact and delivery details captured with an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    /// Recipient's first name.
    pub first_name: String,
    /// Recipient's last name.
    pub last_name: String,
    /// Contact phone number.
    pub phone: String,
    /// Delivery address; absent for pickup orders.
    pub address: Option<String>,
    /// Delivery or pickup.
    pub buying_type: BuyingType,
    /// The day the customer would like the order.
    pub preferred_date: Option<Date>,
    /// Free-form note for the shop.
    pub comment: Option<String>,
}

/// An immutable order record referencing its frozen cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Stable id.
    pub id: Uuid,
    /// The customer the order belongs to.
    pub customer: Uuid,
    /// The now-frozen cart the order snapshots.
    pub cart_id: Uuid,
    /// Contact and delivery details as submitted.
    pub details: OrderDetails,
    /// Administrative status.
    pub status: OrderStatus,
    /// Cart totals at the moment of placement.
    pub totals: Totals,
    /// When the order was placed.
    pub placed_at: Timestamp,
}

impl Order {
    /// Set the administrative status. Any transition is permitted.
    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
    }
}

/// Materialise an order from an open, non-empty cart, freezing the cart.
/// The customer's next cart resolution yields a fresh open cart; none is
/// created here.
///
/// # Errors
///
/// Returns [`CheckoutError::AlreadyPlaced`] for a frozen cart and
/// [`CheckoutError::EmptyCart`] for a cart with no line items. The cart is
/// unchanged on error.
pub fn place_order(
    order_id: Uuid,
    cart: &mut Cart,
    customer: Uuid,
    details: OrderDetails,
    placed_at: Timestamp,
) -> Result<Order, CheckoutError> {
    if cart.is_frozen() {
        return Err(CheckoutError::AlreadyPlaced);
    }

    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    cart.freeze();

    Ok(Order {
        id: order_id,
        customer,
        cart_id: cart.id(),
        details,
        status: OrderStatus::New,
        totals: cart.totals(),
        placed_at,
    })
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::cart::{CartError, CartOwner, Quantity};
    use crate::catalog::{Product, Sellable};

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

    fn stocked_cart() -> TestResult<Cart> {
        let mut cart = Cart::new(Uuid::now_v7(), CartOwner::Customer(Uuid::now_v7()));
        let bottle = Sellable::Product(Product {
            id: Uuid::now_v7(),
            slug: "vermouth-rosso".to_string(),
            name: "Vermouth Rosso".to_string(),
            brand: None,
            price: 9_00,
            stock: 2,
        });
        cart.add(Uuid::now_v7(), &bottle, Quantity::new(2)?)?;

        Ok(cart)
    }

    #[test]
    fn placing_an_order_freezes_the_cart() -> TestResult {
        let mut cart = stocked_cart()?;
        let customer = Uuid::now_v7();

        let order = place_order(
            Uuid::now_v7(),
            &mut cart,
            customer,
            details(),
            Timestamp::now(),
        )?;

        assert!(cart.is_frozen());
        assert_eq!(order.customer, customer);
        assert_eq!(order.cart_id, cart.id());
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.totals, cart.totals());
        assert_eq!(order.totals.final_price, 18_00);

        Ok(())
    }

    #[test]
    fn frozen_cart_rejects_line_item_mutation_after_checkout() -> TestResult {
        let mut cart = stocked_cart()?;
        let entity = cart
            .items()
            .first()
            .map(|item| item.entity)
            .expect("cart should have an item");

        place_order(
            Uuid::now_v7(),
            &mut cart,
            Uuid::now_v7(),
            details(),
            Timestamp::now(),
        )?;

        let result = cart.set_quantity(&entity, Quantity::new(3)?);

        assert!(matches!(result, Err(CartError::Frozen)), "expected Frozen");

        Ok(())
    }

    #[test]
    fn empty_cart_cannot_be_checked_out() {
        let mut cart = Cart::new(Uuid::now_v7(), CartOwner::Customer(Uuid::now_v7()));

        let result = place_order(
            Uuid::now_v7(),
            &mut cart,
            Uuid::now_v7(),
            details(),
            Timestamp::now(),
        );

        assert!(
            matches!(result, Err(CheckoutError::EmptyCart)),
            "expected EmptyCart"
        );
        assert!(!cart.is_frozen());
    }

    #[test]
    fn double_checkout_is_rejected() -> TestResult {
        let mut cart = stocked_cart()?;

        place_order(
            Uuid::now_v7(),
            &mut cart,
            Uuid::now_v7(),
            details(),
            Timestamp::now(),
        )?;
        let result = place_order(
            Uuid::now_v7(),
            &mut cart,
            Uuid::now_v7(),
            details(),
            Timestamp::now(),
        );

        assert!(
            matches!(result, Err(CheckoutError::AlreadyPlaced)),
            "expected AlreadyPlaced"
        );

        Ok(())
    }

    #[test]
    fn status_tags_round_trip() -> TestResult {
        for status in [
            OrderStatus::New,
            OrderStatus::Confirmed,
            OrderStatus::InProgress,
            OrderStatus::Ready,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>()?, status);
        }

        assert!(
            "misplaced".parse::<OrderStatus>().is_err(),
            "unknown tag should not parse"
        );

        Ok(())
    }

    #[test]
    fn any_status_transition_is_permitted() -> TestResult {
        let mut cart = stocked_cart()?;
        let mut order = place_order(
            Uuid::now_v7(),
            &mut cart,
            Uuid::now_v7(),
            details(),
            Timestamp::now(),
        )?;

        order.set_status(OrderStatus::Completed);
        order.set_status(OrderStatus::New);

        assert_eq!(order.status, OrderStatus::New);

        Ok(())
    }
}
