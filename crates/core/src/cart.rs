//! Shopping cart aggregate, line items and the recalculation procedure.
//!
//! A [`Cart`] owns its line items and a pair of denormalised totals. The
//! totals are written by exactly one piece of code, [`recalculate`], and
//! every mutation runs it before returning, so a cart observed between
//! operations always satisfies `final_price == Σ subtotal` and
//! `item_count == Σ quantity`. Mutations are all-or-nothing: on any error
//! the cart is left exactly as it was.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::{EntityRef, Sellable};
use crate::price::Price;

/// Errors from cart construction or mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// Quantities start at one.
    #[error("invalid quantity {0}; quantities start at 1")]
    InvalidQuantity(u32),

    /// The strict create path was asked for an entity the cart already holds.
    #[error("cart already holds a line item for {0}")]
    DuplicateItem(EntityRef),

    /// No line item references the given entity.
    #[error("no line item for {0}")]
    ItemNotFound(EntityRef),

    /// The cart has been placed into an order and is immutable.
    #[error("cart is frozen; it already belongs to an order")]
    Frozen,

    /// A subtotal or total exceeded the representable range.
    #[error("cart arithmetic overflowed")]
    Overflow,
}

/// A positive line-item quantity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// The quantity a freshly added line item starts at.
    pub const ONE: Quantity = Quantity(1);

    /// Validate a raw quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] when `n` is zero.
    pub fn new(n: u32) -> Result<Self, CartError> {
        if n < 1 {
            return Err(CartError::InvalidQuantity(n));
        }

        Ok(Self(n))
    }

    /// The raw quantity.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Merge two quantities, as when the same entity is added again.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Overflow`] when the sum is not representable.
    pub fn checked_add(self, other: Quantity) -> Result<Quantity, CartError> {
        self.0
            .checked_add(other.0)
            .map(Quantity)
            .ok_or(CartError::Overflow)
    }
}

impl TryFrom<u32> for Quantity {
    type Error = CartError;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

/// One purchasable entity placed into a cart at a given quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Stable id of the line item itself.
    pub id: Uuid,
    /// Polymorphic reference to the purchased entity.
    pub entity: EntityRef,
    /// Name shown on the cart line.
    pub display_name: String,
    /// The entity's unit price at the time it was added.
    pub unit_price: Price,
    /// How many units are in the cart.
    pub quantity: Quantity,
    /// Cached `quantity × unit_price`; recomputed on every quantity change.
    pub subtotal: Price,
}

impl LineItem {
    /// Build a line item for a resolved entity, computing its subtotal.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Overflow`] when the subtotal is not
    /// representable.
    pub fn new(id: Uuid, sellable: &Sellable, quantity: Quantity) -> Result<Self, CartError> {
        let unit_price = sellable.unit_price();

        Ok(Self {
            id,
            entity: sellable.entity_ref(),
            display_name: sellable.display_name(),
            unit_price,
            quantity,
            subtotal: line_subtotal(unit_price, quantity)?,
        })
    }

    /// Change the quantity, recomputing the cached subtotal.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Overflow`] when the new subtotal is not
    /// representable; the item is unchanged on error.
    pub fn set_quantity(&mut self, quantity: Quantity) -> Result<(), CartError> {
        self.subtotal = line_subtotal(self.unit_price, quantity)?;
        self.quantity = quantity;

        Ok(())
    }
}

/// `quantity × unit_price`, checked.
fn line_subtotal(unit_price: Price, quantity: Quantity) -> Result<Price, CartError> {
    unit_price
        .checked_mul(Price::from(quantity.get()))
        .ok_or(CartError::Overflow)
}

/// Denormalised cart totals, kept for display without re-aggregating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of line-item subtotals.
    pub final_price: Price,
    /// Sum of line-item quantities.
    pub item_count: u64,
}

/// Recompute cart totals from the current line items.
///
/// This is the only writer of [`Totals`]. An empty item set yields zeroed
/// totals rather than leaving previous values behind.
///
/// # Errors
///
/// Returns [`CartError::Overflow`] when the summed price is not
/// representable.
pub fn recalculate(items: &[LineItem]) -> Result<Totals, CartError> {
    items.iter().try_fold(Totals::default(), |acc, item| {
        Ok(Totals {
            final_price: acc
                .final_price
                .checked_add(item.subtotal)
                .ok_or(CartError::Overflow)?,
            item_count: acc.item_count + u64::from(item.quantity.get()),
        })
    })
}

/// The identity a cart belongs to: an authenticated customer or an anonymous
/// browsing session. Exactly one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CartOwner {
    /// An authenticated customer.
    Customer(Uuid),
    /// An anonymous browsing session.
    Anonymous(Uuid),
}

/// One shopping basket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    id: Uuid,
    owner: CartOwner,
    items: Vec<LineItem>,
    totals: Totals,
    in_order: bool,
}

impl Cart {
    /// Create an empty, open cart for the given identity.
    pub fn new(id: Uuid, owner: CartOwner) -> Self {
        Self {
            id,
            owner,
            items: Vec::new(),
            totals: Totals::default(),
            in_order: false,
        }
    }

    /// Rehydrate a cart from stored parts, recomputing the totals from the
    /// item set so a stale stored total can never be observed.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Overflow`] when the summed price is not
    /// representable.
    pub fn from_parts(
        id: Uuid,
        owner: CartOwner,
        items: Vec<LineItem>,
        in_order: bool,
    ) -> Result<Self, CartError> {
        Ok(Self {
            id,
            owner,
            totals: recalculate(&items)?,
            items,
            in_order,
        })
    }

    /// The cart's id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The identity the cart belongs to.
    pub fn owner(&self) -> CartOwner {
        self.owner
    }

    /// The current line items.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// The line item referencing the given entity, when present.
    pub fn item(&self, entity: &EntityRef) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.entity == entity)
    }

    /// The denormalised totals.
    pub fn totals(&self) -> Totals {
        self.totals
    }

    /// Whether the cart has been placed into an order.
    pub fn is_frozen(&self) -> bool {
        self.in_order
    }

    /// Whether the cart holds no line items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add an entity to the cart, incrementing the quantity of an existing
    /// line item for the same reference instead of creating a second one.
    /// Returns the id of the affected line item.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Frozen`] for a placed cart and
    /// [`CartError::Overflow`] when the merged quantity or subtotal is not
    /// representable.
    pub fn add(
        &mut self,
        item_id: Uuid,
        sellable: &Sellable,
        quantity: Quantity,
    ) -> Result<Uuid, CartError> {
        self.ensure_open()?;

        // Mutate a scratch copy so an overflow mid-way leaves the cart
        // untouched.
        let mut items = self.items.clone();
        let id = match items.iter_mut().find(|i| i.entity == sellable.entity_ref()) {
            Some(existing) => {
                existing.set_quantity(existing.quantity.checked_add(quantity)?)?;
                existing.id
            }
            None => {
                items.push(LineItem::new(item_id, sellable, quantity)?);
                item_id
            }
        };

        self.commit(items)?;

        Ok(id)
    }

    /// Strict create path: add a line item for an entity the cart must not
    /// already hold. Callers wanting add-or-increment semantics use
    /// [`Cart::add`] instead.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::DuplicateItem`] when a line item for the same
    /// reference exists, plus the errors of [`Cart::add`].
    pub fn insert_new(
        &mut self,
        item_id: Uuid,
        sellable: &Sellable,
        quantity: Quantity,
    ) -> Result<Uuid, CartError> {
        self.ensure_open()?;

        let entity = sellable.entity_ref();
        if self.items.iter().any(|item| item.entity == entity) {
            return Err(CartError::DuplicateItem(entity));
        }

        let mut items = self.items.clone();
        items.push(LineItem::new(item_id, sellable, quantity)?);
        self.commit(items)?;

        Ok(item_id)
    }

    /// Set the quantity of the line item referencing `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] when no such line item exists,
    /// plus [`CartError::Frozen`] and [`CartError::Overflow`].
    pub fn set_quantity(
        &mut self,
        entity: &EntityRef,
        quantity: Quantity,
    ) -> Result<(), CartError> {
        self.ensure_open()?;

        let mut items = self.items.clone();
        let item = items
            .iter_mut()
            .find(|item| &item.entity == entity)
            .ok_or(CartError::ItemNotFound(*entity))?;
        item.set_quantity(quantity)?;

        self.commit(items)
    }

    /// Remove the line item referencing `entity`, returning it. The
    /// membership is dropped before totals are rewritten, so no dangling
    /// reference is ever observable.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] when no such line item exists,
    /// plus [`CartError::Frozen`].
    pub fn remove(&mut self, entity: &EntityRef) -> Result<LineItem, CartError> {
        self.ensure_open()?;

        let index = self
            .items
            .iter()
            .position(|item| &item.entity == entity)
            .ok_or(CartError::ItemNotFound(*entity))?;

        let mut items = self.items.clone();
        let removed = items.remove(index);
        self.commit(items)?;

        Ok(removed)
    }

    /// Replace the item set and rewrite totals in one step.
    fn commit(&mut self, items: Vec<LineItem>) -> Result<(), CartError> {
        self.totals = recalculate(&items)?;
        self.items = items;

        Ok(())
    }

    fn ensure_open(&self) -> Result<(), CartError> {
        if self.in_order {
            return Err(CartError::Frozen);
        }

        Ok(())
    }

    /// Mark the cart as belonging to an order. Used by checkout; every
    /// mutating operation refuses a frozen cart.
    pub(crate) fn freeze(&mut self) {
        self.in_order = true;
    }
}
