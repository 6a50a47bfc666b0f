//! Wishlists and the back-in-stock notification trigger.
//!
//! The trigger is edge-triggered, not polled: it fires exactly when a stock
//! update crosses the out-of-stock → in-stock boundary, and each notified
//! customer loses the entity from their wishlist in the same unit of work,
//! so a second update cannot notify them again.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{EntityRef, Product};

/// True exactly when a stock update crosses the out-of-stock → in-stock
/// edge.
pub fn back_in_stock(previous: u32, current: u32) -> bool {
    previous == 0 && current > 0
}

/// A customer's set of watched catalog entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wishlist {
    entries: Vec<EntityRef>,
}

impl Wishlist {
    /// Create an empty wishlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity; returns `false` when it was already present.
    pub fn add(&mut self, entity: EntityRef) -> bool {
        if self.contains(&entity) {
            return false;
        }

        self.entries.push(entity);
        true
    }

    /// Remove an entity; returns `false` when it was not present.
    pub fn remove(&mut self, entity: &EntityRef) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry != entity);
        self.entries.len() < before
    }

    /// Whether the wishlist holds the entity.
    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.entries.contains(entity)
    }

    /// The watched entities, oldest first.
    pub fn entries(&self) -> &[EntityRef] {
        &self.entries
    }

    /// Whether the wishlist is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A message for one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// The customer the message is for.
    pub recipient: Uuid,
    /// Message body.
    pub text: String,
    /// Whether the customer has seen it.
    pub read: bool,
}

/// The back-in-stock message body for a product.
pub fn restock_text(product: &Product) -> String {
    format!("{}, which you were waiting for, is back in stock", product.name)
}

/// Build one unread notification per recipient for a restocked product.
pub fn restock_notifications<I>(product: &Product, recipients: I) -> Vec<Notification>
where
    I: IntoIterator<Item = Uuid>,
{
    recipients
        .into_iter()
        .map(|recipient| Notification {
            recipient,
            text: restock_text(product),
            read: false,
        })
        .collect()
}

/// Apply a stock update to a product. When the update crosses the
/// out-of-stock → in-stock edge, every wishlist holding the product loses
/// it and its owner receives one notification.
pub fn apply_stock_update(
    product: &mut Product,
    new_stock: u32,
    wishlists: &mut [(Uuid, Wishlist)],
) -> Vec<Notification> {
    let restocked = back_in_stock(product.stock, new_stock);
    product.stock = new_stock;

    if !restocked {
        return Vec::new();
    }

    let entity = product.entity_ref();
    wishlists
        .iter_mut()
        .filter_map(|(customer, wishlist)| {
            wishlist.remove(&entity).then(|| Notification {
                recipient: *customer,
                text: restock_text(product),
                read: false,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vintage_port() -> Product {
        Product {
            id: Uuid::now_v7(),
            slug: "vintage-port".to_string(),
            name: "Vintage Port".to_string(),
            brand: None,
            price: 35_00,
            stock: 0,
        }
    }

    #[test]
    fn edge_fires_only_from_zero_to_positive() {
        assert!(back_in_stock(0, 3));
        assert!(!back_in_stock(0, 0));
        assert!(!back_in_stock(2, 5));
        assert!(!back_in_stock(2, 0));
    }

    #[test]
    fn wishlist_add_is_idempotent() {
        let product = vintage_port();
        let mut wishlist = Wishlist::new();

        assert!(wishlist.add(product.entity_ref()));
        assert!(!wishlist.add(product.entity_ref()));
        assert_eq!(wishlist.entries().len(), 1);
    }

    #[test]
    fn restock_notifies_each_wisher_once_and_clears_their_wishlists() {
        let mut product = vintage_port();
        let (anna, boris, clara) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());

        let mut watching = Wishlist::new();
        watching.add(product.entity_ref());

        let mut wishlists = vec![
            (anna, watching.clone()),
            (boris, watching),
            (clara, Wishlist::new()),
        ];

        let notifications = apply_stock_update(&mut product, 3, &mut wishlists);

        assert_eq!(product.stock, 3);
        assert_eq!(notifications.len(), 2);
        let recipients: Vec<Uuid> = notifications.iter().map(|n| n.recipient).collect();
        assert!(recipients.contains(&anna), "anna should be notified");
        assert!(recipients.contains(&boris), "boris should be notified");
        assert!(!recipients.contains(&clara), "clara was not watching");
        assert!(
            notifications.iter().all(|n| !n.read),
            "notifications start unread"
        );
        assert!(
            wishlists.iter().all(|(_, w)| w.is_empty()),
            "the entity leaves every notified wishlist"
        );
    }

    #[test]
    fn second_restock_does_not_notify_again() {
        let mut product = vintage_port();
        let anna = Uuid::now_v7();
        let mut watching = Wishlist::new();
        watching.add(product.entity_ref());
        let mut wishlists = vec![(anna, watching)];

        let first = apply_stock_update(&mut product, 2, &mut wishlists);
        let drained = apply_stock_update(&mut product, 0, &mut wishlists);
        let second = apply_stock_update(&mut product, 5, &mut wishlists);

        assert_eq!(first.len(), 1);
        assert!(drained.is_empty(), "going out of stock notifies nobody");
        assert!(second.is_empty(), "the wishlist entry was consumed");
    }

    #[test]
    fn restock_while_in_stock_is_not_an_edge() {
        let mut product = vintage_port();
        product.stock = 1;
        let anna = Uuid::now_v7();
        let mut watching = Wishlist::new();
        watching.add(product.entity_ref());
        let mut wishlists = vec![(anna, watching)];

        let notifications = apply_stock_update(&mut product, 4, &mut wishlists);

        assert!(notifications.is_empty(), "2→4 is not an edge");
        assert!(
            wishlists.iter().all(|(_, w)| !w.is_empty()),
            "wishlist is kept until a real edge"
        );
    }
}
