//! Customers Models

use decanter::catalog::{EntityKind, EntityRef};
use jiff::{Timestamp, civil::Date};
use uuid::Uuid;

use crate::uuids::TypedUuid;

/// Marker for the authentication principal a customer profile hangs off.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser;

/// User UUID
pub type UserUuid = TypedUuid<AuthUser>;

/// Customer UUID
pub type CustomerUuid = TypedUuid<CustomerRecord>;

/// Customer Record
#[derive(Debug, Clone)]
pub struct CustomerRecord {
    pub uuid: CustomerUuid,
    pub user_uuid: UserUuid,
    pub phone: Option<String>,
    pub birth_date: Option<Date>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// New Customer Model
#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomer {
    pub uuid: CustomerUuid,
    pub user_uuid: UserUuid,
    pub phone: Option<String>,
    pub birth_date: Option<Date>,
}

/// Wishlist Entry Record
#[derive(Debug, Clone)]
pub struct WishlistEntryRecord {
    pub customer_uuid: CustomerUuid,
    pub entity_kind: EntityKind,
    pub entity_uuid: Uuid,
    pub created_at: Timestamp,
}

impl WishlistEntryRecord {
    /// The polymorphic reference this entry watches.
    #[must_use]
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef {
            kind: self.entity_kind,
            id: self.entity_uuid,
        }
    }
}
