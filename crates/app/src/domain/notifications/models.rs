//! Notifications Models

use decanter::wishlist::Notification;
use jiff::Timestamp;

use crate::domain::customers::models::CustomerUuid;
use crate::uuids::TypedUuid;

/// Notification UUID
pub type NotificationUuid = TypedUuid<NotificationRecord>;

/// Notification Record
#[derive(Debug, Clone)]
pub struct NotificationRecord {
    pub uuid: NotificationUuid,
    pub customer_uuid: CustomerUuid,
    pub text: String,
    pub read: bool,
    pub created_at: Timestamp,
}

impl NotificationRecord {
    /// View of this record as the core notification.
    #[must_use]
    pub fn to_notification(&self) -> Notification {
        Notification {
            recipient: self.customer_uuid.into_uuid(),
            text: self.text.clone(),
            read: self.read,
        }
    }
}
