//! Notifications service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::{
        customers::models::CustomerUuid,
        notifications::{
            errors::NotificationsServiceError, models::NotificationRecord,
            repository::PgNotificationsRepository,
        },
    },
};

#[derive(Debug, Clone)]
pub struct PgNotificationsService {
    db: Db,
    repository: PgNotificationsRepository,
}

impl PgNotificationsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgNotificationsRepository::new(),
        }
    }
}

#[async_trait]
impl NotificationsService for PgNotificationsService {
    async fn unread(
        &self,
        customer: CustomerUuid,
    ) -> Result<Vec<NotificationRecord>, NotificationsServiceError> {
        let mut tx = self.db.begin().await?;

        let notifications = self.repository.unread_for_customer(&mut tx, customer).await?;

        tx.commit().await?;

        Ok(notifications)
    }

    async fn mark_all_read(
        &self,
        customer: CustomerUuid,
    ) -> Result<u64, NotificationsServiceError> {
        let mut tx = self.db.begin().await?;

        let marked = self.repository.mark_all_read(&mut tx, customer).await?;

        tx.commit().await?;

        Ok(marked)
    }
}

#[automock]
#[async_trait]
pub trait NotificationsService: Send + Sync {
    /// The customer's unread notifications, newest first.
    async fn unread(
        &self,
        customer: CustomerUuid,
    ) -> Result<Vec<NotificationRecord>, NotificationsServiceError>;

    /// Mark every notification for the customer as read, returning how many
    /// were flipped.
    async fn mark_all_read(
        &self,
        customer: CustomerUuid,
    ) -> Result<u64, NotificationsServiceError>;
}
