//! Notifications Repository

use decanter::wishlist::Notification;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::customers::models::CustomerUuid;
use crate::domain::notifications::models::{NotificationRecord, NotificationUuid};

const CREATE_NOTIFICATION_SQL: &str = include_str!("sql/create_notification.sql");
const UNREAD_FOR_CUSTOMER_SQL: &str = include_str!("sql/unread_for_customer.sql");
const MARK_ALL_READ_SQL: &str = include_str!("sql/mark_all_read.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgNotificationsRepository;

impl PgNotificationsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_notification(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        uuid: NotificationUuid,
        notification: &Notification,
    ) -> Result<NotificationRecord, sqlx::Error> {
        query_as::<Postgres, NotificationRecord>(CREATE_NOTIFICATION_SQL)
            .bind(uuid.into_uuid())
            .bind(notification.recipient)
            .bind(&notification.text)
            .bind(notification.read)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn unread_for_customer(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
    ) -> Result<Vec<NotificationRecord>, sqlx::Error> {
        query_as::<Postgres, NotificationRecord>(UNREAD_FOR_CUSTOMER_SQL)
            .bind(customer.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn mark_all_read(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(MARK_ALL_READ_SQL)
            .bind(customer.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for NotificationRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: NotificationUuid::from_uuid(row.try_get("uuid")?),
            customer_uuid: CustomerUuid::from_uuid(row.try_get("customer_uuid")?),
            text: row.try_get("text")?,
            read: row.try_get("read")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}
