//! Wishlists Repository

use std::str::FromStr;

use decanter::catalog::{EntityKind, EntityRef};
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};
use uuid::Uuid;

use crate::domain::customers::models::{CustomerUuid, WishlistEntryRecord};

const ADD_WISHLIST_ITEM_SQL: &str = include_str!("../sql/add_wishlist_item.sql");
const REMOVE_WISHLIST_ITEM_SQL: &str = include_str!("../sql/remove_wishlist_item.sql");
const LIST_WISHLIST_SQL: &str = include_str!("../sql/list_wishlist.sql");
const CUSTOMERS_WISHING_SQL: &str = include_str!("../sql/customers_wishing.sql");
const REMOVE_WISHLIST_ENTITY_SQL: &str = include_str!("../sql/remove_wishlist_entity.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgWishlistsRepository;

impl PgWishlistsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Add an entity to a customer's wishlist. Returns `false` when it was
    /// already present.
    pub(crate) async fn add_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
        entity: EntityRef,
    ) -> Result<bool, sqlx::Error> {
        let rows_affected = query(ADD_WISHLIST_ITEM_SQL)
            .bind(customer.into_uuid())
            .bind(entity.kind.as_str())
            .bind(entity.id)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Remove an entity from a customer's wishlist. Returns `false` when it
    /// was not present.
    pub(crate) async fn remove_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
        entity: EntityRef,
    ) -> Result<bool, sqlx::Error> {
        let rows_affected = query(REMOVE_WISHLIST_ITEM_SQL)
            .bind(customer.into_uuid())
            .bind(entity.kind.as_str())
            .bind(entity.id)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    pub(crate) async fn list_for_customer(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
    ) -> Result<Vec<WishlistEntryRecord>, sqlx::Error> {
        query_as::<Postgres, WishlistEntryRecord>(LIST_WISHLIST_SQL)
            .bind(customer.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    /// Every customer currently watching the given entity.
    pub(crate) async fn customers_wishing(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        kind: EntityKind,
        entity_uuid: Uuid,
    ) -> Result<Vec<CustomerUuid>, sqlx::Error> {
        let uuids = query_scalar::<Postgres, Uuid>(CUSTOMERS_WISHING_SQL)
            .bind(kind.as_str())
            .bind(entity_uuid)
            .fetch_all(&mut **tx)
            .await?;

        Ok(uuids.into_iter().map(CustomerUuid::from_uuid).collect())
    }

    /// Drop the entity from every wishlist holding it. Runs after a restock
    /// notification so the next restock cannot notify the same customers.
    pub(crate) async fn remove_entity_everywhere(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        kind: EntityKind,
        entity_uuid: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(REMOVE_WISHLIST_ENTITY_SQL)
            .bind(kind.as_str())
            .bind(entity_uuid)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for WishlistEntryRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let kind_tag: String = row.try_get("entity_kind")?;
        let entity_kind = EntityKind::from_str(&kind_tag).map_err(|e| sqlx::Error::ColumnDecode {
            index: "entity_kind".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            customer_uuid: CustomerUuid::from_uuid(row.try_get("customer_uuid")?),
            entity_kind,
            entity_uuid: row.try_get("entity_uuid")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}
