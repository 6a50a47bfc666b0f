//! Carts Repository

use decanter::cart::Totals;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::domain::carts::models::{CartIdentity, CartRecord, CartUuid};
use crate::domain::rows::{to_db_amount, try_get_amount};

const GET_CART_SQL: &str = include_str!("../sql/get_cart.sql");
const GET_OPEN_CART_FOR_UPDATE_SQL: &str = include_str!("../sql/get_open_cart_for_update.sql");
const CREATE_OPEN_CART_SQL: &str = include_str!("../sql/create_open_cart.sql");
const UPDATE_TOTALS_SQL: &str = include_str!("../sql/update_totals.sql");
const MARK_IN_ORDER_SQL: &str = include_str!("../sql/mark_in_order.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartsRepository;

impl PgCartsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<CartRecord, sqlx::Error> {
        query_as::<Postgres, CartRecord>(GET_CART_SQL)
            .bind(cart.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Fetch the identity's open cart with a `FOR UPDATE` lock. All cart
    /// mutations go through this lock, serialising writers per cart.
    pub(crate) async fn get_open_cart_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        identity: CartIdentity,
    ) -> Result<CartRecord, sqlx::Error> {
        let (customer_uuid, session_uuid) = identity.columns();

        query_as::<Postgres, CartRecord>(GET_OPEN_CART_FOR_UPDATE_SQL)
            .bind(customer_uuid)
            .bind(session_uuid)
            .fetch_one(&mut **tx)
            .await
    }

    /// Insert an open cart for the identity unless one already exists. The
    /// partial unique indexes on open carts make concurrent inserts collapse
    /// into a single row.
    pub(crate) async fn create_open_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        identity: CartIdentity,
    ) -> Result<(), sqlx::Error> {
        let (customer_uuid, session_uuid) = identity.columns();

        query(CREATE_OPEN_CART_SQL)
            .bind(cart.into_uuid())
            .bind(customer_uuid)
            .bind(session_uuid)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Persist recomputed totals. Refuses a cart that has been placed into
    /// an order; the caller maps the missing row to a frozen-cart error.
    pub(crate) async fn update_totals(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        totals: Totals,
    ) -> Result<(), sqlx::Error> {
        query(UPDATE_TOTALS_SQL)
            .bind(cart.into_uuid())
            .bind(to_db_amount(totals.final_price, "final_price")?)
            .bind(to_db_amount(totals.item_count, "item_count")?)
            .fetch_one(&mut **tx)
            .await?;

        Ok(())
    }

    /// Flip a still-open cart into its frozen, in-order state.
    pub(crate) async fn mark_in_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<(), sqlx::Error> {
        query(MARK_IN_ORDER_SQL)
            .bind(cart.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        Ok(())
    }
}

impl<'r> FromRow<'r, PgRow> for CartRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let customer_uuid: Option<Uuid> = row.try_get("customer_uuid")?;
        let session_uuid: Option<Uuid> = row.try_get("session_uuid")?;
        let identity = CartIdentity::from_columns(customer_uuid, session_uuid).map_err(|e| {
            sqlx::Error::ColumnDecode {
                index: "customer_uuid".to_string(),
                source: Box::new(e),
            }
        })?;

        let cart_items_count: i64 = row.try_get("cart_items_count")?;

        Ok(Self {
            uuid: CartUuid::from_uuid(row.try_get("uuid")?),
            identity,
            final_price: try_get_amount(row, "final_price")?,
            item_count: try_get_amount(row, "item_count")?,
            in_order: row.try_get("in_order")?,
            items: Vec::with_capacity(usize::try_from(cart_items_count).unwrap_or_default()),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
