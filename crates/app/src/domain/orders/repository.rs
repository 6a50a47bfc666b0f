//! Orders Repository

use std::str::FromStr;

use decanter::checkout::{BuyingType, Order, OrderDetails, OrderStatus};
use jiff_sqlx::{Date as SqlxDate, Timestamp as SqlxTimestamp};
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};

use crate::domain::carts::models::CartUuid;
use crate::domain::customers::models::CustomerUuid;
use crate::domain::orders::models::{OrderRecord, OrderUuid};
use crate::domain::rows::{to_db_amount, try_get_amount};

const CREATE_ORDER_SQL: &str = include_str!("sql/create_order.sql");
const GET_ORDER_SQL: &str = include_str!("sql/get_order.sql");
const LIST_ORDERS_FOR_CUSTOMER_SQL: &str = include_str!("sql/list_orders_for_customer.sql");
const UPDATE_ORDER_STATUS_SQL: &str = include_str!("sql/update_order_status.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgOrdersRepository;

impl PgOrdersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Persist a freshly placed order.
    pub(crate) async fn create_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &Order,
    ) -> Result<OrderRecord, sqlx::Error> {
        query_as::<Postgres, OrderRecord>(CREATE_ORDER_SQL)
            .bind(order.id)
            .bind(order.customer)
            .bind(order.cart_id)
            .bind(&order.details.first_name)
            .bind(&order.details.last_name)
            .bind(&order.details.phone)
            .bind(&order.details.address)
            .bind(order.details.buying_type.as_str())
            .bind(order.details.preferred_date.map(SqlxDate::from))
            .bind(&order.details.comment)
            .bind(order.status.as_str())
            .bind(to_db_amount(order.totals.final_price, "final_price")?)
            .bind(to_db_amount(order.totals.item_count, "item_count")?)
            .bind(SqlxTimestamp::from(order.placed_at))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<OrderRecord, sqlx::Error> {
        query_as::<Postgres, OrderRecord>(GET_ORDER_SQL)
            .bind(order.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list_orders_for_customer(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
    ) -> Result<Vec<OrderRecord>, sqlx::Error> {
        query_as::<Postgres, OrderRecord>(LIST_ORDERS_FOR_CUSTOMER_SQL)
            .bind(customer.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn update_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        status: OrderStatus,
    ) -> Result<OrderRecord, sqlx::Error> {
        query_as::<Postgres, OrderRecord>(UPDATE_ORDER_STATUS_SQL)
            .bind(order.into_uuid())
            .bind(status.as_str())
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for OrderRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let buying_type_tag: String = row.try_get("buying_type")?;
        let buying_type =
            BuyingType::from_str(&buying_type_tag).map_err(|e| sqlx::Error::ColumnDecode {
                index: "buying_type".to_string(),
                source: Box::new(e),
            })?;

        let status_tag: String = row.try_get("status")?;
        let status = OrderStatus::from_str(&status_tag).map_err(|e| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            uuid: OrderUuid::from_uuid(row.try_get("uuid")?),
            customer_uuid: CustomerUuid::from_uuid(row.try_get("customer_uuid")?),
            cart_uuid: CartUuid::from_uuid(row.try_get("cart_uuid")?),
            details: OrderDetails {
                first_name: row.try_get("first_name")?,
                last_name: row.try_get("last_name")?,
                phone: row.try_get("phone")?,
                address: row.try_get("address")?,
                buying_type,
                preferred_date: row
                    .try_get::<Option<SqlxDate>, _>("preferred_date")?
                    .map(SqlxDate::to_jiff),
                comment: row.try_get("comment")?,
            },
            status,
            final_price: try_get_amount(row, "final_price")?,
            item_count: try_get_amount(row, "item_count")?,
            placed_at: row.try_get::<SqlxTimestamp, _>("placed_at")?.to_jiff(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
