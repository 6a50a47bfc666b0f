//! Catalog Repository

use std::str::FromStr;

use decanter::catalog::{EntityKey, EntityKind, Sellable};
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};
use uuid::Uuid;

use crate::domain::catalog::models::{ImageRecord, NewProduct, ProductRecord, ProductUuid};
use crate::domain::rows::{to_db_amount, to_db_quantity, try_get_amount, try_get_quantity};

const LIST_PRODUCTS_SQL: &str = include_str!("sql/list_products.sql");
const GET_PRODUCT_BY_UUID_SQL: &str = include_str!("sql/get_product_by_uuid.sql");
const GET_PRODUCT_BY_SLUG_SQL: &str = include_str!("sql/get_product_by_slug.sql");
const GET_PRODUCT_FOR_UPDATE_SQL: &str = include_str!("sql/get_product_for_update.sql");
const CREATE_PRODUCT_SQL: &str = include_str!("sql/create_product.sql");
const UPDATE_STOCK_SQL: &str = include_str!("sql/update_stock.sql");
const IMAGES_FOR_OWNER_SQL: &str = include_str!("sql/images_for_owner.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCatalogRepository;

impl PgCatalogRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn list_products(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<ProductRecord>, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(LIST_PRODUCTS_SQL)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn get_product_by_uuid(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(GET_PRODUCT_BY_UUID_SQL)
            .bind(product.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_product_by_slug(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        slug: &str,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(GET_PRODUCT_BY_SLUG_SQL)
            .bind(slug)
            .fetch_one(&mut **tx)
            .await
    }

    /// Fetch a product row with a `FOR UPDATE` lock, pinning its stock level
    /// for the duration of the transaction.
    pub(crate) async fn get_product_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(GET_PRODUCT_FOR_UPDATE_SQL)
            .bind(product.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn create_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: NewProduct,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(CREATE_PRODUCT_SQL)
            .bind(product.uuid.into_uuid())
            .bind(&product.slug)
            .bind(&product.name)
            .bind(&product.brand)
            .bind(to_db_amount(product.price, "price")?)
            .bind(to_db_quantity(product.stock, "stock")?)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn update_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        stock: u32,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(UPDATE_STOCK_SQL)
            .bind(product.into_uuid())
            .bind(to_db_quantity(stock, "stock")?)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn images_for(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner_kind: EntityKind,
        owner_uuid: Uuid,
    ) -> Result<Vec<ImageRecord>, sqlx::Error> {
        query_as::<Postgres, ImageRecord>(IMAGES_FOR_OWNER_SQL)
            .bind(owner_kind.as_str())
            .bind(owner_uuid)
            .fetch_all(&mut **tx)
            .await
    }

    /// Resolve a polymorphic `(kind, key)` reference to a concrete sellable
    /// entity. The single place where a kind tag picks a concrete lookup.
    pub(crate) async fn resolve(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        kind: EntityKind,
        key: &EntityKey,
    ) -> Result<Sellable, sqlx::Error> {
        match kind {
            EntityKind::Product => {
                let record = match key {
                    EntityKey::Id(id) => {
                        self.get_product_by_uuid(tx, ProductUuid::from_uuid(*id)).await?
                    }
                    EntityKey::Slug(slug) => self.get_product_by_slug(tx, slug).await?,
                };

                Ok(Sellable::Product(record.to_product()))
            }
        }
    }
}

impl<'r> FromRow<'r, PgRow> for ProductRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: ProductUuid::from_uuid(row.try_get("uuid")?),
            slug: row.try_get("slug")?,
            name: row.try_get("name")?,
            brand: row.try_get("brand")?,
            price: try_get_amount(row, "price")?,
            stock: try_get_quantity(row, "stock")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for ImageRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let kind_tag: String = row.try_get("owner_kind")?;
        let owner_kind = EntityKind::from_str(&kind_tag).map_err(|e| sqlx::Error::ColumnDecode {
            index: "owner_kind".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            uuid: row.try_get("uuid")?,
            owner_kind,
            owner_uuid: row.try_get("owner_uuid")?,
            url: row.try_get("url")?,
            use_in_slider: row.try_get("use_in_slider")?,
            sort_order: row.try_get("sort_order")?,
        })
    }
}
