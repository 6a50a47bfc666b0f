//! Customers service.

use async_trait::async_trait;
use decanter::catalog::{EntityKey, EntityRef};
use decanter::wishlist::Wishlist;
use mockall::automock;
use tracing::debug;

use crate::{
    database::Db,
    domain::{
        catalog::PgCatalogRepository,
        customers::{
            errors::CustomersServiceError,
            models::{CustomerRecord, CustomerUuid, NewCustomer},
            repositories::{PgCustomersRepository, PgWishlistsRepository},
        },
    },
};

#[derive(Debug, Clone)]
pub struct PgCustomersService {
    db: Db,
    customers_repository: PgCustomersRepository,
    wishlists_repository: PgWishlistsRepository,
    catalog_repository: PgCatalogRepository,
}

impl PgCustomersService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            customers_repository: PgCustomersRepository::new(),
            wishlists_repository: PgWishlistsRepository::new(),
            catalog_repository: PgCatalogRepository::new(),
        }
    }
}

#[async_trait]
impl CustomersService for PgCustomersService {
    async fn register_customer(
        &self,
        customer: NewCustomer,
    ) -> Result<CustomerRecord, CustomersServiceError> {
        let mut tx = self.db.begin().await?;

        let user = customer.user_uuid;

        // Insert-if-absent then select: a repeat registration for the same
        // user returns the existing profile.
        self.customers_repository
            .create_customer(&mut tx, customer)
            .await?;

        let record = self
            .customers_repository
            .get_customer_by_user(&mut tx, user)
            .await?;

        tx.commit().await?;

        debug!(customer = %record.uuid, "customer registered");

        Ok(record)
    }

    async fn get_customer(
        &self,
        customer: CustomerUuid,
    ) -> Result<CustomerRecord, CustomersServiceError> {
        let mut tx = self.db.begin().await?;

        let record = self
            .customers_repository
            .get_customer(&mut tx, customer)
            .await?;

        tx.commit().await?;

        Ok(record)
    }

    async fn add_to_wishlist(
        &self,
        customer: CustomerUuid,
        entity: EntityRef,
    ) -> Result<bool, CustomersServiceError> {
        let mut tx = self.db.begin().await?;

        // The wishlist table holds a polymorphic reference the database
        // cannot constrain, so confirm the entity exists before inserting.
        self.catalog_repository
            .resolve(&mut tx, entity.kind, &EntityKey::Id(entity.id))
            .await
            .map_err(|error| match error {
                sqlx::Error::RowNotFound => CustomersServiceError::NotFound,
                other => other.into(),
            })?;

        let added = self
            .wishlists_repository
            .add_item(&mut tx, customer, entity)
            .await?;

        tx.commit().await?;

        if added {
            debug!(customer = %customer, entity = %entity, "added to wishlist");
        }

        Ok(added)
    }

    async fn remove_from_wishlist(
        &self,
        customer: CustomerUuid,
        entity: EntityRef,
    ) -> Result<(), CustomersServiceError> {
        let mut tx = self.db.begin().await?;

        let removed = self
            .wishlists_repository
            .remove_item(&mut tx, customer, entity)
            .await?;

        if !removed {
            return Err(CustomersServiceError::NotFound);
        }

        tx.commit().await?;

        debug!(customer = %customer, entity = %entity, "removed from wishlist");

        Ok(())
    }

    async fn wishlist(&self, customer: CustomerUuid) -> Result<Wishlist, CustomersServiceError> {
        let mut tx = self.db.begin().await?;

        let entries = self
            .wishlists_repository
            .list_for_customer(&mut tx, customer)
            .await?;

        tx.commit().await?;

        let mut wishlist = Wishlist::new();
        for entry in &entries {
            wishlist.add(entry.entity_ref());
        }

        Ok(wishlist)
    }
}

#[automock]
#[async_trait]
pub trait CustomersService: Send + Sync {
    /// Register a customer profile for a user, returning the existing
    /// profile when the user already has one.
    async fn register_customer(
        &self,
        customer: NewCustomer,
    ) -> Result<CustomerRecord, CustomersServiceError>;

    /// Retrieve a single customer.
    async fn get_customer(
        &self,
        customer: CustomerUuid,
    ) -> Result<CustomerRecord, CustomersServiceError>;

    /// Add an entity to the customer's wishlist; `false` when it was already
    /// there. The reference must resolve in the catalog.
    async fn add_to_wishlist(
        &self,
        customer: CustomerUuid,
        entity: EntityRef,
    ) -> Result<bool, CustomersServiceError>;

    /// Remove an entity from the customer's wishlist.
    async fn remove_from_wishlist(
        &self,
        customer: CustomerUuid,
        entity: EntityRef,
    ) -> Result<(), CustomersServiceError>;

    /// The customer's wishlist, oldest entry first.
    async fn wishlist(&self, customer: CustomerUuid) -> Result<Wishlist, CustomersServiceError>;
}
