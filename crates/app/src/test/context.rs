//! Test context for service-level integration tests.

use crate::{
    database::Db,
    domain::{
        carts::PgCartsService, catalog::PgCatalogService, customers::PgCustomersService,
        notifications::PgNotificationsService, orders::PgOrdersService,
    },
};

use super::db::TestDb;

pub struct TestContext {
    pub db: TestDb,
    pub catalog: PgCatalogService,
    pub carts: PgCartsService,
    pub customers: PgCustomersService,
    pub orders: PgOrdersService,
    pub notifications: PgNotificationsService,
}

impl TestContext {
    pub async fn new() -> Self {
        let test_db = TestDb::new().await;
        let db = Db::new(test_db.pool().clone());

        Self {
            catalog: PgCatalogService::new(db.clone()),
            carts: PgCartsService::new(db.clone()),
            customers: PgCustomersService::new(db.clone()),
            orders: PgOrdersService::new(db.clone()),
            notifications: PgNotificationsService::new(db),
            db: test_db,
        }
    }
}
