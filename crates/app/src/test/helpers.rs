//! Test Helpers

use crate::{
    domain::{
        catalog::{
            CatalogService,
            models::{NewProduct, ProductRecord, ProductUuid},
        },
        customers::{
            CustomersService,
            models::{CustomerRecord, CustomerUuid, NewCustomer, UserUuid},
        },
    },
    test::TestContext,
};

pub(crate) async fn create_product(
    ctx: &TestContext,
    slug: &str,
    price: u64,
    stock: u32,
) -> ProductRecord {
    ctx.catalog
        .create_product(NewProduct {
            uuid: ProductUuid::generate(),
            slug: slug.to_string(),
            name: slug.to_string(),
            brand: None,
            price,
            stock,
        })
        .await
        .expect("create_product should succeed")
}

pub(crate) async fn register_customer(ctx: &TestContext) -> CustomerRecord {
    ctx.customers
        .register_customer(NewCustomer {
            uuid: CustomerUuid::generate(),
            user_uuid: UserUuid::generate(),
            phone: None,
            birth_date: None,
        })
        .await
        .expect("register_customer should succeed")
}
