//! Database test utilities and shared infrastructure.

use once_cell::sync::Lazy;
use sqlx::{Connection, PgConnection, PgPool};
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres as PostgresImage;
use tokio::sync::{OnceCell, mpsc};

const DB_USER: &str = "decanter_test";
const DB_PASSWORD: &str = "decanter_test_password";

/// The reference schema every test database is provisioned with.
const SCHEMA_SQL: &str = include_str!("../../schema.sql");

/// Shared PostgreSQL container that starts once and is reused across all tests.
static POSTGRES_CONTAINER: Lazy<OnceCell<ContainerAsync<PostgresImage>>> = Lazy::new(OnceCell::new);

/// Cleanup channel for database cleanup requests.
static CLEANUP_SENDER: Lazy<OnceCell<mpsc::UnboundedSender<String>>> = Lazy::new(OnceCell::new);

/// Guards the identifiers interpolated into CREATE/DROP DATABASE statements.
///
/// Names must be 1-63 characters, start with a letter or underscore, and
/// contain only letters, digits, and underscores.
fn validate_database_name(name: &str) -> Result<(), String> {
    if name.is_empty() || name.len() > 63 {
        return Err("database name must be 1-63 characters long".to_string());
    }

    let starts_ok = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');

    if !starts_ok {
        return Err("database name must start with a letter or underscore".to_string());
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("database name can only contain letters, digits, and underscores".to_string());
    }

    Ok(())
}

fn container_host() -> String {
    std::env::var("TESTCONTAINERS_HOST_OVERRIDE").unwrap_or_else(|_| "localhost".to_string())
}

fn admin_url(port: u16) -> String {
    let host = container_host();
    format!("postgresql://{DB_USER}:{DB_PASSWORD}@{host}:{port}/postgres")
}

async fn init_postgres_container() -> ContainerAsync<PostgresImage> {
    PostgresImage::default()
        .with_user(DB_USER)
        .with_password(DB_PASSWORD)
        .with_db_name("decanter_test")
        .with_env_var("POSTGRES_INITDB_ARGS", "--auth-host=trust")
        .start()
        .await
        .expect("failed to start PostgreSQL container")
}

/// Initialize the background task draining database cleanup requests.
async fn init_cleanup_task() -> mpsc::UnboundedSender<String> {
    let (sender, mut receiver) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(db_name) = receiver.recv().await {
            if let Err(error) = drop_database(&db_name).await {
                eprintln!("failed to drop test database '{db_name}': {error}");
            }
        }
    });

    sender
}

/// Drop a test database by name.
async fn drop_database(db_name: &str) -> Result<(), sqlx::Error> {
    let Some(container) = POSTGRES_CONTAINER.get() else {
        return Ok(());
    };

    let Ok(port) = container.get_host_port_ipv4(5432).await else {
        return Ok(());
    };

    if validate_database_name(db_name).is_err() {
        return Ok(());
    }

    let mut conn = PgConnection::connect(&admin_url(port)).await?;

    sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\""))
        .execute(&mut conn)
        .await?;

    conn.close().await?;

    Ok(())
}

/// An isolated test database inside the shared container.
///
/// Each `TestDb` creates a uniquely named database with the reference schema
/// applied, so tests never observe each other's rows. Service methods commit
/// their own transactions normally; clean state comes from the per-test
/// database, not from rollback. The database is dropped in the background
/// once the handle goes out of scope.
#[derive(Debug, Clone)]
pub struct TestDb {
    /// PostgreSQL connection pool.
    pub pool: PgPool,

    /// PostgreSQL database name.
    pub name: String,
}

impl Drop for TestDb {
    fn drop(&mut self) {
        if let Some(sender) = CLEANUP_SENDER.get() {
            let _ = sender.send(self.name.clone());
        }
    }
}

impl TestDb {
    /// Create an isolated test database with a unique generated name.
    pub async fn new() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock before the epoch")
            .as_nanos();

        let thread_id = std::thread::current().id();

        let name = format!("decanter_test_{nanos}_{thread_id:?}").replace([':', ' ', '(', ')'], "");

        Self::new_with_db_name(&name).await
    }

    /// Create an isolated test database with the given name.
    pub async fn new_with_db_name(db_name: &str) -> Self {
        let _cleanup_sender = CLEANUP_SENDER.get_or_init(init_cleanup_task).await;

        if let Err(error) = validate_database_name(db_name) {
            panic!("invalid database name '{db_name}': {error}");
        }

        let container = POSTGRES_CONTAINER
            .get_or_init(init_postgres_container)
            .await;

        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("failed to get container port");

        let mut conn = PgConnection::connect(&admin_url(port))
            .await
            .expect("failed to connect to the admin database");

        sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
            .execute(&mut conn)
            .await
            .expect("failed to create test database");

        conn.close()
            .await
            .expect("failed to close admin connection");

        let host = container_host();
        let database_url = format!("postgresql://{DB_USER}:{DB_PASSWORD}@{host}:{port}/{db_name}");

        let pool = PgPool::connect(&database_url)
            .await
            .expect("failed to create pool for test database");

        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&pool)
            .await
            .expect("failed to apply schema to test database");

        Self {
            pool,
            name: db_name.to_string(),
        }
    }

    /// Returns the connection pool for this test database.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_database_names() {
        assert!(validate_database_name("decanter_test_1").is_ok());
        assert!(validate_database_name("_underscore_start").is_ok());
    }

    #[test]
    fn rejects_malformed_database_names() {
        assert!(validate_database_name("").is_err());
        assert!(validate_database_name(&"a".repeat(64)).is_err());
        assert!(validate_database_name("1_starts_with_digit").is_err());
        assert!(validate_database_name("has-hyphen").is_err());
        assert!(validate_database_name("has space").is_err());
    }

    #[tokio::test]
    async fn fresh_database_carries_the_schema() {
        let test_db = TestDb::new().await;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(test_db.pool())
            .await
            .expect("schema tables should exist");

        assert_eq!(count, 0);
    }
}
