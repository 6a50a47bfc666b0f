//! Carts service errors.

use decanter::cart::CartError;
use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CartsServiceError {
    #[error("cart not found")]
    NotFound,

    #[error("referenced catalog entity not found")]
    EntityNotFound,

    #[error("cart is frozen; it already belongs to an order")]
    CartFrozen,

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("cart already exists")]
    AlreadyExists,

    #[error("related resource not found")]
    InvalidReference,

    #[error("missing required data")]
    MissingRequiredData,

    #[error("invalid data")]
    InvalidData,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for CartsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            Some(ErrorKind::NotNullViolation) => Self::MissingRequiredData,
            Some(ErrorKind::CheckViolation) => Self::InvalidData,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use decanter::catalog::{EntityKind, EntityRef};
    use uuid::Uuid;

    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let mapped = CartsServiceError::from(Error::RowNotFound);

        assert!(
            matches!(mapped, CartsServiceError::NotFound),
            "expected NotFound, got {mapped:?}"
        );
    }

    // Out-of-range amounts surface as ColumnDecode from the row helpers
    // and stay inside the Sql variant.
    #[test]
    fn column_decode_failures_map_to_sql() {
        let decode = Error::ColumnDecode {
            index: "final_price".to_string(),
            source: "value out of range".into(),
        };

        let mapped = CartsServiceError::from(decode);

        assert!(
            matches!(mapped, CartsServiceError::Sql(_)),
            "expected Sql, got {mapped:?}"
        );
    }

    #[test]
    fn core_cart_errors_pass_through_transparently() {
        let entity = EntityRef {
            kind: EntityKind::Product,
            id: Uuid::now_v7(),
        };

        let mapped = CartsServiceError::from(CartError::ItemNotFound(entity));

        assert_eq!(
            mapped.to_string(),
            CartError::ItemNotFound(entity).to_string()
        );
    }
}
