//! # Services
//!
//! Business operations that span several repositories.
//!
//! - [`sale`] - Record and delete sales in one transaction
//! - [`report`] - Load rows and hand them to the core report functions
//! - [`export`] - Sales CSV export
//!
//! ## Error Codes
//! ```text
//! ┌────────────────────────────┬──────────────────────┬───────────────────┐
//! │ SaleError                  │ code()               │ Anything written? │
//! ├────────────────────────────┼──────────────────────┼───────────────────┤
//! │ Validation                 │ VALIDATION_ERROR     │ no                │
//! │ NotFound                   │ NOT_FOUND            │ no                │
//! │ InsufficientStock          │ INSUFFICIENT_STOCK   │ no                │
//! │ Persistence                │ DATABASE_ERROR       │ no (rolled back)  │
//! │ Timeout                    │ TIMEOUT              │ no (rolled back)  │
//! └────────────────────────────┴──────────────────────┴───────────────────┘
//! ```

pub mod export;
pub mod report;
pub mod sale;

use std::time::Duration;
use thiserror::Error;

use crate::error::DbError;
use threadgood_core::{CoreError, Size, ValidationError};

/// What a caller of [`sale::SaleService`] sees when an operation fails.
#[derive(Debug, Error)]
pub enum SaleError {
    /// Bad input or a business rule rejected the sale.
    #[error("{0}")]
    Validation(CoreError),

    /// A referenced product, customer or sale does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The requested size does not have enough units.
    #[error("Insufficient stock for {sku} size {size}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        size: Size,
        available: u32,
        requested: u32,
    },

    /// A database write failed and the transaction was rolled back.
    #[error("{0}")]
    Persistence(DbError),

    /// The operation ran past its deadline before reaching COMMIT and was
    /// rolled back. Commits are never cut short by the deadline.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl SaleError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        SaleError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Machine-readable error code for the dashboard.
    pub fn code(&self) -> &'static str {
        match self {
            SaleError::Validation(_) => "VALIDATION_ERROR",
            SaleError::NotFound { .. } => "NOT_FOUND",
            SaleError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            SaleError::Persistence(_) => "DATABASE_ERROR",
            SaleError::Timeout(_) => "TIMEOUT",
        }
    }
}

impl From<ValidationError> for SaleError {
    fn from(err: ValidationError) -> Self {
        SaleError::Validation(CoreError::Validation(err))
    }
}

impl From<CoreError> for SaleError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                sku,
                size,
                available,
                requested,
            } => SaleError::InsufficientStock {
                sku,
                size,
                available,
                requested,
            },
            other => SaleError::Validation(other),
        }
    }
}

/// Validation and missing rows keep their own codes; everything else is a
/// persistence failure.
impl From<DbError> for SaleError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Invalid(v) => v.into(),
            DbError::NotFound { entity, id } => SaleError::NotFound { entity, id },
            other => SaleError::Persistence(other),
        }
    }
}

pub type SaleResult<T> = Result<T, SaleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let validation: SaleError = ValidationError::required("product id").into();
        assert_eq!(validation.code(), "VALIDATION_ERROR");

        let missing = SaleError::not_found("Sale", "s1");
        assert_eq!(missing.code(), "NOT_FOUND");

        let stock: SaleError = CoreError::InsufficientStock {
            sku: "HD-01".into(),
            size: Size::M,
            available: 1,
            requested: 2,
        }
        .into();
        assert_eq!(stock.code(), "INSUFFICIENT_STOCK");

        assert_eq!(SaleError::Timeout(Duration::from_secs(10)).code(), "TIMEOUT");
    }

    #[test]
    fn test_db_errors_keep_their_meaning() {
        let invalid: SaleError = DbError::Invalid(ValidationError::required("mobile")).into();
        assert_eq!(invalid.code(), "VALIDATION_ERROR");

        let missing: SaleError = DbError::not_found("Customer", "c1").into();
        assert_eq!(missing.to_string(), "Customer not found: c1");

        let write: SaleError = DbError::CheckViolation("CHECK constraint failed".into()).into();
        assert_eq!(write.code(), "DATABASE_ERROR");
        assert_eq!(write.to_string(), "Constraint violation: CHECK constraint failed");
    }

    #[test]
    fn test_inactive_product_is_a_validation_error() {
        let err: SaleError = CoreError::ProductInactive("HD-01".into()).into();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(err.to_string(), "Product HD-01 is inactive and cannot be sold");
    }
}
