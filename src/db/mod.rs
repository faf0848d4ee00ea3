//! Postgres persistence.
//!
//! Each module owns the SQL for one table family. Rows come back as `*Row`
//! structs and are converted into domain values with `TryFrom`, so an
//! unknown status label in the database surfaces as an error instead of a
//! silently wrong variant.

pub mod cart;
pub mod complaints;
pub mod invoices;
pub mod ledger;
pub mod notifications;
pub mod offers;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod stores;
pub mod users;
pub mod withdrawals;

use crate::error::{Error, Result};

pub use invoices::PgInvoiceRepository;
pub use ledger::PgBalanceLedger;
pub use notifications::PgNotificationRepository;
pub use orders::PgOrderRepository;

/// Non-negative `INTEGER` column into `u32`.
pub(crate) fn to_u32(column: &str, value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::Internal(format!("negative {} in database: {}", column, value)))
}

/// Maps a unique-constraint violation to `Conflict`, leaving other errors as they are.
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict(message.to_string()),
        _ => Error::Database(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_u32_rejects_negative() {
        assert_eq!(to_u32("stock", 4).unwrap(), 4);
        assert!(matches!(to_u32("stock", -1), Err(Error::Internal(_))));
    }

    #[test]
    fn test_non_unique_errors_pass_through() {
        assert!(matches!(conflict_on_unique(sqlx::Error::RowNotFound, "taken"), Error::Database(_)));
    }
}
