//! Repository implementations, one module per aggregate.

pub mod incident;
pub mod invite;
pub mod material;
pub mod member;
pub mod organization;
pub mod profile;
pub mod project;
pub mod subscription;
pub mod transaction;
pub mod upload;

use carbonledger_core::AppError;

/// Map a sqlx unique-constraint violation onto a domain error, falling back
/// to the generic database variant.
pub(crate) fn map_unique_violation(err: sqlx::Error, on_conflict: AppError) -> AppError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return on_conflict;
        }
    }
    AppError::Database(err)
}
