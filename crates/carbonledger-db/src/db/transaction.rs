//! Database transaction utilities
//!
//! Helper for multi-step operations that need atomicity, such as
//! organization creation (organization + owner membership + subscription)
//! and incident status transitions (status update + audit log).

use carbonledger_core::AppError;
use sqlx::{PgPool, Postgres, Transaction};

/// Execute a closure within a database transaction.
///
/// Begins a transaction, executes the closure, and commits if successful or
/// rolls back on error. Domain errors raised inside the closure propagate
/// unchanged; begin/commit failures surface as database errors.
///
/// # Example
///
/// ```ignore
/// use carbonledger_db::db::transaction::with_transaction;
///
/// async fn example(pool: &sqlx::PgPool) -> Result<(), carbonledger_core::AppError> {
///     with_transaction(pool, |tx| Box::pin(async move {
///         sqlx::query("INSERT INTO ...").execute(&mut **tx).await?;
///         sqlx::query("UPDATE ...").execute(&mut **tx).await?;
///         Ok(())
///     })).await
/// }
/// ```
pub async fn with_transaction<F, R>(pool: &PgPool, f: F) -> Result<R, AppError>
where
    F: for<'a> FnOnce(
        &'a mut Transaction<'_, Postgres>,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<R, AppError>> + Send + 'a>,
    >,
{
    let mut tx = pool.begin().await.map_err(AppError::Database)?;

    match f(&mut tx).await {
        Ok(result) => {
            tx.commit().await.map_err(AppError::Database)?;
            Ok(result)
        }
        Err(e) => {
            tx.rollback().await.ok(); // Ignore rollback errors
            Err(e)
        }
    }
}
