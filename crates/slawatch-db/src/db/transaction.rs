//! Database transaction utilities
//!
//! Writers that touch more than one row in a single logical operation (the
//! breach scan marking emails and inserting alerts) run inside a
//! `TransactionGuard` so a failure anywhere rolls the whole operation back.

use anyhow::Context;
use slawatch_core::AppError;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

/// A database transaction wrapper with explicit commit/rollback
///
/// # Example
///
/// ```ignore
/// use slawatch_db::TransactionGuard;
///
/// async fn example(pool: &sqlx::PgPool) -> Result<(), slawatch_core::AppError> {
///     let mut tx = TransactionGuard::begin(pool).await?;
///     sqlx::query("UPDATE emails SET ...").execute(tx.conn()?).await?;
///     tx.commit().await
/// }
/// ```
pub struct TransactionGuard {
    transaction: Option<Transaction<'static, Postgres>>,
}

impl TransactionGuard {
    /// Begin a new database transaction
    pub async fn begin(pool: &PgPool) -> Result<Self, AppError> {
        let transaction = pool
            .begin()
            .await
            .context("Failed to begin database transaction")?;

        Ok(Self {
            transaction: Some(transaction),
        })
    }

    /// Connection bound to the open transaction
    pub fn conn(&mut self) -> Result<&mut PgConnection, AppError> {
        self.transaction
            .as_deref_mut()
            .ok_or_else(|| AppError::Internal("Transaction already finished".to_string()))
    }

    pub async fn commit(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.commit()
                .await
                .context("Failed to commit database transaction")?;
        }
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.rollback()
                .await
                .context("Failed to rollback database transaction")?;
        }
        Ok(())
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        // sqlx queues a ROLLBACK when an open transaction is dropped
        if self.transaction.is_some() {
            tracing::warn!("Transaction dropped without commit or rollback - rolling back");
        }
    }
}
