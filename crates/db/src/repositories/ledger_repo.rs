//! Atomic ledger operations over `users` and `restorations`.
//!
//! Each operation runs as a single transaction. The paid-pool deduction is
//! a conditional `UPDATE ... AND paid_credits > 0`, so two concurrent
//! commits racing for the last credit resolve at the database: exactly one
//! sees a row updated, the other observes zero rows and reports
//! insufficient capacity. No negative balances, ever.

use sqlx::PgPool;

use photolift_core::types::DbId;

/// Result row of a successful deduct-and-record.
#[derive(Debug, Clone, Copy)]
pub struct CommitRow {
    pub restoration_id: DbId,
    pub remaining_paid_credits: i32,
}

/// The three ledger operations (see `PgCreditLedger` for the trait facade).
pub struct LedgerRepo;

impl LedgerRepo {
    /// Resolve the internal id and paid balance for an external identity.
    pub async fn find_balance(
        pool: &PgPool,
        auth_id: &str,
    ) -> Result<Option<(DbId, i32)>, sqlx::Error> {
        sqlx::query_as::<_, (DbId, i32)>(
            "SELECT id, paid_credits FROM users WHERE auth_id = $1",
        )
        .bind(auth_id)
        .fetch_optional(pool)
        .await
    }

    /// Atomically deduct one paid credit (unless `use_free_credit`) and
    /// insert the restoration row.
    ///
    /// Returns `Ok(None)` when the paid pool is already empty or the user
    /// row has vanished; nothing is written in that case.
    pub async fn deduct_and_record(
        pool: &PgPool,
        user_id: DbId,
        original_label: &str,
        output_reference: &str,
        use_free_credit: bool,
    ) -> Result<Option<CommitRow>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let remaining: Option<i32> = if use_free_credit {
            // Free-pool commits leave the paid balance untouched; read it
            // for the receipt.
            sqlx::query_scalar("SELECT paid_credits FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?
        } else {
            sqlx::query_scalar(
                "UPDATE users \
                 SET paid_credits = paid_credits - 1, updated_at = NOW() \
                 WHERE id = $1 AND paid_credits > 0 \
                 RETURNING paid_credits",
            )
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
        };

        let Some(remaining_paid_credits) = remaining else {
            return Ok(None);
        };

        let restoration_id: DbId = sqlx::query_scalar(
            "INSERT INTO restorations (user_id, original_label, output_reference, used_free_credit) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(user_id)
        .bind(original_label)
        .bind(output_reference)
        .bind(use_free_credit)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(CommitRow {
            restoration_id,
            remaining_paid_credits,
        }))
    }

    /// Compensate a committed restoration: restore the paid credit (if one
    /// was used) and delete the row.
    ///
    /// Returns `false` for unknown ids, including ids already rolled back;
    /// repeated invocation never double-credits.
    pub async fn rollback_restoration(
        pool: &PgPool,
        restoration_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let row: Option<(DbId, bool)> = sqlx::query_as(
            "SELECT user_id, used_free_credit FROM restorations WHERE id = $1 FOR UPDATE",
        )
        .bind(restoration_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((user_id, used_free_credit)) = row else {
            return Ok(false);
        };

        if !used_free_credit {
            sqlx::query(
                "UPDATE users SET paid_credits = paid_credits + 1, updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM restorations WHERE id = $1")
            .bind(restoration_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}
