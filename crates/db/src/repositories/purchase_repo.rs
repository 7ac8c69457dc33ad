//! Payment reconciliation against the `purchases` table.

use sqlx::PgPool;

use photolift_core::types::DbId;

use crate::models::purchase::{NewPurchase, Purchase};

/// Column list for `purchases` queries.
const COLUMNS: &str =
    "id, user_id, external_payment_id, credits_purchased, amount_paid, package_type, created_at";

/// Outcome of applying a verified payment event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// First delivery: purchase recorded and balance incremented.
    Applied { new_balance: i32 },
    /// The payment id was already reconciled; nothing was written.
    Duplicate,
}

/// Records reconciled payments and applies credit top-ups.
pub struct PurchaseRepo;

impl PurchaseRepo {
    /// Idempotency gate plus credit application, as one transaction.
    ///
    /// `INSERT ... ON CONFLICT (external_payment_id) DO NOTHING` is the
    /// critical section: a redelivered or concurrently racing event inserts
    /// no row and the transaction applies nothing. Only the first writer
    /// reaches the balance increment.
    pub async fn apply(
        pool: &PgPool,
        user_id: DbId,
        input: &NewPurchase,
    ) -> Result<PurchaseOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let inserted: Option<DbId> = sqlx::query_scalar(
            "INSERT INTO purchases \
                 (user_id, external_payment_id, credits_purchased, amount_paid, package_type) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (external_payment_id) DO NOTHING \
             RETURNING id",
        )
        .bind(user_id)
        .bind(&input.external_payment_id)
        .bind(input.credits_purchased)
        .bind(input.amount_paid)
        .bind(&input.package_type)
        .fetch_optional(&mut *tx)
        .await?;

        if inserted.is_none() {
            return Ok(PurchaseOutcome::Duplicate);
        }

        let new_balance: i32 = sqlx::query_scalar(
            "UPDATE users \
             SET paid_credits = paid_credits + $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING paid_credits",
        )
        .bind(user_id)
        .bind(input.credits_purchased)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(PurchaseOutcome::Applied { new_balance })
    }

    /// Look up a reconciled payment by provider id.
    pub async fn find_by_external_id(
        pool: &PgPool,
        external_payment_id: &str,
    ) -> Result<Option<Purchase>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM purchases WHERE external_payment_id = $1");
        sqlx::query_as::<_, Purchase>(&query)
            .bind(external_payment_id)
            .fetch_optional(pool)
            .await
    }
}
