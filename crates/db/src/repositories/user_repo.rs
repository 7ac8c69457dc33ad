//! Repository for the `users` table.
//!
//! Rows are created and deleted by the identity-sync webhook; the ledger
//! and reconciliation repositories only touch `paid_credits`.

use sqlx::PgPool;

use crate::models::user::User;

/// Column list for `users` queries.
const COLUMNS: &str = "id, auth_id, email, paid_credits, created_at, updated_at";

/// Provides CRUD operations for identity-synced users.
pub struct UserRepo;

impl UserRepo {
    /// Create a user for a first-seen identity.
    ///
    /// Uses `ON CONFLICT (auth_id) DO NOTHING` so a redelivered create event
    /// is a no-op: returns `None` when the identity already exists.
    pub async fn create(
        pool: &PgPool,
        auth_id: &str,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (auth_id, email) VALUES ($1, $2) \
             ON CONFLICT (auth_id) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(auth_id)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Look up a user by external auth identifier.
    pub async fn find_by_auth_id(
        pool: &PgPool,
        auth_id: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE auth_id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(auth_id)
            .fetch_optional(pool)
            .await
    }

    /// Update profile fields from an identity-update event.
    ///
    /// Returns `None` if the identity is unknown (caller surfaces a 500 so
    /// the provider retries).
    pub async fn update_email(
        pool: &PgPool,
        auth_id: &str,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET email = $2, updated_at = NOW() \
             WHERE auth_id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(auth_id)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Delete a user on an identity-deletion event.
    ///
    /// Restorations and purchases cascade. Returns `false` for unknown ids.
    pub async fn delete_by_auth_id(pool: &PgPool, auth_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE auth_id = $1")
            .bind(auth_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
