//! Notify-me requests for backordered products.

use sqlx::PgPool;
use tracing::instrument;

use canopy_core::{Email, ProductId};

use super::RepositoryError;

/// Repository for backorder notification requests.
pub struct BackorderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BackorderRepository<'a> {
    /// Create a new backorder repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record that `email` wants to hear when `product_id` is back.
    ///
    /// Asking twice is not an error. Returns `true` when a new request was
    /// stored and `false` when one already existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, email), fields(product_id = %product_id))]
    pub async fn request(&self, product_id: &ProductId, email: &Email) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO storefront.backorder_requests (product_id, email)
            VALUES ($1, $2)
            ON CONFLICT (product_id, email) DO NOTHING
            ",
        )
        .bind(product_id.as_str())
        .bind(email.as_str())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
