//! Order persistence.
//!
//! An order and its lines are written in one transaction: either the whole
//! submission is stored or nothing is.

use sqlx::PgPool;
use tracing::instrument;

use canopy_core::UserId;
use canopy_core::checkout::{Address, NewAddress, OrderSubmission};

use super::RepositoryError;

/// Internal row type for previously used shipping addresses.
#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    company: Option<String>,
    line1: String,
    line2: Option<String>,
    city: String,
    state: String,
    zip: String,
    country: Option<String>,
}

impl AddressRow {
    /// Re-validate a stored address, giving it a fresh form id.
    fn into_address(self) -> Option<Address> {
        NewAddress {
            company: self.company,
            line1: self.line1,
            line2: self.line2,
            city: self.city,
            state: self.state,
            zip: self.zip,
            country: self.country,
        }
        .validate()
        .ok()
    }
}

fn to_i32(value: u32, what: &str) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("{what} out of range: {value}")))
}

/// Repository for submitted orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a validated order and its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order id already exists.
    /// Returns `RepositoryError::Database` for other database errors; in
    /// every error case nothing is written.
    #[instrument(skip(self, order), fields(order_id = %order.id, lines = order.lines.len()))]
    pub async fn insert(&self, order: &OrderSubmission) -> Result<(), RepositoryError> {
        let item_count = to_i32(order.item_count, "item count")?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO storefront.orders (
                id, user_id,
                contact_first_name, contact_last_name, contact_email, contact_phone,
                company, line1, line2, city, state, zip, country,
                fulfillment_method, payment_method, cash_photo_path,
                item_count, total, submitted_at
            )
            VALUES ($1::uuid, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            ",
        )
        .bind(order.id.as_str())
        .bind(order.user_id.as_str())
        .bind(&order.contact.first_name)
        .bind(&order.contact.last_name)
        .bind(order.contact.email.as_str())
        .bind(order.contact.phone.as_deref())
        .bind(order.address.company.as_deref())
        .bind(&order.address.line1)
        .bind(order.address.line2.as_deref())
        .bind(&order.address.city)
        .bind(&order.address.state)
        .bind(&order.address.zip)
        .bind(&order.address.country)
        .bind(order.fulfillment.to_string())
        .bind(order.payment.to_string())
        .bind(order.cash_photo.as_ref().map(|p| p.path.as_str()))
        .bind(item_count)
        .bind(order.total)
        .bind(order.submitted_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "order"))?;

        for (position, line) in order.lines.iter().enumerate() {
            let position = i32::try_from(position).map_err(|_| {
                RepositoryError::DataCorruption("too many order lines".to_string())
            })?;
            sqlx::query(
                r"
                INSERT INTO storefront.order_lines (order_id, position, product_id, name, unit_price, quantity)
                VALUES ($1::uuid, $2, $3, $4, $5, $6)
                ",
            )
            .bind(order.id.as_str())
            .bind(position)
            .bind(line.product_id.as_str())
            .bind(&line.name)
            .bind(line.unit_price.amount())
            .bind(to_i32(line.quantity, "quantity")?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Distinct shipping addresses from the user's past orders, most recent first.
    ///
    /// Stored addresses that no longer validate are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn recent_addresses(
        &self,
        user_id: &UserId,
        limit: i64,
    ) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT company, line1, line2, city, state, zip, country, last_used
            FROM (
                SELECT DISTINCT ON (lower(line1), lower(coalesce(line2, '')), lower(city), lower(state), zip)
                       company, line1, line2, city, state, zip, country,
                       submitted_at AS last_used
                FROM storefront.orders
                WHERE user_id = $1
                ORDER BY lower(line1), lower(coalesce(line2, '')), lower(city), lower(state), zip,
                         submitted_at DESC
            ) recent
            ORDER BY last_used DESC
            LIMIT $2
            ",
        )
        .bind(user_id.as_str())
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(AddressRow::into_address).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(line1: &str) -> AddressRow {
        AddressRow {
            company: Some("Green Leaf LLC".to_string()),
            line1: line1.to_string(),
            line2: None,
            city: "Bozeman".to_string(),
            state: "MT".to_string(),
            zip: "59715".to_string(),
            country: None,
        }
    }

    #[test]
    fn test_address_row_revalidates() {
        let address = row("416 N Ida Ave").into_address().unwrap();
        assert_eq!(address.country, "USA");
        assert_eq!(address.company.as_deref(), Some("Green Leaf LLC"));
        assert!(row("   ").into_address().is_none());
    }

    #[test]
    fn test_to_i32_range() {
        assert_eq!(to_i32(3, "quantity").unwrap(), 3);
        assert!(matches!(
            to_i32(u32::MAX, "quantity"),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
