//! Customer profiles.
//!
//! `public.profiles` is keyed by the auth user id and maintained by the
//! backend; the storefront only reads contact details from it.

use sqlx::PgPool;
use tracing::instrument;

use canopy_core::checkout::ContactInfo;
use canopy_core::{Email, UserId};

use super::RepositoryError;

/// Internal row type for profile queries.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
}

/// Contact fields stored on a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            first_name: row.first_name.unwrap_or_default().trim().to_string(),
            last_name: row.last_name.unwrap_or_default().trim().to_string(),
            phone: row.phone.filter(|p| !p.trim().is_empty()),
        }
    }
}

impl Profile {
    /// Combine with the signed-in email into checkout contact info.
    #[must_use]
    pub fn into_contact(self, email: Email) -> ContactInfo {
        ContactInfo {
            first_name: self.first_name,
            last_name: self.last_name,
            email,
            phone: self.phone,
        }
    }
}

/// Repository for profile reads.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Profile for a user, or `None` if the backend has not created one yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get(&self, user_id: &UserId) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"
            SELECT first_name, last_name, phone
            FROM public.profiles
            WHERE id::text = $1
            ",
        )
        .bind(user_id.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Profile::from))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_row_normalizes_blanks() {
        let profile = Profile::from(ProfileRow {
            first_name: Some(" Dana ".to_string()),
            last_name: None,
            phone: Some("  ".to_string()),
        });
        assert_eq!(profile.first_name, "Dana");
        assert_eq!(profile.last_name, "");
        assert!(profile.phone.is_none());
    }

    #[test]
    fn test_missing_profile_still_yields_contact() {
        let contact = Profile::default().into_contact(Email::parse("dana@example.com").unwrap());
        assert_eq!(contact.display_name(), "dana@example.com");
    }
}
