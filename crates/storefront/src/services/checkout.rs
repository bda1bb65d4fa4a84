//! Checkout side effects around the pure [`CheckoutForm`].
//!
//! The form decides what is valid; this service does the I/O each step
//! needs: loading contact details and past addresses, storing and deleting
//! cash photos, and writing the final order.

use chrono::Utc;
use sqlx::PgPool;
use tracing::instrument;

use canopy_core::PaymentMethod;
use canopy_core::cart::Cart;
use canopy_core::checkout::{CashPhoto, CashPhotoReceipt, CheckoutError, CheckoutForm, OrderSubmission};

use crate::db::{OrderRepository, ProfileRepository, RepositoryError};
use crate::models::CurrentUser;
use crate::supabase::{SupabaseClient, SupabaseError, photo_path};

/// How many past addresses are offered at checkout.
const RECENT_ADDRESS_LIMIT: i64 = 5;

/// Errors from checkout side effects.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutServiceError {
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Storage(#[from] SupabaseError),
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    supabase: &'a SupabaseClient,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, supabase: &'a SupabaseClient) -> Self {
        Self { pool, supabase }
    }

    /// Start a checkout for `user`, pre-filled from their profile and past orders.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutServiceError::Repository` if the lookups fail.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn start(&self, user: &CurrentUser) -> Result<CheckoutForm, CheckoutServiceError> {
        let profile = ProfileRepository::new(self.pool)
            .get(&user.id)
            .await?
            .unwrap_or_default();
        let addresses = OrderRepository::new(self.pool)
            .recent_addresses(&user.id, RECENT_ADDRESS_LIMIT)
            .await?;

        Ok(CheckoutForm::new(
            profile.into_contact(user.email.clone()),
            addresses,
        ))
    }

    /// Store a cash photo and attach it to the form.
    ///
    /// A photo it replaces is deleted from storage.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::CashPhotoNotExpected` unless paying cash, or
    /// `CheckoutServiceError::Storage` if the upload fails. The form is left
    /// unchanged on error.
    #[instrument(skip(self, user, form, photo), fields(user_id = %user.id, size = photo.len()))]
    pub async fn attach_photo(
        &self,
        user: &CurrentUser,
        form: &mut CheckoutForm,
        photo: CashPhoto,
    ) -> Result<CashPhotoReceipt, CheckoutServiceError> {
        if !form.payment_method().is_some_and(PaymentMethod::requires_photo) {
            return Err(CheckoutError::CashPhotoNotExpected.into());
        }

        let format = photo.format();
        let captured_at = Utc::now();
        let path = photo_path(&user.id, format, captured_at);
        let size = photo.len();
        self.supabase
            .upload_object(&path, format.mime(), photo.into_bytes())
            .await?;

        let receipt = CashPhotoReceipt {
            path,
            format,
            size,
            captured_at,
        };
        if let Some(old) = form.attach_cash_photo(receipt.clone())? {
            self.discard_photo(&old).await;
        }
        Ok(receipt)
    }

    /// Change payment method, deleting a photo the change discards.
    pub async fn set_payment_method(&self, form: &mut CheckoutForm, method: PaymentMethod) {
        if let Some(discarded) = form.set_payment_method(method) {
            self.discard_photo(&discarded).await;
        }
    }

    /// Best-effort removal of a photo that is no longer referenced.
    pub async fn discard_photo(&self, receipt: &CashPhotoReceipt) {
        if let Err(e) = self.supabase.delete_object(&receipt.path).await {
            tracing::warn!(path = %receipt.path, error = %e, "Failed to delete discarded cash photo");
        }
    }

    /// Validate the form against the cart and store the order.
    ///
    /// # Errors
    ///
    /// Returns the first unmet checkout precondition, or a repository error
    /// if the order could not be written (in which case nothing was stored).
    #[instrument(skip(self, user, form, cart), fields(user_id = ?user.map(|u| u.id.as_str())))]
    pub async fn submit(
        &self,
        user: Option<&CurrentUser>,
        form: &CheckoutForm,
        cart: &Cart,
    ) -> Result<OrderSubmission, CheckoutServiceError> {
        let order = form.submit(user.map(|u| &u.id), cart)?;
        OrderRepository::new(self.pool).insert(&order).await?;
        tracing::info!(
            order_id = %order.id,
            payment = %order.payment,
            items = order.item_count,
            "Order submitted"
        );
        Ok(order)
    }
}
