//! The checkout form and order submission.
//!
//! Checkout is a single validated form rather than a strict wizard: the
//! shopper can revise the address, fulfillment and payment choices in any
//! order, and [`CheckoutForm::submit`] checks every precondition at once.
//! Paying cash adds one branch: a photo of the cash must be attached first.

pub mod address;
pub mod capture;
pub mod photo;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use address::{Address, AddressError, DEFAULT_COUNTRY, NewAddress};
pub use capture::{CameraDevice, CaptureError, CaptureState, MediaStream, PhotoCapture, StreamGuard};
pub use photo::{CashPhoto, CashPhotoReceipt, ImageFormat, MAX_PHOTO_BYTES, PhotoError};

use crate::cart::Cart;
use crate::types::{
    AddressId, Email, FulfillmentMethod, OrderId, PaymentMethod, Price, ProductId, UserId,
    format_usd,
};

/// Why a checkout action was refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Please sign in to place your order")]
    NotAuthenticated,
    #[error("Your cart is empty")]
    EmptyCart,
    #[error("Please select a shipping address")]
    NoAddressSelected,
    #[error("That address is no longer available")]
    UnknownAddress(AddressId),
    #[error("Please choose a fulfillment method")]
    NoFulfillmentMethod,
    #[error("Please choose a payment method")]
    NoPaymentMethod,
    #[error("Please take a photo of your cash payment before placing the order")]
    CashPhotoRequired,
    #[error("A cash photo is only needed when paying cash")]
    CashPhotoNotExpected,
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// Who is placing the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: Option<String>,
}

impl ContactInfo {
    /// `First Last`, or the email when no name is on file.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        if name.is_empty() {
            self.email.to_string()
        } else {
            name.to_string()
        }
    }
}

/// What the form still needs before it can be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    AddressSelect,
    FulfillmentSelect,
    PaymentSelect,
    CashVerification,
    ReadyToSubmit,
}

/// The shopper's in-progress checkout. Lives in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutForm {
    contact: ContactInfo,
    addresses: Vec<Address>,
    selected_address_id: Option<AddressId>,
    fulfillment_method: Option<FulfillmentMethod>,
    payment_method: Option<PaymentMethod>,
    cash_photo: Option<CashPhotoReceipt>,
}

impl CheckoutForm {
    /// Start a checkout. The first address becomes the default and is
    /// pre-selected; fulfillment and payment start at their defaults.
    #[must_use]
    pub fn new(contact: ContactInfo, mut addresses: Vec<Address>) -> Self {
        for (idx, address) in addresses.iter_mut().enumerate() {
            address.is_default = idx == 0;
        }
        let selected_address_id = addresses.first().map(|a| a.id.clone());
        Self {
            contact,
            addresses,
            selected_address_id,
            fulfillment_method: Some(FulfillmentMethod::default()),
            payment_method: Some(PaymentMethod::default()),
            cash_photo: None,
        }
    }

    #[must_use]
    pub const fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    #[must_use]
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    #[must_use]
    pub fn selected_address(&self) -> Option<&Address> {
        let id = self.selected_address_id.as_ref()?;
        self.addresses.iter().find(|a| &a.id == id)
    }

    #[must_use]
    pub const fn fulfillment_method(&self) -> Option<FulfillmentMethod> {
        self.fulfillment_method
    }

    #[must_use]
    pub const fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    #[must_use]
    pub const fn cash_photo(&self) -> Option<&CashPhotoReceipt> {
        self.cash_photo.as_ref()
    }

    /// Add a shipping address and select it.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Address` if a required field is missing.
    pub fn add_address(&mut self, new: NewAddress) -> Result<&Address, CheckoutError> {
        let address = new.validate()?;
        self.selected_address_id = Some(address.id.clone());
        self.addresses.push(address);
        self.addresses
            .last()
            .ok_or(CheckoutError::NoAddressSelected)
    }

    /// Select one of the form's addresses.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::UnknownAddress` if the ID is not on the form.
    pub fn select_address(&mut self, id: &AddressId) -> Result<(), CheckoutError> {
        if !self.addresses.iter().any(|a| &a.id == id) {
            return Err(CheckoutError::UnknownAddress(id.clone()));
        }
        self.selected_address_id = Some(id.clone());
        Ok(())
    }

    pub fn set_fulfillment_method(&mut self, method: FulfillmentMethod) {
        self.fulfillment_method = Some(method);
    }

    /// Change the payment method.
    ///
    /// Moving away from cash discards any attached cash photo and returns it
    /// so the caller can delete the stored object.
    pub fn set_payment_method(&mut self, method: PaymentMethod) -> Option<CashPhotoReceipt> {
        self.payment_method = Some(method);
        if method.requires_photo() {
            None
        } else {
            self.cash_photo.take()
        }
    }

    /// Attach the stored cash photo, replacing (and returning) any earlier one.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::CashPhotoNotExpected` unless paying cash.
    pub fn attach_cash_photo(
        &mut self,
        receipt: CashPhotoReceipt,
    ) -> Result<Option<CashPhotoReceipt>, CheckoutError> {
        if !self.payment_method.is_some_and(PaymentMethod::requires_photo) {
            return Err(CheckoutError::CashPhotoNotExpected);
        }
        Ok(self.cash_photo.replace(receipt))
    }

    /// Drop the attached photo so the shopper can retake it.
    pub fn clear_cash_photo(&mut self) -> Option<CashPhotoReceipt> {
        self.cash_photo.take()
    }

    /// The first thing still missing, or `ReadyToSubmit`.
    #[must_use]
    pub fn step(&self) -> CheckoutStep {
        if self.selected_address().is_none() {
            return CheckoutStep::AddressSelect;
        }
        if self.fulfillment_method.is_none() {
            return CheckoutStep::FulfillmentSelect;
        }
        match self.payment_method {
            None => CheckoutStep::PaymentSelect,
            Some(method) if method.requires_photo() && self.cash_photo.is_none() => {
                CheckoutStep::CashVerification
            }
            Some(_) => CheckoutStep::ReadyToSubmit,
        }
    }

    /// Validate the form against the cart and produce the order to record.
    ///
    /// The form itself is not consumed: the caller discards it only once the
    /// order has been stored, so a failed write can be retried.
    ///
    /// # Errors
    ///
    /// Returns the first unmet precondition.
    pub fn submit(&self, user: Option<&UserId>, cart: &Cart) -> Result<OrderSubmission, CheckoutError> {
        let user_id = user.ok_or(CheckoutError::NotAuthenticated)?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let address = match &self.selected_address_id {
            None => return Err(CheckoutError::NoAddressSelected),
            Some(id) => self
                .selected_address()
                .ok_or_else(|| CheckoutError::UnknownAddress(id.clone()))?,
        };
        let fulfillment = self
            .fulfillment_method
            .ok_or(CheckoutError::NoFulfillmentMethod)?;
        let payment = self.payment_method.ok_or(CheckoutError::NoPaymentMethod)?;

        let cash_photo = if payment.requires_photo() {
            Some(
                self.cash_photo
                    .clone()
                    .ok_or(CheckoutError::CashPhotoRequired)?,
            )
        } else {
            None
        };

        let lines = cart
            .lines()
            .iter()
            .map(|line| OrderLine {
                product_id: line.product.id.clone(),
                name: line.product.name.clone(),
                unit_price: line.product.price,
                quantity: line.quantity,
            })
            .collect();
        let snapshot = cart.snapshot();

        Ok(OrderSubmission {
            id: OrderId::generate(),
            user_id: user_id.clone(),
            contact: self.contact.clone(),
            address: address.clone(),
            fulfillment,
            payment,
            cash_photo,
            lines,
            item_count: snapshot.item_count,
            total: snapshot.total_price,
            submitted_at: Utc::now(),
        })
    }
}

/// One product line of a submitted order, priced at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Price,
    pub quantity: u32,
}

impl OrderLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.times(self.quantity)
    }
}

/// A fully validated order, ready to be written in one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSubmission {
    pub id: OrderId,
    pub user_id: UserId,
    pub contact: ContactInfo,
    pub address: Address,
    pub fulfillment: FulfillmentMethod,
    pub payment: PaymentMethod,
    pub cash_photo: Option<CashPhotoReceipt>,
    pub lines: Vec<OrderLine>,
    pub item_count: u32,
    /// Unrounded sum of the line totals.
    pub total: Decimal,
    pub submitted_at: DateTime<Utc>,
}

impl OrderSubmission {
    #[must_use]
    pub fn total_display(&self) -> String {
        format_usd(self.total)
    }
}
