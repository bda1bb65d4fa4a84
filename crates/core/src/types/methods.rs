//! Checkout choice enums.

use serde::{Deserialize, Serialize};

/// How an order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentMethod {
    /// Standard shipping, 3-5 business days.
    #[default]
    Standard,
    /// Express shipping, 1-2 business days.
    Express,
}

impl FulfillmentMethod {
    /// All methods in display order.
    pub const ALL: [Self; 2] = [Self::Standard, Self::Express];

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Standard => "Standard Shipping",
            Self::Express => "Express Shipping",
        }
    }

    /// Delivery estimate shown next to the label.
    #[must_use]
    pub const fn estimate(self) -> &'static str {
        match self {
            Self::Standard => "3-5 business days",
            Self::Express => "1-2 business days",
        }
    }
}

impl std::fmt::Display for FulfillmentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Express => write!(f, "express"),
        }
    }
}

impl std::str::FromStr for FulfillmentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "express" => Ok(Self::Express),
            _ => Err(format!("invalid fulfillment method: {s}")),
        }
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery. Requires a photo of the cash before submission.
    #[default]
    Cash,
    /// Direct bank transfer.
    Ach,
    /// Line of credit for qualified customers.
    Credit,
}

impl PaymentMethod {
    /// All methods in display order.
    pub const ALL: [Self; 3] = [Self::Cash, Self::Ach, Self::Credit];

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cash => "Cash on Delivery",
            Self::Ach => "ACH Payment",
            Self::Credit => "Line of Credit",
        }
    }

    /// Short description shown under the label.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Cash => "Pay when your order is delivered",
            Self::Ach => "Direct bank transfer",
            Self::Credit => "Flexible payment option for qualified customers",
        }
    }

    /// Whether this method needs a cash photo before the order is accepted.
    #[must_use]
    pub const fn requires_photo(self) -> bool {
        matches!(self, Self::Cash)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cash => write!(f, "cash"),
            Self::Ach => write!(f, "ach"),
            Self::Credit => write!(f, "credit"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(Self::Cash),
            "ach" => Ok(Self::Ach),
            "credit" => Ok(Self::Credit),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_roundtrip() {
        for method in PaymentMethod::ALL {
            assert_eq!(method.to_string().parse::<PaymentMethod>(), Ok(method));
        }
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_only_cash_requires_photo() {
        assert!(PaymentMethod::Cash.requires_photo());
        assert!(!PaymentMethod::Ach.requires_photo());
        assert!(!PaymentMethod::Credit.requires_photo());
    }

    #[test]
    fn test_fulfillment_method_roundtrip() {
        for method in FulfillmentMethod::ALL {
            assert_eq!(method.to_string().parse::<FulfillmentMethod>(), Ok(method));
        }
    }
}
