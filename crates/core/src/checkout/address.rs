//! Shipping addresses.

use serde::{Deserialize, Serialize};

use crate::types::AddressId;

/// Country used when the shopper leaves it blank.
pub const DEFAULT_COUNTRY: &str = "USA";

/// Errors from validating a new address.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Please enter a street address")]
    MissingLine1,
    #[error("Please enter a city")]
    MissingCity,
    #[error("Please enter a state")]
    MissingState,
    #[error("Please enter a ZIP code")]
    MissingZip,
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
}

/// A shipping address on the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub company: Option<String>,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub is_default: bool,
}

impl Address {
    /// Single-line rendering, e.g. `416 N Ida Ave, Bozeman, MT 59715`.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut out = self.line1.clone();
        if let Some(line2) = &self.line2 {
            out.push_str(", ");
            out.push_str(line2);
        }
        out.push_str(&format!(", {}, {} {}", self.city, self.state, self.zip));
        out
    }
}

/// Address fields as submitted by the shopper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAddress {
    #[serde(default)]
    pub company: Option<String>,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    #[serde(default)]
    pub country: Option<String>,
}

impl NewAddress {
    const MAX_FIELD: usize = 200;

    /// Validate and turn into an [`Address`] with a fresh ID.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is blank or any field is too long.
    pub fn validate(self) -> Result<Address, AddressError> {
        let required = |value: String, missing: AddressError, field: &'static str| {
            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(missing);
            }
            check_len(field, &value)?;
            Ok(value)
        };

        let line1 = required(self.line1, AddressError::MissingLine1, "Street address")?;
        let city = required(self.city, AddressError::MissingCity, "City")?;
        let state = required(self.state, AddressError::MissingState, "State")?;
        let zip = required(self.zip, AddressError::MissingZip, "ZIP code")?;

        let company = optional("Company", self.company)?;
        let line2 = optional("Address line 2", self.line2)?;
        let country = optional("Country", self.country)?.unwrap_or_else(|| DEFAULT_COUNTRY.to_string());

        Ok(Address {
            id: AddressId::generate(),
            company,
            line1,
            line2,
            city,
            state,
            zip,
            country,
            is_default: false,
        })
    }
}

fn check_len(field: &'static str, value: &str) -> Result<(), AddressError> {
    if value.chars().count() > NewAddress::MAX_FIELD {
        return Err(AddressError::TooLong {
            field,
            max: NewAddress::MAX_FIELD,
        });
    }
    Ok(())
}

fn optional(field: &'static str, value: Option<String>) -> Result<Option<String>, AddressError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => {
            check_len(field, &v)?;
            Ok(Some(v))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn bozeman() -> NewAddress {
        NewAddress {
            line1: " 416 N Ida Ave ".to_string(),
            city: "Bozeman".to_string(),
            state: "MT".to_string(),
            zip: "59715".to_string(),
            ..NewAddress::default()
        }
    }

    #[test]
    fn test_validate_trims_and_defaults_country() {
        let address = bozeman().validate().unwrap();
        assert_eq!(address.line1, "416 N Ida Ave");
        assert_eq!(address.country, "USA");
        assert!(!address.is_default);
        assert!(address.id.as_str().starts_with("address-"));
        assert_eq!(address.one_line(), "416 N Ida Ave, Bozeman, MT 59715");
    }

    #[test]
    fn test_validate_requires_fields() {
        let mut missing_city = bozeman();
        missing_city.city = "  ".to_string();
        assert_eq!(missing_city.validate(), Err(AddressError::MissingCity));

        let mut missing_zip = bozeman();
        missing_zip.zip = String::new();
        assert_eq!(missing_zip.validate(), Err(AddressError::MissingZip));
    }

    #[test]
    fn test_blank_optionals_become_none() {
        let mut address = bozeman();
        address.line2 = Some("   ".to_string());
        address.country = Some(String::new());
        let address = address.validate().unwrap();
        assert!(address.line2.is_none());
        assert_eq!(address.country, DEFAULT_COUNTRY);
    }

    #[test]
    fn test_rejects_overlong_fields() {
        let mut address = bozeman();
        address.company = Some("x".repeat(201));
        assert!(matches!(
            address.validate(),
            Err(AddressError::TooLong { field: "Company", .. })
        ));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = bozeman().validate().unwrap();
        let b = bozeman().validate().unwrap();
        assert_ne!(a.id, b.id);
    }
}
