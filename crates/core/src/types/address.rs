//! Postal shipping address.

use serde::{Deserialize, Serialize};

/// Errors that can occur when validating a [`ShippingAddress`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// A required field is empty.
    #[error("shipping address field `{0}` is required")]
    MissingField(&'static str),
    /// The email address does not have a local part and a domain.
    #[error("shipping address email is invalid")]
    InvalidEmail,
    /// The country is not an ISO 3166-1 alpha-2 code.
    #[error("shipping address country must be a two-letter code")]
    InvalidCountry,
}

/// Normalized postal address for a shipment.
///
/// Accepts the front end's field names (`state`, `address`) as aliases for
/// `region` and `address1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub country: String,
    #[serde(alias = "state")]
    pub region: String,
    #[serde(alias = "address")]
    pub address1: String,
    #[serde(default)]
    pub address2: Option<String>,
    pub city: String,
    pub zip: String,
}

impl ShippingAddress {
    /// Check that every field the print provider needs is present.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), AddressError> {
        let required = [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("email", &self.email),
            ("country", &self.country),
            ("address1", &self.address1),
            ("city", &self.city),
            ("zip", &self.zip),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(AddressError::MissingField(name));
            }
        }

        match self.email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err(AddressError::InvalidEmail),
        }

        if self.country.len() != 2 || !self.country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AddressError::InvalidCountry);
        }

        Ok(())
    }

    /// Split a single "full name" into first and last name.
    ///
    /// Everything after the first whitespace is treated as the last name.
    /// A single name fills both halves, since the print vendor requires a
    /// non-empty last name.
    #[must_use]
    pub fn split_name(full_name: &str) -> (String, String) {
        let trimmed = full_name.trim();
        match trimmed.split_once(char::is_whitespace) {
            Some((first, last)) => (first.to_owned(), last.trim().to_owned()),
            None => (trimmed.to_owned(), trimmed.to_owned()),
        }
    }
}
