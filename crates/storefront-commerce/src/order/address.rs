//! Address types.

use crate::error::CommerceError;
use serde::{Deserialize, Serialize};

/// A postal address.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    /// Recipient name.
    pub full_name: String,
    /// Contact phone for the courier.
    pub phone: String,
    /// Street address.
    pub address1: String,
    /// Apartment, floor, building.
    #[serde(default)]
    pub address2: Option<String>,
    /// Ward or district.
    #[serde(default)]
    pub district: Option<String>,
    /// City or province.
    pub city: String,
    /// Postal code, where used.
    #[serde(default)]
    pub postal_code: Option<String>,
    /// ISO country code (e.g., "VN").
    pub country_code: String,
}

impl Address {
    /// Create a new address.
    pub fn new(
        full_name: impl Into<String>,
        phone: impl Into<String>,
        address1: impl Into<String>,
        city: impl Into<String>,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            phone: phone.into(),
            address1: address1.into(),
            address2: None,
            district: None,
            city: city.into(),
            postal_code: None,
            country_code: country_code.into(),
        }
    }

    /// Format as single line.
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.address1.clone()];
        if let Some(ref addr2) = self.address2 {
            parts.push(addr2.clone());
        }
        if let Some(ref district) = self.district {
            parts.push(district.clone());
        }
        parts.push(self.city.clone());
        if let Some(ref postal) = self.postal_code {
            parts.push(postal.clone());
        }
        parts.push(self.country_code.clone());
        parts.join(", ")
    }

    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("full_name", &self.full_name),
            ("phone", &self.phone),
            ("address1", &self.address1),
            ("city", &self.city),
            ("country_code", &self.country_code),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Check if address is complete.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Validate, naming every missing field.
    pub fn validate(&self, label: &str) -> Result<(), CommerceError> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CommerceError::ValidationError(format!(
                "{} address is missing {}",
                label,
                missing.join(", ")
            )))
        }
    }
}
