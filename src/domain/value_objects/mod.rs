//! Value Objects for the storefront

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::validation::{validate_phone_number, validate_postal_code};

/// Wire timestamps carry no zone (`2026-02-01T10:15:30.123`).
pub type Timestamp = chrono::NaiveDateTime;

pub fn now() -> Timestamp { chrono::Utc::now().naive_utc() }

/// Delivery address, snapshotted into the order at checkout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[validate(length(min = 2, max = 100))]
    pub full_name: String,
    #[validate(length(min = 1, max = 200))]
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200))]
    pub address_line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(custom = "validate_postal_code")]
    pub postal_code: String,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_phone_number")]
    pub phone_number: Option<String>,
}

impl ShippingAddress {
    /// Multi-line label form used on confirmation pages.
    pub fn formatted(&self) -> String {
        let mut out = format!("{}\n{}", self.full_name, self.address_line1);
        if let Some(line2) = self.address_line2.as_deref().filter(|l| !l.is_empty()) {
            out.push_str(", ");
            out.push_str(line2);
        }
        out.push_str(&format!("\n{}, {}\n{}", self.city, self.postal_code, self.country));
        if let Some(phone) = self.phone_number.as_deref().filter(|p| !p.is_empty()) {
            out.push_str("\nPhone: ");
            out.push_str(phone);
        }
        out
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Client,
    Seller,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Client => write!(f, "CLIENT"), Self::Seller => write!(f, "SELLER") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "John Client".into(),
            address_line1: "Storgatan 1".into(),
            address_line2: Some("Apt 4".into()),
            city: "Mariehamn".into(),
            postal_code: "22100".into(),
            country: "Finland".into(),
            phone_number: Some("+358401234567".into()),
        }
    }

    #[test]
    fn test_formatted_address() {
        assert_eq!(
            address().formatted(),
            "John Client\nStorgatan 1, Apt 4\nMariehamn, 22100\nFinland\nPhone: +358401234567"
        );
        let bare = ShippingAddress { address_line2: None, phone_number: Some(String::new()), ..address() };
        assert_eq!(bare.formatted(), "John Client\nStorgatan 1\nMariehamn, 22100\nFinland");
    }

    #[test]
    fn test_address_validation() {
        assert!(address().validate().is_ok());
        let bad = ShippingAddress { postal_code: "12a".into(), city: String::new(), ..address() };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("postal_code"));
        assert!(fields.contains_key("city"));
    }

    #[test]
    fn test_role_wire_format() {
        assert_eq!(serde_json::to_string(&Role::Seller).unwrap(), "\"SELLER\"");
        assert_eq!(serde_json::from_str::<Role>("\"CLIENT\"").unwrap(), Role::Client);
    }
}
