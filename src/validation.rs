//! Form validation: custom field rules and user-facing messages.

use rust_decimal::Decimal;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::error::ApiError;

pub fn validate_postal_code(value: &str) -> Result<(), ValidationError> {
    let len = value.len();
    if (4..=10).contains(&len) && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("postal_code"))
    }
}

/// `+` followed by 7 to 15 digits, or the digits alone.
pub fn validate_phone_number(value: &str) -> Result<(), ValidationError> {
    let digits = value.strip_prefix('+').unwrap_or(value);
    if (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("phone"))
    }
}

pub fn validate_price(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_positive() && !value.is_zero() { Ok(()) } else { Err(ValidationError::new("price")) }
}

/// Runs the derive rules and turns failures into an inline-display error.
pub fn check<T: Validate>(value: &T) -> Result<(), ApiError> {
    value.validate().map_err(|errors| {
        let fields = field_messages(&errors);
        let message = fields.first().cloned().unwrap_or_else(|| "Invalid value".to_string());
        ApiError::InvalidInput { message, fields }
    })
}

/// One message per failed rule, ordered by field name.
pub fn field_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages = Vec::new();
    collect(errors, &mut messages);
    messages
}

fn collect(errors: &ValidationErrors, out: &mut Vec<String>) {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by_key(|(name, _)| **name);
    for (name, kind) in fields {
        match kind {
            ValidationErrorsKind::Field(list) => {
                out.extend(list.iter().map(|e| message_for(&format_field_name(name), e)));
            }
            ValidationErrorsKind::Struct(nested) => collect(nested, out),
            ValidationErrorsKind::List(items) => {
                for nested in items.values() {
                    collect(nested, out);
                }
            }
        }
    }
}

fn message_for(field: &str, error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    let param = |key: &str| error.params.get(key);
    let number = |key: &str| param(key).and_then(|v| v.as_f64());
    match error.code.as_ref() {
        "required" => format!("{field} is required"),
        "length" => {
            let current = param("value").and_then(|v| v.as_str()).map_or(0, |s| s.chars().count());
            match (number("min"), number("max")) {
                (Some(_), _) if current == 0 => format!("{field} is required"),
                (Some(min), _) if (current as f64) < min => {
                    format!("{field} must be at least {min} characters (current: {current})")
                }
                (_, Some(max)) => format!("{field} must not exceed {max} characters"),
                _ => format!("{field} has an invalid length"),
            }
        }
        "range" => {
            let value = number("value");
            match (number("min"), number("max")) {
                (Some(min), _) if value.map_or(true, |v| v < min) => format!("{field} must be at least {min}"),
                (_, Some(max)) => format!("{field} must not exceed {max}"),
                _ => format!("{field} is out of range"),
            }
        }
        "email" => "Please enter a valid email address".to_string(),
        "postal_code" => "Please enter a valid postal code (4-10 digits)".to_string(),
        "phone" => "Please enter a valid phone number (e.g., +1234567890)".to_string(),
        "price" => format!("{field} must be greater than 0"),
        _ => "Invalid value".to_string(),
    }
}

/// `postal_code` -> `Postal code`
fn format_field_name(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
