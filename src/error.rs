//! HTTP error taxonomy and the message-extraction rules for error bodies.

use serde_json::Value;
use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Cannot connect to server. Please check your internet connection.")]
    Network { detail: String },

    #[error("{message}")]
    Validation { message: String, details: Option<Value> },

    #[error("Your session has expired. Please login again.")]
    Unauthorized,

    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error("{message}")]
    NotFound { message: String, from_server: bool },

    #[error("{message}")]
    Conflict { message: String },

    #[error("{message}")]
    BusinessRule { message: String },

    #[error("Too many requests. Please try again later.")]
    RateLimited,

    #[error("Server error occurred. Please try again later.")]
    Server,

    #[error("Service temporarily unavailable. Please try again later.")]
    Unavailable { status: u16 },

    #[error("{message}")]
    Unexpected { status: u16, message: String },

    #[error("Unreadable server response: {0}")]
    Decode(String),

    #[error("User not authenticated")]
    NotAuthenticated,

    #[error("{message}")]
    InvalidInput { message: String, fields: Vec<String> },
}

/// What the interceptor does with an error before handing it to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Dedicated "no connection" notice.
    NetworkNotice,
    /// Left for inline form display.
    Inline,
    /// Session reset plus an auth notice.
    SessionReset,
    PermissionNotice,
    Toast(String),
}

impl ApiError {
    /// Maps a non-success response. `body` is the raw response text.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed = parse_body(body);
        let message = extract_message(&parsed);
        let or = |fallback: &str| message.clone().unwrap_or_else(|| fallback.to_string());
        match status {
            0 => Self::Network { detail: or("no response") },
            400 => Self::Validation {
                message: or("Invalid request. Please check your input."),
                details: extract_details(&parsed),
            },
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound {
                from_server: message.is_some(),
                message: or("The requested resource was not found."),
            },
            409 => Self::Conflict { message: or("This action conflicts with existing data.") },
            422 => Self::BusinessRule { message: or("Unable to process your request.") },
            429 => Self::RateLimited,
            500 => Self::Server,
            502..=504 => Self::Unavailable { status },
            _ => Self::Unexpected { status, message: or(&format!("Error {status}")) },
        }
    }

    /// HTTP status this error came from; 0 for transport and client-side errors.
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::BusinessRule { .. } => 422,
            Self::RateLimited => 429,
            Self::Server => 500,
            Self::Unavailable { status } | Self::Unexpected { status, .. } => *status,
            Self::Network { .. } | Self::Decode(_) | Self::NotAuthenticated | Self::InvalidInput { .. } => 0,
        }
    }

    pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound { .. }) }

    /// Errors the user can act on without a session reset.
    pub fn is_recoverable(&self) -> bool { !matches!(self, Self::Unauthorized) }

    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Network { .. } => Disposition::NetworkNotice,
            Self::Validation { .. } | Self::InvalidInput { .. } => Disposition::Inline,
            Self::Unauthorized => Disposition::SessionReset,
            Self::Forbidden => Disposition::PermissionNotice,
            other => Disposition::Toast(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            Self::from_response(status.as_u16(), "")
        } else {
            Self::Network { detail: e.to_string() }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Body {
    Empty,
    Json(Value),
    Text(String),
}

fn parse_body(raw: &str) -> Body {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Body::Empty;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::String(inner)) => match serde_json::from_str::<Value>(&inner) {
            Ok(value @ Value::Object(_)) => Body::Json(value),
            _ => Body::Text(inner),
        },
        Ok(value) => Body::Json(value),
        Err(_) => Body::Text(trimmed.to_string()),
    }
}

/// Tries `message`, then `error` (with `: reason` if present), then `reason`,
/// then a plain-text body.
fn extract_message(body: &Body) -> Option<String> {
    match body {
        Body::Empty => None,
        Body::Text(text) => Some(text.clone()),
        Body::Json(value) => {
            let field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
            if let Some(message) = field("message") {
                return Some(message);
            }
            if let Some(error) = field("error") {
                return Some(match field("reason") {
                    Some(reason) => format!("{error}: {reason}"),
                    None => error,
                });
            }
            field("reason")
        }
    }
}

fn extract_details(body: &Body) -> Option<Value> {
    let Body::Json(value) = body else { return None };
    value
        .get("details")
        .filter(|d| !d.is_null())
        .or_else(|| value.get("errors").filter(|e| e.is_array()))
        .or_else(|| value.get("fields").filter(|f| !f.is_null()))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_extraction_order() {
        let err = ApiError::from_response(409, r#"{"message":"Order already cancelled","error":"Conflict"}"#);
        assert_eq!(err, ApiError::Conflict { message: "Order already cancelled".into() });

        let err = ApiError::from_response(422, r#"{"error":"Insufficient stock","reason":"only 2 left"}"#);
        assert_eq!(err.to_string(), "Insufficient stock: only 2 left");

        let err = ApiError::from_response(422, r#"{"reason":"only 2 left"}"#);
        assert_eq!(err.to_string(), "only 2 left");

        let err = ApiError::from_response(409, "plain text failure");
        assert_eq!(err.to_string(), "plain text failure");

        let err = ApiError::from_response(409, r#""{\"message\":\"double encoded\"}""#);
        assert_eq!(err.to_string(), "double encoded");
    }

    #[test]
    fn test_default_messages() {
        assert_eq!(ApiError::from_response(400, "").to_string(), "Invalid request. Please check your input.");
        assert_eq!(ApiError::from_response(404, ""), ApiError::NotFound { message: "The requested resource was not found.".into(), from_server: false });
        assert_eq!(ApiError::from_response(429, r#"{"message":"slow down"}"#), ApiError::RateLimited);
        assert_eq!(ApiError::from_response(500, "boom"), ApiError::Server);
        assert_eq!(ApiError::from_response(503, ""), ApiError::Unavailable { status: 503 });
        assert_eq!(ApiError::from_response(418, "").to_string(), "Error 418");
    }

    #[test]
    fn test_validation_details() {
        let err = ApiError::from_response(400, r#"{"message":"Validation failed","errors":[{"field":"quantity"}]}"#);
        assert_eq!(err, ApiError::Validation { message: "Validation failed".into(), details: Some(json!([{"field":"quantity"}])) });
        let err = ApiError::from_response(400, r#"{"fields":{"city":"required"}}"#);
        let ApiError::Validation { details, .. } = err else { panic!("expected validation") };
        assert_eq!(details, Some(json!({"city":"required"})));
    }

    #[test]
    fn test_dispositions() {
        assert_eq!(ApiError::Network { detail: "refused".into() }.disposition(), Disposition::NetworkNotice);
        assert_eq!(ApiError::from_response(400, "").disposition(), Disposition::Inline);
        assert_eq!(ApiError::Unauthorized.disposition(), Disposition::SessionReset);
        assert_eq!(ApiError::Forbidden.disposition(), Disposition::PermissionNotice);
        assert_eq!(
            ApiError::from_response(404, r#"{"message":"Product not found"}"#).disposition(),
            Disposition::Toast("Product not found".into())
        );
        assert!(!ApiError::Unauthorized.is_recoverable());
        assert!(ApiError::Conflict { message: "x".into() }.is_recoverable());
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [400u16, 401, 403, 404, 409, 422, 429, 500, 502, 504, 418] {
            assert_eq!(ApiError::from_response(status, "").status(), status);
        }
    }
}
