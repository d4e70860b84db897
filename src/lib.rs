//! buy-01 Storefront
//!
//! Client core for the buy-01 marketplace UI.
//!
//! ## Features
//! - REST clients for the cart, order, product and user services
//! - Observable caches with optimistic cart updates and exact rollback
//! - Order action guards (cancel, redo) and dashboard statistics
//! - One error policy for every failed request
//! - An in-memory mock backend for development and tests

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod mock;
pub mod notify;
pub mod services;
pub mod session;
pub mod store;
pub mod storefront;
pub mod validation;

pub use config::{ClientConfig, MockServerConfig};
pub use error::{ApiError, ApiResult};
pub use notify::{LogNotifier, Notification, Notifier, RecordingNotifier};
pub use session::Session;
pub use store::{Store, Transaction};
pub use storefront::Storefront;

use thiserror::Error;

// =============================================================================
// Errors
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversions() {
        let err: StorefrontError = ApiError::Forbidden.into();
        assert!(matches!(err, StorefrontError::Api(ApiError::Forbidden)));
        let err = StorefrontError::Config("PORT is not a valid port: x".into());
        assert_eq!(err.to_string(), "Configuration error: PORT is not a valid port: x");
    }
}
