//! Environment configuration for the client and the mock backend.

use std::time::Duration;

use crate::{Result, StorefrontError};

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub products_url: String,
    pub orders_url: String,
    pub cart_url: String,
    pub users_url: String,
    pub timeout: Duration,
    pub debug_logging: bool,
}

impl Default for ClientConfig {
    fn default() -> Self { Self::with_api_url(DEFAULT_API_URL) }
}

impl ClientConfig {
    /// Derives every service URL from one gateway base.
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            products_url: format!("{api_url}/products"),
            orders_url: format!("{api_url}/orders"),
            cart_url: format!("{api_url}/cart"),
            users_url: format!("{api_url}/users"),
            api_url,
            timeout: Duration::from_secs(30),
            debug_logging: false,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::with_api_url(lookup("BUY01_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()));
        let service = |key: &str, slot: &mut String| {
            if let Some(url) = lookup(key).filter(|u| !u.is_empty()) {
                *slot = url.trim_end_matches('/').to_string();
            }
        };
        service("BUY01_PRODUCTS_URL", &mut config.products_url);
        service("BUY01_ORDERS_URL", &mut config.orders_url);
        service("BUY01_CART_URL", &mut config.cart_url);
        service("BUY01_USERS_URL", &mut config.users_url);
        if let Some(secs) = lookup("BUY01_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| StorefrontError::Config(format!("BUY01_HTTP_TIMEOUT_SECS is not a number: {secs}")))?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(flag) = lookup("BUY01_DEBUG_LOGGING") {
            config.debug_logging = parse_flag("BUY01_DEBUG_LOGGING", &flag)?;
        }
        Ok(config)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockServerConfig {
    pub port: u16,
    pub seed: bool,
}

impl Default for MockServerConfig {
    fn default() -> Self { Self { port: 8080, seed: true } }
}

impl MockServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(port) = lookup("PORT") {
            config.port = port.parse().map_err(|_| StorefrontError::Config(format!("PORT is not a valid port: {port}")))?;
        }
        if let Some(flag) = lookup("BUY01_SEED") {
            config.seed = parse_flag("BUY01_SEED", &flag)?;
        }
        Ok(config)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(StorefrontError::Config(format!("{key} is not a boolean: {other}"))),
    }
}
