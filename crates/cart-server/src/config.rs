//! Server Configuration
//!
//! Read once from the environment (after `.env` is loaded).

use chrono::Duration;

use cart_commerce::HandoffMode;
use cart_core::NonceSigner;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct Config {
    /// Listen address
    pub bind_addr: String,

    /// Public URL of the cart page
    pub cart_page_url: String,

    /// Host checkout page, also the base of order payment URLs.
    /// A local path is served by this process.
    pub host_checkout_url: String,

    /// Anonymous visitors may not add services
    pub require_login: bool,

    /// Anti-forgery token secret, random per process when unset
    pub nonce_secret: Option<String>,

    /// Anti-forgery token lifetime
    pub nonce_lifetime: Duration,

    /// Order webhook secret, random per process when unset
    pub webhook_secret: Option<String>,

    pub handoff_mode: HandoffMode,

    /// Session cookie name
    pub session_cookie: String,

    /// Prefix for displayed prices
    pub currency_symbol: String,

    /// Directory served under `/assets`
    pub static_dir: String,

    /// Request header carrying the user id set by the host's auth proxy
    pub user_header: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            cart_page_url: "/cart".into(),
            host_checkout_url: "/checkout".into(),
            require_login: false,
            nonce_secret: None,
            nonce_lifetime: Duration::seconds(NonceSigner::DEFAULT_LIFETIME_SECS),
            webhook_secret: None,
            handoff_mode: HandoffMode::default(),
            session_cookie: "service_cart_session".into(),
            currency_symbol: "$".into(),
            static_dir: "static".into(),
            user_header: None,
        }
    }
}

impl Config {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();

        let require_login = var("REQUIRE_LOGIN").map_or(Ok(defaults.require_login), |v| {
            parse_bool(&v).ok_or_else(|| AppError::Config(format!("REQUIRE_LOGIN: not a boolean: {v}")))
        })?;

        let nonce_lifetime = var("NONCE_LIFETIME_SECS").map_or(Ok(defaults.nonce_lifetime), |v| {
            v.parse::<i64>()
                .ok()
                .filter(|secs| *secs > 1)
                .map(Duration::seconds)
                .ok_or_else(|| AppError::Config(format!("NONCE_LIFETIME_SECS: invalid value: {v}")))
        })?;

        let handoff_mode = var("HANDOFF_MODE").map_or(Ok(defaults.handoff_mode), |v| {
            HandoffMode::parse(&v)
                .ok_or_else(|| AppError::Config(format!("HANDOFF_MODE: expected host_cart or direct_order, got {v}")))
        })?;

        let host_checkout_url = var("HOST_CHECKOUT_URL").unwrap_or(defaults.host_checkout_url);
        if let Some(path) = local_path(&host_checkout_url)
            .filter(|path| RESERVED_PREFIXES.iter().any(|prefix| path.starts_with(prefix)))
        {
            return Err(AppError::Config(format!(
                "HOST_CHECKOUT_URL: {path} collides with a cart route"
            )));
        }

        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            cart_page_url: var("CART_PAGE_URL").unwrap_or(defaults.cart_page_url),
            host_checkout_url,
            require_login,
            nonce_secret: var("NONCE_SECRET"),
            nonce_lifetime,
            webhook_secret: var("WEBHOOK_SECRET"),
            handoff_mode,
            session_cookie: var("SESSION_COOKIE").unwrap_or(defaults.session_cookie),
            currency_symbol: var("CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol),
            static_dir: var("STATIC_DIR").unwrap_or(defaults.static_dir),
            user_header: var("USER_HEADER").map(|h| h.to_lowercase()),
        })
    }

    /// Path of the host checkout when this process serves it
    pub fn storefront_path(&self) -> Option<&str> {
        local_path(&self.host_checkout_url)
    }
}

/// Route prefixes owned by the cart itself
const RESERVED_PREFIXES: [&str; 5] = ["/cart", "/api", "/assets", "/health", "/webhook"];

fn local_path(url: &str) -> Option<&str> {
    let path = url.trim_end_matches('/');
    (path.starts_with('/') && !path.starts_with("//")).then_some(path)
}

fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Loose boolean: yes/no, true/false, on/off, 1/0
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.session_cookie, "service_cart_session");
        assert_eq!(config.handoff_mode, HandoffMode::HostCart);
        assert_eq!(config.nonce_lifetime.num_seconds(), 86_400);
        assert_eq!(config.storefront_path(), Some("/checkout"));
    }

    #[test]
    fn test_storefront_path() {
        let with = |url: &str| Config {
            host_checkout_url: url.into(),
            ..Config::default()
        };

        assert_eq!(with("/shop/checkout/").storefront_path(), Some("/shop/checkout"));
        assert_eq!(with("https://shop.example/checkout").storefront_path(), None);
        assert_eq!(with("//cdn.example/checkout").storefront_path(), None);
        assert_eq!(with("/").storefront_path(), None);
    }
}
