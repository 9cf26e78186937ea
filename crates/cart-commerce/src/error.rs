//! Commerce Error Types

use cart_core::NoticeCode;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, CommerceError>;

/// Checkout and order-sync errors
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Moving cart items into the host cart failed
    #[error("Cart transfer failed: {0}")]
    Transfer(String),

    /// Creating the payment order failed
    #[error("Order creation failed: {0}")]
    Order(String),

    /// Host commerce backend rejected a call
    #[error("Host commerce error: {0}")]
    Host(String),

    /// Order not found
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Service cart error
    #[error(transparent)]
    Cart(#[from] cart_core::CartError),

    /// Catalogue error
    #[error(transparent)]
    Catalog(#[from] cart_catalog::CatalogError),
}

impl CommerceError {
    /// Cart page notice for a failed checkout
    pub const fn notice_code(&self) -> NoticeCode {
        match self {
            Self::Order(_) => NoticeCode::OrderError,
            _ => NoticeCode::TransferError,
        }
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &str {
        match self {
            Self::Transfer(_) | Self::Order(_) => self.notice_code().message(),
            Self::OrderNotFound(_) => "Order not found.",
            _ => "An error occurred processing your request.",
        }
    }
}
