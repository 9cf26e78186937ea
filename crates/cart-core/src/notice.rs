//! Outcome Codes & Notices
//!
//! Every cart operation outcome that reaches the user is a `(kind, code)`
//! pair. The form transport carries it in the redirect query string, the
//! async transport in its JSON body; the cart page renders it once.

use serde::{Deserialize, Serialize};

/// Banner style
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

impl NoticeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Outcome of a cart operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeCode {
    Added,
    Security,
    LoginRequired,
    InvalidService,
    PriceError,
    TransferError,
    OrderError,
}

impl NoticeCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Security => "security",
            Self::LoginRequired => "login_required",
            Self::InvalidService => "invalid_service",
            Self::PriceError => "price_error",
            Self::TransferError => "transfer_error",
            Self::OrderError => "order_error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "added" => Some(Self::Added),
            "security" => Some(Self::Security),
            "login_required" => Some(Self::LoginRequired),
            "invalid_service" => Some(Self::InvalidService),
            "price_error" => Some(Self::PriceError),
            "transfer_error" => Some(Self::TransferError),
            "order_error" => Some(Self::OrderError),
            _ => None,
        }
    }

    pub const fn kind(self) -> NoticeKind {
        match self {
            Self::Added => NoticeKind::Success,
            _ => NoticeKind::Error,
        }
    }

    /// Short user-facing message
    pub const fn message(self) -> &'static str {
        match self {
            Self::Added => "Service added to cart.",
            Self::Security => "Security check failed. Please reload the page and try again.",
            Self::LoginRequired => "Please log in to purchase services.",
            Self::InvalidService => "Invalid service identifier.",
            Self::PriceError => "Could not calculate the service price.",
            Self::TransferError => "Could not move your services to checkout. Please try again.",
            Self::OrderError => "Could not create the payment order. Please try again.",
        }
    }
}

/// A one-shot banner for the cart page
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub code: NoticeCode,
}

impl Notice {
    pub const fn new(code: NoticeCode) -> Self {
        Self {
            kind: code.kind(),
            code,
        }
    }

    /// Look up a notice from untrusted query parameters.
    ///
    /// Only pairs present in the catalogue produce a notice; a known code
    /// under the wrong kind is ignored.
    pub fn from_query(kind: &str, code: &str) -> Option<Self> {
        let kind = NoticeKind::parse(kind)?;
        let code = NoticeCode::parse(code)?;
        (code.kind() == kind).then(|| Self::new(code))
    }

    pub const fn message(&self) -> &'static str {
        self.code.message()
    }
}
