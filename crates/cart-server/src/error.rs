//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use cart_catalog::CatalogError;
use cart_commerce::CommerceError;
use cart_core::CartError;

/// Server-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// Anti-forgery token missing or invalid
    #[error("security check failed")]
    Forbidden,

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Commerce(#[from] CommerceError),

    /// Template rendering failed
    #[error("render error: {0}")]
    Render(#[from] minijinja::Error),

    /// Network binding or I/O error
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Forbidden => (StatusCode::FORBIDDEN, "security"),
            Self::Commerce(CommerceError::WebhookSignature(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_SIGNATURE")
            }
            Self::Commerce(CommerceError::WebhookParse(_)) => (StatusCode::BAD_REQUEST, "INVALID_PAYLOAD"),
            Self::Commerce(CommerceError::OrderNotFound(_)) => (StatusCode::NOT_FOUND, "ORDER_NOT_FOUND"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Client-facing message, never the internal error text
    pub fn user_message(&self) -> &str {
        match self {
            Self::Forbidden => cart_core::NoticeCode::Security.message(),
            Self::Cart(e) => e.user_message(),
            Self::Commerce(CommerceError::WebhookSignature(_)) => "Invalid signature",
            Self::Commerce(CommerceError::WebhookParse(_)) => "Invalid payload",
            Self::Commerce(e) => e.user_message(),
            _ => "Internal server error.",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        let body = ErrorResponse {
            error: self.user_message().to_string(),
            code: code.into(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_forbidden_maps_to_403() {
        assert_eq!(status_of(AppError::Forbidden), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_webhook_errors_map_to_400() {
        assert_eq!(
            status_of(CommerceError::WebhookSignature("bad".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CommerceError::WebhookParse("bad".into()).into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_unknown_order_maps_to_404() {
        assert_eq!(
            status_of(CommerceError::OrderNotFound("ord_x".into()).into()),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_render_error_is_internal() {
        let err = AppError::from(minijinja::Error::new(
            minijinja::ErrorKind::TemplateNotFound,
            "cart.html missing",
        ));
        assert_eq!(err.user_message(), "Internal server error.");
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_text_is_hidden() {
        let err = AppError::Cart(CartError::Session("lock poisoned at 0xdead".into()));
        assert!(!err.user_message().contains("0xdead"));
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
