//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Responses are JSON: `{"error": "<message>"}`, plus `"details"` for vendor
//! failures on the operator surface.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use geoart_core::CategoryError;

use crate::db::RepositoryError;
use crate::identity::AuthError;
use crate::services::{CartError, CatalogError, CheckoutError, FulfillmentError, WebhookError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Caller credential missing or invalid.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Structurally invalid request.
    #[error("{0}")]
    Validation(String),

    /// Webhook failed its authenticity check.
    #[error("Invalid signature: {0}")]
    Signature(String),

    /// Resource not found (or owned by someone else).
    #[error("Not found: {0}")]
    NotFound(String),

    /// An external collaborator failed. The message is logged, never shown.
    #[error("Downstream error: {0}")]
    Downstream(String),

    /// The print vendor rejected an order after validation passed.
    #[error("Failed to create order: {message}")]
    Fulfillment {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) | Self::Signature(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Downstream(_) | Self::Fulfillment { .. } | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let body = match self {
            Self::Downstream(_) | Self::Database(_) | Self::Internal(_) => {
                json!({ "error": "Internal Server Error" })
            }
            Self::Fulfillment { details, .. } => match details {
                Some(details) => json!({ "error": "Failed to create order", "details": details }),
                None => json!({ "error": "Failed to create order" }),
            },
            Self::Unauthorized(_) => json!({ "error": "Unauthorized" }),
            Self::Signature(_) => json!({ "error": "Invalid signature." }),
            Self::Validation(message) | Self::NotFound(message) => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken(_) => {
                Self::Unauthorized(err.to_string())
            }
            AuthError::KeysUnavailable(_) => Self::Downstream(err.to_string()),
        }
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::InvalidQuantity | CartError::MissingField(_) => {
                Self::Validation(err.to_string())
            }
            CartError::NotFound(_) => Self::NotFound(err.to_string()),
            CartError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Repository(e) => Self::Database(e),
            CheckoutError::Payment(e) => Self::Downstream(e.to_string()),
            CheckoutError::EmptyCart
            | CheckoutError::UnknownItem(_)
            | CheckoutError::InvalidPrice(_)
            | CheckoutError::InvalidQuantity(_)
            | CheckoutError::AmountOverflow
            | CheckoutError::Incomplete(_)
            | CheckoutError::Address(_) => Self::Validation(err.to_string()),
        }
    }
}

impl From<FulfillmentError> for AppError {
    fn from(err: FulfillmentError) -> Self {
        if err.is_validation() {
            return Self::Validation(err.to_string());
        }
        Self::Fulfillment {
            details: err.vendor_details(),
            message: err.to_string(),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Unsupported(_) | CatalogError::MissingField(_) => {
                Self::Validation(err.to_string())
            }
            CatalogError::PriceOutOfRange => Self::Internal(err.to_string()),
            CatalogError::Vendor(e) => Self::Downstream(e.to_string()),
        }
    }
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::Signature(e) => Self::Signature(e.to_string()),
            WebhookError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<CategoryError> for AppError {
    fn from(err: CategoryError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}
