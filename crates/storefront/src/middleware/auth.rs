//! Authentication extractors.
//!
//! Shoppers authenticate with a Firebase ID token; the operator surface uses
//! a static bearer token from configuration.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use secrecy::ExposeSecret;

use geoart_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::identity::AuthError;
use crate::state::AppState;

/// Extractor that requires a verified shopper identity.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_cart(
///     State(state): State<AppState>,
///     RequireUser(user_id): RequireUser,
/// ) -> Result<Json<Vec<CartLineItem>>> {
///     Ok(Json(state.cart().list_cart(&user_id).await?))
/// }
/// ```
pub struct RequireUser(pub UserId);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        let user_id = state.identity().verify(token).await.inspect_err(|e| {
            tracing::debug!(error = %e, "Rejected identity token");
        })?;

        set_sentry_user(&user_id);
        Ok(Self(user_id))
    }
}

/// Extractor for operator-only endpoints.
///
/// Rejects every request when no operator token is configured.
pub struct RequireOperator;

impl FromRequestParts<AppState> for RequireOperator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.operator_token() else {
            return Err(AppError::Unauthorized(
                "operator endpoints are disabled".to_owned(),
            ));
        };
        let presented = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("missing operator token".to_owned()))?;

        if constant_time_compare(expected.expose_secret(), presented) {
            Ok(Self)
        } else {
            tracing::warn!("Rejected operator token");
            Err(AppError::Unauthorized("invalid operator token".to_owned()))
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/cart");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsed() {
        let parts = parts_with(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_token_requires_scheme() {
        assert_eq!(bearer_token(&parts_with(Some("abc.def.ghi"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Basic dXNlcjpwYXNz"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer   "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
    }
}
