//! Caller identity verification.
//!
//! Every authenticated route passes the bearer credential through an
//! [`IdentityVerifier`] and works only with the canonical [`UserId`] it
//! returns.

mod firebase;

use async_trait::async_trait;
use thiserror::Error;

use geoart_core::UserId;

pub use firebase::FirebaseVerifier;

/// Errors that can occur while verifying a caller credential.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer credential was supplied.
    #[error("missing bearer token")]
    MissingToken,

    /// The credential failed verification (signature, audience, expiry).
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Signing keys could not be fetched from the identity provider.
    #[error("identity provider unavailable: {0}")]
    KeysUnavailable(String),
}

/// Verifies a bearer credential and returns the caller's canonical id.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError>;
}
