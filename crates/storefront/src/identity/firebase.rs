//! Firebase ID token verification.
//!
//! Tokens are RS256 JWTs signed by Google's `securetoken` service account.
//! The public keys are published as a JWKS document and rotated every few
//! hours, so they are cached for a bounded time rather than fetched per
//! request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use moka::future::Cache;
use serde::Deserialize;

use geoart_core::UserId;

use super::{AuthError, IdentityVerifier};
use crate::config::FirebaseConfig;

/// Google's JWKS endpoint for Firebase ID token signing keys.
const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

const KEYS_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
}

/// Verifies Firebase ID tokens against the project's audience and issuer.
#[derive(Clone)]
pub struct FirebaseVerifier {
    client: reqwest::Client,
    project_id: String,
    jwks_url: String,
    keys: Cache<(), Arc<JwkSet>>,
}

impl FirebaseVerifier {
    /// Create a verifier for the configured Firebase project.
    #[must_use]
    pub fn new(config: &FirebaseConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            project_id: config.project_id.clone(),
            jwks_url: JWKS_URL.to_owned(),
            keys: Cache::builder().max_capacity(1).time_to_live(KEYS_TTL).build(),
        }
    }

    /// Fetch signing keys from a different JWKS endpoint.
    #[must_use]
    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = url.into();
        self
    }

    async fn signing_keys(&self) -> Result<Arc<JwkSet>, AuthError> {
        self.keys
            .try_get_with((), async {
                let response = self
                    .client
                    .get(&self.jwks_url)
                    .send()
                    .await
                    .and_then(reqwest::Response::error_for_status)
                    .map_err(|e| AuthError::KeysUnavailable(e.to_string()))?;
                let keys: JwkSet = response
                    .json()
                    .await
                    .map_err(|e| AuthError::KeysUnavailable(e.to_string()))?;
                tracing::debug!(count = keys.keys.len(), "Fetched identity signing keys");
                Ok::<_, AuthError>(Arc::new(keys))
            })
            .await
            .map_err(|e| AuthError::KeysUnavailable(e.to_string()))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!("{ISSUER_PREFIX}{}", self.project_id)]);
        validation
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    #[tracing::instrument(name = "identity.verify", skip_all)]
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("missing kid in token header".to_owned()))?;

        let keys = self.signing_keys().await?;
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown signing key {kid}")))?;
        let key = match &jwk.algorithm {
            AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| AuthError::InvalidToken(e.to_string()))?,
            _ => {
                return Err(AuthError::InvalidToken(
                    "signing key is not an RSA key".to_owned(),
                ));
            }
        };

        let claims = decode::<FirebaseClaims>(token, &key, &self.validation())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?
            .claims;
        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken("empty subject".to_owned()));
        }

        Ok(UserId::new(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> FirebaseVerifier {
        FirebaseVerifier::new(
            &FirebaseConfig {
                project_id: "geoart-test".to_owned(),
            },
            reqwest::Client::new(),
        )
        // Unroutable; any fetch attempt would fail loudly
        .with_jwks_url("http://127.0.0.1:9/jwks")
    }

    #[tokio::test]
    async fn test_garbage_token_rejected_before_key_fetch() {
        let result = verifier().verify("not-a-jwt").await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_hs256_token_rejected() {
        // {"alg":"HS256","typ":"JWT","kid":"k1"}.{"sub":"u1"}.sig
        let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCIsImtpZCI6ImsxIn0.eyJzdWIiOiJ1MSJ9.c2ln";
        let result = verifier().verify(token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_validation_pins_audience_and_issuer() {
        let validation = verifier().validation();
        assert!(validation.aud.as_ref().is_some_and(|aud| aud.contains("geoart-test")));
        assert!(
            validation
                .iss
                .as_ref()
                .is_some_and(|iss| iss.contains("https://securetoken.google.com/geoart-test"))
        );
    }
}
