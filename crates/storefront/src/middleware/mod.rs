//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//!
//! Authentication is per-route via the [`RequireUser`] and
//! [`RequireOperator`] extractors.

pub mod auth;
pub mod request_id;

pub use auth::{RequireOperator, RequireUser};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
