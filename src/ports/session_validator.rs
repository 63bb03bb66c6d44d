//! Session validation port for access token validation.
//!
//! All implementations MUST validate:
//! - **Signature**: token issued by the identity provider
//! - **Audience (aud)**: token is meant for this application
//! - **Expiry (exp)**: token is not expired

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Validates access tokens and extracts user identity.
///
/// HTTP middleware uses this to validate Bearer tokens.
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a raw token (without "Bearer " prefix).
    ///
    /// * `Err(AuthError::InvalidToken)` - malformed or bad signature
    /// * `Err(AuthError::TokenExpired)` - signature valid but expired
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
