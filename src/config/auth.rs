//! Authentication configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Access token validation settings.
///
/// Tokens are HS256 JWTs signed by the identity provider with `jwt_secret`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,

    /// Expected `aud` claim
    #[serde(default = "default_jwt_audience")]
    pub jwt_audience: String,
}

impl AuthConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.jwt_secret.is_empty() {
            return Err(ValidationError::MissingRequired("JWT_SECRET"));
        }
        if self.jwt_secret.len() < 32 {
            return Err(ValidationError::JwtSecretTooShort);
        }
        if self.jwt_audience.trim().is_empty() {
            return Err(ValidationError::MissingRequired("JWT_AUDIENCE"));
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_audience: default_jwt_audience(),
        }
    }
}

fn default_jwt_audience() -> String {
    "authenticated".to_string()
}
