//! Authentication adapters.
//!
//! Implementations of the `SessionValidator` port:
//!
//! - `jwt` - HS256 access tokens from the identity provider
//! - `mock` - fixed token table for tests

mod jwt;
mod mock;

pub use jwt::{JwtConfig, JwtSessionValidator, DEFAULT_AUDIENCE};
pub use mock::MockSessionValidator;
