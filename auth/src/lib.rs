//! Signed session tokens for microservices.
//!
//! Issues access/refresh token pairs carrying a subject and a list of roles,
//! and verifies them back into claims. Tokens are compact HMAC-signed JWTs.

mod claims;
mod config;
mod jwt;
mod service;

pub use claims::{Claims, EXPIRES_AT, ISSUED_AT, SUBJECT};
pub use config::{Algorithm, JwtConfig, SigningKey, DEFAULT_ROLES_CLAIM};
pub use jwt::{decode_token, encode_token, validate_token, Header};
pub use service::{JwtService, TokenPair, TokenRequest};

pub use error::AuthError;
