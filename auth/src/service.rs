//! Token issuance and inspection.

use chrono::{Duration, Utc};
use error::AuthError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::claims::Claims;
use crate::config::JwtConfig;
use crate::jwt::{decode_token, encode_token, validate_token};

/// Subject and roles to issue tokens for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    /// Subject (user identifier)
    pub subject: String,
    /// Roles, in order
    pub roles: Vec<String>,
}

impl TokenRequest {
    pub fn new<I, R>(subject: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            subject: subject.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

/// Access and refresh tokens issued together.
///
/// The expiry fields are exact epoch milliseconds, while the `exp` claim
/// inside each token is truncated to whole seconds. A token therefore stops
/// validating up to 999 ms before the reported expiry; treat these values as
/// an upper bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Access token (short-lived).
    pub access_token: String,
    /// Refresh token (long-lived).
    pub refresh_token: String,
    /// Access token expiration, epoch milliseconds.
    pub access_expires_at_ms: i64,
    /// Refresh token expiration, epoch milliseconds.
    pub refresh_expires_at_ms: i64,
}

/// Issues and reads signed tokens with a fixed configuration.
///
/// Holds no mutable state; clones share the same configuration and can be
/// used from any thread.
#[derive(Debug, Clone)]
pub struct JwtService {
    config: Arc<JwtConfig>,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Build a service from a base64 secret with default lifetimes.
    pub fn from_secret(secret: &str) -> Result<Self, AuthError> {
        JwtConfig::new(secret).map(Self::new)
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Issue an access/refresh pair carrying the request's roles.
    ///
    /// Lifetimes left as `None` fall back to the configured defaults.
    pub fn issue_token_pair(
        &self,
        request: &TokenRequest,
        access_lifetime: Option<Duration>,
        refresh_lifetime: Option<Duration>,
    ) -> Result<TokenPair, AuthError> {
        let claims = self.roles_claims(request);
        self.issue_token_pair_for(&request.subject, &claims, access_lifetime, refresh_lifetime)
    }

    /// Issue an access/refresh pair for arbitrary claims.
    pub fn issue_token_pair_for(
        &self,
        subject: &str,
        claims: &Claims,
        access_lifetime: Option<Duration>,
        refresh_lifetime: Option<Duration>,
    ) -> Result<TokenPair, AuthError> {
        // Both tokens share one issue time.
        let issued_at_ms = Utc::now().timestamp_millis();
        let access_lifetime = access_lifetime.unwrap_or_else(|| self.config.access_lifetime());
        let refresh_lifetime = refresh_lifetime.unwrap_or_else(|| self.config.refresh_lifetime());

        let (access_token, access_expires_at_ms) = self.sign(subject, claims, issued_at_ms, access_lifetime)?;
        let (refresh_token, refresh_expires_at_ms) = self.sign(subject, claims, issued_at_ms, refresh_lifetime)?;

        tracing::debug!(
            "Issued token pair (access until {}, refresh until {})",
            access_expires_at_ms,
            refresh_expires_at_ms
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at_ms,
            refresh_expires_at_ms,
        })
    }

    /// Issue a single token carrying the request's roles.
    pub fn issue_token(&self, request: &TokenRequest, lifetime: Option<Duration>) -> Result<String, AuthError> {
        let claims = self.roles_claims(request);
        self.issue_token_with_claims(&request.subject, &claims, lifetime)
    }

    /// Issue a single token for arbitrary claims.
    pub fn issue_token_with_claims(
        &self,
        subject: &str,
        claims: &Claims,
        lifetime: Option<Duration>,
    ) -> Result<String, AuthError> {
        let lifetime = lifetime.unwrap_or_else(|| self.config.access_lifetime());
        let (token, expires_at_ms) = self.sign(subject, claims, Utc::now().timestamp_millis(), lifetime)?;
        tracing::debug!("Issued token (until {})", expires_at_ms);
        Ok(token)
    }

    /// Yes/no gate: `true` only if the token decodes, verifies and has not
    /// expired. Never fails; call [`JwtService::get_claims`] to learn why a
    /// token was rejected.
    pub fn validate(&self, token: &str) -> bool {
        validate_token(token, self.config.signing_key())
    }

    /// Verify a token and return all of its claims.
    pub fn get_claims(&self, token: &str) -> Result<Claims, AuthError> {
        decode_token(token, self.config.signing_key())
    }

    pub fn get_subject(&self, token: &str) -> Result<String, AuthError> {
        self.get_claims(token)?
            .subject()
            .map(str::to_owned)
            .ok_or_else(|| AuthError::MissingClaim(crate::claims::SUBJECT.to_string()))
    }

    /// Roles stored under the configured roles claim.
    pub fn get_roles(&self, token: &str) -> Result<Vec<String>, AuthError> {
        self.get_claims(token)?.string_list(self.config.roles_claim())
    }

    fn roles_claims(&self, request: &TokenRequest) -> Claims {
        Claims::new().with(self.config.roles_claim(), request.roles.clone())
    }

    fn sign(
        &self,
        subject: &str,
        claims: &Claims,
        issued_at_ms: i64,
        lifetime: Duration,
    ) -> Result<(String, i64), AuthError> {
        let expires_at_ms = issued_at_ms
            .checked_add(lifetime.num_milliseconds())
            .ok_or_else(|| AuthError::TokenCreationFailed("token lifetime out of range".to_string()))?;
        let token = encode_token(subject, claims, issued_at_ms, expires_at_ms, self.config.signing_key())?;
        Ok((token, expires_at_ms))
    }
}
