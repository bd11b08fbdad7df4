//! Signing key and token lifetime configuration.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::Duration;
use error::AuthError;
use std::fmt;
use std::str::FromStr;

use crate::claims::{EXPIRES_AT, ISSUED_AT, SUBJECT};

/// Default claim name under which roles are stored.
pub const DEFAULT_ROLES_CLAIM: &str = "auth";

/// HMAC variants a token can be signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// HMAC using SHA-256
    #[default]
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
}

impl Algorithm {
    /// Name as written in the token header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::HS256 => "HS256",
            Algorithm::HS384 => "HS384",
            Algorithm::HS512 => "HS512",
        }
    }

    /// Shortest key accepted for this variant, in bytes.
    pub fn min_key_len(&self) -> usize {
        match self {
            Algorithm::HS256 => 32,
            Algorithm::HS384 => 48,
            Algorithm::HS512 => 64,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(Algorithm::HS256),
            "HS384" => Ok(Algorithm::HS384),
            "HS512" => Ok(Algorithm::HS512),
            other => Err(AuthError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Symmetric key material bound to the algorithm it signs with.
#[derive(Clone)]
pub struct SigningKey {
    bytes: Vec<u8>,
    algorithm: Algorithm,
}

impl SigningKey {
    /// Decode a base64 (standard or URL-safe, padding optional) secret.
    pub fn from_base64(secret: &str, algorithm: Algorithm) -> Result<Self, AuthError> {
        let trimmed = secret.trim().trim_end_matches('=');
        let bytes = STANDARD_NO_PAD
            .decode(trimmed)
            .or_else(|_| URL_SAFE_NO_PAD.decode(trimmed))
            .map_err(|e| AuthError::InvalidKey(format!("secret is not valid base64: {}", e)))?;

        Self::from_bytes(bytes, algorithm)
    }

    /// Wrap raw key bytes, rejecting keys too short for `algorithm`.
    pub fn from_bytes(bytes: Vec<u8>, algorithm: Algorithm) -> Result<Self, AuthError> {
        if bytes.len() < algorithm.min_key_len() {
            return Err(AuthError::InvalidKey(format!(
                "{} requires at least {} bits, got {}",
                algorithm,
                algorithm.min_key_len() * 8,
                bytes.len() * 8
            )));
        }
        Ok(Self { bytes, algorithm })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// JWT configuration.
///
/// Immutable once built; share it behind an `Arc` (see [`crate::JwtService`]).
#[derive(Debug, Clone)]
pub struct JwtConfig {
    signing_key: SigningKey,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
    roles_claim: String,
}

impl JwtConfig {
    /// Default access token lifetime (30 minutes).
    pub fn default_access_lifetime() -> Duration {
        Duration::minutes(30)
    }

    /// Default refresh token lifetime (7 days).
    pub fn default_refresh_lifetime() -> Duration {
        Duration::days(7)
    }

    /// Create a configuration from a base64 secret, signing with HS256 and
    /// the default lifetimes.
    pub fn new(secret: &str) -> Result<Self, AuthError> {
        Ok(Self {
            signing_key: SigningKey::from_base64(secret, Algorithm::default())?,
            access_lifetime: Self::default_access_lifetime(),
            refresh_lifetime: Self::default_refresh_lifetime(),
            roles_claim: DEFAULT_ROLES_CLAIM.to_string(),
        })
    }

    /// Create configuration from environment variables.
    ///
    /// `JWT_SECRET` is required. `JWT_ALGORITHM`,
    /// `JWT_ACCESS_TOKEN_EXPIRATION_MS`, `JWT_REFRESH_TOKEN_EXPIRATION_MS`
    /// and `JWT_ROLES_CLAIM` override the defaults when set.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET")
            .ok_or_else(|| AuthError::InvalidConfig("JWT_SECRET is not set".to_string()))?;

        let algorithm = match lookup("JWT_ALGORITHM") {
            Some(name) => name
                .parse::<Algorithm>()
                .map_err(|_| AuthError::InvalidConfig(format!("JWT_ALGORITHM: unknown value {:?}", name)))?,
            None => Algorithm::default(),
        };

        let mut config = Self::new(&secret)?.with_algorithm(algorithm)?;

        if let Some(value) = lookup("JWT_ACCESS_TOKEN_EXPIRATION_MS") {
            config.access_lifetime = parse_millis("JWT_ACCESS_TOKEN_EXPIRATION_MS", &value)?;
        }

        if let Some(value) = lookup("JWT_REFRESH_TOKEN_EXPIRATION_MS") {
            config.refresh_lifetime = parse_millis("JWT_REFRESH_TOKEN_EXPIRATION_MS", &value)?;
        }

        if let Some(name) = lookup("JWT_ROLES_CLAIM") {
            config = config.with_roles_claim(name.trim())?;
        }

        tracing::info!(
            "Loaded JWT config: algorithm={}, access={}ms, refresh={}ms",
            config.signing_key.algorithm(),
            config.access_lifetime_ms(),
            config.refresh_lifetime_ms()
        );

        Ok(config)
    }

    /// Set the access token lifetime.
    pub fn with_access_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_lifetime = lifetime;
        self
    }

    /// Set the refresh token lifetime.
    pub fn with_refresh_lifetime(mut self, lifetime: Duration) -> Self {
        self.refresh_lifetime = lifetime;
        self
    }

    /// Set the claim name roles are stored under.
    ///
    /// Empty names and the registered `sub`/`iat`/`exp` claims are rejected,
    /// since the codec would overwrite the roles stored there.
    pub fn with_roles_claim(mut self, name: impl Into<String>) -> Result<Self, AuthError> {
        let name = name.into();
        check_roles_claim(&name)?;
        self.roles_claim = name;
        Ok(self)
    }

    /// Switch the HMAC variant. Fails if the key is too short for it.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Result<Self, AuthError> {
        if algorithm != self.signing_key.algorithm {
            self.signing_key = SigningKey::from_bytes(self.signing_key.bytes, algorithm)?;
        }
        Ok(self)
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn access_lifetime(&self) -> Duration {
        self.access_lifetime
    }

    pub fn refresh_lifetime(&self) -> Duration {
        self.refresh_lifetime
    }

    pub fn access_lifetime_ms(&self) -> i64 {
        self.access_lifetime.num_milliseconds()
    }

    pub fn refresh_lifetime_ms(&self) -> i64 {
        self.refresh_lifetime.num_milliseconds()
    }

    pub fn roles_claim(&self) -> &str {
        &self.roles_claim
    }
}

fn check_roles_claim(name: &str) -> Result<(), AuthError> {
    if name.is_empty() {
        return Err(AuthError::InvalidConfig("roles claim name is empty".to_string()));
    }
    if [SUBJECT, ISSUED_AT, EXPIRES_AT].contains(&name) {
        return Err(AuthError::InvalidConfig(format!(
            "roles claim name {:?} is a registered claim",
            name
        )));
    }
    Ok(())
}

fn parse_millis(name: &str, value: &str) -> Result<Duration, AuthError> {
    match value.trim().parse::<i64>() {
        Ok(ms) if ms > 0 => Ok(Duration::milliseconds(ms)),
        _ => Err(AuthError::InvalidConfig(format!(
            "{}: expected a positive number of milliseconds, got {:?}",
            name, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    // "ThisIsTestSecretKeyForJWTTokenGenerationAndValidation", 53 bytes
    const SECRET: &str = "VGhpc0lzVGVzdFNlY3JldEtleUZvckpXVFRva2VuR2VuZXJhdGlvbkFuZFZhbGlkYXRpb24=";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = JwtConfig::new(SECRET).unwrap();
        assert_eq!(config.access_lifetime_ms(), 1_800_000);
        assert_eq!(config.refresh_lifetime_ms(), 604_800_000);
        assert_eq!(config.roles_claim(), "auth");
        assert_eq!(config.signing_key().algorithm(), Algorithm::HS256);
    }

    #[test]
    fn test_url_safe_and_unpadded_secrets() {
        let standard = SigningKey::from_base64(SECRET, Algorithm::HS256).unwrap();
        let unpadded = SigningKey::from_base64(SECRET.trim_end_matches('='), Algorithm::HS256).unwrap();
        assert_eq!(standard.as_bytes(), unpadded.as_bytes());

        // 0xfb 0xff bytes encode to '+' and '/' (or '-' and '_')
        let raw = vec![0xfb_u8; 33];
        let url_safe = URL_SAFE_NO_PAD.encode(&raw);
        assert!(url_safe.contains('-') || url_safe.contains('_'));
        let key = SigningKey::from_base64(&url_safe, Algorithm::HS256).unwrap();
        assert_eq!(key.as_bytes(), raw.as_slice());
    }

    #[test]
    fn test_rejects_invalid_secret() {
        let err = JwtConfig::new("not base64 at all!").unwrap_err();
        assert!(matches!(err, AuthError::InvalidKey(_)));

        // 16 bytes is below the HS256 minimum
        let short = STANDARD_NO_PAD.encode([7u8; 16]);
        let err = JwtConfig::new(&short).unwrap_err();
        assert!(matches!(err, AuthError::InvalidKey(_)));

        assert!(matches!(JwtConfig::new("").unwrap_err(), AuthError::InvalidKey(_)));
    }

    #[test]
    fn test_with_algorithm_checks_key_length() {
        // 53 bytes: enough for HS384, not for HS512
        let config = JwtConfig::new(SECRET).unwrap();
        let config = config.with_algorithm(Algorithm::HS384).unwrap();
        assert_eq!(config.signing_key().algorithm(), Algorithm::HS384);

        let err = config.with_algorithm(Algorithm::HS512).unwrap_err();
        assert!(matches!(err, AuthError::InvalidKey(_)));
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("hs512".parse::<Algorithm>().unwrap(), Algorithm::HS512);
        assert!(matches!(
            "none".parse::<Algorithm>(),
            Err(AuthError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = JwtConfig::from_lookup(lookup(&[
            ("JWT_SECRET", SECRET),
            ("JWT_ACCESS_TOKEN_EXPIRATION_MS", "900000"),
            ("JWT_REFRESH_TOKEN_EXPIRATION_MS", "86400000"),
            ("JWT_ROLES_CLAIM", "roles"),
            ("JWT_ALGORITHM", "HS384"),
        ]))
        .unwrap();

        assert_eq!(config.access_lifetime_ms(), 900_000);
        assert_eq!(config.refresh_lifetime_ms(), 86_400_000);
        assert_eq!(config.roles_claim(), "roles");
        assert_eq!(config.signing_key().algorithm(), Algorithm::HS384);
    }

    #[test]
    fn test_from_lookup_errors() {
        let err = JwtConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, AuthError::InvalidConfig(_)));

        let err = JwtConfig::from_lookup(lookup(&[
            ("JWT_SECRET", SECRET),
            ("JWT_ACCESS_TOKEN_EXPIRATION_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AuthError::InvalidConfig(_)));

        let err = JwtConfig::from_lookup(lookup(&[
            ("JWT_SECRET", SECRET),
            ("JWT_REFRESH_TOKEN_EXPIRATION_MS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AuthError::InvalidConfig(_)));

        let err = JwtConfig::from_lookup(lookup(&[("JWT_SECRET", SECRET), ("JWT_ALGORITHM", "RS256")]))
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidConfig(_)));
    }

    #[test]
    fn test_roles_claim_must_not_collide() {
        for name in ["", "sub", "iat", "exp"] {
            let err = JwtConfig::new(SECRET).unwrap().with_roles_claim(name).unwrap_err();
            assert!(matches!(err, AuthError::InvalidConfig(_)), "{:?}: {:?}", name, err);

            let err = JwtConfig::from_lookup(lookup(&[("JWT_SECRET", SECRET), ("JWT_ROLES_CLAIM", name)]))
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidConfig(_)), "{:?}: {:?}", name, err);
        }

        let config = JwtConfig::new(SECRET).unwrap().with_roles_claim("roles").unwrap();
        assert_eq!(config.roles_claim(), "roles");
    }

    #[test]
    fn test_debug_hides_key_material() {
        let config = JwtConfig::new(SECRET).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("84, 104"));
        assert!(rendered.contains("HS256"));
    }
}
