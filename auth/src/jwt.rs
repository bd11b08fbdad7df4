//! JWT encoding and decoding utilities.
//!
//! Tokens use the compact form `header.payload.signature`, each segment
//! base64url without padding, signed with HMAC over `header.payload`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use error::AuthError;
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};

use crate::claims::{Claims, EXPIRES_AT, ISSUED_AT, SUBJECT};
use crate::config::{Algorithm, SigningKey};

/// JOSE header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

impl Header {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            alg: algorithm.as_str().to_string(),
            typ: Some("JWT".to_string()),
        }
    }
}

/// Encode claims into a JWT token.
///
/// `sub`, `iat` and `exp` are always taken from the arguments and replace
/// any entries of the same name in `claims`. Timestamps are given in epoch
/// milliseconds and written in seconds.
pub fn encode_token(
    subject: &str,
    claims: &Claims,
    issued_at_ms: i64,
    expires_at_ms: i64,
    key: &SigningKey,
) -> Result<String, AuthError> {
    let mut payload = claims.clone();
    payload.insert(SUBJECT, subject);
    payload.insert(ISSUED_AT, issued_at_ms.div_euclid(1000));
    payload.insert(EXPIRES_AT, expires_at_ms.div_euclid(1000));

    let header = serde_json::to_vec(&Header::new(key.algorithm())).map_err(|e| {
        tracing::error!("Failed to serialize JWT header: {}", e);
        AuthError::TokenCreationFailed(e.to_string())
    })?;
    let payload = serde_json::to_vec(&payload).map_err(|e| {
        tracing::error!("Failed to serialize JWT claims: {}", e);
        AuthError::TokenCreationFailed(e.to_string())
    })?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(payload)
    );
    let signature = sign(key, signing_input.as_bytes())?;

    Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
}

/// Decode and validate a JWT token against the current time.
pub fn decode_token(token: &str, key: &SigningKey) -> Result<Claims, AuthError> {
    decode_token_at(token, key, chrono::Utc::now().timestamp()).map_err(|e| {
        tracing::warn!("Failed to decode JWT: {}", e);
        e
    })
}

/// Check a token, discarding the reason it was rejected.
///
/// Every decode failure maps to `false`; use [`decode_token`] when the cause
/// matters.
pub fn validate_token(token: &str, key: &SigningKey) -> bool {
    decode_token(token, key).is_ok()
}

/// Decode a token as of `now` (Unix seconds).
pub(crate) fn decode_token_at(token: &str, key: &SigningKey, now: i64) -> Result<Claims, AuthError> {
    let segments: Vec<&str> = token.split('.').collect();
    let (header_b64, payload_b64, signature_b64) = match segments.as_slice() {
        [h, p, s] => (*h, *p, *s),
        _ => {
            return Err(AuthError::MalformedToken(format!(
                "expected 3 segments, found {}",
                segments.len()
            )))
        }
    };

    let header: Header = decode_json(header_b64, "header")?;
    // Checked before touching the signature so "none" and foreign
    // algorithms never reach verification.
    if header.alg != key.algorithm().as_str() {
        return Err(AuthError::UnsupportedAlgorithm(header.alg));
    }

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AuthError::SignatureMismatch)?;
    let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];
    if !verify(key, signing_input.as_bytes(), &signature)? {
        return Err(AuthError::SignatureMismatch);
    }

    let claims: Claims = decode_json(payload_b64, "payload")?;
    for name in [ISSUED_AT, EXPIRES_AT] {
        if claims.get(name).map_or(false, |v| v.as_i64().is_none()) {
            return Err(AuthError::MalformedToken(format!("{} is not an integer", name)));
        }
    }

    if let Some(exp) = claims.expires_at() {
        if now >= exp {
            return Err(AuthError::TokenExpired);
        }
    }

    Ok(claims)
}

fn decode_json<T: serde::de::DeserializeOwned>(segment: &str, what: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::MalformedToken(format!("{} is not base64url: {}", what, e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::MalformedToken(format!("{} is not valid JSON: {}", what, e)))
}

fn keyed<M: Mac + KeyInit>(key: &SigningKey, message: &[u8]) -> Result<M, AuthError> {
    let mut mac = <M as Mac>::new_from_slice(key.as_bytes()).map_err(|e| {
        tracing::error!("Failed to create HMAC key: {}", e);
        AuthError::InvalidKey(e.to_string())
    })?;
    mac.update(message);
    Ok(mac)
}

fn sign(key: &SigningKey, message: &[u8]) -> Result<Vec<u8>, AuthError> {
    Ok(match key.algorithm() {
        Algorithm::HS256 => keyed::<Hmac<Sha256>>(key, message)?.finalize().into_bytes().to_vec(),
        Algorithm::HS384 => keyed::<Hmac<Sha384>>(key, message)?.finalize().into_bytes().to_vec(),
        Algorithm::HS512 => keyed::<Hmac<Sha512>>(key, message)?.finalize().into_bytes().to_vec(),
    })
}

/// Constant-time signature comparison.
fn verify(key: &SigningKey, message: &[u8], signature: &[u8]) -> Result<bool, AuthError> {
    Ok(match key.algorithm() {
        Algorithm::HS256 => keyed::<Hmac<Sha256>>(key, message)?.verify_slice(signature).is_ok(),
        Algorithm::HS384 => keyed::<Hmac<Sha384>>(key, message)?.verify_slice(signature).is_ok(),
        Algorithm::HS512 => keyed::<Hmac<Sha512>>(key, message)?.verify_slice(signature).is_ok(),
    })
}
