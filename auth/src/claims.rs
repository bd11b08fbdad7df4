//! Token claims.

use error::AuthError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Registered claim: subject.
pub const SUBJECT: &str = "sub";
/// Registered claim: issued at (Unix timestamp, seconds).
pub const ISSUED_AT: &str = "iat";
/// Registered claim: expiration time (Unix timestamp, seconds).
pub const EXPIRES_AT: &str = "exp";

/// Open-ended claim set carried in a token payload.
///
/// Values are arbitrary JSON. Keys are kept sorted so the encoded payload is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(BTreeMap<String, Value>);

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a claim, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert a claim, returning the previous value if any.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// The `sub` claim, if present and a string.
    pub fn subject(&self) -> Option<&str> {
        self.get(SUBJECT).and_then(Value::as_str)
    }

    /// The `iat` claim in seconds.
    pub fn issued_at(&self) -> Option<i64> {
        self.get(ISSUED_AT).and_then(Value::as_i64)
    }

    /// The `exp` claim in seconds.
    pub fn expires_at(&self) -> Option<i64> {
        self.get(EXPIRES_AT).and_then(Value::as_i64)
    }

    /// Read a claim that must be a list of strings.
    ///
    /// Absence and any other shape (a bare string, a list with a non-string
    /// entry) are both reported as [`AuthError::MissingClaim`].
    pub fn string_list(&self, name: &str) -> Result<Vec<String>, AuthError> {
        let value = self
            .get(name)
            .ok_or_else(|| AuthError::MissingClaim(name.to_string()))?;

        let items = value
            .as_array()
            .ok_or_else(|| AuthError::MissingClaim(format!("{} is not a list", name)))?;

        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| AuthError::MissingClaim(format!("{} contains a non-string entry", name)))
            })
            .collect()
    }
}

impl From<BTreeMap<String, Value>> for Claims {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Claims {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for Claims {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
