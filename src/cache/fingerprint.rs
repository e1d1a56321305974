//! Request fingerprints used as cache keys
//!
//! A fingerprint is the SHA-256 of the endpoint joined with a canonical form
//! of the query parameters. Parameters live in a `BTreeMap`, so the canonical
//! form is sorted by key and two requests built in a different insertion
//! order hash to the same key.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::CacheError;

/// Query parameters of a GET request, restricted to scalar values
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryParams {
    values: BTreeMap<String, Value>,
}

impl QueryParams {
    /// Creates an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing any previous value for the same key
    ///
    /// # Example
    ///
    /// ```
    /// use dramaball::cache::QueryParams;
    ///
    /// let params = QueryParams::new().with("league", "NFL").with("season", 2025);
    /// assert_eq!(params.len(), 2);
    /// ```
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.values.insert(key.into(), value.into().0);
        self
    }

    /// Builds parameters from any serializable value
    ///
    /// The value must serialize to a flat JSON object whose fields are strings,
    /// numbers, booleans or null. Anything else is rejected with
    /// `CacheError::InvalidFingerprintInput`, which the caller should treat as
    /// a failure of that single request.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, CacheError> {
        let json = serde_json::to_value(value)
            .map_err(|e| CacheError::InvalidFingerprintInput(e.to_string()))?;

        let map = match json {
            Value::Object(map) => map,
            other => {
                return Err(CacheError::InvalidFingerprintInput(format!(
                    "expected a map of parameters, got {}",
                    other
                )))
            }
        };

        let mut values = BTreeMap::new();
        for (key, value) in map {
            if value.is_object() || value.is_array() {
                return Err(CacheError::InvalidFingerprintInput(format!(
                    "parameter '{}' is not a scalar",
                    key
                )));
            }
            values.insert(key, value);
        }

        Ok(Self { values })
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no parameters are set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over `(key, value)` pairs as strings, sorted by key
    ///
    /// Strings are emitted without JSON quoting so the pairs can be handed
    /// straight to an HTTP query builder.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, String)> {
        self.values.iter().map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key.as_str(), rendered)
        })
    }

    /// Canonical string form: a JSON object with keys in sorted order
    fn canonical(&self) -> String {
        // BTreeMap<String, Value> always serializes; keys are strings.
        serde_json::to_string(&self.values).unwrap_or_default()
    }
}

/// A scalar parameter value
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar(Value);

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar(Value::String(value.to_string()))
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar(Value::String(value))
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar(Value::from(value))
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar(Value::from(value))
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Scalar(Value::from(value))
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar(Value::from(value))
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar(Value::Bool(value))
    }
}

/// Computes the cache key for a request
///
/// Absent parameters and an empty parameter set produce different keys, the
/// same way `"/matches"` and `"/matches?"` are different requests upstream.
pub fn fingerprint(endpoint: &str, params: Option<&QueryParams>) -> String {
    let params_part = match params {
        Some(params) => params.canonical(),
        None => "null".to_string(),
    };
    let key_data = format!("{}_{}", endpoint, params_part);
    hex::encode(Sha256::digest(key_data.as_bytes()))
}
