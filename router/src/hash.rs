//! Content hash over a route set.
//!
//! The hash is the optimistic-consistency token shared between the local
//! route set and the index. "Never written" is its own variant so it cannot
//! be confused with the hash of an empty route set.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::route::Route;

/// State hash of a route set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum StateHash {
    /// No hash has been written yet.
    Uninitialized,

    /// Hex-encoded SHA-256 digest.
    Value(String),
}

impl StateHash {
    /// Hash the full, ordered route set.
    ///
    /// Every field of every route takes part, so two hashes are equal only
    /// when the serialized definitions are byte-for-byte equal.
    pub fn compute(routes: &[Route]) -> serde_json::Result<Self> {
        let bytes = serde_json::to_vec(routes)?;
        Ok(Self::Value(format!("{:x}", Sha256::digest(bytes))))
    }

    /// Whether no hash has been written yet.
    pub fn is_uninitialized(&self) -> bool {
        matches!(self, Self::Uninitialized)
    }

    /// The digest, if there is one.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Uninitialized => None,
            Self::Value(value) => Some(value),
        }
    }
}

impl fmt::Display for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("<uninitialized>"),
            Self::Value(value) => f.write_str(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hash_is_deterministic() {
        let routes = vec![Route::new("greeting", ["hi", "hello"])];
        assert_eq!(
            StateHash::compute(&routes).unwrap(),
            StateHash::compute(&routes.clone()).unwrap()
        );
    }

    #[test]
    fn test_empty_route_set_is_not_uninitialized() {
        let hash = StateHash::compute(&[]).unwrap();
        assert!(!hash.is_uninitialized());
        assert_eq!(hash.value().map(str::len), Some(64));
        assert_ne!(hash, StateHash::Uninitialized);
    }

    #[test]
    fn test_every_field_changes_the_hash() {
        let base = Route::new("greeting", ["hi", "hello"]);
        let variants = [
            Route::new("greetings", ["hi", "hello"]),
            Route::new("greeting", ["hello", "hi"]),
            base.clone().with_metadata("lang", "en"),
            base.clone()
                .with_function_schema(serde_json::json!({"name": "wave"})),
        ];

        let base_hash = StateHash::compute(std::slice::from_ref(&base)).unwrap();
        for variant in variants {
            assert_ne!(
                StateHash::compute(&[variant.clone()]).unwrap(),
                base_hash,
                "{variant:?}"
            );
        }
    }

    #[test]
    fn test_serde_round_trip_keeps_variant() {
        let json = serde_json::to_string(&StateHash::Uninitialized).unwrap();
        assert_eq!(json, r#"{"state":"uninitialized"}"#);
        let back: StateHash = serde_json::from_str(&json).unwrap();
        assert!(back.is_uninitialized());
    }
}
