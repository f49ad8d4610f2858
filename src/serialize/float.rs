//! Non-finite float sanitizing.
//!
//! JSON has no spelling for `NaN` or the infinities, and `serde_json` silently
//! turns them into `null`. Every float field of a stored record goes through
//! this module instead, which writes a fixed sentinel string for non-finite
//! values and reads both the sentinels and legacy `null` back.
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Point {
//!     #[serde(with = "trueno_runstore::serialize::float")]
//!     loss: f64,
//! }
//!
//! let json = serde_json::to_string(&Point { loss: f64::NAN }).unwrap();
//! assert_eq!(json, r#"{"loss":"NaN"}"#);
//! let back: Point = serde_json::from_str(&json).unwrap();
//! assert!(back.loss.is_nan());
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sentinel written for `NaN`.
pub const NAN_TOKEN: &str = "NaN";
/// Sentinel written for `+inf`.
pub const INFINITY_TOKEN: &str = "Infinity";
/// Sentinel written for `-inf`.
pub const NEG_INFINITY_TOKEN: &str = "-Infinity";

/// Sentinel for a non-finite value, `None` for finite ones.
#[must_use]
pub fn sentinel(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        Some(NAN_TOKEN)
    } else if value == f64::INFINITY {
        Some(INFINITY_TOKEN)
    } else if value == f64::NEG_INFINITY {
        Some(NEG_INFINITY_TOKEN)
    } else {
        None
    }
}

fn parse_sentinel(token: &str) -> Option<f64> {
    match token {
        NAN_TOKEN => Some(f64::NAN),
        INFINITY_TOKEN => Some(f64::INFINITY),
        NEG_INFINITY_TOKEN => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Number(f64),
    Token(String),
    Null(()),
}

/// A float that (de)serializes through the sentinel encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sanitized(pub f64);

impl PartialEq for Sanitized {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 || (self.0.is_nan() && other.0.is_nan())
    }
}

impl Serialize for Sanitized {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Sanitized {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize(deserializer).map(Self)
    }
}

/// Serialize an `f64`, replacing non-finite values by their sentinel.
///
/// # Errors
///
/// Propagates serializer errors.
#[allow(clippy::trivially_copy_pass_by_ref)]
pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    match sentinel(*value) {
        Some(token) => serializer.serialize_str(token),
        None => serializer.serialize_f64(*value),
    }
}

/// Deserialize an `f64` written by [`serialize`] (or a legacy `null`).
///
/// # Errors
///
/// Fails on strings that are not one of the sentinels.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Repr::deserialize(deserializer)? {
        Repr::Number(value) => Ok(value),
        Repr::Null(()) => Ok(f64::NAN),
        Repr::Token(token) => parse_sentinel(&token)
            .ok_or_else(|| D::Error::custom(format!("invalid float token '{token}'"))),
    }
}

/// Same encoding for `Vec<f64>` fields.
pub mod vec {
    use super::Sanitized;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize every element through the sentinel encoding.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(values: &Vec<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&Sanitized(*value))?;
        }
        seq.end()
    }

    /// Deserialize a sequence written by [`serialize`].
    ///
    /// # Errors
    ///
    /// Fails on elements that are neither numbers nor sentinels.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let values = Vec::<Sanitized>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| v.0).collect())
    }
}
