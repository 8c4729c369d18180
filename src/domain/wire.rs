//! JSON encoding for feature values that may be NaN or infinite.
//!
//! JSON numbers cannot carry non-finite values, yet the wetness index is
//! allowed to be one. Finite values travel as numbers; non-finite values
//! travel as the strings `"NaN"`, `"Infinity"` and `"-Infinity"`. A JSON
//! `null` decodes as NaN.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

const NAN_TOKEN: &str = "NaN";
const POS_INF_TOKEN: &str = "Infinity";
const NEG_INF_TOKEN: &str = "-Infinity";

/// A single `f64` with the non-finite string encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WireFloat(pub f64);

impl Serialize for WireFloat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        if v.is_finite() {
            serializer.serialize_f64(v)
        } else if v.is_nan() {
            serializer.serialize_str(NAN_TOKEN)
        } else if v.is_sign_positive() {
            serializer.serialize_str(POS_INF_TOKEN)
        } else {
            serializer.serialize_str(NEG_INF_TOKEN)
        }
    }
}

struct WireFloatVisitor;

impl<'de> Visitor<'de> for WireFloatVisitor {
    type Value = WireFloat;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number, null, or one of \"NaN\", \"Infinity\", \"-Infinity\"")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<WireFloat, E> {
        Ok(WireFloat(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<WireFloat, E> {
        Ok(WireFloat(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<WireFloat, E> {
        Ok(WireFloat(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<WireFloat, E> {
        match v.trim() {
            t if t.eq_ignore_ascii_case(NAN_TOKEN) => Ok(WireFloat(f64::NAN)),
            t if t.eq_ignore_ascii_case(POS_INF_TOKEN) || t.eq_ignore_ascii_case("inf") => {
                Ok(WireFloat(f64::INFINITY))
            }
            t if t.eq_ignore_ascii_case(NEG_INF_TOKEN) || t.eq_ignore_ascii_case("-inf") => {
                Ok(WireFloat(f64::NEG_INFINITY))
            }
            other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
        }
    }

    fn visit_unit<E: de::Error>(self) -> Result<WireFloat, E> {
        Ok(WireFloat(f64::NAN))
    }

    fn visit_none<E: de::Error>(self) -> Result<WireFloat, E> {
        Ok(WireFloat(f64::NAN))
    }
}

impl<'de> Deserialize<'de> for WireFloat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(WireFloatVisitor)
    }
}

/// `#[serde(with = "...")]` adapter for `Vec<f64>` fields.
pub mod float_seq {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for v in values {
            seq.serialize_element(&WireFloat(*v))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let raw = Vec::<WireFloat>::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|w| w.0).collect())
    }
}
