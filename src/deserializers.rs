//! Forgiving deserializers for values produced by remote APIs and models.
//!
//! Token counters may be missing or `null` in provider payloads, and models
//! sometimes quote numbers. These helpers accept those shapes while still
//! rejecting values that cannot mean a count or a score.

use serde::{Deserialize, Deserializer};

/// Deserializes a token counter, treating `null` as zero.
///
/// # Accepted Formats
///
/// * **Numeric**: non-negative integers
/// * **Null**: `null` → 0
///
/// Pair with `#[serde(default)]` so a missing field is also zero.
pub fn de_count_or_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

/// Deserializes any defaultable value, treating `null` as its default.
pub fn de_default_on_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserializes a floating point score from a number or a numeric string.
///
/// # Accepted Formats
///
/// * **Numeric**: `0.42`, `-1`, `3`
/// * **String numeric**: `"0.42"`, `" -0.1 "`
///
/// # Errors
///
/// Returns an error for non-numeric strings, non-finite values, and any
/// other JSON type.
pub fn de_score_forgiving<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let v = serde_json::Value::deserialize(deserializer)?;
    let val = match v {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| D::Error::custom("invalid numeric for score"))?,
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("invalid score string: '{}'", s.trim())))?,
        other => {
            return Err(D::Error::custom(format!(
                "expected number or numeric string for score, got {}",
                other
            )));
        }
    };
    if !val.is_finite() {
        return Err(D::Error::custom("non-finite score"));
    }
    Ok(val)
}

/// Deserializes a non-negative count from an integral number or string.
///
/// # Accepted Formats
///
/// * **Numeric**: `3`, `3.0`
/// * **String numeric**: `"3"`
///
/// # Errors
///
/// Returns an error for negative or fractional values, values above
/// `u32::MAX`, and non-numeric input.
pub fn de_count_forgiving<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let v = serde_json::Value::deserialize(deserializer)?;
    let val = match v {
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u as f64
            } else if let Some(f) = n.as_f64() {
                f
            } else {
                return Err(D::Error::custom("invalid numeric for count"));
            }
        }
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("invalid count string: '{}'", s.trim())))?,
        other => {
            return Err(D::Error::custom(format!(
                "expected number or numeric string for count, got {}",
                other
            )));
        }
    };
    if !val.is_finite() || val < 0.0 || val.fract() != 0.0 || val > u32::MAX as f64 {
        return Err(D::Error::custom(format!(
            "count must be a non-negative integer, got {}",
            val
        )));
    }
    Ok(val as u32)
}
