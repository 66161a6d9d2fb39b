//! Deep-derivative comparison of desired and observed objects.
//!
//! Every field populated in the desired object must equal the corresponding field of the observed
//! one. Fields left at their zero value in the desired object are not compared, which tolerates
//! defaults and fields injected by the API server.
use serde::Serialize;
use serde_json::Value;

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Whether `current` carries everything `desired` asks for.
pub fn derivative_eq(desired: &Value, current: &Value) -> bool {
    if is_zero(desired) {
        return true;
    }
    match (desired, current) {
        (Value::Object(desired), Value::Object(current)) => desired.iter().all(|(key, value)| {
            match current.get(key) {
                Some(observed) => derivative_eq(value, observed),
                None => is_zero(value),
            }
        }),
        (Value::Array(desired), Value::Array(current)) => {
            desired.len() == current.len()
                && desired.iter().zip(current).all(|(d, c)| derivative_eq(d, c))
        }
        (desired, current) => desired == current,
    }
}

/// [`derivative_eq`] over the serialized forms of two objects.
pub fn semantic_equal<K: Serialize>(desired: &K, current: &K) -> Result<bool, serde_json::Error> {
    Ok(derivative_eq(&serde_json::to_value(desired)?, &serde_json::to_value(current)?))
}
