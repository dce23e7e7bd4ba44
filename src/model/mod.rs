//! Runner-side data shapes: steps, tests, suites and batch results.

pub mod batch;
pub mod step;
pub mod test;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub use batch::{BatchResult, NormalizedResult, TestBuckets};
pub use step::{SECRET_MASK, Step, StepArg, StepContext};
pub use test::{ArtifactBundle, ErrorPayload, Outcome, SuiteRef, TestCase};

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Read a list of steps where any falsy placeholder (`null`, `false`, `0`,
/// `""`) stands for an absent step. A `null` list reads as empty.
pub(crate) fn step_slots<'de, D>(deserializer: D) -> Result<Vec<Option<Step>>, D::Error>
where
    D: Deserializer<'de>,
{
    let slots = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    slots
        .into_iter()
        .map(|slot| match slot {
            Value::Object(_) => serde_json::from_value(slot).map(Some).map_err(D::Error::custom),
            other if is_falsy(&other) => Ok(None),
            other => Err(D::Error::custom(format!("expected a step object, found {other}"))),
        })
        .collect()
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
