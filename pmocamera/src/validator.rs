//! Argument checks against a declared signature.

use crate::error::{CameraError, Result};
use crate::registry::TypeTag;
use serde_json::Value;

/// Check `given` against the `expected` type tags of `method`.
///
/// The count must match exactly. Types are then checked position by
/// position and the first mismatch is reported.
pub fn validate(method: &str, given: &[Value], expected: &[TypeTag]) -> Result<()> {
    if given.len() != expected.len() {
        return Err(CameraError::Arity {
            method: method.to_string(),
            expected: expected.len(),
            given: given.len(),
        });
    }

    match given
        .iter()
        .zip(expected)
        .position(|(value, tag)| !tag.accepts(value))
    {
        Some(index) => Err(CameraError::Type {
            method: method.to_string(),
            index,
            value: given[index].clone(),
            expected: expected[index].to_string(),
        }),
        None => Ok(()),
    }
}
