//! Validation strategies for values written to the instrument.
//!
//! Every strategy either returns the accepted value or an
//! [`ScopeError::InvalidArgument`]; nothing is clamped silently.

use crate::error::{ScopeError, ScopeResult};
use crate::value::Value;

/// Tolerance used when checking that a value sits on a discrete step.
const STEP_TOLERANCE: f64 = 1e-9;

/// A validator together with its allowed values.
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    /// Value must be one of the listed values.
    DiscreteSet(Vec<Value>),
    /// Numeric value within `[min, max]`.
    Range {
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
    /// Numeric value within `[min, max]` and on a multiple of `step` from `min`.
    DiscreteRange {
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
        /// Step between accepted values.
        step: f64,
    },
}

impl Validator {
    /// Discrete set built from anything convertible into [`Value`].
    pub fn set<T: Into<Value>>(values: impl IntoIterator<Item = T>) -> Self {
        Validator::DiscreteSet(values.into_iter().map(Into::into).collect())
    }

    /// Check `value` against this validator.
    pub fn validate(&self, value: Value) -> ScopeResult<Value> {
        match self {
            Validator::DiscreteSet(allowed) => strict_discrete_set(value, allowed),
            Validator::Range { min, max } => strict_range(value, *min, *max),
            Validator::DiscreteRange { min, max, step } => {
                strict_discrete_range(value, *min, *max, *step)
            }
        }
    }
}

/// Accept `value` only when it is a member of `allowed`.
pub fn strict_discrete_set(value: Value, allowed: &[Value]) -> ScopeResult<Value> {
    if allowed.contains(&value) {
        Ok(value)
    } else {
        let choices: Vec<String> = allowed.iter().map(ToString::to_string).collect();
        Err(ScopeError::invalid(format!(
            "value {value} is not in the discrete set [{}]",
            choices.join(", ")
        )))
    }
}

/// Accept a numeric `value` only when `min <= value <= max`.
pub fn strict_range(value: Value, min: f64, max: f64) -> ScopeResult<Value> {
    let n = numeric(&value)?;
    if (min..=max).contains(&n) {
        Ok(value)
    } else {
        Err(ScopeError::invalid(format!(
            "value {n} is not in range [{min}, {max}]"
        )))
    }
}

/// Accept a numeric `value` within `[min, max]` that lies on a `step` boundary.
pub fn strict_discrete_range(value: Value, min: f64, max: f64, step: f64) -> ScopeResult<Value> {
    let value = strict_range(value, min, max)?;
    let n = numeric(&value)?;
    let steps = (n - min) / step;
    if (steps - steps.round()).abs() <= STEP_TOLERANCE * steps.abs().max(1.0) {
        Ok(value)
    } else {
        Err(ScopeError::invalid(format!(
            "value {n} is not a multiple of {step} in range [{min}, {max}]"
        )))
    }
}

fn numeric(value: &Value) -> ScopeResult<f64> {
    match value {
        Value::Number(n) if n.is_finite() => Ok(*n),
        other => Err(ScopeError::invalid(format!("value {other} is not a finite number"))),
    }
}
