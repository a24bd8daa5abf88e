// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::PredicateError;
use crate::predicates::hashing::deep_eq;
use crate::predicates::utils::{ensure_args_count, ensure_bool, ensure_numeric, internal};
use crate::value::Value;

pub fn equal(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    ensure_args_count("equal", args, 1)?;
    Ok(deep_eq(value, &args[0]))
}

pub fn not_equal(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    ensure_args_count("notEqual", args, 1)?;
    Ok(!deep_eq(value, &args[0]))
}

fn compare(
    name: &'static str,
    value: &Value,
    args: &[Value],
    op: fn(f64, f64) -> bool,
) -> Result<bool, PredicateError> {
    ensure_args_count(name, args, 1)?;
    let v = ensure_numeric(name, 0, value)?;
    let bound = ensure_numeric(name, 1, &args[0])?;
    Ok(op(v, bound))
}

pub fn greater_than(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    compare("greaterThan", value, args, |v, b| v > b)
}

pub fn greater_than_or_equal(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    compare("greaterThanOrEqual", value, args, |v, b| v >= b)
}

pub fn less_than(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    compare("lessThan", value, args, |v, b| v < b)
}

pub fn less_than_or_equal(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    compare("lessThanOrEqual", value, args, |v, b| v <= b)
}

/// Inclusive on both ends.
pub fn within_range(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    let name = "withinRange";
    ensure_args_count(name, args, 2)?;
    let v = ensure_numeric(name, 0, value)?;
    let min = ensure_numeric(name, 1, &args[0])?;
    let max = ensure_numeric(name, 2, &args[1])?;
    if min > max {
        return Err(internal(name, format!("empty range [{min}, {max}]")));
    }
    Ok(min <= v && v <= max)
}

pub fn is_true(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    ensure_args_count("isTrue", args, 0)?;
    ensure_bool("isTrue", 0, value)
}

pub fn is_false(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    ensure_args_count("isFalse", args, 0)?;
    Ok(!ensure_bool("isFalse", 0, value)?)
}
