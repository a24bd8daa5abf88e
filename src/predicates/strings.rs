// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::PredicateError;
use crate::predicates::hashing::deep_eq;
use crate::predicates::utils::{ensure_args_count, ensure_numeric, ensure_string, internal};
use crate::typing::Type;
use crate::value::Value;

use regex::Regex;

pub fn has_prefix(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    let name = "hasPrefix";
    ensure_args_count(name, args, 1)?;
    let s = ensure_string(name, 0, value)?;
    let prefix = ensure_string(name, 1, &args[0])?;
    Ok(s.starts_with(prefix.as_ref()))
}

pub fn has_suffix(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    let name = "hasSuffix";
    ensure_args_count(name, args, 1)?;
    let s = ensure_string(name, 0, value)?;
    let suffix = ensure_string(name, 1, &args[0])?;
    Ok(s.ends_with(suffix.as_ref()))
}

/// Substring test for strings, membership test for lists and tuples.
pub fn contains(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    let name = "contains";
    ensure_args_count(name, args, 1)?;
    if let Some(items) = value.as_sequence() {
        return Ok(items.iter().any(|v| deep_eq(v, &args[0])));
    }
    match value.unwrapped() {
        Value::String(s) => {
            let needle = ensure_string(name, 1, &args[0])?;
            Ok(s.contains(needle.as_ref()))
        }
        _ => Err(PredicateError::ValueType {
            predicate: name,
            expected: Type::variant(vec![Type::String, Type::list(Type::Generic)]),
            actual: value.type_of(),
        }),
    }
}

/// Unanchored search. Anchor the pattern with `^...$` to match the whole string.
pub fn matches_regex(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    let name = "matchesRegex";
    ensure_args_count(name, args, 1)?;
    let s = ensure_string(name, 0, value)?;
    let pattern = ensure_string(name, 1, &args[0])?;
    let re = Regex::new(&pattern).map_err(|e| internal(name, format!("invalid regex: {e}")))?;
    Ok(re.is_match(&s))
}

// Number of characters, elements or entries. None for other kinds.
fn length(value: &Value) -> Option<usize> {
    if let Some(items) = value.as_sequence() {
        return Some(items.len());
    }
    if let Some(entries) = value.as_entries() {
        return Some(entries.len());
    }
    match value.unwrapped() {
        Value::String(s) => Some(s.chars().count()),
        Value::Null => Some(0),
        _ => None,
    }
}

fn sized(name: &'static str, value: &Value) -> Result<usize, PredicateError> {
    length(value).ok_or_else(|| PredicateError::ValueType {
        predicate: name,
        expected: super::sized_type(),
        actual: value.type_of(),
    })
}

pub fn is_empty(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    ensure_args_count("isEmpty", args, 0)?;
    Ok(sized("isEmpty", value)? == 0)
}

pub fn is_not_empty(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    ensure_args_count("isNotEmpty", args, 0)?;
    Ok(sized("isNotEmpty", value)? != 0)
}

pub fn has_length(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    let name = "hasLength";
    ensure_args_count(name, args, 1)?;
    let len = sized(name, value)?;
    let expected = ensure_numeric(name, 1, &args[0])?;
    if expected < 0.0 || expected.fract() != 0.0 {
        return Err(internal(name, format!("invalid length {expected}")));
    }
    Ok(len as f64 == expected)
}
