// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Set and sequence predicates.
//!
//! Set style checks (`isSubset`, `containsAll`, ...) ignore element order and
//! compare nested values by content. `listIsEqual` is positional.

use crate::error::PredicateError;
use crate::predicates::hashing::{deep_eq, ContentHasher};
use crate::predicates::utils::{ensure_args_count, ensure_sequence};
use crate::value::Value;

use std::collections::HashSet;

// Subject and single argument as sequences.
fn operands<'a>(
    name: &'static str,
    value: &'a Value,
    args: &'a [Value],
) -> Result<(&'a [Value], &'a [Value]), PredicateError> {
    ensure_args_count(name, args, 1)?;
    Ok((
        ensure_sequence(name, 0, value)?,
        ensure_sequence(name, 1, &args[0])?,
    ))
}

/// Every element of the value appears in the argument.
pub fn is_subset(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    let (subset, superset) = operands("isSubset", value, args)?;
    let hasher = ContentHasher::new();
    let keys = hasher.key_set(superset);
    Ok(subset.iter().all(|v| keys.contains(&hasher.key(v))))
}

/// Every element of the argument appears in the value.
pub fn is_superset(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    let (superset, subset) = operands("isSuperset", value, args)?;
    let hasher = ContentHasher::new();
    let keys = hasher.key_set(superset);
    Ok(subset.iter().all(|v| keys.contains(&hasher.key(v))))
}

pub fn contains_all(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    let (items, wanted) = operands("containsAll", value, args)?;
    let hasher = ContentHasher::new();
    let keys = hasher.key_set(items);
    Ok(wanted.iter().all(|v| keys.contains(&hasher.key(v))))
}

fn any_present(name: &'static str, value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    let (items, wanted) = operands(name, value, args)?;
    let hasher = ContentHasher::new();
    let keys = hasher.key_set(items);
    Ok(wanted.iter().any(|v| keys.contains(&hasher.key(v))))
}

pub fn contains_any_of(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    any_present("containsAnyOf", value, args)
}

pub fn contains_none_of(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    Ok(!any_present("containsNoneOf", value, args)?)
}

pub fn has_no_duplicates(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    let name = "hasNoDuplicates";
    ensure_args_count(name, args, 0)?;
    let items = ensure_sequence(name, 0, value)?;
    let hasher = ContentHasher::new();
    let mut seen = HashSet::with_capacity(items.len());
    Ok(items.iter().all(|v| seen.insert(hasher.key(v))))
}

/// Positional equality.
pub fn list_is_equal(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    let (a, b) = operands("listIsEqual", value, args)?;
    Ok(a.len() == b.len() && a.iter().zip(b).all(|(x, y)| deep_eq(x, y)))
}

/// Set equality: same distinct elements, in any order.
pub fn collection_is_equal(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    let (a, b) = operands("collectionIsEqual", value, args)?;
    let hasher = ContentHasher::new();
    Ok(hasher.key_set(a) == hasher.key_set(b))
}

/// The value equals one of the elements of the argument.
pub fn is_one_of(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    let name = "isOneOf";
    ensure_args_count(name, args, 1)?;
    let options = ensure_sequence(name, 1, &args[0])?;
    let hasher = ContentHasher::new();
    let key = hasher.key(value);
    Ok(options.iter().any(|o| hasher.key(o) == key))
}
