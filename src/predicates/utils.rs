// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::PredicateError;
use crate::typing::Type;
use crate::value::Value;
use crate::Rc;

use std::collections::BTreeMap;

pub fn ensure_args_count(
    predicate: &'static str,
    args: &[Value],
    expected: usize,
) -> Result<(), PredicateError> {
    if args.len() != expected {
        return Err(PredicateError::ArgumentCount {
            predicate,
            expected,
            actual: args.len(),
        });
    }
    Ok(())
}

// Position 0 is the subject value, arguments start at 1.
fn mismatch(predicate: &'static str, position: usize, expected: Type, v: &Value) -> PredicateError {
    if position == 0 {
        PredicateError::ValueType {
            predicate,
            expected,
            actual: v.type_of(),
        }
    } else {
        PredicateError::ArgumentType {
            predicate,
            position,
            expected,
            actual: v.type_of(),
        }
    }
}

pub fn ensure_numeric(predicate: &'static str, position: usize, v: &Value) -> Result<f64, PredicateError> {
    v.as_number()
        .map_err(|_| mismatch(predicate, position, Type::Number, v))
}

pub fn ensure_string(
    predicate: &'static str,
    position: usize,
    v: &Value,
) -> Result<Rc<str>, PredicateError> {
    v.as_string()
        .cloned()
        .map_err(|_| mismatch(predicate, position, Type::String, v))
}

pub fn ensure_bool(predicate: &'static str, position: usize, v: &Value) -> Result<bool, PredicateError> {
    v.as_bool()
        .map_err(|_| mismatch(predicate, position, Type::Bool, v))
}

pub fn ensure_sequence<'a>(
    predicate: &'static str,
    position: usize,
    v: &'a Value,
) -> Result<&'a [Value], PredicateError> {
    v.as_sequence()
        .ok_or_else(|| mismatch(predicate, position, Type::list(Type::Generic), v))
}

pub fn ensure_entries<'a>(
    predicate: &'static str,
    position: usize,
    v: &'a Value,
) -> Result<&'a BTreeMap<String, Value>, PredicateError> {
    v.as_entries()
        .ok_or_else(|| mismatch(predicate, position, Type::map(Type::Generic), v))
}

pub fn internal(predicate: &'static str, message: impl Into<String>) -> PredicateError {
    PredicateError::Internal {
        predicate,
        message: message.into(),
    }
}
