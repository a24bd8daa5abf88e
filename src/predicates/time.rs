// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::PredicateError;
use crate::predicates::utils::{ensure_args_count, ensure_string, internal};
use crate::value::Value;

use chrono::{DateTime, NaiveDate, Utc};

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(predicate: &'static str, s: &str) -> Result<DateTime<Utc>, PredicateError> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        Ok(d) => match d.and_hms_opt(0, 0, 0) {
            Some(t) => Ok(t.and_utc()),
            None => Err(internal(predicate, format!("invalid date `{s}`"))),
        },
        Err(e) => Err(internal(predicate, format!("invalid date `{s}`: {e}"))),
    }
}

fn dates(
    name: &'static str,
    value: &Value,
    args: &[Value],
) -> Result<(DateTime<Utc>, DateTime<Utc>), PredicateError> {
    ensure_args_count(name, args, 1)?;
    let v = ensure_string(name, 0, value)?;
    let bound = ensure_string(name, 1, &args[0])?;
    Ok((parse_date(name, &v)?, parse_date(name, &bound)?))
}

pub fn date_before(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    let (v, bound) = dates("dateBefore", value, args)?;
    Ok(v < bound)
}

pub fn date_after(value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
    let (v, bound) = dates("dateAfter", value, args)?;
    Ok(v > bound)
}
