// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Predicate dispatch.
//!
//! A [`Condition`] names a predicate. Its [`Signature`] is checked before the
//! predicate runs so that a value or argument of the wrong shape is reported
//! as a [`PredicateError`] rather than as a failed assertion.

pub mod collections;
pub mod comparison;
pub mod hashing;
pub mod strings;
pub mod time;
pub mod utils;

use crate::error::PredicateError;
use crate::typing::Type;
use crate::value::Value;

use core::fmt;
use core::str::FromStr;

use serde::Serialize;

pub type PredicateFcn = fn(&Value, &[Value]) -> Result<bool, PredicateError>;

/// Expected shape of a predicate's subject value and arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signature {
    pub value: Type,
    pub args: Vec<Type>,
}

impl Signature {
    fn new(value: Type, args: Vec<Type>) -> Self {
        Self { value, args }
    }

    /// Check `value` and `args` against this signature.
    pub fn check(
        &self,
        predicate: &'static str,
        value: &Value,
        args: &[Value],
    ) -> Result<(), PredicateError> {
        if args.len() != self.args.len() {
            return Err(PredicateError::ArgumentCount {
                predicate,
                expected: self.args.len(),
                actual: args.len(),
            });
        }
        if !self.value.accepts(value) {
            return Err(PredicateError::ValueType {
                predicate,
                expected: self.value.clone(),
                actual: value.type_of(),
            });
        }
        for (idx, (t, arg)) in self.args.iter().zip(args).enumerate() {
            if !t.accepts(arg) {
                return Err(PredicateError::ArgumentType {
                    predicate,
                    position: idx + 1,
                    expected: t.clone(),
                    actual: arg.type_of(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} [", self.value)?;
        for (idx, t) in self.args.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{t}")?;
        }
        f.write_str("]")
    }
}

/// Strings, collections and null: anything with a length.
pub(crate) fn sized_type() -> Type {
    Type::variant(vec![
        Type::String,
        Type::list(Type::Generic),
        Type::map(Type::Generic),
        Type::Null,
    ])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Condition {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    WithinRange,
    IsTrue,
    IsFalse,
    IsEmpty,
    IsNotEmpty,
    HasLength,
    IsOneOf,
    HasPrefix,
    HasSuffix,
    Contains,
    MatchesRegex,
    IsSubset,
    IsSuperset,
    ContainsAll,
    ContainsAnyOf,
    ContainsNoneOf,
    HasNoDuplicates,
    ListIsEqual,
    CollectionIsEqual,
    DateBefore,
    DateAfter,
}

impl Condition {
    pub const ALL: &'static [Condition] = &[
        Condition::Equal,
        Condition::NotEqual,
        Condition::GreaterThan,
        Condition::GreaterThanOrEqual,
        Condition::LessThan,
        Condition::LessThanOrEqual,
        Condition::WithinRange,
        Condition::IsTrue,
        Condition::IsFalse,
        Condition::IsEmpty,
        Condition::IsNotEmpty,
        Condition::HasLength,
        Condition::IsOneOf,
        Condition::HasPrefix,
        Condition::HasSuffix,
        Condition::Contains,
        Condition::MatchesRegex,
        Condition::IsSubset,
        Condition::IsSuperset,
        Condition::ContainsAll,
        Condition::ContainsAnyOf,
        Condition::ContainsNoneOf,
        Condition::HasNoDuplicates,
        Condition::ListIsEqual,
        Condition::CollectionIsEqual,
        Condition::DateBefore,
        Condition::DateAfter,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Condition::Equal => "equal",
            Condition::NotEqual => "notEqual",
            Condition::GreaterThan => "greaterThan",
            Condition::GreaterThanOrEqual => "greaterThanOrEqual",
            Condition::LessThan => "lessThan",
            Condition::LessThanOrEqual => "lessThanOrEqual",
            Condition::WithinRange => "withinRange",
            Condition::IsTrue => "isTrue",
            Condition::IsFalse => "isFalse",
            Condition::IsEmpty => "isEmpty",
            Condition::IsNotEmpty => "isNotEmpty",
            Condition::HasLength => "hasLength",
            Condition::IsOneOf => "isOneOf",
            Condition::HasPrefix => "hasPrefix",
            Condition::HasSuffix => "hasSuffix",
            Condition::Contains => "contains",
            Condition::MatchesRegex => "matchesRegex",
            Condition::IsSubset => "isSubset",
            Condition::IsSuperset => "isSuperset",
            Condition::ContainsAll => "containsAll",
            Condition::ContainsAnyOf => "containsAnyOf",
            Condition::ContainsNoneOf => "containsNoneOf",
            Condition::HasNoDuplicates => "hasNoDuplicates",
            Condition::ListIsEqual => "listIsEqual",
            Condition::CollectionIsEqual => "collectionIsEqual",
            Condition::DateBefore => "dateBefore",
            Condition::DateAfter => "dateAfter",
        }
    }

    pub fn signature(self) -> Signature {
        use Condition::*;
        let list = || Type::list(Type::Generic);
        match self {
            Equal | NotEqual => Signature::new(Type::Generic, vec![Type::Generic]),
            GreaterThan | GreaterThanOrEqual | LessThan | LessThanOrEqual => {
                Signature::new(Type::Number, vec![Type::Number])
            }
            WithinRange => Signature::new(Type::Number, vec![Type::Number, Type::Number]),
            IsTrue | IsFalse => Signature::new(Type::Bool, vec![]),
            IsEmpty | IsNotEmpty => Signature::new(sized_type(), vec![]),
            HasLength => Signature::new(sized_type(), vec![Type::Number]),
            IsOneOf => Signature::new(Type::Generic, vec![list()]),
            HasPrefix | HasSuffix | MatchesRegex | DateBefore | DateAfter => {
                Signature::new(Type::String, vec![Type::String])
            }
            Contains => Signature::new(
                Type::variant(vec![Type::String, list()]),
                vec![Type::Generic],
            ),
            IsSubset | IsSuperset | ContainsAll | ContainsAnyOf | ContainsNoneOf | ListIsEqual
            | CollectionIsEqual => Signature::new(list(), vec![list()]),
            HasNoDuplicates => Signature::new(list(), vec![]),
        }
    }

    fn function(self) -> PredicateFcn {
        use Condition::*;
        match self {
            Equal => comparison::equal,
            NotEqual => comparison::not_equal,
            GreaterThan => comparison::greater_than,
            GreaterThanOrEqual => comparison::greater_than_or_equal,
            LessThan => comparison::less_than,
            LessThanOrEqual => comparison::less_than_or_equal,
            WithinRange => comparison::within_range,
            IsTrue => comparison::is_true,
            IsFalse => comparison::is_false,
            IsEmpty => strings::is_empty,
            IsNotEmpty => strings::is_not_empty,
            HasLength => strings::has_length,
            IsOneOf => collections::is_one_of,
            HasPrefix => strings::has_prefix,
            HasSuffix => strings::has_suffix,
            Contains => strings::contains,
            MatchesRegex => strings::matches_regex,
            IsSubset => collections::is_subset,
            IsSuperset => collections::is_superset,
            ContainsAll => collections::contains_all,
            ContainsAnyOf => collections::contains_any_of,
            ContainsNoneOf => collections::contains_none_of,
            HasNoDuplicates => collections::has_no_duplicates,
            ListIsEqual => collections::list_is_equal,
            CollectionIsEqual => collections::collection_is_equal,
            DateBefore => time::date_before,
            DateAfter => time::date_after,
        }
    }

    /// Run the predicate without the signature check.
    pub fn test(self, value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
        (self.function())(value, args)
    }

    /// Check the signature, then run the predicate.
    pub fn evaluate(self, value: &Value, args: &[Value]) -> Result<bool, PredicateError> {
        self.signature().check(self.name(), value, args)?;
        self.test(value, args)
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown predicate `{s}`"))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Condition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}
