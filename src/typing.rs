// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Type descriptors for [`Value`](crate::Value).
//!
//! Every descriptor has a [`TypeKind`] tag. Primitive kinds carry the
//! [`TypeKind::PRIMITIVE`] bit, composite kinds each own a distinct bit below
//! it, so primitive tests and kind compatibility checks are integer masks
//! rather than structural walks.

use crate::value::Value;
use crate::Rc;

use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeKind {
    Null = 0x8001,
    Bool = 0x8002,
    Number = 0x8004,
    String = 0x8008,

    List = 0x0010,
    Map = 0x0020,
    Object = 0x0040,
    Tuple = 0x0080,
    Variant = 0x0100,
    Generic = 0x0200,
}

impl TypeKind {
    pub const PRIMITIVE: u16 = 0x8000;

    /// Kinds that can be indexed by position.
    pub const SEQUENCE: u16 = TypeKind::List.bits() | TypeKind::Tuple.bits();

    /// Kinds that can be indexed by attribute name.
    pub const KEYED: u16 = TypeKind::Map.bits() | TypeKind::Object.bits();

    pub const fn bits(self) -> u16 {
        self as u16
    }

    pub const fn is_primitive(self) -> bool {
        self.bits() & Self::PRIMITIVE != 0
    }

    pub const fn is_sequence(self) -> bool {
        self.bits() & Self::SEQUENCE != 0
    }

    pub const fn is_keyed(self) -> bool {
        self.bits() & Self::KEYED != 0
    }

    /// Kinds that only wrap another value.
    pub const fn is_wrapper(self) -> bool {
        self.bits() & (TypeKind::Variant.bits() | TypeKind::Generic.bits()) != 0
    }

    pub const fn name(self) -> &'static str {
        match self {
            TypeKind::Null => "null",
            TypeKind::Bool => "bool",
            TypeKind::Number => "number",
            TypeKind::String => "string",
            TypeKind::List => "list",
            TypeKind::Map => "map",
            TypeKind::Object => "object",
            TypeKind::Tuple => "tuple",
            TypeKind::Variant => "variant",
            TypeKind::Generic => "generic",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "camelCase")]
pub enum Type {
    Null,
    Bool,
    Number,
    String,

    // Homogenous sequence.
    List { item_type: Box<Type> },

    // String keyed, homogenous values.
    Map { value_type: Box<Type> },

    // Named fields with individual types.
    Object { fields: Rc<BTreeMap<String, Type>> },

    // Positional, heterogenous.
    Tuple { item_types: Vec<Type> },

    // One of the candidates, in priority order.
    Variant { candidates: Vec<Type> },

    // Any value.
    Generic,
}

impl Type {
    pub fn list(item_type: Type) -> Type {
        Type::List {
            item_type: Box::new(item_type),
        }
    }

    pub fn map(value_type: Type) -> Type {
        Type::Map {
            value_type: Box::new(value_type),
        }
    }

    pub fn object<I, K>(fields: I) -> Type
    where
        I: IntoIterator<Item = (K, Type)>,
        K: Into<String>,
    {
        Type::Object {
            fields: Rc::new(fields.into_iter().map(|(k, t)| (k.into(), t)).collect()),
        }
    }

    pub fn tuple(item_types: Vec<Type>) -> Type {
        Type::Tuple { item_types }
    }

    pub fn variant(candidates: Vec<Type>) -> Type {
        Type::Variant { candidates }
    }

    /// `t` or null.
    pub fn optional(t: Type) -> Type {
        Type::variant(vec![t, Type::Null])
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            Type::Null => TypeKind::Null,
            Type::Bool => TypeKind::Bool,
            Type::Number => TypeKind::Number,
            Type::String => TypeKind::String,
            Type::List { .. } => TypeKind::List,
            Type::Map { .. } => TypeKind::Map,
            Type::Object { .. } => TypeKind::Object,
            Type::Tuple { .. } => TypeKind::Tuple,
            Type::Variant { .. } => TypeKind::Variant,
            Type::Generic => TypeKind::Generic,
        }
    }

    pub fn is_primitive(&self) -> bool {
        self.kind().is_primitive()
    }

    /// Union of kind bits this type can accept at the top level.
    pub fn accepted_kinds(&self) -> u16 {
        match self {
            Type::Generic => u16::MAX,
            Type::Variant { candidates } => candidates
                .iter()
                .fold(0, |bits, c| bits | c.accepted_kinds()),
            // Sequences and keyed collections are interchangeable as long as
            // the elements fit.
            Type::List { .. } | Type::Tuple { .. } => TypeKind::SEQUENCE,
            Type::Map { .. } | Type::Object { .. } => TypeKind::KEYED,
            t => t.kind().bits(),
        }
    }

    /// Check whether `value` can be used where this type is expected.
    pub fn accepts(&self, value: &Value) -> bool {
        let value = value.unwrapped();
        if self.accepted_kinds() & value.kind().bits() == 0 {
            return false;
        }

        match self {
            Type::Generic => true,
            Type::Null | Type::Bool | Type::Number | Type::String => true,
            Type::Variant { candidates } => candidates.iter().any(|c| c.accepts(value)),
            Type::List { item_type } => match value.as_sequence() {
                Some(items) => items.iter().all(|v| item_type.accepts(v)),
                None => false,
            },
            Type::Tuple { item_types } => match value.as_sequence() {
                Some(items) => {
                    items.len() == item_types.len()
                        && item_types.iter().zip(items).all(|(t, v)| t.accepts(v))
                }
                None => false,
            },
            Type::Map { value_type } => match value.as_entries() {
                Some(entries) => entries.values().all(|v| value_type.accepts(v)),
                None => false,
            },
            Type::Object { fields } => match value.as_entries() {
                Some(entries) => fields.iter().all(|(name, t)| match entries.get(name) {
                    Some(v) => t.accepts(v),
                    // An absent field is acceptable when the field admits null.
                    None => t.accepts(&Value::Null),
                }),
                None => false,
            },
        }
    }

    /// Least specific common type of two types.
    pub fn unify(&self, other: &Type) -> Type {
        if self == other {
            self.clone()
        } else {
            Type::Generic
        }
    }

    /// Common type of a sequence of types. Empty or mixed sequences are generic.
    pub fn unify_all<'a, I>(types: I) -> Type
    where
        I: IntoIterator<Item = &'a Type>,
    {
        let mut iter = types.into_iter();
        let Some(first) = iter.next() else {
            return Type::Generic;
        };
        let mut t = first.clone();
        for next in iter {
            t = t.unify(next);
            if t == Type::Generic {
                break;
            }
        }
        t
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::List { item_type } => write!(f, "list<{item_type}>"),
            Type::Map { value_type } => write!(f, "map<{value_type}>"),
            Type::Object { fields } => {
                f.write_str("object{")?;
                for (idx, (name, t)) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {t}")?;
                }
                f.write_str("}")
            }
            Type::Tuple { item_types } => {
                f.write_str("tuple(")?;
                for (idx, t) in item_types.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{t}")?;
                }
                f.write_str(")")
            }
            Type::Variant { candidates } => {
                for (idx, t) in candidates.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{t}")?;
                }
                Ok(())
            }
            t => f.write_str(t.kind().name()),
        }
    }
}
