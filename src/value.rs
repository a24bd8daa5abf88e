// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::TypeError;
use crate::typing::{Type, TypeKind};
use crate::Rc;

use core::fmt;
use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

// Composite payloads are reference counted so that values handed out by the
// reference store and shared across workers are cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),

    List(Rc<List>),
    Map(Rc<Map>),
    Object(Rc<BTreeMap<String, Value>>),
    Tuple(Rc<Vec<Value>>),

    // A value tagged with the candidate types it was resolved against.
    Variant(Rc<Variant>),

    // A value whose static type is unknown.
    Generic(Rc<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct List {
    item_type: Type,
    items: Vec<Value>,
}

impl List {
    pub fn item_type(&self) -> &Type {
        &self.item_type
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    value_type: Type,
    entries: BTreeMap<String, Value>,
}

impl Map {
    pub fn value_type(&self) -> &Type {
        &self.value_type
    }

    pub fn entries(&self) -> &BTreeMap<String, Value> {
        &self.entries
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    candidates: Vec<Type>,
    value: Value,
}

impl Variant {
    pub fn candidates(&self) -> &[Type] {
        &self.candidates
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => {
                // Integral numbers are written without a fractional part.
                if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Value::String(s) => serializer.serialize_str(s.as_ref()),
            Value::List(_) | Value::Tuple(_) => {
                let items = self.as_sequence().unwrap_or_default();
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(_) | Value::Object(_) => {
                let mut map = serializer.serialize_map(None)?;
                if let Some(entries) = self.as_entries() {
                    for (k, v) in entries.iter() {
                        map.serialize_entry(k, v)?;
                    }
                }
                map.end()
            }
            Value::Variant(v) => v.value.serialize(serializer),
            Value::Generic(v) => v.serialize(serializer),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a value")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer)
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Bool(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Number(v as f64))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Number(v as f64))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Number(v))
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(s))
    }

    fn visit_string<E>(self, s: String) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(s))
    }

    fn visit_seq<V>(self, mut visitor: V) -> Result<Self::Value, V::Error>
    where
        V: SeqAccess<'de>,
    {
        let mut items = vec![];
        while let Some(v) = visitor.next_element()? {
            items.push(v);
        }
        Ok(Value::from(items))
    }

    fn visit_map<V>(self, mut visitor: V) -> Result<Self::Value, V::Error>
    where
        V: MapAccess<'de>,
    {
        let mut fields = BTreeMap::new();
        while let Some((key, value)) = visitor.next_entry::<Value, Value>()? {
            // YAML allows scalar keys of any type.
            let key = match key {
                Value::String(s) => s.as_ref().to_string(),
                Value::Bool(_) | Value::Number(_) | Value::Null => key.to_string(),
                _ => return Err(de::Error::custom("object keys must be scalars")),
            };
            fields.insert(key, value);
        }
        Ok(Value::from(fields))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

fn write_json<T: Serialize + ?Sized>(f: &mut fmt::Formatter, v: &T) -> fmt::Result {
    match serde_json::to_string(v) {
        Ok(s) => f.write_str(&s),
        Err(_e) => Err(fmt::Error),
    }
}

// Compact json, except that non-finite numbers, which json cannot express,
// are written as `inf`, `-inf` and `NaN` instead of `null`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(n) if n.is_nan() => f.write_str("NaN"),
            Value::Number(n) if n.is_infinite() && *n > 0.0 => f.write_str("inf"),
            Value::Number(n) if n.is_infinite() => f.write_str("-inf"),
            Value::List(_) | Value::Tuple(_) => {
                f.write_str("[")?;
                for (idx, item) in self.as_sequence().unwrap_or_default().iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(_) | Value::Object(_) => {
                f.write_str("{")?;
                if let Some(entries) = self.as_entries() {
                    for (idx, (k, v)) in entries.iter().enumerate() {
                        if idx > 0 {
                            f.write_str(",")?;
                        }
                        write_json(f, k)?;
                        write!(f, ":{v}")?;
                    }
                }
                f.write_str("}")
            }
            Value::Variant(v) => write!(f, "{}", v.value),
            Value::Generic(v) => write!(f, "{v}"),
            _ => write_json(f, self),
        }
    }
}

impl Value {
    pub fn new_object() -> Value {
        Value::from(BTreeMap::new())
    }

    pub fn new_list() -> Value {
        Value::from(vec![])
    }

    /// List whose element type is inferred from the items.
    pub fn from_list(items: Vec<Value>) -> Value {
        let types: Vec<Type> = items.iter().map(|v| v.type_of()).collect();
        let item_type = Type::unify_all(&types);
        Value::List(Rc::new(List { item_type, items }))
    }

    /// List with an explicit element type. Every item must fit it.
    pub fn typed_list(item_type: Type, items: Vec<Value>) -> Result<Value, TypeError> {
        if let Some(bad) = items.iter().find(|v| !item_type.accepts(v)) {
            return Err(TypeError::Mismatch {
                source_type: bad.type_of(),
                target: item_type,
            });
        }
        Ok(Value::List(Rc::new(List { item_type, items })))
    }

    /// Map with an explicit value type. Every entry must fit it.
    pub fn typed_map(
        value_type: Type,
        entries: BTreeMap<String, Value>,
    ) -> Result<Value, TypeError> {
        if let Some(bad) = entries.values().find(|v| !value_type.accepts(v)) {
            return Err(TypeError::Mismatch {
                source_type: bad.type_of(),
                target: value_type,
            });
        }
        Ok(Value::Map(Rc::new(Map {
            value_type,
            entries,
        })))
    }

    pub fn from_tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Rc::new(items))
    }

    /// Wrap `value` in a variant over `candidates`.
    pub fn new_variant(candidates: Vec<Type>, value: Value) -> Result<Value, TypeError> {
        if !candidates.iter().any(|c| c.accepts(&value)) {
            return Err(TypeError::NoVariantCandidate {
                value_type: value.type_of(),
                candidates: Type::variant(candidates),
            });
        }
        Ok(Value::Variant(Rc::new(Variant { candidates, value })))
    }

    pub fn generic(value: Value) -> Value {
        Value::Generic(Rc::new(value))
    }

    pub fn from_json_str(json: &str) -> Result<Value> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_str(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Value> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read a JSON or YAML document. The format is chosen by extension.
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Value> {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => bail!("Failed to read {}. {e}", path.display()),
        };
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            #[cfg(feature = "yaml")]
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents),
            _ => bail!("Unsupported file `{}`. Must be json or yaml.", path.display()),
        }
    }
}

impl Value {
    pub fn kind(&self) -> TypeKind {
        match self {
            Value::Null => TypeKind::Null,
            Value::Bool(_) => TypeKind::Bool,
            Value::Number(_) => TypeKind::Number,
            Value::String(_) => TypeKind::String,
            Value::List(_) => TypeKind::List,
            Value::Map(_) => TypeKind::Map,
            Value::Object(_) => TypeKind::Object,
            Value::Tuple(_) => TypeKind::Tuple,
            Value::Variant(_) => TypeKind::Variant,
            Value::Generic(_) => TypeKind::Generic,
        }
    }

    /// Type descriptor for this value. Always agrees with [`Value::kind`].
    pub fn type_of(&self) -> Type {
        match self {
            Value::Null => Type::Null,
            Value::Bool(_) => Type::Bool,
            Value::Number(_) => Type::Number,
            Value::String(_) => Type::String,
            Value::List(l) => Type::list(l.item_type.clone()),
            Value::Map(m) => Type::map(m.value_type.clone()),
            Value::Object(fields) => Type::object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.type_of()))
                    .collect::<Vec<_>>(),
            ),
            Value::Tuple(items) => Type::tuple(items.iter().map(|v| v.type_of()).collect()),
            Value::Variant(v) => Type::variant(v.candidates.clone()),
            Value::Generic(_) => Type::Generic,
        }
    }

    /// Strip variant and generic wrappers.
    pub fn unwrapped(&self) -> &Value {
        let mut v = self;
        loop {
            match v {
                Value::Variant(inner) => v = &inner.value,
                Value::Generic(inner) => v = inner,
                _ => return v,
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.unwrapped(), Value::Null)
    }

    /// Items of a list or tuple.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self.unwrapped() {
            Value::List(l) => Some(&l.items),
            Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Entries of a map or object.
    pub fn as_entries(&self) -> Option<&BTreeMap<String, Value>> {
        match self.unwrapped() {
            Value::Map(m) => Some(&m.entries),
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    fn mismatch(&self, target: Type) -> TypeError {
        TypeError::Mismatch {
            source_type: self.type_of(),
            target,
        }
    }

    pub fn as_bool(&self) -> Result<bool, TypeError> {
        match self.unwrapped() {
            Value::Bool(b) => Ok(*b),
            _ => Err(self.mismatch(Type::Bool)),
        }
    }

    pub fn as_number(&self) -> Result<f64, TypeError> {
        match self.unwrapped() {
            Value::Number(n) => Ok(*n),
            _ => Err(self.mismatch(Type::Number)),
        }
    }

    pub fn as_string(&self) -> Result<&Rc<str>, TypeError> {
        match self.unwrapped() {
            Value::String(s) => Ok(s),
            _ => Err(self.mismatch(Type::String)),
        }
    }

    pub fn as_list(&self) -> Result<&[Value], TypeError> {
        self.as_sequence()
            .ok_or_else(|| self.mismatch(Type::list(Type::Generic)))
    }

    pub fn as_object(&self) -> Result<&BTreeMap<String, Value>, TypeError> {
        self.as_entries()
            .ok_or_else(|| self.mismatch(Type::map(Type::Generic)))
    }

    /// Child reached through attribute `name`.
    pub fn get_attr(&self, name: &str) -> Option<&Value> {
        self.as_entries().and_then(|e| e.get(name))
    }

    /// Child reached through position `idx`.
    pub fn get_index(&self, idx: usize) -> Option<&Value> {
        self.as_sequence().and_then(|s| s.get(idx))
    }
}

impl Value {
    /// Convert into the representation described by `target`.
    ///
    /// Variant targets try their candidates in declared order and the first
    /// candidate that converts wins. Use [`Value::resolve_variant_exact`] to
    /// reject values that more than one candidate would accept.
    pub fn convert(&self, target: &Type) -> Result<Value, TypeError> {
        let value = self.unwrapped();
        match target {
            Type::Generic => Ok(Value::generic(value.clone())),
            Type::Null | Type::Bool | Type::Number | Type::String => {
                if value.kind() == target.kind() {
                    Ok(value.clone())
                } else {
                    Err(self.mismatch(target.clone()))
                }
            }
            Type::List { item_type } => {
                let items = value
                    .as_sequence()
                    .ok_or_else(|| self.mismatch(target.clone()))?;
                let items = items
                    .iter()
                    .map(|v| v.convert(item_type))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| self.mismatch(target.clone()))?;
                Ok(Value::List(Rc::new(List {
                    item_type: (**item_type).clone(),
                    items,
                })))
            }
            Type::Tuple { item_types } => {
                let items = value
                    .as_sequence()
                    .filter(|items| items.len() == item_types.len())
                    .ok_or_else(|| self.mismatch(target.clone()))?;
                let items = item_types
                    .iter()
                    .zip(items)
                    .map(|(t, v)| v.convert(t))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| self.mismatch(target.clone()))?;
                Ok(Value::from_tuple(items))
            }
            Type::Map { value_type } => {
                let entries = value
                    .as_entries()
                    .ok_or_else(|| self.mismatch(target.clone()))?;
                let entries = entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.convert(value_type)?)))
                    .collect::<Result<BTreeMap<_, _>, TypeError>>()
                    .map_err(|_| self.mismatch(target.clone()))?;
                Ok(Value::Map(Rc::new(Map {
                    value_type: (**value_type).clone(),
                    entries,
                })))
            }
            Type::Object { fields } => {
                let entries = value
                    .as_entries()
                    .ok_or_else(|| self.mismatch(target.clone()))?;
                let mut converted = entries.clone();
                for (name, t) in fields.iter() {
                    let field = entries.get(name).unwrap_or(&Value::Null);
                    let field = field
                        .convert(t)
                        .map_err(|_| self.mismatch(target.clone()))?;
                    converted.insert(name.clone(), field);
                }
                Ok(Value::from(converted))
            }
            Type::Variant { candidates } => {
                for candidate in candidates {
                    if let Ok(v) = value.convert(candidate) {
                        return Ok(Value::Variant(Rc::new(Variant {
                            candidates: candidates.clone(),
                            value: v,
                        })));
                    }
                }
                Err(TypeError::NoVariantCandidate {
                    value_type: self.type_of(),
                    candidates: target.clone(),
                })
            }
        }
    }

    /// Pick the single candidate that accepts this value.
    pub fn resolve_variant_exact<'a>(&self, candidates: &'a [Type]) -> Result<&'a Type, TypeError> {
        let mut accepting = candidates.iter().filter(|c| c.accepts(self));
        match (accepting.next(), accepting.next()) {
            (Some(first), None) => Ok(first),
            (Some(first), Some(second)) => Err(TypeError::AmbiguousVariant {
                value_type: self.type_of(),
                first: first.clone(),
                second: second.clone(),
            }),
            (None, _) => Err(TypeError::NoVariantCandidate {
                value_type: self.type_of(),
                candidates: Type::variant(candidates.to_vec()),
            }),
        }
    }

    /// Replace this value with `other`. Both must have the same kind.
    pub fn assign(&mut self, other: Value) -> Result<(), TypeError> {
        if self.kind() != other.kind() {
            return Err(TypeError::Assign {
                source_type: other.type_of(),
                target: self.type_of(),
            });
        }
        *self = other;
        Ok(())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::from_list(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Value::Object(Rc::new(fields))
    }
}

impl TryFrom<&Value> for bool {
    type Error = TypeError;

    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        v.as_bool()
    }
}

impl TryFrom<&Value> for f64 {
    type Error = TypeError;

    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        v.as_number()
    }
}

impl TryFrom<&Value> for i64 {
    type Error = TypeError;

    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        let n = v.as_number()?;
        if n.fract() != 0.0 || n < i64::MIN as f64 || n > i64::MAX as f64 {
            return Err(v.mismatch(Type::Number));
        }
        Ok(n as i64)
    }
}

impl TryFrom<&Value> for String {
    type Error = TypeError;

    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        Ok(v.as_string()?.as_ref().to_string())
    }
}

impl TryFrom<&Value> for Vec<Value> {
    type Error = TypeError;

    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        Ok(v.as_list()?.to_vec())
    }
}

impl TryFrom<&Value> for BTreeMap<String, Value> {
    type Error = TypeError;

    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        Ok(v.as_object()?.clone())
    }
}
