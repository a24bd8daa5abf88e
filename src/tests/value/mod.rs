// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::TypeError;
use crate::typing::{Type, TypeKind};
use crate::value::*;

use anyhow::Result;

use std::collections::BTreeMap;

#[test]
fn kinds() {
    for k in [TypeKind::Null, TypeKind::Bool, TypeKind::Number, TypeKind::String] {
        assert!(k.is_primitive());
    }
    for k in [
        TypeKind::List,
        TypeKind::Map,
        TypeKind::Object,
        TypeKind::Tuple,
        TypeKind::Variant,
        TypeKind::Generic,
    ] {
        assert!(!k.is_primitive());
    }
    assert!(TypeKind::Variant.is_wrapper());
    assert!(TypeKind::Tuple.is_sequence());
    assert!(TypeKind::Object.is_keyed());
}

#[test]
fn reported_type_matches_variant() -> Result<()> {
    let v = Value::from_json_str(r#"{ "a": [1, 2], "b": ["x", 1], "c": null }"#)?;
    assert_eq!(v.kind(), TypeKind::Object);

    let a = v.get_attr("a").cloned().unwrap_or(Value::Null);
    assert_eq!(a.type_of(), Type::list(Type::Number));
    let b = v.get_attr("b").cloned().unwrap_or(Value::Null);
    assert_eq!(b.type_of(), Type::list(Type::Generic));
    assert_eq!(v.get_attr("c"), Some(&Value::Null));

    let t = Value::from_tuple(vec![1.into(), "x".into()]);
    assert_eq!(t.type_of(), Type::tuple(vec![Type::Number, Type::String]));
    assert_eq!(t.kind(), TypeKind::Tuple);
    Ok(())
}

#[test]
fn convert_shapes() -> Result<()> {
    let v = Value::from_json_str("[1, 2, 3]")?;
    let as_tuple = v.convert(&Type::tuple(vec![Type::Number, Type::Number, Type::Number]))?;
    assert_eq!(as_tuple.kind(), TypeKind::Tuple);

    assert_eq!(
        v.convert(&Type::list(Type::String)),
        Err(TypeError::Mismatch {
            source_type: Type::list(Type::Number),
            target: Type::list(Type::String),
        })
    );
    assert!(v.convert(&Type::tuple(vec![Type::Number])).is_err());

    let obj = Value::from_json_str(r#"{ "port": 80, "host": "x" }"#)?;
    let schema = Type::object([("port", Type::Number), ("tls", Type::optional(Type::Bool))]);
    let converted = obj.convert(&schema)?;
    assert_eq!(
        converted.get_attr("port").map(|p| p.as_number()),
        Some(Ok(80.0))
    );
    assert!(converted.get_attr("tls").map(|t| t.is_null()).unwrap_or(false));

    let map = obj.convert(&Type::map(Type::Generic))?;
    assert_eq!(map.kind(), TypeKind::Map);
    Ok(())
}

#[test]
fn variants_use_declared_priority() -> Result<()> {
    let candidates = vec![Type::Generic, Type::Number];
    let v = Value::from(5).convert(&Type::variant(candidates.clone()))?;
    let Value::Variant(variant) = &v else {
        panic!("expected a variant, got {v:?}");
    };
    assert_eq!(variant.value().kind(), TypeKind::Generic);
    assert_eq!(variant.candidates(), &candidates[..]);

    assert!(matches!(
        Value::from(5).resolve_variant_exact(&candidates),
        Err(TypeError::AmbiguousVariant { .. })
    ));
    assert_eq!(
        Value::from("x").resolve_variant_exact(&[Type::Number, Type::String]),
        Ok(&Type::String)
    );
    assert!(matches!(
        Value::from(true).resolve_variant_exact(&[Type::Number, Type::String]),
        Err(TypeError::NoVariantCandidate { .. })
    ));
    Ok(())
}

#[test]
fn wrappers_are_transparent() -> Result<()> {
    let inner = Value::from_json_str(r#"{ "a": [1] }"#)?;
    let wrapped = Value::generic(Value::new_variant(vec![Type::map(Type::Generic)], inner.clone())?);
    assert_eq!(wrapped.get_attr("a"), inner.get_attr("a"));
    assert_eq!(wrapped.to_string(), inner.to_string());
    assert!(Value::new_variant(vec![Type::Number], inner).is_err());
    Ok(())
}

#[test]
fn assign_checks_kind() {
    let mut v = Value::from(1);
    assert!(v.assign(Value::from(2)).is_ok());
    assert_eq!(v, Value::from(2));
    assert!(matches!(
        v.assign(Value::from("two")),
        Err(TypeError::Assign { .. })
    ));
    assert_eq!(v, Value::from(2));
}

#[test]
fn try_from() -> Result<()> {
    let v = Value::from_json_str(r#"{ "n": 3, "s": "x", "b": true, "l": [1], "f": 1.5 }"#)?;
    let fields = BTreeMap::<String, Value>::try_from(&v)?;
    assert_eq!(i64::try_from(&fields["n"])?, 3);
    assert_eq!(String::try_from(&fields["s"])?, "x");
    assert!(bool::try_from(&fields["b"])?);
    assert_eq!(Vec::<Value>::try_from(&fields["l"])?, vec![Value::from(1)]);
    assert_eq!(f64::try_from(&fields["f"])?, 1.5);
    assert!(i64::try_from(&fields["f"]).is_err());
    assert!(bool::try_from(&fields["s"]).is_err());
    Ok(())
}

#[test]
fn typed_collections() {
    assert!(Value::typed_list(Type::Number, vec![1.into(), "x".into()]).is_err());
    let mut entries = BTreeMap::new();
    entries.insert("a".to_string(), Value::from(true));
    assert!(Value::typed_map(Type::Bool, entries.clone()).is_ok());
    assert!(Value::typed_map(Type::String, entries).is_err());
}

#[test]
fn serialize_numbers() -> Result<()> {
    let v = Value::from_json_str(r#"{ "i": 60, "f": 0.5, "l": [1, "a", null] }"#)?;
    assert_eq!(v.to_string(), r#"{"f":0.5,"i":60,"l":[1,"a",null]}"#);
    Ok(())
}

#[test]
fn display_non_finite_numbers() -> Result<()> {
    let list = Value::from_list(vec![
        Value::from(f64::INFINITY),
        Value::from(f64::NEG_INFINITY),
        Value::from(f64::NAN),
        Value::from(1.5),
    ]);
    assert_eq!(list.to_string(), "[inf,-inf,NaN,1.5]");

    let mut fields = BTreeMap::new();
    fields.insert("max".to_string(), Value::from(f64::INFINITY));
    fields.insert("name \"q\"".to_string(), Value::from("x"));
    assert_eq!(Value::from(fields).to_string(), r#"{"max":inf,"name \"q\"":"x"}"#);
    Ok(())
}

#[cfg(feature = "yaml")]
#[test]
fn yaml_infinities_render() -> Result<()> {
    let args = Value::from_yaml_str("[.inf, -.inf]")?;
    let rendered: Vec<String> = args.as_list()?.iter().map(|v| v.to_string()).collect();
    assert_eq!(rendered, ["inf", "-inf"]);
    Ok(())
}

#[cfg(feature = "yaml")]
#[test]
fn yaml_scalar_keys() -> Result<()> {
    let v = Value::from_yaml_str("1: one\ntrue: yes\nname: x\n")?;
    assert_eq!(v.get_attr("1"), Some(&Value::from("one")));
    assert_eq!(v.get_attr("true"), Some(&Value::from("yes")));
    Ok(())
}
