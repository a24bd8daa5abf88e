// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use blueprint_engine::*;

use std::io::Write;

use anyhow::Result;

#[test]
fn from_file_by_extension() -> Result<()> {
    let dir = tempfile::tempdir()?;

    let json = dir.path().join("limits.json");
    std::fs::File::create(&json)?.write_all(br#"{ "limits": { "rps": 60 } }"#)?;
    let v = Value::from_file(&json)?;
    assert_eq!(
        v.get_attr("limits").and_then(|l| l.get_attr("rps")),
        Some(&Value::from(60))
    );

    let text = dir.path().join("limits.txt");
    std::fs::File::create(&text)?.write_all(b"rps=60")?;
    assert!(Value::from_file(&text).is_err());
    assert!(Value::from_file(dir.path().join("missing.json")).is_err());
    Ok(())
}

#[cfg(feature = "yaml")]
#[test]
fn yaml_and_json_agree() -> Result<()> {
    let yaml = Value::from_yaml_str("hosts:\n  - name: a\n    port: 80\n  - name: b\n    port: 443\n")?;
    let json = Value::from_json_str(
        r#"{ "hosts": [ { "name": "a", "port": 80 }, { "name": "b", "port": 443 } ] }"#,
    )?;
    assert_eq!(yaml, json);
    Ok(())
}

#[test]
fn paths_walk_values() -> Result<()> {
    let store = ValueReferenceStore::new();
    store.insert_root(
        "app",
        Value::from_json_str(r#"{ "hosts": [ { "name": "a" }, { "name": "b" } ] }"#)?,
    );

    let path = Path::parse("app.hosts[1].name")?;
    assert_eq!(path.to_string(), "app.hosts[1].name");
    assert_eq!(store.get_at_path(&path)?, Value::from("b"));

    let missing = Path::parse("app.hosts[2]")?;
    assert!(matches!(
        store.get_at_path(&missing),
        Err(ResolutionError::MissingStep { .. })
    ));
    Ok(())
}

#[test]
fn schemas_accept_matching_shapes() -> Result<()> {
    let schema = Type::object([("path", Type::String), ("prefix", Type::optional(Type::String))]);
    assert!(schema.accepts(&Value::from_json_str(r#"{ "path": "/etc/app.json" }"#)?));
    assert!(!schema.accepts(&Value::from_json_str(r#"{ "path": 3 }"#)?));
    assert!(!schema.accepts(&Value::from_json_str(r#"["path"]"#)?));
    assert_eq!(
        Type::list(Type::Number).to_string(),
        "list<number>"
    );
    Ok(())
}

#[test]
fn predicates_through_the_public_api() -> Result<()> {
    let value = Value::from_json_str(r#"["b", "a", "c"]"#)?;
    let args = [Value::from_json_str(r#"["a", "b", "c"]"#)?];
    assert!(Condition::CollectionIsEqual.evaluate(&value, &args)?);
    assert!(!Condition::ListIsEqual.evaluate(&value, &args)?);

    let condition: Condition = "withinRange".parse().map_err(anyhow::Error::msg)?;
    assert!(condition.evaluate(&Value::from(5), &[Value::from(1), Value::from(10)])?);
    assert!(matches!(
        condition.evaluate(&Value::from(5), &[Value::from(1)]),
        Err(PredicateError::ArgumentCount { expected: 2, actual: 1, .. })
    ));
    Ok(())
}
