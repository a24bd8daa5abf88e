// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::path::Path;
use crate::store::*;
use crate::value::Value;

use anyhow::Result;
use proptest::prelude::*;

use std::sync::Arc;

fn tree() -> Result<Value> {
    Value::from_json_str(
        r#"{
            "services": [
                { "name": "api", "ports": [80, 443], "tags": { "tier": "web" } },
                { "name": "worker", "ports": [], "tags": { "tier": "batch" } }
            ],
            "region": "westus"
        }"#,
    )
}

#[test]
fn concurrent_readers_agree() -> Result<()> {
    let store = Arc::new(ValueReferenceStore::new());
    store.insert_root("app", tree()?);

    let paths = [
        "app.services[0].ports[1]",
        "app.services[1].tags.tier",
        "app.services[0].name",
        "app.region",
    ];
    let expected: Vec<Value> = vec![443.into(), "batch".into(), "api".into(), "westus".into()];

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = store.clone();
            std::thread::spawn(move || -> Result<Vec<Value>> {
                let mut out = vec![];
                for i in 0..paths.len() {
                    let p = Path::parse(paths[(i + t) % paths.len()])?;
                    out.push(store.get_at_path(&p)?);
                }
                out.rotate_right(t % paths.len());
                Ok(out)
            })
        })
        .collect();

    for h in handles {
        let out = h.join().map_err(|_| anyhow::anyhow!("reader panicked"))??;
        assert_eq!(out, expected);
    }
    Ok(())
}

#[test]
fn second_lookup_does_not_walk() -> Result<()> {
    let store = ValueReferenceStore::new();
    store.insert_root("app", tree()?);
    let path = Path::parse("app.services[1].tags.tier")?;

    let first = store.get_at_path(&path)?;
    let walked = store.stats().steps_walked;
    assert_eq!(walked, 4);

    let second = store.get_at_path(&path)?;
    assert_eq!(first, second);
    assert_eq!(store.stats().steps_walked, walked);
    assert_eq!(store.stats().hits, 1);
    Ok(())
}

#[test]
fn deep_paths_reuse_the_longest_prefix() -> Result<()> {
    let depth = 64;
    let json = format!("{}7{}", r#"{ "n": "#.repeat(depth), "}".repeat(depth));
    let store = ValueReferenceStore::new();
    store.insert_root("deep", Value::from_json_str(&json)?);

    let full = format!("deep{}", ".n".repeat(depth));
    assert_eq!(store.get_at_path(&Path::parse(&full)?)?, Value::from(7));
    assert_eq!(store.stats().steps_walked, depth);

    // Every prefix was cached on the way down.
    let half = format!("deep{}", ".n".repeat(depth / 2));
    store.get_at_path(&Path::parse(&half)?)?;
    assert_eq!(store.stats().steps_walked, depth);
    assert_eq!(store.stats().hits, 1);
    Ok(())
}

#[test]
fn references_are_roots() -> Result<()> {
    let store = ValueReferenceStore::new();
    store.insert_root("app", tree()?);
    let web = store.get_at_path(&Path::parse("app.services[0]")?)?;
    store.insert_root("web", web);

    assert!(store.contains_root("web"));
    assert_eq!(
        store.get_at_path(&Path::parse("web.tags.tier")?)?,
        Value::from("web")
    );
    assert!(!store.contains_root("services"));
    Ok(())
}

#[test]
fn keyed_hashes() -> Result<()> {
    let path = Path::parse("app.services[0]")?;
    let a = ValueReferenceStore::with_key([7; 32]);
    let b = ValueReferenceStore::with_key([7; 32]);
    let c = ValueReferenceStore::with_key([8; 32]);
    assert_eq!(a.prefix_hashes(&path), b.prefix_hashes(&path));
    assert_ne!(a.prefix_hashes(&path), c.prefix_hashes(&path));

    // Each prefix hash chains from the previous one.
    let parent = Path::parse("app.services")?;
    assert_eq!(a.prefix_hashes(&path)[..2], a.prefix_hashes(&parent)[..]);
    Ok(())
}

proptest! {
    #[test]
    fn lookups_are_idempotent(ops in prop::collection::vec((0usize..2, 0usize..3, 0usize..3), 1..20)) {
        let store = ValueReferenceStore::new();
        let Ok(value) = Value::from_json_str(
            r#"{ "l": [[1, 2, 3], [4, 5, 6], [7, 8, 9]], "m": { "a": [0, 1, 2], "b": [3, 4, 5], "c": [6, 7, 8] } }"#,
        ) else {
            panic!("valid json");
        };
        store.insert_root("r", value);

        for (kind, i, j) in ops {
            let text = match kind {
                0 => format!("r.l[{i}][{j}]"),
                _ => format!("r.m.{}[{j}]", ["a", "b", "c"][i]),
            };
            let Ok(path) = Path::parse(&text) else {
                panic!("valid path {text}");
            };
            let first = store.get_at_path(&path);
            let walked = store.stats().steps_walked;
            let second = store.get_at_path(&path);
            prop_assert_eq!(first, second);
            prop_assert_eq!(store.stats().steps_walked, walked);
        }
    }
}
