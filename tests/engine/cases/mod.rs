// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use blueprint_engine::*;

use std::collections::BTreeMap;
use std::path::Path as FsPath;

use anyhow::{bail, Result};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Expected {
    exit_code: i32,
    #[serde(default)]
    halted_at: Option<String>,
    #[serde(default)]
    failing: Vec<String>,
    #[serde(default)]
    errors: Option<usize>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    #[serde(default)]
    env: BTreeMap<String, String>,
    blueprint: serde_yaml::Value,
    expected: Expected,
}

#[derive(Deserialize)]
struct YamlTest {
    cases: Vec<TestCase>,
}

async fn run_case_file(file: &FsPath) -> Result<()> {
    let test: YamlTest = serde_yaml::from_str(&std::fs::read_to_string(file)?)?;
    for case in test.cases {
        let blueprint: Blueprint = serde_yaml::from_value(case.blueprint)?;
        let engine = Engine::builder()
            .environment(case.env.into_iter().collect())
            .build();
        let report = engine.run(&blueprint).await;

        let failing: Vec<String> = report
            .rule_results
            .iter()
            .filter(|r| !r.passed())
            .map(|r| r.name.clone())
            .collect();
        let ok = report.exit_code() == case.expected.exit_code
            && report.halted_at == case.expected.halted_at
            && failing == case.expected.failing
            && case.expected.errors.map_or(true, |n| n == report.error_count());
        if !ok {
            for d in &report.diagnostics {
                println!("{d}");
            }
            bail!(
                "{}: case `{}` failed: exit {} halted {:?} failing {:?}",
                file.display(),
                case.note,
                report.exit_code(),
                report.halted_at,
                failing
            );
        }
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn yaml_cases() -> Result<()> {
    let dir = FsPath::new(env!("CARGO_MANIFEST_DIR")).join("tests/engine/cases");
    let mut files: Vec<_> = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|e| e == "yaml"))
        .collect();
    files.sort();
    if files.is_empty() {
        bail!("no cases under {}", dir.display());
    }
    for file in files {
        run_case_file(&file).await?;
    }
    Ok(())
}
