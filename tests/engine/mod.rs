// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use blueprint_engine::*;

use anyhow::Result;

use std::time::Duration;

#[cfg(feature = "yaml")]
mod cases;
mod providers;

fn engine(env: &[(&str, &str)]) -> Engine {
    Engine::builder()
        .config(EngineConfig::default().with_step_timeout(Duration::from_secs(10)))
        .environment(env.iter().copied().collect())
        .build()
}

fn rate_limit_blueprint(limit: u32) -> Result<Blueprint> {
    Blueprint::from_json_str(&format!(
        r#"{{
            "version": 1,
            "sources": {{
                "api": {{ "provider": "inline", "config": {{ "value": {{ "rate-limit": {limit} }} }} }}
            }},
            "ruleset": [
                {{ "$value": "api.rate-limit", "lessThanOrEqual": [100] }}
            ]
        }}"#
    ))
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_within_limit() -> Result<()> {
    let report = engine(&[]).run(&rate_limit_blueprint(60)?).await;
    assert!(report.passed(), "{:#?}", report.diagnostics);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.rule_results.len(), 1);
    assert_eq!(report.rule_results[0].outcome, RuleOutcome::Passed);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_over_limit() -> Result<()> {
    let report = engine(&[]).run(&rate_limit_blueprint(150)?).await;
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.halted_at, None);

    let errors: Vec<&Diagnostic> = report.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].summary, "rule `#1` failed");
    assert!(errors[0].details.contains("api.rate-limit"));
    assert!(errors[0].details.contains("lessThanOrEqual"));
    assert!(errors[0].details.contains("[100]"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_mutual_references() -> Result<()> {
    let blueprint = Blueprint::from_json_str(
        r#"{
            "version": 1,
            "sources": { "api": { "provider": "inline", "config": { "value": {} } } },
            "$refs": { "a": "b.x", "b": "a.y" },
            "ruleset": [ { "$value": "api", "isNotEmpty": [] } ]
        }"#,
    )?;
    let report = engine(&[]).run(&blueprint).await;

    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.halted_at.as_deref(), Some("resolve"));
    assert!(report.rule_results.is_empty());

    let errors: Vec<&Diagnostic> = report.errors().collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].details.contains("cyclic dependency"));
    assert!(errors[0].details.contains('a') && errors[0].details.contains('b'));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn validation_stops_before_sources() -> Result<()> {
    let blueprint = Blueprint::from_json_str(
        r#"{
            "sources": { "cfg": { "provider": "file", "config": { "path": "/does/not/exist.json" } } },
            "ruleset": [ { "$value": "cfg.x", "nope": [] } ]
        }"#,
    )?;
    let report = engine(&[]).run(&blueprint).await;
    assert_eq!(report.halted_at.as_deref(), Some("validate"));
    // Missing version and unknown predicate. The file is never opened.
    assert_eq!(report.error_count(), 2);
    assert!(report
        .errors()
        .all(|d| d.summary == "invalid blueprint"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn ruleset_is_exhaustive_and_repeatable() -> Result<()> {
    // 12 rules, every third one violated.
    let mut rules = vec![];
    for i in 0..12 {
        let bound = if i % 3 == 0 { 5 } else { 50 };
        rules.push(format!(
            r#"{{ "name": "r{i}", "$value": "app.values[{i}]", "lessThan": [{bound}] }}"#
        ));
    }
    let values: Vec<String> = (0..12).map(|i| (i + 10).to_string()).collect();
    let blueprint = Blueprint::from_json_str(&format!(
        r#"{{
            "version": 1,
            "sources": {{ "app": {{ "provider": "inline", "config": {{ "value": {{ "values": [{}] }} }} }} }},
            "ruleset": [{}]
        }}"#,
        values.join(", "),
        rules.join(", ")
    ))?;

    let engine = Engine::builder()
        .config(EngineConfig::default().with_concurrency(3))
        .environment(Environment::new())
        .build();
    let first = engine.run(&blueprint).await;
    let second = engine.run(&blueprint).await;

    let failing: Vec<&str> = first
        .rule_results
        .iter()
        .filter(|r| !r.passed())
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(failing, ["r0", "r3", "r6", "r9"]);
    assert_eq!(first.error_count(), 4);
    assert_eq!(first.exit_code(), 1);

    assert_eq!(first.rule_results, second.rule_results);
    assert!(first
        .rule_results
        .iter()
        .enumerate()
        .all(|(i, r)| r.index == i));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn one_bad_source_does_not_hide_others() -> Result<()> {
    let blueprint = Blueprint::from_json_str(
        r#"{
            "version": 1,
            "sources": {
                "good": { "provider": "inline", "config": { "value": { "on": true } } },
                "bad": { "provider": "file", "config": { "path": "/does/not/exist.json" } },
                "secret": { "provider": "inline", "config": { "value": { "k": "${API_KEY}" } } }
            },
            "$refs": { "flag": "good.on", "broken": "bad.x" },
            "ruleset": [
                { "name": "flag", "$value": "flag", "isTrue": [] },
                { "name": "broken", "$value": "broken", "isTrue": [] },
                { "name": "key", "$value": "secret.k", "equal": [{ "sensitive": "abc" }] }
            ]
        }"#,
    )?;
    let report = engine(&[]).run(&blueprint).await;

    assert_eq!(report.halted_at, None);
    let outcome = |name: &str| {
        report
            .rule_results
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.outcome.clone())
    };
    assert_eq!(outcome("flag"), Some(RuleOutcome::Passed));
    assert!(matches!(outcome("broken"), Some(RuleOutcome::Errored { .. })));
    assert!(matches!(outcome("key"), Some(RuleOutcome::Errored { .. })));

    let details: Vec<&str> = report.errors().map(|d| d.details.as_str()).collect();
    assert!(details.iter().any(|d| d.contains("API_KEY")));
    assert!(details.iter().all(|d| !d.contains("abc")));
    Ok(())
}

#[test]
fn run_blocking() -> Result<()> {
    let report = engine(&[]).run_blocking(&rate_limit_blueprint(100)?)?;
    assert_eq!(report.exit_code(), 0);
    Ok(())
}
