// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use blueprint_engine::*;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

/// Serves `{ "replicas": n }` where `n` comes from its configuration.
struct Inventory {
    replicas: Option<Value>,
    configured: Arc<AtomicUsize>,
}

#[async_trait]
impl Provider for Inventory {
    fn config_schema(&self) -> Type {
        Type::object([("replicas", Type::String)])
    }

    async fn configure(&mut self, request: ConfigureRequest) -> Result<(), ProviderError> {
        self.configured.fetch_add(1, Ordering::SeqCst);
        let replicas = request
            .config
            .get_attr("replicas")
            .and_then(|v| v.as_string().ok())
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| ProviderError::Configure {
                source_alias: request.source_alias.clone(),
                message: "`replicas` is not a number".to_string(),
            })?;
        self.replicas = Some(Value::from(replicas));
        Ok(())
    }

    async fn provide(&self, _request: ProvideRequest) -> ProvideResponse {
        let mut fields = BTreeMap::new();
        if let Some(replicas) = &self.replicas {
            fields.insert("replicas".to_string(), replicas.clone());
        }
        ProvideResponse::value(Value::from(fields))
    }
}

/// Never answers.
struct Stalled;

#[async_trait]
impl Provider for Stalled {
    fn config_schema(&self) -> Type {
        Type::Generic
    }

    async fn configure(&mut self, _request: ConfigureRequest) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn provide(&self, _request: ProvideRequest) -> ProvideResponse {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        ProvideResponse::default()
    }
}

/// Serves a value built ahead of time.
struct Fixed(Value);

#[async_trait]
impl Provider for Fixed {
    fn config_schema(&self) -> Type {
        Type::Generic
    }

    async fn configure(&mut self, _request: ConfigureRequest) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn provide(&self, _request: ProvideRequest) -> ProvideResponse {
        ProvideResponse::value(self.0.clone())
    }
}

fn factory(configured: Arc<AtomicUsize>) -> ProviderFactory {
    let mut factory = ProviderFactory::with_builtins();
    factory.register("inventory", move || {
        Box::new(Inventory {
            replicas: None,
            configured: configured.clone(),
        })
    });
    factory.register("stalled", || Box::new(Stalled));
    factory
}

#[tokio::test(flavor = "multi_thread")]
async fn custom_provider_sees_interpolated_config() -> Result<()> {
    let configured = Arc::new(AtomicUsize::new(0));
    let engine = Engine::builder()
        .factory(factory(configured.clone()))
        .environment([("REPLICAS", "3")].into_iter().collect())
        .build();
    let blueprint = Blueprint::from_json_str(
        r#"{
            "version": 1,
            "sources": { "inv": { "provider": "inventory", "config": { "replicas": "${REPLICAS}" } } },
            "ruleset": [
                { "name": "ha", "$value": "inv.replicas", "greaterThanOrEqual": [3] },
                { "name": "cap", "$value": "inv.replicas", "lessThan": [3] }
            ]
        }"#,
    )?;

    let report = engine.run(&blueprint).await;
    assert_eq!(configured.load(Ordering::SeqCst), 1);
    let failing: Vec<&str> = report
        .rule_results
        .iter()
        .filter(|r| !r.passed())
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(failing, ["cap"]);
    assert_eq!(report.exit_code(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn stalled_source_times_out() -> Result<()> {
    let engine = Engine::builder()
        .factory(factory(Arc::new(AtomicUsize::new(0))))
        .config(EngineConfig::default().with_step_timeout(Duration::from_millis(100)))
        .environment(Environment::new())
        .build();
    let blueprint = Blueprint::from_json_str(
        r#"{
            "version": 1,
            "sources": {
                "slow": { "provider": "stalled", "config": {} },
                "fast": { "provider": "inline", "config": { "value": { "ok": true } } }
            },
            "ruleset": [
                { "name": "fast", "$value": "fast.ok", "isTrue": [] },
                { "name": "slow", "$value": "slow.ok", "isTrue": [] }
            ]
        }"#,
    )?;

    let report = engine.run(&blueprint).await;
    assert_eq!(report.halted_at, None);
    assert!(report
        .errors()
        .any(|d| d.summary == "step `read `slow`` did not complete"));
    assert_eq!(report.rule_results[0].outcome, RuleOutcome::Passed);
    assert!(matches!(
        report.rule_results[1].outcome,
        RuleOutcome::Errored { .. }
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn schema_mismatch_is_reported() -> Result<()> {
    let engine = Engine::builder()
        .factory(factory(Arc::new(AtomicUsize::new(0))))
        .environment(Environment::new())
        .build();
    let blueprint = Blueprint::from_json_str(
        r#"{
            "version": 1,
            "sources": { "inv": { "provider": "inventory", "config": { "replicas": 3 } } },
            "ruleset": []
        }"#,
    )?;

    let report = engine.run(&blueprint).await;
    let errors: Vec<&Diagnostic> = report.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].summary, "source failed");
    assert!(errors[0].details.starts_with("source `inv`: configuration does not match"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_predicates_time_out() -> Result<()> {
    // Composite values are shared, so every clone of this is cheap.
    let items: Vec<Value> = (0..1_000_000).map(Value::from).collect();
    let mut fields = BTreeMap::new();
    fields.insert("items".to_string(), Value::from_list(items));
    fields.insert("small".to_string(), Value::from_list(vec![1.into(), 2.into()]));
    let big = Value::from(fields);

    let mut factory = ProviderFactory::with_builtins();
    factory.register("fixed", move || Box::new(Fixed(big.clone())));
    let engine = Engine::builder()
        .factory(factory)
        .config(
            EngineConfig::default()
                .with_concurrency(2)
                .with_step_timeout(Duration::from_millis(20)),
        )
        .environment(Environment::new())
        .build();
    let blueprint = Blueprint::from_json_str(
        r#"{
            "version": 1,
            "sources": { "big": { "provider": "fixed", "config": {} } },
            "ruleset": [
                { "name": "unique", "$value": "big.items", "hasNoDuplicates": [] },
                { "name": "small", "$value": "big.small", "hasNoDuplicates": [] }
            ]
        }"#,
    )?;

    let report = engine.run(&blueprint).await;
    assert_eq!(report.halted_at, None);
    match &report.rule_results[0].outcome {
        RuleOutcome::Errored { message } => assert!(message.starts_with("timed out"), "{message}"),
        outcome => panic!("expected a timeout, got {outcome:?}"),
    }
    assert_eq!(report.rule_results[1].outcome, RuleOutcome::Passed);

    let errors: Vec<&Diagnostic> = report.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].summary, "rule `unique` could not be evaluated");
    Ok(())
}
