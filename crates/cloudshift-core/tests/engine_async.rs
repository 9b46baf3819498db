//! Async engine behaviour: budgets, cancellation, reload and concurrency

mod test_support;

use cloudshift_core::adapter::Insertion;
use cloudshift_core::catalog::ImportSpec;
use cloudshift_core::{
    AdapterRegistry, CancellationFlag, Engine, EngineOptions, Error, Fidelity, LanguageAdapter,
    LanguageVariant, Outcome, PatternCatalog, PythonAdapter, Stage, SyntaxTree,
};
use std::sync::Arc;
use std::time::Duration;
use test_support::*;

/// Python adapter that stalls before every parse
struct SlowAdapter {
    inner: PythonAdapter,
    delay: Duration,
}

impl LanguageAdapter for SlowAdapter {
    fn variant(&self) -> LanguageVariant {
        self.inner.variant()
    }

    fn fidelity(&self) -> Fidelity {
        self.inner.fidelity()
    }

    fn analyze(&self, text: &str) -> cloudshift_core::Result<SyntaxTree> {
        std::thread::sleep(self.delay);
        self.inner.analyze(text)
    }

    fn import_insertion(&self, tree: &SyntaxTree, imports: &[ImportSpec]) -> Option<Insertion> {
        self.inner.import_insertion(tree, imports)
    }
}

fn slow_engine(delay: Duration, budget: Duration) -> Engine {
    let mut adapters = AdapterRegistry::with_defaults();
    adapters.register(Arc::new(SlowAdapter {
        inner: PythonAdapter::new(),
        delay,
    }));
    Engine::new(builtin_catalog())
        .with_adapters(adapters)
        .with_options(EngineOptions::default().with_adapter_timeout(budget))
}

#[tokio::test]
async fn test_async_transform_matches_blocking() {
    let engine = engine();
    let async_result = engine
        .transform(request(PY_S3, LanguageVariant::Python, "azure"))
        .await
        .unwrap();
    let blocking_result = engine
        .transform_blocking(request(PY_S3, LanguageVariant::Python, "azure"))
        .unwrap();

    assert_eq!(async_result.output, blocking_result.output);
    assert_eq!(async_result.hits, blocking_result.hits);
    assert_eq!(async_result.outcome, Outcome::Success);
}

#[tokio::test]
async fn test_slow_adapter_times_out() {
    let engine = slow_engine(Duration::from_millis(300), Duration::from_millis(20));
    let err = engine
        .transform(request(PY_S3, LanguageVariant::Python, "azure"))
        .await
        .unwrap_err();

    match err {
        Error::Timeout { stage, budget_ms } => {
            assert_eq!(stage, Stage::Parse);
            assert_eq!(budget_ms, 20);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!Error::Timeout {
        stage: Stage::Parse,
        budget_ms: 20
    }
    .to_string()
    .is_empty());
}

#[tokio::test]
async fn test_generous_budget_completes() {
    let engine = slow_engine(Duration::from_millis(10), Duration::from_secs(5));
    let result = engine
        .transform(request(PY_S3, LanguageVariant::Python, "azure"))
        .await
        .unwrap();
    assert!(result.is_success());
}

#[tokio::test]
async fn test_detect_parse_is_budgeted() {
    let engine = slow_engine(Duration::from_millis(300), Duration::from_millis(20));
    let err = engine
        .detect(request(PY_S3, LanguageVariant::Python, "azure"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { stage: Stage::Parse, budget_ms: 20 }));

    let report = slow_engine(Duration::from_millis(10), Duration::from_secs(5))
        .detect(request(PY_S3, LanguageVariant::Python, "azure"))
        .await
        .unwrap();
    let blocking = test_support::engine().detect_blocking(request(PY_S3, LanguageVariant::Python, "azure")).unwrap();
    assert_eq!(report.hits, blocking.hits);
}

#[tokio::test]
async fn test_cancelled_request_stops_before_parse() {
    let engine = engine();
    let cancel = CancellationFlag::new();
    cancel.cancel();

    let err = engine
        .transform_with_cancel(request(PY_S3, LanguageVariant::Python, "azure"), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled { stage: Stage::Parse }));
}

#[tokio::test]
async fn test_reload_applies_to_later_requests() {
    let engine = engine();
    let before = engine
        .transform(request(JS_UNMAPPED, LanguageVariant::JavaScript, "azure"))
        .await
        .unwrap();
    assert_eq!(before.outcome, Outcome::Partial);

    let copy_rule = r#"
catalog_version: 1.0.0
mappings:
  - source: aws
    target: azure
    rules:
      - id: js.s3.copy-object
        family: object_storage
        language: js
        match: { kind: call, name: copyObject, min_args: 1, max_args: 1 }
        rewrite:
          template: "$0.getContainerClient($1).getBlockBlobClient($2).syncCopyFromURL($3)"
          captures:
            - { part: receiver }
            - { arg: 0, field: Bucket }
            - { arg: 0, field: Key }
            - { arg: 0, field: CopySource }
"#;
    let snapshot = engine.catalog();
    let mut sources = cloudshift_providers::builtin_catalog_sources();
    sources.push(("copy.yaml", copy_rule));
    engine.reload(PatternCatalog::from_sources(sources).unwrap());

    let after = engine
        .transform(request(JS_UNMAPPED, LanguageVariant::JavaScript, "azure"))
        .await
        .unwrap();
    assert_eq!(after.outcome, Outcome::Success, "{:?}", after.report.items);
    assert!(after
        .output
        .contains("s3.getContainerClient('archive').getBlockBlobClient(key).syncCopyFromURL('reports/' + key)"));

    // Snapshots taken before the swap keep the old rule set
    assert_eq!(snapshot.rule_count() + 1, engine.catalog().rule_count());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_engine() {
    let engine = Arc::new(engine());
    let sources = [
        (PY_S3, LanguageVariant::Python),
        (JS_LAMBDA, LanguageVariant::JavaScript),
        (PY_DYNAMODB, LanguageVariant::Python),
        (TS_LAMBDA, LanguageVariant::TypeScript),
    ];

    let mut handles = Vec::new();
    for round in 0..4 {
        for (source, language) in sources {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                let result = engine
                    .transform(request(source, language, "azure"))
                    .await
                    .unwrap();
                (round, source, result.output)
            }));
        }
    }

    for handle in handles {
        let (_, source, output) = handle.await.unwrap();
        let language = sources
            .iter()
            .find(|(s, _)| *s == source)
            .map(|(_, l)| *l)
            .unwrap();
        let expected = engine
            .transform_blocking(request(source, language, "azure"))
            .unwrap()
            .output;
        assert_eq!(output, expected);
    }
}
