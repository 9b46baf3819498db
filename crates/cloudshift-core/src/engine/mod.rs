//! Transformation engine
//!
//! [`Engine`] owns the compiled catalog and the adapter registry and runs one
//! request through parse, detect, transform, render, cleanup and validate.
//! Requests share nothing mutable: each takes a snapshot of the catalog when
//! it starts, so [`Engine::reload`] never disturbs work in flight.
//!
//! The async entry points move adapter-bound stages onto blocking threads
//! under the configured budget. [`Engine::transform_blocking`] and
//! [`Engine::detect_blocking`] run the same stages inline without a budget.
//!
//! ```no_run
//! use cloudshift_core::{Engine, PatternCatalog, TransformRequest, LanguageVariant};
//!
//! # async fn example(catalog: PatternCatalog) -> cloudshift_core::Result<()> {
//! let engine = Engine::new(catalog);
//! let request = TransformRequest::new("import boto3\n", LanguageVariant::Python, "aws", "azure");
//! let result = engine.transform(request).await?;
//! println!("{}", result.output);
//! # Ok(())
//! # }
//! ```

mod pipeline;

use crate::adapter::AdapterRegistry;
use crate::catalog::PatternCatalog;
use crate::error::{Error, Result, Stage};
use crate::syntax::SyntaxTree;
use crate::types::{DetectionHit, SiteRef, TransformRequest, TransformResult, UnmappedSite};
use cloudshift_schemas::LanguageVariant;
use pipeline::Pipeline;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Budget for each adapter-bound stage of one request
    pub adapter_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            adapter_timeout: Duration::from_secs(5),
        }
    }
}

impl EngineOptions {
    /// Override the adapter budget
    pub fn with_adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout = timeout;
        self
    }

    /// Validate option values
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.adapter_timeout.is_zero() {
            return Err("Adapter timeout cannot be zero".to_string());
        }
        Ok(())
    }
}

/// Caller-owned cancellation signal for one request
///
/// Checked before every stage; a stage already running completes and its
/// result is discarded.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self, stage: Stage) -> Result<()> {
        if self.is_cancelled() {
            debug!(%stage, "Request cancelled");
            return Err(Error::Cancelled { stage });
        }
        Ok(())
    }
}

/// Detection-only view of a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub language: LanguageVariant,
    /// Source-provider imports found in the input
    pub imports: Vec<SiteRef>,
    pub hits: Vec<DetectionHit>,
    pub unmapped: Vec<UnmappedSite>,
}

/// Catalog-driven transformation engine
pub struct Engine {
    catalog: RwLock<Arc<PatternCatalog>>,
    adapters: AdapterRegistry,
    options: EngineOptions,
}

impl Engine {
    /// Engine with the built-in adapters and default options
    pub fn new(catalog: PatternCatalog) -> Self {
        Self {
            catalog: RwLock::new(Arc::new(catalog)),
            adapters: AdapterRegistry::with_defaults(),
            options: EngineOptions::default(),
        }
    }

    pub fn with_adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Snapshot of the current catalog
    pub fn catalog(&self) -> Arc<PatternCatalog> {
        let guard = self.catalog.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Swap in a new catalog; requests already running keep the old one
    pub fn reload(&self, catalog: PatternCatalog) {
        let version = catalog.version().to_string();
        let mut guard = self.catalog.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(catalog);
        info!(%version, "Catalog reloaded");
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Transform one source text
    pub async fn transform(&self, request: TransformRequest) -> Result<TransformResult> {
        self.transform_with_cancel(request, &CancellationFlag::new())
            .await
    }

    /// Transform one source text, stopping before the next stage once
    /// `cancel` is set
    #[instrument(
        skip_all,
        fields(
            language = %request.language,
            source = %request.source_provider,
            target = %request.target_provider,
        )
    )]
    pub async fn transform_with_cancel(
        &self,
        request: TransformRequest,
        cancel: &CancellationFlag,
    ) -> Result<TransformResult> {
        let started = Instant::now();
        let pipeline = Pipeline::new(self.catalog(), &self.adapters, request)?;

        cancel.check(Stage::Parse)?;
        let tree = {
            let p = pipeline.clone();
            Arc::new(self.offload(Stage::Parse, move || p.parse()).await?)
        };

        cancel.check(Stage::Detect)?;
        let detection = pipeline.detect(&tree)?;

        cancel.check(Stage::Transform)?;
        let transformation = pipeline.transform(&tree, &detection)?;

        cancel.check(Stage::Render)?;
        let rendered = {
            let (p, tree, plan) = (pipeline.clone(), Arc::clone(&tree), transformation.plan.clone());
            self.offload(Stage::Render, move || p.render(&tree, &plan)).await?
        };

        cancel.check(Stage::Cleanup)?;
        let cleanup = {
            let p = pipeline.clone();
            let removed = !transformation.imports.removed.is_empty();
            self.offload(Stage::Cleanup, move || p.cleanup(&rendered, removed))
                .await?
        };

        cancel.check(Stage::Validate)?;
        let validation = {
            let (p, output, touched) = (pipeline.clone(), cleanup.output.clone(), transformation.families());
            self.offload(Stage::Validate, move || p.validate(&output, &touched))
                .await?
        };

        let result = pipeline.finish(detection, transformation, cleanup, validation, started);
        log_result(&result);
        Ok(result)
    }

    /// Run the same stages inline, without budgets or cancellation
    pub fn transform_blocking(&self, request: TransformRequest) -> Result<TransformResult> {
        let started = Instant::now();
        let pipeline = Pipeline::new(self.catalog(), &self.adapters, request)?;

        let tree = pipeline.parse()?;
        let detection = pipeline.detect(&tree)?;
        let transformation = pipeline.transform(&tree, &detection)?;
        let rendered = pipeline.render(&tree, &transformation.plan)?;
        let cleanup = pipeline.cleanup(&rendered, !transformation.imports.removed.is_empty())?;
        let validation = pipeline.validate(&cleanup.output, &transformation.families())?;

        let result = pipeline.finish(detection, transformation, cleanup, validation, started);
        log_result(&result);
        Ok(result)
    }

    /// Run [`Engine::transform`] to completion on an internal runtime
    #[cfg(feature = "blocking")]
    pub fn transform_sync(&self, request: TransformRequest) -> Result<TransformResult> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        runtime.block_on(self.transform(request))
    }

    /// Parse and detect only, with the parse under the adapter budget
    pub async fn detect(&self, request: TransformRequest) -> Result<DetectionReport> {
        let pipeline = Pipeline::new(self.catalog(), &self.adapters, request)?;
        let tree = {
            let p = pipeline.clone();
            self.offload(Stage::Parse, move || p.parse()).await?
        };
        report_detection(&pipeline, &tree)
    }

    /// Parse and detect inline, without a budget
    pub fn detect_blocking(&self, request: TransformRequest) -> Result<DetectionReport> {
        let pipeline = Pipeline::new(self.catalog(), &self.adapters, request)?;
        let tree = pipeline.parse()?;
        report_detection(&pipeline, &tree)
    }

    async fn offload<T, F>(&self, stage: Stage, work: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let budget = self.options.adapter_timeout;
        match tokio::time::timeout(budget, tokio::task::spawn_blocking(work)).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(Error::Internal {
                message: format!("{} stage did not complete", stage),
                source: anyhow::Error::new(join),
            }),
            Err(_) => {
                let budget_ms = budget.as_millis() as u64;
                warn!(%stage, budget_ms, "Adapter stage timed out");
                Err(Error::Timeout { stage, budget_ms })
            }
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("catalog_version", &self.catalog().version().to_string())
            .field("adapters", &self.adapters)
            .field("options", &self.options)
            .finish()
    }
}

fn report_detection(pipeline: &Pipeline, tree: &SyntaxTree) -> Result<DetectionReport> {
    let detection = pipeline.detect(tree)?;
    let text = &pipeline.request().source_text;

    Ok(DetectionReport {
        language: pipeline.request().language,
        imports: detection
            .imports
            .iter()
            .filter_map(|id| tree.site(*id))
            .map(|site| site.to_ref(text))
            .collect(),
        hits: detection.hits,
        unmapped: detection.unmapped,
    })
}

fn log_result(result: &TransformResult) {
    info!(
        outcome = ?result.outcome,
        hits = result.hits.len(),
        unmapped = result.unmapped.len(),
        cleanup = result.cleanup.len(),
        validation_passed = result.validation.passed(),
        duration_ms = result.metadata.duration_ms.unwrap_or_default(),
        "Transform complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::types::Outcome;

    fn request(text: &str, language: LanguageVariant) -> TransformRequest {
        TransformRequest::new(text, language, "aws", "azure")
    }

    #[test]
    fn test_options_validation() {
        assert!(EngineOptions::default().validate().is_ok());
        assert_eq!(EngineOptions::default().adapter_timeout, Duration::from_secs(5));
        let zero = EngineOptions::default().with_adapter_timeout(Duration::ZERO);
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_cancellation_flag_is_shared() {
        let flag = CancellationFlag::new();
        let other = flag.clone();
        assert!(flag.check(Stage::Parse).is_ok());
        other.cancel();
        assert!(flag.is_cancelled());
        assert!(matches!(
            flag.check(Stage::Render),
            Err(Error::Cancelled { stage: Stage::Render })
        ));
    }

    #[test]
    fn test_blocking_transform() {
        let engine = Engine::new(testing::catalog());
        let source = "import boto3\n\ns3 = boto3.client(\"s3\")\ns3.put_object(Bucket=\"b\", Key=\"k\", Body=b\"x\")\n";
        let result = engine
            .transform_blocking(request(source, LanguageVariant::Python))
            .unwrap();

        assert_eq!(result.outcome, Outcome::Success, "{:?}", result.report.items);
        assert!(!result.output.contains("boto3"));
        assert_eq!(result.hits.len(), 2);
        assert_eq!(result.metadata.catalog_version, "1.0.0");
    }

    #[test]
    fn test_unsupported_requests_fail_early() {
        let engine = Engine::new(testing::catalog());
        let err = engine
            .transform_blocking(TransformRequest::new("x", LanguageVariant::Python, "aws", "gcp"))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedMapping { .. }));

        let engine = Engine::new(testing::catalog()).with_adapters(AdapterRegistry::new());
        let err = engine
            .transform_blocking(request("x", LanguageVariant::Python))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage { .. }));
    }

    #[test]
    fn test_parse_error_aborts() {
        let engine = Engine::new(testing::catalog());
        let err = engine
            .transform_blocking(request("def broken(:\n", LanguageVariant::Python))
            .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_detect_only() {
        let engine = Engine::new(testing::catalog());
        let report = engine
            .detect_blocking(request(
                "import boto3\ns3 = boto3.client(\"s3\")\ns3.copy_object(Bucket=\"b\")\n",
                LanguageVariant::Python,
            ))
            .unwrap();
        assert_eq!(report.imports.len(), 1);
        assert_eq!(report.hits.len(), 1);
        assert_eq!(report.unmapped.len(), 1);
        assert_eq!(report.unmapped[0].site.name, "copy_object");
    }

    #[test]
    fn test_reload_swaps_snapshot() {
        let engine = Engine::new(testing::catalog());
        let before = engine.catalog();
        let next = testing::CATALOG.replace("catalog_version: 1.0.0", "catalog_version: 1.1.0");
        engine.reload(PatternCatalog::from_yaml_str(&next).unwrap());

        assert_eq!(before.version().to_string(), "1.0.0");
        assert_eq!(engine.catalog().version().to_string(), "1.1.0");
    }
}
