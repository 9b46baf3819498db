//! Request pipeline stages
//!
//! Each stage is a plain synchronous function over owned or shared inputs so
//! the async engine can move adapter-bound stages onto blocking threads while
//! the synchronous path calls them in sequence.

use crate::adapter::{AdapterRegistry, LanguageAdapter};
use crate::catalog::{Mapping, PatternCatalog, ProviderProfile};
use crate::cleanup::{Cleanup, ResidualCleanup};
use crate::detection::{Detection, Detector};
use crate::error::{Error, Result};
use crate::report::CoverageTracker;
use crate::syntax::SyntaxTree;
use crate::transform::{RewritePlan, Transformation, Transformer};
use crate::types::{
    Outcome, ServiceFamily, TransformMetadata, TransformRequest, TransformResult,
};
use crate::validation::{ValidationReport, Validator};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

/// Everything one request needs, cheap to clone into blocking tasks
#[derive(Clone)]
pub(crate) struct Pipeline {
    catalog: Arc<PatternCatalog>,
    adapter: Arc<dyn LanguageAdapter>,
    request: Arc<TransformRequest>,
}

impl Pipeline {
    /// Resolve the adapter and mapping up front so a bad request fails
    /// before any stage runs
    pub fn new(
        catalog: Arc<PatternCatalog>,
        adapters: &AdapterRegistry,
        request: TransformRequest,
    ) -> Result<Self> {
        let adapter = adapters.get(request.language)?;
        let pipeline = Self {
            catalog,
            adapter,
            request: Arc::new(request),
        };
        pipeline.mapping()?;
        pipeline.profiles()?;
        Ok(pipeline)
    }

    pub fn request(&self) -> &TransformRequest {
        &self.request
    }

    fn mapping(&self) -> Result<&Mapping> {
        self.catalog
            .mapping(&self.request.source_provider, &self.request.target_provider)
    }

    fn profiles(&self) -> Result<(&ProviderProfile, &ProviderProfile)> {
        let profile = |id| {
            self.catalog.provider(id).ok_or_else(|| Error::UnsupportedMapping {
                source_provider: self.request.source_provider.to_string(),
                target_provider: self.request.target_provider.to_string(),
                catalog_version: self.catalog.version().to_string(),
            })
        };
        Ok((
            profile(&self.request.source_provider)?,
            profile(&self.request.target_provider)?,
        ))
    }

    pub fn parse(&self) -> Result<SyntaxTree> {
        self.adapter.parse(&self.request.source_text)
    }

    pub fn detect(&self, tree: &SyntaxTree) -> Result<Detection> {
        let (source, _) = self.profiles()?;
        Ok(Detector::new(self.mapping()?, source).detect(tree))
    }

    pub fn transform(&self, tree: &SyntaxTree, detection: &Detection) -> Result<Transformation> {
        Ok(Transformer::new(self.mapping()?).transform(self.adapter.as_ref(), tree, detection))
    }

    pub fn render(&self, tree: &SyntaxTree, plan: &RewritePlan) -> Result<String> {
        self.adapter.render(tree, plan)
    }

    pub fn cleanup(&self, rendered: &str, imports_removed: bool) -> Result<Cleanup> {
        let (source, _) = self.profiles()?;
        ResidualCleanup::new(self.mapping()?, source).run(self.adapter.as_ref(), rendered, imports_removed)
    }

    pub fn validate(&self, output: &str, touched: &BTreeSet<ServiceFamily>) -> Result<ValidationReport> {
        let (source, target) = self.profiles()?;
        Validator::new(&self.catalog, source, target).validate(self.adapter.as_ref(), output, touched)
    }

    /// Assemble the result and its coverage report
    pub fn finish(
        &self,
        detection: Detection,
        transformation: Transformation,
        cleanup: Cleanup,
        validation: ValidationReport,
        started: Instant,
    ) -> TransformResult {
        let mut unmapped = detection.unmapped;
        unmapped.extend(transformation.failed);
        unmapped.sort_by_key(|u| (u.site.span.start, u.site.id));

        let mut tracker = CoverageTracker::new();
        for site in &unmapped {
            tracker.add_unmapped(site);
        }
        for action in &cleanup.actions {
            tracker.add_cleanup(action);
        }
        for failure in &validation.syntax.failures {
            tracker.add_syntax_invalid(&failure.locator(), &failure.message);
        }
        for failure in &validation.residual.failures {
            tracker.add_residual(&failure.locator(), &failure.subject);
        }
        if let Ok((_, target)) = self.profiles() {
            for failure in &validation.presence.failures {
                tracker.add_target_missing(&ServiceFamily::new(&failure.subject), &target.name);
            }
        }

        let outcome = if unmapped.is_empty() && validation.passed() {
            Outcome::Success
        } else {
            Outcome::Partial
        };

        TransformResult {
            output: cleanup.output,
            outcome,
            hits: transformation.applied,
            unmapped,
            cleanup: cleanup.actions,
            validation,
            report: tracker.build_report(),
            metadata: TransformMetadata {
                catalog_version: self.catalog.version().to_string(),
                source_provider: self.request.source_provider.clone(),
                target_provider: self.request.target_provider.clone(),
                language: self.request.language,
                timestamp: chrono::Utc::now().to_rfc3339(),
                duration_ms: Some(started.elapsed().as_millis() as u64),
            },
        }
    }
}
