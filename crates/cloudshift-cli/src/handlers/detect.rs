//! Detect command handler

use super::utils::{build_request, load_catalog};
use crate::cli::DetectArgs;
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use cloudshift_core::Engine;
use tracing::{info, instrument};

/// Handle the detect command
#[instrument(skip(config, output), fields(file = %args.file.display()))]
pub async fn handle_detect(args: DetectArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let _timer = Timer::with_details("detect_command", &format!("file: {}", args.file.display()));

    let request = build_request(&args.request, config, &args.file)?;
    let engine = Engine::new(load_catalog(config, &args.request.catalogs)?)
        .with_options(config.engine_options());

    let report = engine.detect(request).await?;
    info!(
        hits = report.hits.len(),
        unmapped = report.unmapped.len(),
        "Detection finished"
    );

    output.detection_report(&args.file.display().to_string(), &report)?;
    if report.unmapped.is_empty() && !report.hits.is_empty() {
        output.success("✓ Every provider construct has a catalog rule")?;
    }
    Ok(())
}
