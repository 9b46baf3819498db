//! Transform command handler

use super::utils::{build_request, load_catalog};
use crate::cli::TransformArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::{redaction, timing::Timer};
use crate::output::OutputWriter;
use cloudshift_core::{Engine, TransformResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, trace, warn};

/// Outcome of one input file
#[derive(Debug, Serialize)]
struct FileOutcome {
    file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    written_to: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<TransformResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Handle the transform command
#[instrument(skip(config, output), fields(files = args.files.len(), strict = args.strict))]
pub async fn handle_transform(
    args: TransformArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    let timer = Timer::with_details("transform_command", &format!("files: {}", args.files.len()));

    let catalog = {
        let _catalog_timer = Timer::new("catalog_loading");
        load_catalog(config, &args.request.catalogs)?
    };
    output.info(&format!(
        "Loaded catalog {} ({} rules)",
        catalog.version(),
        catalog.rule_count()
    ))?;

    if let Some(dir) = &args.out_dir {
        fs::create_dir_all(dir)?;
    }

    let engine = Arc::new(Engine::new(catalog).with_options(config.engine_options()));
    let limit = Arc::new(Semaphore::new(config.engine.max_concurrent_files));
    let progress = if args.files.len() > 1 {
        output.progress_bar(args.files.len() as u64, "Transforming files")
    } else {
        None
    };

    let mut tasks = JoinSet::new();
    for (index, path) in args.files.iter().enumerate() {
        let request = build_request(&args.request, config, path);
        let engine = Arc::clone(&engine);
        let limit = Arc::clone(&limit);
        let path = path.clone();
        tasks.spawn(async move {
            let result = match request {
                Ok(request) => match limit.acquire_owned().await {
                    Ok(_permit) => engine.transform(request).await.map_err(Error::from),
                    Err(e) => Err(Error::other(format!("worker pool closed: {}", e))),
                },
                Err(e) => Err(e),
            };
            (index, path, result)
        });
    }

    let mut slots: Vec<Option<(PathBuf, Result<TransformResult>)>> =
        (0..args.files.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        let (index, path, result) =
            joined.map_err(|e| Error::other(format!("transform task failed: {}", e)))?;
        if let Some(pb) = &progress {
            pb.inc(1);
        }
        slots[index] = Some((path, result));
    }
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let mut outcomes = Vec::with_capacity(slots.len());
    for (path, result) in slots.into_iter().flatten() {
        outcomes.push(finish_file(&args, path, result)?);
    }

    report(&args, &outcomes, output)?;

    let total = outcomes.len();
    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    let partial = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref())
        .filter(|r| !r.is_success())
        .count();

    info!(
        total,
        failed,
        partial,
        elapsed_ms = timer.elapsed().as_millis() as u64,
        "Transform finished"
    );
    if failed > 0 {
        return Err(Error::Failed { failed, total });
    }
    if args.strict && partial > 0 {
        return Err(Error::Partial { count: partial });
    }
    Ok(())
}

/// Write the output of one file where the arguments ask for it
fn finish_file(
    args: &TransformArgs,
    file: PathBuf,
    result: Result<TransformResult>,
) -> Result<FileOutcome> {
    let result = match result {
        Ok(result) => result,
        Err(e) => {
            error!(file = %file.display(), error = %e, "Transform failed");
            return Ok(FileOutcome {
                file,
                written_to: None,
                result: None,
                error: Some(e.to_string()),
            });
        }
    };

    for hit in &result.hits {
        trace!(
            rule = %hit.rule_id,
            at = %hit.site.span.locator(),
            snippet = %redaction::redact_sensitive(&hit.site.snippet),
            "Rewrote site"
        );
    }
    for site in &result.unmapped {
        warn!(
            file = %file.display(),
            at = %site.site.span.locator(),
            name = %site.site.name,
            reason = %site.reason,
            "Unmapped site"
        );
    }

    let destination = if args.write {
        Some(file.clone())
    } else {
        args.out_dir
            .as_deref()
            .map(|dir| output_path(dir, &file))
            .transpose()?
    };
    if let Some(destination) = &destination {
        debug!(to = %destination.display(), "Writing transformed file");
        fs::write(destination, &result.output)?;
    }

    Ok(FileOutcome {
        file,
        written_to: destination,
        result: Some(result),
        error: None,
    })
}

/// Destination of `file` inside `dir`
fn output_path(dir: &Path, file: &Path) -> Result<PathBuf> {
    file.file_name()
        .map(|name| dir.join(name))
        .ok_or_else(|| Error::invalid_args(format!("{} has no file name", file.display())))
}

fn report(args: &TransformArgs, outcomes: &[FileOutcome], output: &mut OutputWriter) -> Result<()> {
    if !output.is_human() {
        return output.data(&outcomes);
    }

    for outcome in outcomes {
        let name = outcome.file.display().to_string();
        match (&outcome.result, &outcome.error) {
            (Some(result), _) => {
                output.transform_result(&name, result)?;
                if !result.is_success() {
                    output.warning(&format!(
                        "⚠ {} is only partially migrated; review the unmapped sites above",
                        name
                    ))?;
                }
                if args.show_report {
                    output.section("Coverage Report")?;
                    output.coverage_report(&result.report)?;
                }
                match &outcome.written_to {
                    Some(path) => output.success(&format!("✓ Wrote {}", path.display()))?,
                    None => {
                        output.section(&format!("Output: {}", name))?;
                        output.write(&result.output)?;
                    }
                }
            }
            (None, Some(message)) => output.error(&format!("✗ {}: {}", name, message))?,
            (None, None) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::RequestArgs;
    use tempfile::TempDir;

    const LAMBDA: &str = "exports.handler = async (event) => {\n  return { statusCode: 200 };\n};\n";

    fn args(files: Vec<PathBuf>) -> TransformArgs {
        TransformArgs {
            files,
            request: RequestArgs {
                from: Some("aws".to_string()),
                to: Some("azure".to_string()),
                language: None,
                catalogs: Vec::new(),
            },
            write: false,
            out_dir: None,
            strict: false,
            show_report: false,
        }
    }

    fn quiet_output() -> OutputWriter {
        OutputWriter::with_writer(crate::cli::OutputFormat::Json, true, Box::new(std::io::sink()))
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("out"), Path::new("src/app.js")).unwrap(),
            PathBuf::from("out/app.js")
        );
        assert!(output_path(Path::new("out"), Path::new("..")).is_err());
    }

    #[tokio::test]
    async fn test_out_dir_receives_transformed_files() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("index.js");
        fs::write(&input, LAMBDA).unwrap();
        let out_dir = temp_dir.path().join("out");

        let mut args = args(vec![input.clone()]);
        args.out_dir = Some(out_dir.clone());
        handle_transform(args, &Config::default(), &mut quiet_output())
            .await
            .unwrap();

        let written = fs::read_to_string(out_dir.join("index.js")).unwrap();
        assert!(written.contains("@azure/functions"));
        assert_eq!(fs::read_to_string(&input).unwrap(), LAMBDA);
    }

    #[tokio::test]
    async fn test_missing_file_counts_as_failure() {
        let temp_dir = TempDir::new().unwrap();
        let present = temp_dir.path().join("index.js");
        fs::write(&present, LAMBDA).unwrap();

        let args = args(vec![present, temp_dir.path().join("absent.js")]);
        let err = handle_transform(args, &Config::default(), &mut quiet_output())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Failed { failed: 1, total: 2 }));
    }

    #[tokio::test]
    async fn test_strict_rejects_partial_output() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("copy.js");
        fs::write(
            &input,
            "const AWS = require('aws-sdk');\nconst s3 = new AWS.S3();\n\nasync function archive(key) {\n  await s3.copyObject({ CopySource: 'reports/' + key, Bucket: 'archive', Key: key }).promise();\n}\n\nmodule.exports = { archive };\n",
        )
        .unwrap();

        let lenient = args(vec![input.clone()]);
        handle_transform(lenient, &Config::default(), &mut quiet_output())
            .await
            .unwrap();

        let mut strict = args(vec![input]);
        strict.strict = true;
        let err = handle_transform(strict, &Config::default(), &mut quiet_output())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Partial { count: 1 }));
        assert_eq!(err.exit_code(), 9);
    }
}
