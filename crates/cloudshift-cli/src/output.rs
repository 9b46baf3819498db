//! Output formatting and writing utilities
//!
//! Results are written either as machine formats (JSON, YAML) or as
//! human-readable summaries of transform results, detection reports,
//! coverage reports and catalog violations.

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::logging::redaction;
use cloudshift_core::{
    CoverageReport, DetectionReport, Finding, Severity, TransformResult, UnmappedSite,
};
use cloudshift_schemas::ValidationErrors;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, IsTerminal, Write};
use tracing::{debug, trace};

/// Formatting with specialized support for the engine's result types
pub trait OutputFormatter {
    /// Format a serializable value
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Format one file's transform result
    fn format_transform_result(&self, file: &str, result: &TransformResult) -> Result<String>;

    /// Format a detection report
    fn format_detection_report(&self, file: &str, report: &DetectionReport) -> Result<String>;

    /// Format a coverage report with categorization
    fn format_coverage_report(&self, report: &CoverageReport) -> Result<String>;

    /// Format catalog validation errors with their violations
    fn format_validation_errors(&self, errors: &ValidationErrors) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::JsonPretty | OutputFormat::Human => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        }
    }

    fn format_transform_result(&self, file: &str, result: &TransformResult) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_transform_result_human(file, result)),
            _ => self.format(result),
        }
    }

    fn format_detection_report(&self, file: &str, report: &DetectionReport) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_detection_report_human(file, report)),
            _ => self.format(report),
        }
    }

    fn format_coverage_report(&self, report: &CoverageReport) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_coverage_report_human(report)),
            _ => self.format(report),
        }
    }

    fn format_validation_errors(&self, errors: &ValidationErrors) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_validation_errors_human(errors)),
            _ => self.format(errors),
        }
    }
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    show_progress: bool,
    quiet: bool,
    writer: Box<dyn Write>,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool, progress: bool) -> Self {
        Self {
            format,
            use_color,
            show_progress: progress && !quiet && io::stderr().is_terminal(),
            quiet,
            writer: Box::new(io::stdout()),
        }
    }

    /// Create an output writer with a custom writer
    #[cfg(test)]
    pub fn with_writer(format: OutputFormat, quiet: bool, writer: Box<dyn Write>) -> Self {
        Self {
            format,
            use_color: false,
            show_progress: false,
            quiet,
            writer,
        }
    }

    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Write raw output
    pub fn write(&mut self, content: &str) -> Result<()> {
        write!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write a line of output
    pub fn writeln(&mut self, content: &str) -> Result<()> {
        writeln!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write an info message
    pub fn info(&mut self, message: &str) -> Result<()> {
        debug!("Output info: {}", message);

        if self.quiet || !self.is_human() {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.writeln(&format!("INFO: {}", message))
        }
    }

    /// Write a success message
    pub fn success(&mut self, message: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&message.green().to_string())
        } else {
            self.writeln(message)
        }
    }

    /// Write a warning message
    pub fn warning(&mut self, message: &str) -> Result<()> {
        if !self.is_human() {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&message.yellow().to_string())
        } else {
            self.writeln(&format!("WARNING: {}", message))
        }
    }

    /// Write an error message
    pub fn error(&mut self, message: &str) -> Result<()> {
        if !self.is_human() {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&message.red().to_string())
        } else {
            self.writeln(&format!("ERROR: {}", message))
        }
    }

    /// Write a section header
    pub fn section(&mut self, title: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }
        self.writeln("")?;
        if self.use_color {
            self.writeln(&format!("═══ {} ═══", title).bright_blue().to_string())
        } else {
            self.writeln(&format!("=== {} ===", title))
        }
    }

    /// Write data in the configured format
    pub fn data<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let mut value_json = serde_json::to_value(value)?;
        redaction::redact_json_value(&mut value_json);
        trace!(
            "Outputting data: {}",
            serde_json::to_string(&value_json).unwrap_or_else(|_| "[failed to serialize]".to_string())
        );

        let formatted = self.format.format(value)?;
        self.writeln(formatted.trim_end())
    }

    pub fn transform_result(&mut self, file: &str, result: &TransformResult) -> Result<()> {
        let formatted = self.format.format_transform_result(file, result)?;
        self.writeln(formatted.trim_end())
    }

    pub fn detection_report(&mut self, file: &str, report: &DetectionReport) -> Result<()> {
        let formatted = self.format.format_detection_report(file, report)?;
        self.writeln(formatted.trim_end())
    }

    pub fn coverage_report(&mut self, report: &CoverageReport) -> Result<()> {
        let formatted = self.format.format_coverage_report(report)?;
        self.writeln(formatted.trim_end())
    }

    pub fn validation_errors(&mut self, errors: &ValidationErrors) -> Result<()> {
        let formatted = self.format.format_validation_errors(errors)?;
        self.writeln(formatted.trim_end())
    }

    /// Create a progress bar for long operations
    pub fn progress_bar(&self, length: u64, message: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new(length);
        if let Ok(style) = default_progress_style() {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        Some(pb)
    }

    /// Write a table (for human format)
    pub fn table(&mut self, headers: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
        if self.format != OutputFormat::Human {
            return Ok(());
        }

        let mut widths = headers.iter().map(|h| h.len()).collect::<Vec<_>>();
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.chars().count());
                }
            }
        }

        let header_row = headers
            .iter()
            .enumerate()
            .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
            .collect::<Vec<_>>()
            .join(" │ ");

        if self.use_color {
            self.writeln(header_row.trim_end().bold().to_string().as_str())?;
        } else {
            self.writeln(header_row.trim_end())?;
        }

        let separator = widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─");
        self.writeln(&separator)?;

        for row in rows {
            let row_str = row
                .iter()
                .enumerate()
                .map(|(i, cell)| match widths.get(i) {
                    Some(width) => format!("{:width$}", cell, width = width),
                    None => cell.clone(),
                })
                .collect::<Vec<_>>()
                .join(" │ ");
            self.writeln(row_str.trim_end())?;
        }

        Ok(())
    }
}

/// Style of the multi-file progress bar
pub fn default_progress_style() -> std::result::Result<ProgressStyle, indicatif::style::TemplateError> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
        .progress_chars("#>-"))
}

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::Error => "❌",
        Severity::Warning => "⚠️",
        Severity::Info => "ℹ️",
    }
}

fn format_unmapped(site: &UnmappedSite) -> String {
    format!(
        "  {} {} ({}): {}\n",
        site.site.span.locator(),
        site.site.name,
        site.site.kind,
        site.reason
    )
}

/// Format a transform result for human reading
fn format_transform_result_human(file: &str, result: &TransformResult) -> String {
    let mut output = String::new();
    let metadata = &result.metadata;

    output.push_str(&format!("═══ {} ═══\n\n", file));
    output.push_str(&format!(
        "🔧 {} → {} ({}, catalog {})\n",
        metadata.source_provider, metadata.target_provider, metadata.language, metadata.catalog_version
    ));
    output.push_str(&format!("  Outcome: {}\n", result.outcome));
    if let Some(duration) = metadata.duration_ms {
        output.push_str(&format!("  Duration: {}ms\n", duration));
    }

    if !result.hits.is_empty() {
        output.push_str(&format!("\n✅ Rewritten ({}):\n", result.hits.len()));
        for hit in &result.hits {
            output.push_str(&format!(
                "  {} {} [{}]\n",
                hit.site.span.locator(),
                hit.rule_id,
                hit.family
            ));
        }
    }

    if !result.unmapped.is_empty() {
        output.push_str(&format!("\n⚠️ Unmapped ({}):\n", result.unmapped.len()));
        for site in &result.unmapped {
            output.push_str(&format_unmapped(site));
        }
    }

    if !result.cleanup.is_empty() {
        output.push_str(&format!("\n🧹 Cleanup ({}):\n", result.cleanup.len()));
        for action in &result.cleanup {
            output.push_str(&format!("  line {} {}\n", action.line, action.rule_id));
        }
    }

    let failing = result.validation.failing();
    if failing.is_empty() {
        output.push_str("\n✅ Validation passed\n");
    } else {
        output.push_str("\n❌ Validation failed:\n");
        for check in failing {
            for failure in &check.failures {
                output.push_str(&format!(
                    "  [{}] {}: {}\n",
                    check.check,
                    failure.locator(),
                    failure.message
                ));
            }
        }
    }

    output
}

/// Format a detection report for human reading
fn format_detection_report_human(file: &str, report: &DetectionReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("═══ {} ({}) ═══\n", file, report.language));

    if !report.imports.is_empty() {
        output.push_str(&format!("\n📦 Provider imports ({}):\n", report.imports.len()));
        for import in &report.imports {
            output.push_str(&format!("  {} {}\n", import.span.locator(), import.name));
        }
    }

    if report.hits.is_empty() {
        output.push_str("\nNo catalog rule matches\n");
    } else {
        output.push_str(&format!("\n🔍 Matches ({}):\n", report.hits.len()));
        for hit in &report.hits {
            output.push_str(&format!(
                "  {} {} → {} [{}]\n",
                hit.site.span.locator(),
                hit.site.name,
                hit.rule_id,
                hit.family
            ));
        }
    }

    if !report.unmapped.is_empty() {
        output.push_str(&format!("\n⚠️ Unmapped ({}):\n", report.unmapped.len()));
        for site in &report.unmapped {
            output.push_str(&format_unmapped(site));
        }
    }

    output
}

/// Format a coverage report for human reading
fn format_coverage_report_human(report: &CoverageReport) -> String {
    let mut output = String::new();

    if report.items.is_empty() {
        output.push_str("✅ Nothing to report\n");
        return output;
    }

    output.push_str(&format!(
        "🔍 Coverage Report - {} Finding(s), max severity {}\n\n",
        report.summary.total_items, report.max_severity
    ));

    output.push_str("📊 Summary by Severity:\n");
    for (severity, count) in &report.summary.by_severity {
        output.push_str(&format!("  • {}: {}\n", severity, count));
    }
    output.push('\n');

    output.push_str("📋 Summary by Type:\n");
    for (code, count) in &report.summary.by_code {
        output.push_str(&format!("  • {}: {}\n", code, count));
    }
    output.push('\n');

    for severity in [Severity::Critical, Severity::Error, Severity::Warning, Severity::Info] {
        let items: Vec<&Finding> = report.items.iter().filter(|f| f.severity == severity).collect();
        if items.is_empty() {
            continue;
        }
        output.push_str(&format!("{} {} Findings:\n", severity_icon(severity), severity));
        for item in items {
            output.push_str(&format!("  📍 {} {}: {}\n", item.path, item.code, item.message));
            if let Some(before) = &item.before {
                output.push_str(&format!("    - {}\n", redaction::redact_sensitive(before)));
            }
            if let Some(after) = &item.after {
                output.push_str(&format!("    + {}\n", redaction::redact_sensitive(after)));
            }
        }
        output.push('\n');
    }

    output
}

/// Format catalog validation errors for human reading
fn format_validation_errors_human(errors: &ValidationErrors) -> String {
    let mut output = String::new();

    output.push_str(&format!("❌ Catalog Invalid - {} Error(s)\n\n", errors.len()));

    for (i, error) in errors.errors.iter().enumerate() {
        output.push_str(&format!("{}. 📍 {}\n", i + 1, error.path));
        output.push_str(&format!("   💬 {}\n", error.message));
        for violation in &error.schema_violations {
            output.push_str(&format!(
                "   • {}: expected {}, found {}\n",
                violation.rule, violation.expected, violation.actual
            ));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    include!("output/tests.rs");
}
