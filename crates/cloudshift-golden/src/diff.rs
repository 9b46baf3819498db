//! Line diffs between expected and actual text

use crate::{GoldenError, Result};
use colored::*;
use regex::Regex;
use similar::{ChangeTag, TextDiff};

/// Options for diff comparison
#[derive(Debug, Clone)]
pub struct DiffOptions {
    pub colored: bool,

    /// Unchanged lines shown around each change
    pub context_lines: usize,

    /// Treat `\r\n` as `\n`
    pub normalize_line_endings: bool,

    pub ignore_trailing_whitespace: bool,

    /// Maximum diff lines to show (0 = unlimited)
    pub max_diff_lines: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            colored: true,
            context_lines: 3,
            normalize_line_endings: true,
            ignore_trailing_whitespace: false,
            max_diff_lines: 200,
        }
    }
}

/// Result of a diff operation
#[derive(Debug)]
pub struct DiffResult {
    pub matches: bool,
    pub diff_output: String,
    pub summary: DiffSummary,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    /// 1-based expected-side line numbers of the first removed lines in each hunk
    pub first_changed_lines: Vec<usize>,
}

/// Compares texts after normalization and volatile-line masking
pub struct DiffEngine {
    options: DiffOptions,
    volatile_patterns: Vec<Regex>,
}

impl DiffEngine {
    pub fn new(options: DiffOptions) -> Self {
        Self {
            options,
            volatile_patterns: Vec::new(),
        }
    }

    /// Lines matching `pattern` compare equal whatever their content
    pub fn add_volatile_pattern(&mut self, pattern: &str) -> Result<()> {
        let regex = Regex::new(pattern)
            .map_err(|e| GoldenError::CorpusError(format!("Invalid regex pattern: {}", e)))?;
        self.volatile_patterns.push(regex);
        Ok(())
    }

    pub fn compare(&self, expected: &str, actual: &str) -> DiffResult {
        let expected = self.prepare(expected);
        let actual = self.prepare(actual);

        if expected == actual {
            return DiffResult {
                matches: true,
                diff_output: String::new(),
                summary: DiffSummary::default(),
            };
        }

        let diff = TextDiff::from_lines(&expected, &actual);
        let mut summary = DiffSummary::default();
        for op in diff.ops() {
            let mut removed_here = false;
            for change in diff.iter_changes(op) {
                match change.tag() {
                    ChangeTag::Delete => {
                        summary.removed += 1;
                        if !removed_here {
                            if let Some(index) = change.old_index() {
                                summary.first_changed_lines.push(index + 1);
                            }
                            removed_here = true;
                        }
                    }
                    ChangeTag::Insert => summary.added += 1,
                    ChangeTag::Equal => {}
                }
            }
        }

        DiffResult {
            matches: false,
            diff_output: self.render(&diff),
            summary,
        }
    }

    fn prepare(&self, text: &str) -> String {
        let text = if self.options.normalize_line_endings {
            text.replace("\r\n", "\n")
        } else {
            text.to_string()
        };

        text.split_inclusive('\n')
            .map(|line| {
                let body = line.trim_end_matches('\n');
                let newline = if line.ends_with('\n') { "\n" } else { "" };
                if self.volatile_patterns.iter().any(|p| p.is_match(body)) {
                    format!("<volatile>{}", newline)
                } else if self.options.ignore_trailing_whitespace {
                    format!("{}{}", body.trim_end(), newline)
                } else {
                    line.to_string()
                }
            })
            .collect()
    }

    fn render(&self, diff: &TextDiff<'_, '_, '_, str>) -> String {
        let mut output = String::new();
        if self.options.colored {
            output.push_str(&"=== Diff Output ===\n".bold().to_string());
        } else {
            output.push_str("=== Diff Output ===\n");
        }

        let mut line_count = 0;
        for (i, group) in diff.grouped_ops(self.options.context_lines).iter().enumerate() {
            if i > 0 {
                output.push_str("...\n");
            }
            for op in group {
                for change in diff.iter_changes(op) {
                    if self.options.max_diff_lines > 0 && line_count >= self.options.max_diff_lines {
                        output.push_str("... (diff truncated) ...\n");
                        return output;
                    }
                    let line = match change.tag() {
                        ChangeTag::Delete if self.options.colored => {
                            format!("{}", format!("-{}", change).red())
                        }
                        ChangeTag::Insert if self.options.colored => {
                            format!("{}", format!("+{}", change).green())
                        }
                        ChangeTag::Delete => format!("-{}", change),
                        ChangeTag::Insert => format!("+{}", change),
                        ChangeTag::Equal => format!(" {}", change),
                    };
                    output.push_str(&line);
                    if change.missing_newline() {
                        output.push('\n');
                    }
                    line_count += 1;
                }
            }
        }
        output
    }

    /// Plain unified-style diff for error messages
    pub fn simple_diff(&self, expected: &str, actual: &str) -> String {
        let diff = TextDiff::from_lines(expected, actual);
        let mut output = String::new();

        for change in diff.iter_all_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            output.push_str(&format!("{}{}", sign, change));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain() -> DiffEngine {
        DiffEngine::new(DiffOptions {
            colored: false,
            ..DiffOptions::default()
        })
    }

    #[test]
    fn test_identical_texts_match() {
        let result = plain().compare("a\nb\n", "a\nb\n");
        assert!(result.matches);
        assert!(result.diff_output.is_empty());
    }

    #[test]
    fn test_line_endings_are_normalized() {
        assert!(plain().compare("a\r\nb\r\n", "a\nb\n").matches);

        let strict = DiffEngine::new(DiffOptions {
            normalize_line_endings: false,
            ..DiffOptions::default()
        });
        assert!(!strict.compare("a\r\n", "a\n").matches);
    }

    #[test]
    fn test_summary_counts_changes() {
        let result = plain().compare("one\ntwo\nthree\n", "one\n2\nthree\nfour\n");
        assert!(!result.matches);
        assert_eq!(
            result.summary,
            DiffSummary {
                added: 2,
                removed: 1,
                first_changed_lines: vec![2],
            }
        );
        assert!(result.diff_output.contains("-two\n"));
        assert!(result.diff_output.contains("+2\n"));
        assert!(result.diff_output.contains("+four\n"));
    }

    #[test]
    fn test_volatile_lines_are_masked() {
        let mut engine = plain();
        engine.add_volatile_pattern(r"^# generated at ").unwrap();
        assert!(engine
            .compare("# generated at 10:00\nx = 1\n", "# generated at 11:30\nx = 1\n")
            .matches);
        assert!(engine.add_volatile_pattern("(").is_err());
    }

    #[test]
    fn test_trailing_whitespace_option() {
        let engine = DiffEngine::new(DiffOptions {
            colored: false,
            ignore_trailing_whitespace: true,
            ..DiffOptions::default()
        });
        assert!(engine.compare("a  \nb\n", "a\nb\n").matches);
        assert!(!plain().compare("a  \nb\n", "a\nb\n").matches);
    }

    #[test]
    fn test_simple_diff() {
        let diff = plain().simple_diff("a\n", "b\n");
        assert_eq!(diff, "-a\n+b\n");
    }
}
