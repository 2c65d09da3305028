//! Clang-tidy integration
//!
//! Clang-tidy runs once per translation unit and prints diagnostics in the
//! usual compiler format (`file:line:col: warning: message [check]`). Its
//! check names don't line up with MISRA rules, so every diagnostic is filed
//! under Rule 17.7.
//!
//! A timeout or launch failure on one file only skips that file.

use super::process::run_with_timeout;
use super::{SourceSet, Tool, Violation};
use crate::error::Result;
use crate::rules;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info, warn};

const MAX_MESSAGE_CHARS: usize = 200;
const RULE_NUMBER: &str = "17.7";

pub struct ClangTidy {
    binary: String,
    timeout: Duration,
}

impl ClangTidy {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

impl Tool for ClangTidy {
    fn name(&self) -> &'static str {
        "clang-tidy"
    }

    fn run(&self, source_dir: &Path, sources: &SourceSet) -> Result<Vec<Violation>> {
        let mut violations = Vec::new();

        for file in &sources.c_files {
            let mut cmd = Command::new(&self.binary);
            cmd.arg(file)
                .arg("--")
                .arg(format!("-I{}", source_dir.display()));

            match run_with_timeout(self.name(), cmd, self.timeout) {
                Ok(output) => violations.extend(parse_output(&output.stdout, source_dir)),
                Err(e) => warn!(file = %file.display(), error = %e, "clang-tidy skipped file"),
            }
        }

        info!(count = violations.len(), "clang-tidy finished");
        Ok(violations)
    }
}

/// Parse compiler-style diagnostics into violations
pub fn parse_output(output: &str, source_dir: &Path) -> Vec<Violation> {
    output
        .lines()
        .filter(|line| line.contains("warning:") || line.contains("error:"))
        .filter_map(|line| {
            let parsed = parse_line(line, source_dir);
            if parsed.is_none() {
                debug!(line, "skipping malformed clang-tidy line");
            }
            parsed
        })
        .collect()
}

fn parse_line(line: &str, source_dir: &Path) -> Option<Violation> {
    let parts: Vec<&str> = line.split(':').collect();
    if parts.len() < 4 {
        return None;
    }

    // The first tag wins; file names and messages may contain either word
    let severity = match (line.find(": warning:"), line.find(": error:")) {
        (Some(w), Some(e)) if e < w => "error",
        (Some(_), _) => "warning",
        (None, Some(_)) => "error",
        (None, None) => return None,
    };
    let message = parts[3..].join(":");
    let message = message.trim();
    let message = message
        .strip_prefix(severity)
        .and_then(|m| m.strip_prefix(':'))
        .unwrap_or(message)
        .trim();
    let message: String = message.chars().take(MAX_MESSAGE_CHARS).collect();

    let rule = rules::rule_id(RULE_NUMBER);
    Some(Violation::with_rule(
        source_dir,
        parts[0].trim(),
        parts[1].trim().parse().unwrap_or(0),
        severity,
        rule,
        &message,
        "clang-tidy",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Severity;

    #[test]
    fn test_parses_warning() {
        let out = "/src/main.c:12:5: warning: Value stored to 'x' is never read [clang-analyzer-deadcode.DeadStores]\n    x = 3;\n    ^\n";
        let v = parse_output(out, Path::new("/src"));

        assert_eq!(v.len(), 1);
        assert_eq!(v[0].file, "main.c");
        assert_eq!(v[0].line, 12);
        assert_eq!(v[0].rule, "MISRA C:2012 Rule 17.7");
        assert_eq!(v[0].severity, Severity::Required);
        assert_eq!(v[0].tool, "clang-tidy");
        assert_eq!(
            v[0].message,
            "Value stored to 'x' is never read [clang-analyzer-deadcode.DeadStores]"
        );
    }

    #[test]
    fn test_parses_error() {
        let v = parse_output("/src/a.c:1:10: error: 'missing.h' file not found [clang-diagnostic-error]", Path::new("/src"));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].tool_severity, "error");
        assert!(v[0].message.starts_with("'missing.h' file not found"));
    }

    #[test]
    fn test_severity_comes_from_the_tag_not_the_file_name() {
        let out = "/src/warning_utils.c:7:3: error: use of undeclared identifier 'n' [clang-diagnostic-error]\n\
                   /src/error_log.c:2:1: warning: unused variable 'y' [clang-diagnostic-unused-variable]\n";
        let v = parse_output(out, Path::new("/src"));

        assert_eq!(v.len(), 2);
        assert_eq!(v[0].file, "warning_utils.c");
        assert_eq!(v[0].tool_severity, "error");
        assert_eq!(v[0].message, "use of undeclared identifier 'n' [clang-diagnostic-error]");
        assert_eq!(v[1].file, "error_log.c");
        assert_eq!(v[1].tool_severity, "warning");
        assert_eq!(v[1].message, "unused variable 'y' [clang-diagnostic-unused-variable]");
    }

    #[test]
    fn test_skips_short_lines() {
        // "error:" present but not enough fields to locate it
        assert!(parse_output("fatal error: too many errors", Path::new("/src")).is_empty());
        assert!(parse_output("12 warnings generated.", Path::new("/src")).is_empty());
    }

    #[test]
    fn test_message_is_truncated() {
        let long = "x".repeat(500);
        let line = format!("/src/a.c:3:1: warning: {}", long);
        let v = parse_output(&line, Path::new("/src"));
        assert_eq!(v[0].message.chars().count(), MAX_MESSAGE_CHARS);
    }

    #[test]
    fn test_missing_binary_skips_files() {
        let tool = ClangTidy::new("definitely-not-clang-tidy", Duration::from_secs(1));
        let sources = SourceSet {
            c_files: vec!["/src/a.c".into(), "/src/b.c".into()],
            h_files: vec![],
        };
        let v = tool.run(Path::new("/src"), &sources).unwrap();
        assert!(v.is_empty());
    }
}
