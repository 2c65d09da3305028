//! Cppcheck integration
//!
//! Cppcheck is asked to print one finding per line using a custom template
//! with `|||` as the field separator:
//!
//! ```text
//! {file}|||{line}|||{severity}|||{id}|||{message}
//! ```
//!
//! Everything else it prints (progress lines, "Checking foo.c ...",
//! summaries) lacks the separator and is ignored. The `id` field is the
//! cppcheck check id, which [`crate::rules::map_tool_code`] turns into a
//! MISRA rule.

use super::process::run_with_timeout;
use super::{SourceSet, Tool, Violation};
use crate::error::Result;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info};

const SEPARATOR: &str = "|||";
const TEMPLATE: &str = "--template={file}|||{line}|||{severity}|||{id}|||{message}";

pub struct Cppcheck {
    binary: String,
    timeout: Duration,
}

impl Cppcheck {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    fn command(&self, source_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--enable=all")
            .arg("--inconclusive")
            .arg("--suppress=missingIncludeSystem")
            .arg(TEMPLATE)
            .arg(source_dir);
        cmd
    }
}

impl Tool for Cppcheck {
    fn name(&self) -> &'static str {
        "cppcheck"
    }

    fn run(&self, source_dir: &Path, sources: &SourceSet) -> Result<Vec<Violation>> {
        if sources.is_empty() {
            return Ok(vec![]);
        }

        let output = run_with_timeout(self.name(), self.command(source_dir), self.timeout)?;

        // Findings go to stderr; stdout only carries progress, but parse both
        let mut violations = parse_output(&output.stderr, source_dir);
        violations.extend(parse_output(&output.stdout, source_dir));

        info!(count = violations.len(), "cppcheck finished");
        Ok(violations)
    }
}

/// Parse templated cppcheck output into violations
pub fn parse_output(output: &str, source_dir: &Path) -> Vec<Violation> {
    output
        .lines()
        .filter(|line| line.contains(SEPARATOR))
        .filter_map(|line| {
            let parsed = parse_line(line, source_dir);
            if parsed.is_none() {
                debug!(line, "skipping malformed cppcheck line");
            }
            parsed
        })
        .collect()
}

fn parse_line(line: &str, source_dir: &Path) -> Option<Violation> {
    let parts: Vec<&str> = line.splitn(5, SEPARATOR).map(str::trim).collect();
    if parts.len() < 5 {
        return None;
    }

    let [file, line_no, severity, id, message] = [parts[0], parts[1], parts[2], parts[3], parts[4]];

    Some(Violation::from_tool(
        source_dir,
        file,
        line_no.parse().unwrap_or(0),
        severity,
        id,
        message,
        "cppcheck",
    ))
}
