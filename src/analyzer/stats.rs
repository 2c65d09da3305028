//! Summary statistics for one analysis run

use super::Violation;
use crate::rules::Severity;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Per-file message counters
///
/// The first four buckets follow the tool's own severity; the last three
/// follow the MISRA category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileStats {
    pub messages: usize,
    pub error: usize,
    pub warning: usize,
    pub info: usize,
    pub note: usize,
    pub mandatory: usize,
    pub required: usize,
    pub advisory: usize,
}

impl FileStats {
    fn record(&mut self, v: &Violation) {
        self.messages += 1;

        match v.tool_severity.to_ascii_lowercase().as_str() {
            "error" => self.error += 1,
            "warning" => self.warning += 1,
            "info" => self.info += 1,
            _ => self.note += 1,
        }

        match v.severity {
            Severity::Mandatory => self.mandatory += 1,
            Severity::Required => self.required += 1,
            Severity::Advisory => self.advisory += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub mandatory: usize,
    pub required: usize,
    pub advisory: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub files_analyzed: usize,
    pub lines_analyzed: usize,
    pub total_violations: usize,
    pub severity_counts: SeverityCounts,
    /// Keyed by path relative to the archive root
    pub file_stats: BTreeMap<String, FileStats>,
}

impl Summary {
    pub fn from_violations(violations: &[Violation], files_analyzed: usize, lines_analyzed: usize) -> Self {
        let mut summary = Self {
            files_analyzed,
            lines_analyzed,
            total_violations: violations.len(),
            ..Default::default()
        };

        for v in violations {
            summary.file_stats.entry(v.file.clone()).or_default().record(v);

            match v.severity {
                Severity::Mandatory => summary.severity_counts.mandatory += 1,
                Severity::Required => summary.severity_counts.required += 1,
                Severity::Advisory => summary.severity_counts.advisory += 1,
            }
        }

        summary
    }

    /// Number of files that have at least one violation
    pub fn files_with_violations(&self) -> usize {
        self.file_stats.len()
    }
}

/// Count lines across `files`; unreadable files count as zero
pub fn count_lines<P: AsRef<Path>>(files: &[P]) -> usize {
    files
        .iter()
        .filter_map(|f| std::fs::read(f).ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).lines().count())
        .sum()
}
