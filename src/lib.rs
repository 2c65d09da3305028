//! misra-audit - MISRA C:2012 compliance reports for C/C++ source archives
//!
//! misra-audit takes a tree of C/C++ sources (a directory, or a ZIP upload
//! when running as a server), runs external static analyzers over it, and
//! maps what they find onto MISRA C:2012 rules.
//!
//! # Overview
//!
//! The analyzers do the detection. This crate only:
//!
//! 1. **Runs the tools**: `cppcheck` always, `clang-tidy` when enabled, each
//!    as a subprocess with a timeout.
//! 2. **Maps findings**: tool diagnostic ids are translated to MISRA rule ids
//!    through a fixed table, with canned descriptions and remediation text.
//! 3. **Aggregates**: duplicate `(file, line, rule)` findings collapse to one,
//!    results are sorted by file and line, and per-file counters are built.
//! 4. **Reports**: a self-contained HTML report (or JSON from the CLI).
//!
//! # Quick Start
//!
//! ```no_run
//! use misra_audit::{Analyzer, AnalyzerConfig};
//! use std::path::Path;
//!
//! let analyzer = Analyzer::new(&AnalyzerConfig::default());
//! let output = analyzer.analyze(Path::new("./firmware"))?;
//!
//! println!("{} violations in {} files",
//!     output.summary.total_violations,
//!     output.summary.files_analyzed);
//! misra_audit::report::generate("report.html", &output, "firmware")?;
//! # Ok::<(), misra_audit::Error>(())
//! ```
//!
//! # Server Mode
//!
//! [`serve::start`] exposes the same pipeline over HTTP: uploads are stored,
//! recorded in SQLite as `pending`, and processed on a worker pool
//! ([`jobs`]) until they reach `completed` or `failed`.
//!
//! # Modules
//!
//! - [`rules`]: MISRA rule table and tool-code mapping
//! - [`analyzer`]: tool runners, violation model, statistics
//! - [`archive`]: ZIP validation and extraction
//! - [`report`]: HTML and JSON output
//! - [`db`]: analysis records and their status transitions
//! - [`jobs`]: background processing of uploads
//! - [`serve`]: HTTP API and upload page

pub mod analyzer;
pub mod archive;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod report;
pub mod rules;
pub mod schema;
pub mod serve;

pub use analyzer::{AnalysisOutput, Analyzer, Summary, Violation};
pub use config::{AnalyzerConfig, ServerConfig};
pub use db::{AnalysisRecord, AnalysisStatus, Database};
pub use error::{Error, Result};
pub use rules::{Severity, CURRENT_RULESET};

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // PUBLIC API TESTS
    // ==========================================================================
    //
    // These tests verify the public API surface is reachable from the crate
    // root.
    // ==========================================================================

    #[test]
    fn test_public_exports() {
        let _: Severity = Severity::Required;
        let _: AnalysisStatus = AnalysisStatus::Pending;
        let _analyzer = Analyzer::new(&AnalyzerConfig::default());
    }

    #[test]
    fn test_default_analyzer_runs_cppcheck_only() {
        let analyzer = Analyzer::new(&AnalyzerConfig::default());
        assert_eq!(analyzer.tool_names(), vec!["cppcheck"]);

        let config = AnalyzerConfig {
            enable_clang_tidy: true,
            ..AnalyzerConfig::default()
        };
        assert_eq!(Analyzer::new(&config).tool_names(), vec!["cppcheck", "clang-tidy"]);
    }

    #[test]
    fn test_ruleset_accessible() {
        assert_eq!(CURRENT_RULESET.version_string(), "1.0.0");
    }
}
