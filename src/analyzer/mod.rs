//! Analysis engine
//!
//! The engine itself detects nothing. It finds the C/C++ sources in a
//! directory, hands them to one or more external [`Tool`]s, and turns what
//! they report into a deduplicated, sorted list of [`Violation`]s plus a
//! [`Summary`].
//!
//! # Pipeline
//!
//! 1. Discover `.c`, `.cpp`, `.h` and `.hpp` files (recursively)
//! 2. Run every configured tool; each maps its own ids to MISRA rules
//! 3. Drop repeated `(file, line, rule)` findings, keeping the first
//! 4. Sort by file, then line
//! 5. Aggregate per-file and global counters

pub mod clang_tidy;
pub mod cppcheck;
pub mod process;
pub mod stats;

use crate::config::AnalyzerConfig;
use crate::error::{Error, Result};
use crate::rules::{self, Severity};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

pub use clang_tidy::ClangTidy;
pub use cppcheck::Cppcheck;
pub use stats::{FileStats, SeverityCounts, Summary};

const SOURCE_EXTENSIONS: &[&str] = &["c", "cpp"];
const HEADER_EXTENSIONS: &[&str] = &["h", "hpp"];

/// One finding, already mapped onto a MISRA rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Path relative to the analyzed directory
    pub file: String,
    /// 1-based; 0 when the tool didn't report a usable line
    pub line: u32,
    pub severity: Severity,
    pub rule: String,
    pub message: String,
    pub description: String,
    pub solution: String,
    pub tool: String,
    /// Severity exactly as the tool printed it
    #[serde(rename = "type")]
    pub tool_severity: String,
}

impl Violation {
    /// Build a violation from a raw tool diagnostic id
    pub fn from_tool(
        source_dir: &Path,
        file: &str,
        line: u32,
        tool_severity: &str,
        code: &str,
        message: &str,
        tool: &str,
    ) -> Self {
        Self::with_rule(source_dir, file, line, tool_severity, rules::map_tool_code(code), message, tool)
    }

    /// Build a violation for an already-known rule
    pub fn with_rule(
        source_dir: &Path,
        file: &str,
        line: u32,
        tool_severity: &str,
        rule: String,
        message: &str,
        tool: &str,
    ) -> Self {
        let info = rules::rule_info(&rule);
        Self {
            file: relative_path(source_dir, file),
            line,
            severity: rules::map_severity(tool_severity),
            rule,
            message: message.to_string(),
            description: info.description.to_string(),
            solution: info.solution.to_string(),
            tool: tool.to_string(),
            tool_severity: tool_severity.to_string(),
        }
    }
}

/// Path of `file` relative to `source_dir`, or its bare file name when it
/// lives elsewhere (system headers, absolute include paths)
pub fn relative_path(source_dir: &Path, file: &str) -> String {
    let path = Path::new(file);
    match path.strip_prefix(source_dir) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_string_lossy().into_owned(),
        _ => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.to_string()),
    }
}

/// C/C++ files found under a directory
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    /// Translation units (`.c`, `.cpp`)
    pub c_files: Vec<PathBuf>,
    /// Headers (`.h`, `.hpp`)
    pub h_files: Vec<PathBuf>,
}

impl SourceSet {
    pub fn discover(dir: &Path) -> Self {
        let mut set = Self::default();

        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let ext = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase());

            match ext.as_deref() {
                Some(e) if SOURCE_EXTENSIONS.contains(&e) => set.c_files.push(entry.into_path()),
                Some(e) if HEADER_EXTENSIONS.contains(&e) => set.h_files.push(entry.into_path()),
                _ => {}
            }
        }

        set.c_files.sort();
        set.h_files.sort();
        set
    }

    pub fn len(&self) -> usize {
        self.c_files.len() + self.h_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all(&self) -> impl Iterator<Item = &PathBuf> {
        self.c_files.iter().chain(self.h_files.iter())
    }
}

/// An external program that reports findings for a source tree
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(&self, source_dir: &Path, sources: &SourceSet) -> Result<Vec<Violation>>;
}

/// Result of analyzing one source tree
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    pub violations: Vec<Violation>,
    pub summary: Summary,
}

/// Runs the configured tools over a source tree
pub struct Analyzer {
    tools: Vec<Box<dyn Tool>>,
}

impl Analyzer {
    /// Cppcheck, plus clang-tidy when enabled
    pub fn new(config: &AnalyzerConfig) -> Self {
        let mut tools: Vec<Box<dyn Tool>> = vec![Box::new(Cppcheck::new(
            config.cppcheck_bin.clone(),
            config.tool_timeout,
        ))];
        if config.enable_clang_tidy {
            tools.push(Box::new(ClangTidy::new(
                config.clang_tidy_bin.clone(),
                config.clang_tidy_timeout,
            )));
        }
        Self { tools }
    }

    pub fn with_tools(tools: Vec<Box<dyn Tool>>) -> Self {
        Self { tools }
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// `source_dir` is canonicalized first; tools print normalized paths
    /// and a leading `./` would keep them from matching.
    pub fn analyze(&self, source_dir: &Path) -> Result<AnalysisOutput> {
        let source_dir = std::fs::canonicalize(source_dir)?;
        let source_dir = source_dir.as_path();
        let sources = SourceSet::discover(source_dir);
        info!(
            dir = %source_dir.display(),
            sources = sources.c_files.len(),
            headers = sources.h_files.len(),
            "found source files"
        );

        if sources.is_empty() {
            return Err(Error::NoSources);
        }

        let mut violations = Vec::new();
        for tool in &self.tools {
            violations.extend(tool.run(source_dir, &sources)?);
        }

        let mut violations = deduplicate(violations);
        violations.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));

        let files: Vec<&PathBuf> = sources.all().collect();
        let summary = Summary::from_violations(&violations, sources.len(), stats::count_lines(&files));

        Ok(AnalysisOutput { violations, summary })
    }
}

/// Keep the first violation for each `(file, line, rule)`
pub fn deduplicate(violations: Vec<Violation>) -> Vec<Violation> {
    let mut seen = HashSet::new();
    violations
        .into_iter()
        .filter(|v| seen.insert((v.file.clone(), v.line, v.rule.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    // ==========================================================================
    // STUB TOOLS
    // ==========================================================================
    //
    // The real tools need cppcheck/clang-tidy installed. These stand-ins
    // return canned findings so the pipeline can be tested anywhere.
    // ==========================================================================

    struct Canned(Vec<(&'static str, u32, &'static str, &'static str)>);

    impl Tool for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn run(&self, source_dir: &Path, _sources: &SourceSet) -> Result<Vec<Violation>> {
            Ok(self
                .0
                .iter()
                .map(|(file, line, sev, code)| {
                    let path = source_dir.join(file);
                    Violation::from_tool(source_dir, &path.to_string_lossy(), *line, sev, code, "msg", "canned")
                })
                .collect())
        }
    }

    struct Failing;

    impl Tool for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn run(&self, _: &Path, _: &SourceSet) -> Result<Vec<Violation>> {
            Err(Error::Timeout {
                tool: "failing".to_string(),
                after: std::time::Duration::from_secs(1),
            })
        }
    }

    /// Reports paths the way cppcheck prints them for a relative argument:
    /// relative to the working directory, without a leading `./`
    struct CwdRelative;

    impl Tool for CwdRelative {
        fn name(&self) -> &'static str {
            "cwd-relative"
        }

        fn run(&self, source_dir: &Path, sources: &SourceSet) -> Result<Vec<Violation>> {
            Ok(sources
                .c_files
                .iter()
                .map(|f| {
                    let printed = f.strip_prefix("./").unwrap_or(f);
                    Violation::from_tool(source_dir, &printed.to_string_lossy(), 3, "error", "uninitvar", "x", "cwd-relative")
                })
                .collect())
        }
    }

    fn source_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("main.c"), "int main(void)\n{\n    return 0;\n}\n").unwrap();
        fs::write(dir.path().join("lib/util.CPP"), "void f() {}\n").unwrap();
        fs::write(dir.path().join("lib/util.h"), "void f();\n").unwrap();
        fs::write(dir.path().join("README.md"), "not code\n").unwrap();
        dir
    }

    // ==========================================================================
    // SOURCE DISCOVERY
    // ==========================================================================

    #[test]
    fn test_discover_sources() {
        let dir = source_tree();
        let set = SourceSet::discover(dir.path());

        assert_eq!(set.c_files.len(), 2, "extension match is case-insensitive");
        assert_eq!(set.h_files.len(), 1);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_no_sources_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "hi").unwrap();

        let analyzer = Analyzer::with_tools(vec![Box::new(Canned(vec![]))]);
        let err = analyzer.analyze(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NoSources));
    }

    // ==========================================================================
    // DEDUPLICATION AND ORDERING
    // ==========================================================================

    #[test]
    fn test_duplicates_collapse() {
        let dir = source_tree();
        let analyzer = Analyzer::with_tools(vec![Box::new(Canned(vec![
            ("main.c", 3, "error", "uninitvar"),
            // Same rule via a different cppcheck id
            ("main.c", 3, "warning", "uninitStructMember"),
            ("main.c", 3, "style", "unusedVariable"),
            ("lib/util.h", 1, "style", "unusedFunction"),
            ("main.c", 1, "error", "memleak"),
        ]))]);

        let out = analyzer.analyze(dir.path()).unwrap();
        let keys: Vec<_> = out.violations.iter().map(|v| (v.file.as_str(), v.line, v.rule.as_str())).collect();

        assert_eq!(
            keys,
            vec![
                ("lib/util.h", 1, "MISRA C:2012 Rule 2.1"),
                ("main.c", 1, "MISRA C:2012 Rule 22.1"),
                ("main.c", 3, "MISRA C:2012 Rule 9.1"),
                ("main.c", 3, "MISRA C:2012 Rule 2.7"),
            ]
        );
        // First occurrence wins
        assert_eq!(out.violations[2].tool_severity, "error");
        assert_eq!(out.summary.total_violations, 4);
    }

    #[test]
    fn test_duplicates_across_tools_collapse() {
        let dir = source_tree();
        let analyzer = Analyzer::with_tools(vec![
            Box::new(Canned(vec![("main.c", 2, "error", "memleak")])),
            Box::new(Canned(vec![("main.c", 2, "error", "resourceLeak")])),
        ]);
        let out = analyzer.analyze(dir.path()).unwrap();
        assert_eq!(out.violations.len(), 1);
    }

    #[test]
    fn test_summary_counts_files_and_lines() {
        let dir = source_tree();
        let analyzer = Analyzer::with_tools(vec![Box::new(Canned(vec![]))]);
        let out = analyzer.analyze(dir.path()).unwrap();

        assert_eq!(out.summary.files_analyzed, 3);
        // 4 + 1 + 1; README.md is not a source
        assert_eq!(out.summary.lines_analyzed, 6);
        assert_eq!(out.summary.total_violations, 0);
    }

    #[test]
    fn test_tool_error_propagates() {
        let dir = source_tree();
        let analyzer = Analyzer::with_tools(vec![Box::new(Failing)]);
        assert!(matches!(analyzer.analyze(dir.path()), Err(Error::Timeout { .. })));
    }

    // ==========================================================================
    // PATHS AND CONFIG
    // ==========================================================================

    #[test]
    fn test_dot_prefixed_dir_keeps_same_named_files_apart() {
        let dir = tempfile::tempdir_in(".").unwrap();
        let rel = Path::new(".").join(dir.path().file_name().unwrap());
        assert!(rel.starts_with("."));
        fs::create_dir_all(rel.join("a")).unwrap();
        fs::create_dir_all(rel.join("b")).unwrap();
        fs::write(rel.join("a/util.c"), "int a;\n").unwrap();
        fs::write(rel.join("b/util.c"), "int b;\n").unwrap();

        let analyzer = Analyzer::with_tools(vec![Box::new(CwdRelative)]);
        let out = analyzer.analyze(&rel).unwrap();

        let files: Vec<_> = out.violations.iter().map(|v| v.file.as_str()).collect();
        assert_eq!(files, vec!["a/util.c", "b/util.c"]);
        assert_eq!(out.summary.file_stats.len(), 2);
    }

    #[test]
    fn test_missing_dir_is_an_error() {
        let analyzer = Analyzer::with_tools(vec![Box::new(Canned(vec![]))]);
        assert!(matches!(analyzer.analyze(Path::new("./does/not/exist")), Err(Error::Io(_))));
    }

    #[test]
    fn test_relative_path() {
        let root = Path::new("/work/extracted");
        assert_eq!(relative_path(root, "/work/extracted/src/a.c"), "src/a.c");
        assert_eq!(relative_path(root, "/usr/include/stdio.h"), "stdio.h");
        assert_eq!(relative_path(root, "b.c"), "b.c");
    }

    #[test]
    fn test_default_tools() {
        let mut config = AnalyzerConfig::default();
        assert_eq!(Analyzer::new(&config).tool_names(), vec!["cppcheck"]);

        config.enable_clang_tidy = true;
        assert_eq!(Analyzer::new(&config).tool_names(), vec!["cppcheck", "clang-tidy"]);
    }
}
