//! Background analysis jobs
//!
//! Each upload becomes one job on a fixed rayon pool. A job owns its
//! record from `pending` to a terminal state: whatever goes wrong inside
//! [`JobContext::process`] is logged and stored with `mark_failed`, so the
//! HTTP side never has to know about it.

use crate::analyzer::Analyzer;
use crate::archive;
use crate::config::ServerConfig;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::report;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared by every job
pub struct JobContext {
    pub db: Database,
    pub config: ServerConfig,
    pub analyzer: Analyzer,
}

impl JobContext {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let analyzer = Analyzer::new(&config.analyzer);
        Self { db, config, analyzer }
    }

    pub fn with_analyzer(db: Database, config: ServerConfig, analyzer: Analyzer) -> Self {
        Self { db, config, analyzer }
    }

    /// Where an upload and its extracted tree live
    pub fn upload_dir_for(&self, id: &str) -> PathBuf {
        self.config.upload_dir().join(id)
    }

    pub fn report_path_for(&self, id: &str) -> PathBuf {
        self.config.report_dir().join(report::report_file_name(id))
    }

    /// Run one job to a terminal state
    pub fn run(&self, id: &str, zip_path: &Path, filename: &str) {
        if let Err(e) = self.process(id, zip_path, filename) {
            error!(id, error = %e, "analysis failed");
            if let Err(db_err) = self.db.mark_failed(id, &e.to_string()) {
                error!(id, error = %db_err, "could not record failure");
            }
        }
    }

    /// Extract, analyze, report, complete. Errors are left to [`run`](Self::run).
    pub fn process(&self, id: &str, zip_path: &Path, filename: &str) -> Result<()> {
        self.db.mark_running(id)?;

        let extract_dir = self.upload_dir_for(id).join("extracted");
        let extracted = archive::extract(zip_path, &extract_dir)?;
        info!(id, files = extracted.files, skipped = extracted.skipped, "archive extracted");

        let output = self.analyzer.analyze(&extract_dir)?;

        let report_path = self.report_path_for(id);
        report::generate(&report_path, &output, filename)?;

        self.db.mark_completed(id, &report_path, &output.summary)?;
        info!(
            id,
            violations = output.summary.total_violations,
            files = output.summary.files_analyzed,
            "analysis completed"
        );
        Ok(())
    }
}

/// Fixed-size pool that runs jobs in the background
pub struct JobRunner {
    pool: rayon::ThreadPool,
    ctx: Arc<JobContext>,
}

impl JobRunner {
    pub fn new(ctx: JobContext, workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("misra-worker-{}", i))
            .build()
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;

        Ok(Self {
            pool,
            ctx: Arc::new(ctx),
        })
    }

    pub fn context(&self) -> &JobContext {
        &self.ctx
    }

    /// Queue one job; returns immediately
    pub fn submit(&self, id: String, zip_path: PathBuf, filename: String) {
        let ctx = Arc::clone(&self.ctx);
        info!(id = %id, filename = %filename, "analysis scheduled");
        self.pool.spawn(move || {
            if !zip_path.exists() {
                warn!(id = %id, path = %zip_path.display(), "upload vanished before processing");
            }
            ctx.run(&id, &zip_path, &filename);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{SourceSet, Tool, Violation};
    use crate::db::AnalysisStatus;
    use std::io::Write;
    use std::time::{Duration, Instant};

    struct OneFinding;

    impl Tool for OneFinding {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn run(&self, source_dir: &Path, sources: &SourceSet) -> Result<Vec<Violation>> {
            Ok(sources
                .c_files
                .iter()
                .map(|f| Violation::from_tool(source_dir, &f.to_string_lossy(), 2, "error", "uninitvar", "x", "stub"))
                .collect())
        }
    }

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, body) in entries {
            zip.start_file(*name, zip::write::FileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    fn context(dir: &Path) -> JobContext {
        let config = ServerConfig::with_data_dir(dir);
        config.ensure_dirs().unwrap();
        let db = Database::open_at(&config.db_path).unwrap();
        JobContext::with_analyzer(db, config, Analyzer::with_tools(vec![Box::new(OneFinding)]))
    }

    fn stage_upload(ctx: &JobContext, id: &str, entries: &[(&str, &str)]) -> PathBuf {
        let dir = ctx.upload_dir_for(id);
        std::fs::create_dir_all(&dir).unwrap();
        let zip_path = dir.join("code.zip");
        write_zip(&zip_path, entries);
        ctx.db.create_analysis(id, "code.zip").unwrap();
        zip_path
    }

    // ==========================================================================
    // JOB OUTCOMES
    // ==========================================================================

    #[test]
    fn test_job_completes() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let zip_path = stage_upload(&ctx, "ok", &[("src/main.c", "int main(void)\n{\n    int x;\n    return x;\n}\n")]);

        ctx.run("ok", &zip_path, "code.zip");

        let rec = ctx.db.get_analysis("ok").unwrap().unwrap();
        assert_eq!(rec.status, AnalysisStatus::Completed);
        assert_eq!(rec.total_violations, Some(1));
        assert_eq!(rec.files_analyzed, Some(1));
        assert_eq!(rec.lines_analyzed, Some(5));

        let report = std::fs::read_to_string(ctx.report_path_for("ok")).unwrap();
        assert!(report.contains("MISRA C:2012 Compliance Report"));
        assert!(report.contains("src/main.c"));
    }

    #[test]
    fn test_job_without_sources_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let zip_path = stage_upload(&ctx, "empty", &[("README.md", "nothing to see")]);

        ctx.run("empty", &zip_path, "code.zip");

        let rec = ctx.db.get_analysis("empty").unwrap().unwrap();
        assert_eq!(rec.status, AnalysisStatus::Failed);
        assert!(rec.error.unwrap().contains("No C/C++ source files"));
        assert!(rec.report_path.is_none());
        assert!(!ctx.report_path_for("empty").exists());
    }

    #[test]
    fn test_job_with_corrupt_archive_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let upload = ctx.upload_dir_for("bad");
        std::fs::create_dir_all(&upload).unwrap();
        let zip_path = upload.join("code.zip");
        std::fs::write(&zip_path, b"PK\x03\x04 truncated").unwrap();
        ctx.db.create_analysis("bad", "code.zip").unwrap();

        ctx.run("bad", &zip_path, "code.zip");

        assert_eq!(ctx.db.get_analysis("bad").unwrap().unwrap().status, AnalysisStatus::Failed);
    }

    #[test]
    fn test_job_runs_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let zip_path = stage_upload(&ctx, "twice", &[("a.c", "int a;\n")]);

        ctx.run("twice", &zip_path, "code.zip");
        // A second run cannot leave `completed`
        assert!(matches!(
            ctx.process("twice", &zip_path, "code.zip"),
            Err(Error::InvalidTransition { from: AnalysisStatus::Completed, .. })
        ));
        ctx.run("twice", &zip_path, "code.zip");

        let rec = ctx.db.get_analysis("twice").unwrap().unwrap();
        assert_eq!(rec.status, AnalysisStatus::Completed);
        assert!(rec.error.is_none());
    }

    // ==========================================================================
    // POOL
    // ==========================================================================

    #[test]
    fn test_runner_processes_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let zip_path = stage_upload(&ctx, "bg", &[("a.c", "int a;\n")]);

        let runner = JobRunner::new(ctx, 2).unwrap();
        runner.submit("bg".to_string(), zip_path, "code.zip".to_string());

        let deadline = Instant::now() + Duration::from_secs(10);
        let status = loop {
            let status = runner.context().db.get_analysis("bg").unwrap().unwrap().status;
            if matches!(status, AnalysisStatus::Completed | AnalysisStatus::Failed) || Instant::now() > deadline {
                break status;
            }
            std::thread::sleep(Duration::from_millis(20));
        };
        assert_eq!(status, AnalysisStatus::Completed);
    }
}
