//! SQLite database with Diesel ORM
//!
//! Stores one row per uploaded archive. Rows are created `pending`, moved
//! through `running` by the background job, and end in exactly one of
//! `completed` or `failed`. Nothing here ever deletes a row.
//!
//! Every transition is a single guarded `UPDATE ... WHERE status IN (...)`.
//! If the guard matches nothing the transition is rejected, which is what
//! keeps a record from being finished twice.

use crate::analyzer::Summary;
use crate::error::{Error, Result};
use crate::rules::{RuleSet, CURRENT_RULESET};
use crate::schema::*;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Default number of records returned by [`Database::list_recent`]
pub const DEFAULT_LIST_LIMIT: i64 = 50;

const BUSY_TIMEOUT_MS: u32 = 5_000;

// ============================================================================
// Status
// ============================================================================

/// Lifecycle of an analysis record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Running => "running",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    const ALL: [AnalysisStatus; 4] = [
        AnalysisStatus::Pending,
        AnalysisStatus::Running,
        AnalysisStatus::Completed,
        AnalysisStatus::Failed,
    ];

    pub fn can_transition_to(&self, next: AnalysisStatus) -> bool {
        use AnalysisStatus::*;
        matches!(
            (self, next),
            (Pending, Running) | (Running, Completed) | (Pending, Failed) | (Running, Failed)
        )
    }

    /// States a record may be in when moving to `self`; the SQL guard of
    /// every transition
    fn allowed_sources(&self) -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|from| from.can_transition_to(*self))
            .map(|from| from.as_str())
            .collect()
    }
}

impl FromStr for AnalysisStatus {
    type Err = DbError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AnalysisStatus::Pending),
            "running" => Ok(AnalysisStatus::Running),
            "completed" => Ok(AnalysisStatus::Completed),
            "failed" => Ok(AnalysisStatus::Failed),
            other => Err(DbError::Corrupt(format!("unknown status '{}'", other))),
        }
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Diesel Models
// ============================================================================

/// Insertable rule table version
#[derive(Insertable)]
#[diesel(table_name = ruleset_versions)]
struct NewRulesetVersion<'a> {
    version: &'a str,
    name: &'a str,
    tools: &'a str,
    introduced_at: &'a str,
}

/// Queryable rule table version
#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = ruleset_versions)]
pub struct StoredRuleset {
    pub id: i32,
    pub version: String,
    pub name: String,
    pub tools: String,
    pub introduced_at: String,
}

#[derive(Insertable)]
#[diesel(table_name = analyses)]
struct NewAnalysis<'a> {
    id: &'a str,
    status: &'a str,
    filename: &'a str,
    created_at: &'a str,
    ruleset_version: &'a str,
}

/// Raw database row
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = analyses)]
struct AnalysisRow {
    id: String,
    status: String,
    filename: String,
    created_at: String,
    completed_at: Option<String>,
    report_path: Option<String>,
    error: Option<String>,
    total_violations: Option<i32>,
    files_analyzed: Option<i32>,
    lines_analyzed: Option<i32>,
    mandatory_count: Option<i32>,
    required_count: Option<i32>,
    advisory_count: Option<i32>,
    ruleset_version: String,
}

/// Persisted status/result of one uploaded archive
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub id: String,
    pub status: AnalysisStatus,
    pub filename: String,
    /// RFC 3339, UTC
    pub created_at: String,
    pub completed_at: Option<String>,
    pub report_path: Option<String>,
    pub error: Option<String>,
    pub total_violations: Option<i32>,
    pub files_analyzed: Option<i32>,
    pub lines_analyzed: Option<i32>,
    pub mandatory_count: Option<i32>,
    pub required_count: Option<i32>,
    pub advisory_count: Option<i32>,
    pub ruleset_version: String,
}

impl TryFrom<AnalysisRow> for AnalysisRecord {
    type Error = DbError;

    fn try_from(row: AnalysisRow) -> std::result::Result<Self, DbError> {
        Ok(Self {
            status: row.status.parse()?,
            id: row.id,
            filename: row.filename,
            created_at: row.created_at,
            completed_at: row.completed_at,
            report_path: row.report_path,
            error: row.error,
            total_violations: row.total_violations,
            files_analyzed: row.files_analyzed,
            lines_analyzed: row.lines_analyzed,
            mandatory_count: row.mandatory_count,
            required_count: row.required_count,
            advisory_count: row.advisory_count,
            ruleset_version: row.ruleset_version,
        })
    }
}

// ============================================================================
// Database Connection
// ============================================================================

type DbPool = Pool<ConnectionManager<SqliteConnection>>;
type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Error type for database operations
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Query error: {0}")]
    Query(#[from] diesel::result::Error),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<diesel::result::Error> for Error {
    fn from(e: diesel::result::Error) -> Self {
        Error::Database(DbError::Query(e))
    }
}

/// Applied to every pooled connection: the request loop and the workers
/// share one file
#[derive(Debug)]
struct ConnectionOptions {
    busy_timeout_ms: u32,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {}; PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;",
            self.busy_timeout_ms
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Database connection wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

/// Counts of records per status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub running: i64,
    pub completed: i64,
    pub failed: i64,
}

impl StatusCounts {
    pub fn total(&self) -> i64 {
        self.pending + self.running + self.completed + self.failed
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

fn to_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

impl Database {
    /// Open (and create if needed) the database at `path`
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(&path_str);
        let pool = Pool::builder()
            .max_size(5)
            .connection_customizer(Box::new(ConnectionOptions {
                busy_timeout_ms: BUSY_TIMEOUT_MS,
            }))
            .build(manager)
            .map_err(|e| DbError::Connection(e.to_string()))?;

        let db = Self { pool };
        db.init_schema()?;
        debug!(path = %path_str, "database ready");
        Ok(db)
    }

    fn get_conn(&self) -> Result<DbConn> {
        Ok(self.pool.get().map_err(|e| DbError::Connection(e.to_string()))?)
    }

    fn init_schema(&self) -> Result<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(r#"
            CREATE TABLE IF NOT EXISTS ruleset_versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                version TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                tools TEXT NOT NULL,
                introduced_at TEXT NOT NULL
            )
        "#).execute(&mut conn)?;

        diesel::sql_query(r#"
            CREATE TABLE IF NOT EXISTS analyses (
                id TEXT PRIMARY KEY NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                filename TEXT NOT NULL,
                created_at TEXT NOT NULL,
                completed_at TEXT,
                report_path TEXT,
                error TEXT,
                total_violations INTEGER,
                files_analyzed INTEGER,
                lines_analyzed INTEGER,
                mandatory_count INTEGER,
                required_count INTEGER,
                advisory_count INTEGER,
                ruleset_version TEXT NOT NULL
            )
        "#).execute(&mut conn)?;

        diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_analyses_created_at ON analyses(created_at)").execute(&mut conn)?;
        diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_analyses_status ON analyses(status)").execute(&mut conn)?;

        self.register_ruleset(&CURRENT_RULESET)?;
        Ok(())
    }

    fn register_ruleset(&self, ruleset: &RuleSet) -> Result<()> {
        let mut conn = self.get_conn()?;
        let now = now();
        let tools_json = serde_json::to_string(&ruleset.tools).unwrap_or_default();

        let new_ruleset = NewRulesetVersion {
            version: &ruleset.version_string(),
            name: ruleset.name,
            tools: &tools_json,
            introduced_at: &now,
        };

        diesel::insert_or_ignore_into(ruleset_versions::table)
            .values(&new_ruleset)
            .execute(&mut conn)?;

        Ok(())
    }

    /// Every rule table version this database has seen
    pub fn rulesets(&self) -> Result<Vec<StoredRuleset>> {
        let mut conn = self.get_conn()?;
        Ok(ruleset_versions::table
            .order(ruleset_versions::id.asc())
            .load::<StoredRuleset>(&mut conn)?)
    }

    // ========================================================================
    // Analysis Records
    // ========================================================================

    /// Insert a new `pending` record
    pub fn create_analysis(&self, id: &str, filename: &str) -> Result<AnalysisRecord> {
        let mut conn = self.get_conn()?;
        let now = now();

        let new_analysis = NewAnalysis {
            id,
            status: AnalysisStatus::Pending.as_str(),
            filename,
            created_at: &now,
            ruleset_version: &CURRENT_RULESET.version_string(),
        };

        diesel::insert_into(analyses::table)
            .values(&new_analysis)
            .execute(&mut conn)?;

        info!(id, filename, "analysis created");
        self.require(id)
    }

    pub fn get_analysis(&self, id: &str) -> Result<Option<AnalysisRecord>> {
        let mut conn = self.get_conn()?;

        let row = analyses::table
            .filter(analyses::id.eq(id))
            .select(AnalysisRow::as_select())
            .first::<AnalysisRow>(&mut conn)
            .optional()?;

        Ok(row.map(AnalysisRecord::try_from).transpose()?)
    }

    fn require(&self, id: &str) -> Result<AnalysisRecord> {
        self.get_analysis(id)?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Most recent records first
    pub fn list_recent(&self, limit: i64) -> Result<Vec<AnalysisRecord>> {
        let mut conn = self.get_conn()?;

        let rows = analyses::table
            .order(analyses::created_at.desc())
            .limit(limit)
            .select(AnalysisRow::as_select())
            .load::<AnalysisRow>(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(AnalysisRecord::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn mark_running(&self, id: &str) -> Result<()> {
        let mut conn = self.get_conn()?;
        let to = AnalysisStatus::Running;

        let updated = diesel::update(
            analyses::table
                .filter(analyses::id.eq(id))
                .filter(analyses::status.eq_any(to.allowed_sources())),
        )
        .set(analyses::status.eq(to.as_str()))
        .execute(&mut conn)?;

        self.check_transition(id, to, updated)
    }

    pub fn mark_completed(&self, id: &str, report_path: &Path, summary: &Summary) -> Result<()> {
        let mut conn = self.get_conn()?;
        let to = AnalysisStatus::Completed;
        let now = now();
        let report_path = report_path.to_string_lossy().to_string();

        let updated = diesel::update(
            analyses::table
                .filter(analyses::id.eq(id))
                .filter(analyses::status.eq_any(to.allowed_sources())),
        )
        .set((
            analyses::status.eq(to.as_str()),
            analyses::completed_at.eq(Some(now.as_str())),
            analyses::report_path.eq(Some(report_path.as_str())),
            analyses::total_violations.eq(Some(to_i32(summary.total_violations))),
            analyses::files_analyzed.eq(Some(to_i32(summary.files_analyzed))),
            analyses::lines_analyzed.eq(Some(to_i32(summary.lines_analyzed))),
            analyses::mandatory_count.eq(Some(to_i32(summary.severity_counts.mandatory))),
            analyses::required_count.eq(Some(to_i32(summary.severity_counts.required))),
            analyses::advisory_count.eq(Some(to_i32(summary.severity_counts.advisory))),
        ))
        .execute(&mut conn)?;

        self.check_transition(id, to, updated)
    }

    pub fn mark_failed(&self, id: &str, error: &str) -> Result<()> {
        let mut conn = self.get_conn()?;
        let to = AnalysisStatus::Failed;
        let now = now();

        let updated = diesel::update(
            analyses::table
                .filter(analyses::id.eq(id))
                .filter(analyses::status.eq_any(to.allowed_sources())),
        )
        .set((
            analyses::status.eq(to.as_str()),
            analyses::completed_at.eq(Some(now.as_str())),
            analyses::error.eq(Some(error)),
        ))
        .execute(&mut conn)?;

        self.check_transition(id, to, updated)
    }

    /// Fail every record a previous process left unfinished
    pub fn fail_interrupted(&self) -> Result<usize> {
        let mut conn = self.get_conn()?;
        let now = now();

        let updated = diesel::update(
            analyses::table.filter(analyses::status.eq_any(AnalysisStatus::Failed.allowed_sources())),
        )
        .set((
            analyses::status.eq(AnalysisStatus::Failed.as_str()),
            analyses::completed_at.eq(Some(now.as_str())),
            analyses::error.eq(Some("interrupted by server restart")),
        ))
        .execute(&mut conn)?;

        Ok(updated)
    }

    pub fn status_counts(&self) -> Result<StatusCounts> {
        let mut conn = self.get_conn()?;
        let mut count = |status: AnalysisStatus| -> Result<i64> {
            Ok(analyses::table
                .filter(analyses::status.eq(status.as_str()))
                .count()
                .get_result(&mut conn)?)
        };

        Ok(StatusCounts {
            pending: count(AnalysisStatus::Pending)?,
            running: count(AnalysisStatus::Running)?,
            completed: count(AnalysisStatus::Completed)?,
            failed: count(AnalysisStatus::Failed)?,
        })
    }

    /// Consistent copy of the database, safe while the server is running
    pub fn backup_to<P: AsRef<Path>>(&self, dest: P) -> Result<()> {
        let mut conn = self.get_conn()?;
        diesel::sql_query("VACUUM INTO ?")
            .bind::<diesel::sql_types::Text, _>(dest.as_ref().to_string_lossy().to_string())
            .execute(&mut conn)?;
        Ok(())
    }

    fn check_transition(&self, id: &str, to: AnalysisStatus, updated: usize) -> Result<()> {
        if updated > 0 {
            debug!(id, status = %to, "status updated");
            return Ok(());
        }
        let current = self.require(id)?;
        Err(Error::InvalidTransition {
            id: id.to_string(),
            from: current.status,
            to,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Violation;
    use crate::rules::Severity;

    fn open_temp() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn summary() -> Summary {
        let v = Violation {
            file: "a.c".to_string(),
            line: 1,
            severity: Severity::Required,
            rule: "MISRA C:2012 Rule 9.1".to_string(),
            message: String::new(),
            description: String::new(),
            solution: String::new(),
            tool: "cppcheck".to_string(),
            tool_severity: "error".to_string(),
        };
        Summary::from_violations(&[v], 3, 120)
    }

    // ==========================================================================
    // STATUS STATE MACHINE
    // ==========================================================================
    //
    // pending -> running -> completed
    //        \-> failed <-/
    //
    // Terminal states never move again.
    // ==========================================================================

    #[test]
    fn test_status_transitions_table() {
        use AnalysisStatus::*;
        assert!(Pending.can_transition_to(Running));
        assert!(Pending.can_transition_to(Failed));
        assert!(Running.can_transition_to(Completed));
        assert!(Running.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Running));
        assert!(!Running.can_transition_to(Pending));
    }

    #[test]
    fn test_sql_guard_follows_transition_table() {
        assert!(AnalysisStatus::Pending.allowed_sources().is_empty());
        assert_eq!(AnalysisStatus::Running.allowed_sources(), vec!["pending"]);
        assert_eq!(AnalysisStatus::Completed.allowed_sources(), vec!["running"]);
        assert_eq!(AnalysisStatus::Failed.allowed_sources(), vec!["pending", "running"]);
    }

    #[test]
    fn test_status_round_trip_through_text() {
        for s in [AnalysisStatus::Pending, AnalysisStatus::Running, AnalysisStatus::Completed, AnalysisStatus::Failed] {
            assert_eq!(s.as_str().parse::<AnalysisStatus>().unwrap(), s);
        }
        assert!("done".parse::<AnalysisStatus>().is_err());
        assert_eq!(serde_json::to_string(&AnalysisStatus::Running).unwrap(), "\"running\"");
    }

    // ==========================================================================
    // RECORD LIFECYCLE
    // ==========================================================================

    #[test]
    fn test_create_and_get() {
        let (_dir, db) = open_temp();
        let rec = db.create_analysis("id-1", "code.zip").unwrap();

        assert_eq!(rec.status, AnalysisStatus::Pending);
        assert_eq!(rec.filename, "code.zip");
        assert_eq!(rec.ruleset_version, "1.0.0");
        assert!(rec.completed_at.is_none());
        assert_eq!(db.get_analysis("id-1").unwrap(), Some(rec));
        assert_eq!(db.get_analysis("nope").unwrap(), None);
    }

    #[test]
    fn test_successful_lifecycle() {
        let (_dir, db) = open_temp();
        db.create_analysis("a", "code.zip").unwrap();

        db.mark_running("a").unwrap();
        assert_eq!(db.get_analysis("a").unwrap().unwrap().status, AnalysisStatus::Running);

        db.mark_completed("a", Path::new("/reports/misra_report_a.html"), &summary()).unwrap();
        let rec = db.get_analysis("a").unwrap().unwrap();

        assert_eq!(rec.status, AnalysisStatus::Completed);
        assert!(rec.completed_at.is_some());
        assert_eq!(rec.report_path.as_deref(), Some("/reports/misra_report_a.html"));
        assert_eq!(rec.total_violations, Some(1));
        assert_eq!(rec.files_analyzed, Some(3));
        assert_eq!(rec.lines_analyzed, Some(120));
        assert_eq!(rec.required_count, Some(1));
        assert_eq!(rec.advisory_count, Some(0));
        assert!(rec.error.is_none());
    }

    #[test]
    fn test_exactly_one_terminal_transition() {
        let (_dir, db) = open_temp();
        db.create_analysis("a", "code.zip").unwrap();
        db.mark_running("a").unwrap();
        db.mark_completed("a", Path::new("r.html"), &summary()).unwrap();

        let err = db.mark_failed("a", "late failure").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition { from: AnalysisStatus::Completed, to: AnalysisStatus::Failed, .. }
        ));
        let err = db.mark_completed("a", Path::new("r.html"), &summary()).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));

        // The completed record is untouched
        let rec = db.get_analysis("a").unwrap().unwrap();
        assert_eq!(rec.status, AnalysisStatus::Completed);
        assert!(rec.error.is_none());
    }

    #[test]
    fn test_fail_from_pending_and_running() {
        let (_dir, db) = open_temp();
        db.create_analysis("p", "p.zip").unwrap();
        db.create_analysis("r", "r.zip").unwrap();
        db.mark_running("r").unwrap();

        db.mark_failed("p", "bad archive").unwrap();
        db.mark_failed("r", "cppcheck timed out after 300s").unwrap();

        let p = db.get_analysis("p").unwrap().unwrap();
        assert_eq!(p.status, AnalysisStatus::Failed);
        assert_eq!(p.error.as_deref(), Some("bad archive"));
        assert!(p.completed_at.is_some());

        assert!(matches!(db.mark_running("p"), Err(Error::InvalidTransition { .. })));
    }

    #[test]
    fn test_cannot_complete_without_running() {
        let (_dir, db) = open_temp();
        db.create_analysis("a", "a.zip").unwrap();
        assert!(matches!(
            db.mark_completed("a", Path::new("r.html"), &summary()),
            Err(Error::InvalidTransition { from: AnalysisStatus::Pending, .. })
        ));
    }

    #[test]
    fn test_unknown_id() {
        let (_dir, db) = open_temp();
        assert!(matches!(db.mark_running("ghost"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let (_dir, db) = open_temp();
        db.create_analysis("a", "a.zip").unwrap();
        assert!(matches!(db.create_analysis("a", "b.zip"), Err(Error::Database(_))));
    }

    // ==========================================================================
    // LISTING AND MAINTENANCE
    // ==========================================================================

    #[test]
    fn test_list_recent_newest_first() {
        let (_dir, db) = open_temp();
        for id in ["first", "second", "third"] {
            db.create_analysis(id, "x.zip").unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let ids: Vec<_> = db.list_recent(DEFAULT_LIST_LIMIT).unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["third", "second", "first"]);

        assert_eq!(db.list_recent(2).unwrap().len(), 2);
    }

    #[test]
    fn test_fail_interrupted() {
        let (_dir, db) = open_temp();
        db.create_analysis("pending", "a.zip").unwrap();
        db.create_analysis("running", "b.zip").unwrap();
        db.create_analysis("done", "c.zip").unwrap();
        db.mark_running("running").unwrap();
        db.mark_running("done").unwrap();
        db.mark_completed("done", Path::new("r.html"), &summary()).unwrap();

        assert_eq!(db.fail_interrupted().unwrap(), 2);

        let counts = db.status_counts().unwrap();
        assert_eq!(counts, StatusCounts { pending: 0, running: 0, completed: 1, failed: 2 });
        assert_eq!(counts.total(), 3);
        assert_eq!(
            db.get_analysis("running").unwrap().unwrap().error.as_deref(),
            Some("interrupted by server restart")
        );
    }

    #[test]
    fn test_reopen_keeps_records_and_ruleset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.create_analysis("keep", "k.zip").unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert!(db.get_analysis("keep").unwrap().is_some());

        // Registering the same version twice is a no-op
        let rulesets = db.rulesets().unwrap();
        assert_eq!(rulesets.len(), 1);
        assert_eq!(rulesets[0].name, "misra-c-2012");
    }

    #[test]
    fn test_backup() {
        let (dir, db) = open_temp();
        db.create_analysis("a", "a.zip").unwrap();

        let backup = dir.path().join("backup.db");
        db.backup_to(&backup).unwrap();

        let copy = Database::open_at(&backup).unwrap();
        assert!(copy.get_analysis("a").unwrap().is_some());
    }
}
