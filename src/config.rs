//! Runtime configuration
//!
//! Every knob is a clap argument with an environment fallback, so the server
//! can be configured the same way from a shell, a systemd unit or a
//! container env file.

use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "misra-audit.db";
pub const DEFAULT_DATA_DIR: &str = "misra-data";

/// Per-file ceiling for clang-tidy; it runs once per translation unit
const CLANG_TIDY_TIMEOUT: Duration = Duration::from_secs(60);

/// How the external analyzers are invoked
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub cppcheck_bin: String,
    pub clang_tidy_bin: String,
    pub enable_clang_tidy: bool,
    pub tool_timeout: Duration,
    pub clang_tidy_timeout: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            cppcheck_bin: "cppcheck".to_string(),
            clang_tidy_bin: "clang-tidy".to_string(),
            enable_clang_tidy: false,
            tool_timeout: Duration::from_secs(300),
            clang_tidy_timeout: CLANG_TIDY_TIMEOUT,
        }
    }
}

/// Analyzer options shared by the CLI and the server
#[derive(Args, Debug, Clone)]
pub struct ToolArgs {
    /// Path to the cppcheck binary
    #[arg(long, env = "CPPCHECK_BIN", default_value = "cppcheck")]
    pub cppcheck: String,

    /// Path to the clang-tidy binary
    #[arg(long, env = "CLANG_TIDY_BIN", default_value = "clang-tidy")]
    pub clang_tidy: String,

    /// Also run clang-tidy on every .c/.cpp file
    #[arg(long)]
    pub with_clang_tidy: bool,

    /// Seconds before a cppcheck run is abandoned
    #[arg(long, env = "MISRA_TOOL_TIMEOUT_SECS", default_value = "300")]
    pub timeout: u64,
}

impl From<ToolArgs> for AnalyzerConfig {
    fn from(args: ToolArgs) -> Self {
        Self {
            cppcheck_bin: args.cppcheck,
            clang_tidy_bin: args.clang_tidy,
            enable_clang_tidy: args.with_clang_tidy,
            tool_timeout: Duration::from_secs(args.timeout),
            clang_tidy_timeout: CLANG_TIDY_TIMEOUT,
        }
    }
}

/// Server options
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "MISRA_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "MISRA_PORT", default_value = "8001")]
    pub port: u16,

    /// SQLite database holding analysis records
    #[arg(long, env = "MISRA_DB_PATH", default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,

    /// Directory for uploads and generated reports
    #[arg(long, env = "MISRA_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Comma-separated list of allowed CORS origins ("*" for any)
    #[arg(long, env = "CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Largest accepted upload, in megabytes
    #[arg(long, env = "MISRA_MAX_UPLOAD_MB", default_value = "100")]
    pub max_upload_mb: u64,

    /// Number of background analysis workers
    #[arg(long, env = "MISRA_WORKERS", default_value = "2")]
    pub workers: usize,

    /// Open the upload page in a browser once listening
    #[arg(long)]
    pub open: bool,

    #[command(flatten)]
    pub tools: ToolArgs,
}

/// Everything the HTTP server and its workers need
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: u64,
    pub workers: usize,
    pub open_browser: bool,
    pub analyzer: AnalyzerConfig,
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            db_path: args.db,
            data_dir: args.data_dir,
            cors_origins: parse_origins(&args.cors_origins),
            max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
            workers: args.workers.max(1),
            open_browser: args.open,
            analyzer: args.tools.into(),
        }
    }
}

impl ServerConfig {
    /// Config rooted at `data_dir`, with defaults for everything else
    pub fn with_data_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
            db_path: data_dir.join(DEFAULT_DB_PATH),
            data_dir,
            cors_origins: vec!["*".to_string()],
            max_upload_bytes: 100 * 1024 * 1024,
            workers: 2,
            open_browser: false,
            analyzer: AnalyzerConfig::default(),
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn report_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.upload_dir())?;
        std::fs::create_dir_all(self.report_dir())
    }

    /// Value for `Access-Control-Allow-Origin`, if the origin is allowed
    pub fn allowed_origin(&self, request_origin: Option<&str>) -> Option<String> {
        if self.cors_origins.iter().any(|o| o == "*") {
            return Some("*".to_string());
        }
        let origin = request_origin?;
        self.cors_origins
            .iter()
            .find(|o| o.as_str() == origin)
            .cloned()
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
