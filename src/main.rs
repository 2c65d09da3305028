use chrono::Local;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use misra_audit::config::{ServeArgs, ToolArgs, DEFAULT_DB_PATH};
use misra_audit::{archive, AnalysisOutput, Analyzer, AnalyzerConfig, Database, Error, Severity};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "misra-audit")]
#[command(author, version, about = "MISRA C:2012 compliance reports from cppcheck and clang-tidy")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Source directory or ZIP archive to analyze
    path: Option<PathBuf>,

    /// Output report file (.html, .json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for auto-generated reports
    #[arg(long, default_value = "misra-reports")]
    report_dir: PathBuf,

    /// Don't prompt to open report
    #[arg(long)]
    no_open: bool,

    /// List every violation
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only show summary
    #[arg(short, long)]
    quiet: bool,

    #[command(flatten)]
    tools: ToolArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the upload server and web UI
    Serve(ServeArgs),

    /// Inspect the analysis database
    Db {
        /// SQLite database holding analysis records
        #[arg(long, env = "MISRA_DB_PATH", default_value = DEFAULT_DB_PATH)]
        db: PathBuf,

        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    /// List recent analyses
    List {
        /// Number of analyses to show
        #[arg(short, long, default_value = "20", value_parser = clap::value_parser!(i64).range(1..))]
        limit: i64,
    },

    /// Show one analysis as JSON
    Show {
        /// Analysis ID
        id: String,
    },

    /// Count analyses by status
    Stats,

    /// Create a backup of the database
    Backup {
        /// Output path for backup (default: misra_audit_backup_<timestamp>.db)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();

    // Handle subcommands first
    if let Some(cmd) = args.command {
        match cmd {
            Command::Serve(serve_args) => {
                init_logging(if args.verbose { "misra_audit=debug,info" } else { "info" });
                if let Err(e) = misra_audit::serve::start(serve_args.into()) {
                    eprintln!("Server error: {}", e);
                    std::process::exit(1);
                }
                return;
            }
            Command::Db { db, action } => {
                init_logging(if args.verbose { "misra_audit=debug" } else { "warn" });
                handle_db_action(&db, action);
                return;
            }
        }
    }

    init_logging(if args.verbose { "misra_audit=debug" } else { "warn" });

    let path = if let Some(p) = args.path.clone() {
        p
    } else {
        eprintln!("Usage: misra-audit <PATH>");
        eprintln!("Run 'misra-audit --help' for more options.");
        std::process::exit(1);
    };

    let config: AnalyzerConfig = args.tools.clone().into();
    let analyzer = Analyzer::new(&config);

    if !args.quiet {
        eprintln!("\x1b[1mmisra-audit - MISRA C:2012 Compliance\x1b[0m");
        eprintln!("{}", "─".repeat(70));
        eprintln!("Tools: {}\n", analyzer.tool_names().join(", "));
    }

    let source = match SourceDir::prepare(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let spinner = if !args.quiet { Some(spinner(&source.dir)) } else { None };
    let result = analyzer.analyze(&source.dir);
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    drop(source);

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            std::process::exit(1);
        }
    };

    if !args.quiet {
        print_files(&output);
        if args.verbose {
            print_violations(&output);
        }
    }
    print_summary(&output);

    // Determine report path
    let report_path = match args.output {
        Some(ref output) => output.clone(),
        None => {
            if let Err(e) = std::fs::create_dir_all(&args.report_dir) {
                eprintln!("Failed to create {}: {}", args.report_dir.display(), e);
                std::process::exit(1);
            }
            let timestamp = Local::now().format("%Y%m%d_%H%M%S");
            args.report_dir.join(format!("misra_report_{}.html", timestamp))
        }
    };

    let project_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    if let Err(e) = misra_audit::report::generate(&report_path, &output, &project_name) {
        eprintln!("Failed to write report: {}", e);
        std::process::exit(1);
    }
    if !args.quiet {
        eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", report_path.display());
    }

    // Ask before opening
    if !args.no_open && !args.quiet {
        eprint!("\nOpen report in browser? [Y/n] ");
        io::stderr().flush().ok();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_ok() {
            let input = input.trim().to_lowercase();
            if input.is_empty() || input == "y" || input == "yes" {
                if let Err(e) = open::that(&report_path) {
                    eprintln!("Failed to open report: {}", e);
                }
            }
        }
    }

    // Exit with appropriate code
    let counts = &output.summary.severity_counts;
    if counts.mandatory > 0 || counts.required > 0 {
        std::process::exit(2);
    } else if counts.advisory > 0 {
        std::process::exit(1);
    }
}

/// Directory to analyze; extracted ZIPs are removed on drop
struct SourceDir {
    dir: PathBuf,
    scratch: bool,
}

impl SourceDir {
    fn prepare(path: &Path) -> misra_audit::Result<Self> {
        if path.is_dir() {
            return Ok(Self { dir: path.to_path_buf(), scratch: false });
        }

        let mut head = Vec::with_capacity(4);
        std::fs::File::open(path)?.take(4).read_to_end(&mut head)?;
        if !archive::looks_like_zip(&head) {
            return Err(Error::Archive(format!(
                "{} is neither a directory nor a ZIP archive",
                path.display()
            )));
        }

        let dir = std::env::temp_dir().join(format!("misra-audit-{}", uuid::Uuid::new_v4()));
        let source = Self { dir, scratch: true };
        archive::extract(path, &source.dir)?;
        Ok(source)
    }
}

impl Drop for SourceDir {
    fn drop(&mut self) {
        if self.scratch {
            if let Err(e) = std::fs::remove_dir_all(&self.dir) {
                tracing::warn!(dir = %self.dir.display(), error = %e, "could not remove extracted sources");
            }
        }
    }
}

fn spinner(dir: &Path) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {elapsed} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(format!("analyzing {}", dir.display()));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_files(output: &AnalysisOutput) {
    if output.summary.file_stats.is_empty() {
        println!("\x1b[32mNo violations found.\x1b[0m");
        return;
    }

    println!("{:>5} {:>5} {:>5} {:>5}  {}", "TOTAL", "MAND", "REQ", "ADV", "FILE");
    for (file, stats) in &output.summary.file_stats {
        println!(
            "{:>5} {:>5} {:>5} {:>5}  {}",
            stats.messages,
            stats.mandatory,
            stats.required,
            stats.advisory,
            truncate(file, 60)
        );
    }
}

fn print_violations(output: &AnalysisOutput) {
    eprintln!();
    for v in &output.violations {
        let color = match v.severity {
            Severity::Mandatory => "\x1b[31m", // Red
            Severity::Required => "\x1b[33m",  // Yellow
            Severity::Advisory => "\x1b[90m",  // Gray
        };
        eprintln!(
            "{}{:<10}\x1b[0m {}:{}  {}  {}",
            color,
            format!("[{}]", v.severity),
            v.file,
            v.line,
            v.rule,
            truncate(&v.message, 60)
        );
    }
}

fn print_summary(output: &AnalysisOutput) {
    let s = &output.summary;
    eprintln!("\n{}", "─".repeat(70));
    eprintln!("\x1b[1mSummary:\x1b[0m");
    eprintln!("  Files analyzed:  {} ({} lines)", s.files_analyzed, s.lines_analyzed);
    eprintln!("  Violations:      {} in {} file(s)", s.total_violations, s.files_with_violations());
    eprintln!("  \x1b[31mMandatory:\x1b[0m       {}", s.severity_counts.mandatory);
    eprintln!("  \x1b[33mRequired:\x1b[0m        {}", s.severity_counts.required);
    eprintln!("  \x1b[90mAdvisory:\x1b[0m        {}", s.severity_counts.advisory);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn handle_db_action(db_path: &Path, action: DbAction) {
    if let DbAction::Backup { .. } = action {
        if !db_path.exists() {
            eprintln!("No database found at {}", db_path.display());
            return;
        }
    }

    let db = match Database::open_at(db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    match action {
        DbAction::List { limit } => match db.list_recent(limit) {
            Ok(records) => {
                if records.is_empty() {
                    println!("No analyses found.");
                } else {
                    println!("{:<36}  {:<9}  {:>10}  {:<20}  {}", "ID", "STATUS", "VIOLATIONS", "CREATED", "FILE");
                    println!("{}", "-".repeat(100));
                    for r in records {
                        println!(
                            "{:<36}  {:<9}  {:>10}  {:<20}  {}",
                            r.id,
                            r.status,
                            r.total_violations.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string()),
                            truncate(&r.created_at, 20),
                            r.filename
                        );
                    }
                }
            }
            Err(e) => eprintln!("Error: {}", e),
        },

        DbAction::Show { id } => match db.get_analysis(&id) {
            Ok(Some(record)) => match serde_json::to_string_pretty(&record) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Error serializing record: {}", e),
            },
            Ok(None) => {
                eprintln!("Analysis not found: {}", id);
                std::process::exit(1);
            }
            Err(e) => eprintln!("Error: {}", e),
        },

        DbAction::Stats => {
            match db.status_counts() {
                Ok(c) => {
                    println!("pending:   {}", c.pending);
                    println!("running:   {}", c.running);
                    println!("completed: {}", c.completed);
                    println!("failed:    {}", c.failed);
                    println!("total:     {}", c.total());
                }
                Err(e) => eprintln!("Error: {}", e),
            }
            if let Ok(rulesets) = db.rulesets() {
                for r in rulesets {
                    println!("ruleset:   {} v{} ({}) since {}", r.name, r.version, r.tools, r.introduced_at);
                }
            }
        }

        DbAction::Backup { output } => {
            let backup_path = output.unwrap_or_else(|| {
                let timestamp = Local::now().format("%Y%m%d_%H%M%S");
                PathBuf::from(format!("misra_audit_backup_{}.db", timestamp))
            });

            match db.backup_to(&backup_path) {
                Ok(()) => {
                    let bytes = std::fs::metadata(&backup_path).map(|m| m.len()).unwrap_or(0);
                    println!("Backup created: {} ({} bytes)", backup_path.display(), bytes);
                }
                Err(e) => {
                    eprintln!("Failed to create backup: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
