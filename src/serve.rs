//! HTTP server for the upload service
//!
//! `misra-audit serve` → binds, fails any records a previous run left
//! unfinished, then answers requests on one accept loop. Analysis happens on
//! the [`JobRunner`] pool; handlers only touch the database and the disk.

use crate::analyzer::Analyzer;
use crate::archive;
use crate::config::ServerConfig;
use crate::db::{AnalysisStatus, Database, DEFAULT_LIST_LIMIT};
use crate::error::{Error, Result};
use crate::jobs::{JobContext, JobRunner};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::Path;
use std::time::Instant;
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{debug, error, info, warn};

// Embed the UI directly in the binary
const UI_HTML: &str = include_str!("ui.html");

const API_MESSAGE: &str = "MISRA C Analysis API";
const API_VERSION: &str = "1.0";

// ============================================================================
// Routing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route<'a> {
    Ui,
    ApiRoot,
    Upload,
    Analysis(&'a str),
    Report(&'a str),
    List,
    Preflight,
    NotFound,
}

fn route<'a>(method: &Method, path: &'a str) -> Route<'a> {
    if *method == Method::Options {
        return Route::Preflight;
    }

    match (method, path) {
        (Method::Get, "/") => Route::Ui,
        (Method::Get, "/api") | (Method::Get, "/api/") => Route::ApiRoot,
        (Method::Post, "/api/upload") => Route::Upload,
        (Method::Get, "/api/analyses") => Route::List,
        (Method::Get, p) => {
            if let Some(id) = p.strip_prefix("/api/analysis/").filter(|id| is_id(id)) {
                Route::Analysis(id)
            } else if let Some(id) = p.strip_prefix("/api/report/").filter(|id| is_id(id)) {
                Route::Report(id)
            } else {
                Route::NotFound
            }
        }
        _ => Route::NotFound,
    }
}

fn is_id(s: &str) -> bool {
    !s.is_empty() && !s.contains('/')
}

fn split_url(url: &str) -> (&str, &str) {
    match url.split_once('?') {
        Some((path, query)) => (path, query),
        None => (url, ""),
    }
}

// ============================================================================
// Request helpers
// ============================================================================

/// Boundary of a `multipart/form-data` content type
fn boundary_from_content_type(content_type: &str) -> Option<&str> {
    let mut parts = content_type.split(';');
    let mime = parts.next()?.trim();
    if !mime.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }

    parts
        .filter_map(|p| p.trim().split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, v)| v.trim().trim_matches('"'))
        .filter(|b| !b.is_empty())
}

fn is_zip_filename(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".zip")
}

/// Last path component of a client-supplied file name
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if base.is_empty() || base == "." || base == ".." {
        "upload.zip".to_string()
    } else {
        base.to_string()
    }
}

#[derive(Deserialize, Debug, Default)]
struct ListParams {
    limit: Option<i64>,
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, DEFAULT_LIST_LIMIT)
}

fn header_value(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_string())
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Serialize)]
struct Detail<'a> {
    detail: &'a str,
}

#[derive(Serialize)]
struct ApiInfo {
    message: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct UploadResponse {
    analysis_id: String,
    status: AnalysisStatus,
    message: String,
}

struct Reply {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
    headers: Vec<(&'static str, String)>,
}

impl Reply {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                content_type: "application/json",
                body,
                headers: Vec::new(),
            },
            Err(e) => Self::detail(500, &e.to_string()),
        }
    }

    fn detail(status: u16, message: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: serde_json::to_vec(&Detail { detail: message }).unwrap_or_default(),
            headers: Vec::new(),
        }
    }

    fn html(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body,
            headers: Vec::new(),
        }
    }

    fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: Vec::new(),
            headers: Vec::new(),
        }
    }

    fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    fn from_error(e: &Error) -> Self {
        match e {
            Error::NotFound(_) => Self::detail(404, "Analysis not found"),
            other => {
                error!(error = %other, "request failed");
                Self::detail(500, &other.to_string())
            }
        }
    }

    fn into_response(self, allow_origin: Option<String>) -> Response<Cursor<Vec<u8>>> {
        let mut response = Response::from_data(self.body).with_status_code(self.status);
        add_header(&mut response, "Content-Type", self.content_type);
        for (name, value) in &self.headers {
            add_header(&mut response, name, value);
        }
        if let Some(origin) = allow_origin {
            if origin != "*" {
                add_header(&mut response, "Vary", "Origin");
            }
            add_header(&mut response, "Access-Control-Allow-Origin", &origin);
        }
        response
    }
}

fn add_header(response: &mut Response<Cursor<Vec<u8>>>, name: &str, value: &str) {
    match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
        Ok(h) => response.add_header(h),
        Err(()) => warn!(name, "dropping malformed response header"),
    }
}

// ============================================================================
// Server
// ============================================================================

/// Everything request handlers need
pub struct AppState {
    config: ServerConfig,
    runner: JobRunner,
}

impl AppState {
    /// Open the database and start the worker pool
    pub fn new(config: ServerConfig) -> Result<Self> {
        let db = Self::prepare(&config)?;
        let ctx = JobContext::new(db, config.clone());
        let runner = JobRunner::new(ctx, config.workers)?;
        Ok(Self { config, runner })
    }

    /// Same as [`new`](Self::new) with a caller-supplied analyzer
    pub fn with_analyzer(config: ServerConfig, analyzer: Analyzer) -> Result<Self> {
        let db = Self::prepare(&config)?;
        let ctx = JobContext::with_analyzer(db, config.clone(), analyzer);
        let runner = JobRunner::new(ctx, config.workers)?;
        Ok(Self { config, runner })
    }

    fn prepare(config: &ServerConfig) -> Result<Database> {
        config.ensure_dirs()?;
        let db = Database::open_at(&config.db_path)?;
        let interrupted = db.fail_interrupted()?;
        if interrupted > 0 {
            warn!(count = interrupted, "marked unfinished analyses from a previous run as failed");
        }
        Ok(db)
    }

    fn db(&self) -> &Database {
        &self.runner.context().db
    }
}

/// Bind, optionally open a browser, and serve forever
pub fn start(config: ServerConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let server = Server::http(&addr)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    let state = AppState::new(config.clone())?;
    let url = format!("http://{}:{}", display_host(&config.host), config.port);

    eprintln!("\n\x1b[1;32mmisra-audit\x1b[0m");
    eprintln!("   {}", url);
    eprintln!("   Data: {}\n", config.data_dir.display());
    info!(
        %addr,
        tools = ?state.runner.context().analyzer.tool_names(),
        workers = config.workers,
        "server listening"
    );

    if config.open_browser {
        if let Err(e) = open::that(&url) {
            warn!(error = %e, "could not open browser");
        }
    }

    serve(&server, &state);
    Ok(())
}

fn display_host(host: &str) -> &str {
    match host {
        "0.0.0.0" | "127.0.0.1" | "::" => "localhost",
        other => other,
    }
}

/// Accept loop
pub fn serve(server: &Server, state: &AppState) {
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, state) {
            warn!(error = %e, "failed to send response");
        }
    }
}

fn handle_request(mut request: Request, state: &AppState) -> io::Result<()> {
    let started = Instant::now();
    let url = request.url().to_string();
    let (path, query) = split_url(&url);
    let method = request.method().clone();
    let origin = header_value(&request, "Origin");

    let reply = match route(&method, path) {
        Route::Ui => Reply::html(UI_HTML.as_bytes().to_vec()),
        Route::ApiRoot => Reply::json(200, &ApiInfo { message: API_MESSAGE, version: API_VERSION }),
        Route::Upload => handle_upload(&mut request, state).unwrap_or_else(|e| Reply::from_error(&e)),
        Route::Analysis(id) => get_analysis(state, id).unwrap_or_else(|e| Reply::from_error(&e)),
        Route::Report(id) => get_report(state, id).unwrap_or_else(|e| Reply::from_error(&e)),
        Route::List => list_analyses(state, query).unwrap_or_else(|e| Reply::from_error(&e)),
        Route::Preflight => preflight(&request),
        Route::NotFound => Reply::detail(404, "Not Found"),
    };

    debug!(
        method = %method,
        path,
        status = reply.status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );

    let allow_origin = state.config.allowed_origin(origin.as_deref());
    request.respond(reply.into_response(allow_origin))
}

fn preflight(request: &Request) -> Reply {
    let allow_headers = header_value(request, "Access-Control-Request-Headers")
        .unwrap_or_else(|| "Content-Type".to_string());
    Reply::empty(204)
        .with_header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .with_header("Access-Control-Allow-Headers", allow_headers)
        .with_header("Access-Control-Max-Age", "600")
}

// ============================================================================
// Handlers
// ============================================================================

fn handle_upload(request: &mut Request, state: &AppState) -> Result<Reply> {
    let limit = state.config.max_upload_bytes;
    if request.body_length().map_or(false, |len| len as u64 > limit) {
        return Ok(too_large(limit));
    }

    let content_type = header_value(request, "Content-Type").unwrap_or_default();
    let boundary = match boundary_from_content_type(&content_type) {
        Some(b) => b.to_string(),
        None => return Ok(Reply::detail(400, "Expected a multipart/form-data upload")),
    };

    let mut multipart = multipart::server::Multipart::with_body(request.as_reader(), boundary);
    loop {
        let mut field = match multipart.read_entry() {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(Reply::detail(400, "No file uploaded")),
            Err(e) => {
                debug!(error = %e, "malformed multipart body");
                return Ok(Reply::detail(400, "Malformed multipart body"));
            }
        };
        if &*field.headers.name != "file" {
            continue;
        }

        let filename = match field.headers.filename.as_deref() {
            Some(name) if !name.trim().is_empty() => sanitize_filename(name),
            _ => return Ok(Reply::detail(400, "No file uploaded")),
        };
        if !is_zip_filename(&filename) {
            return Ok(Reply::detail(400, "Only ZIP files are accepted"));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let dir = state.config.upload_dir().join(&id);
        fs::create_dir_all(&dir)?;
        let dest = dir.join(&filename);

        let written = match store_upload(&mut field.data, &dest, limit) {
            Ok(written) => written,
            Err(e) => {
                discard(&dir);
                return Err(e);
            }
        };
        if written > limit {
            discard(&dir);
            return Ok(too_large(limit));
        }
        match file_looks_like_zip(&dest) {
            Ok(true) => {}
            Ok(false) => {
                discard(&dir);
                return Ok(Reply::detail(400, "Only ZIP files are accepted"));
            }
            Err(e) => {
                discard(&dir);
                return Err(e);
            }
        }

        register_upload(state.db(), &id, &filename, &dir)?;
        info!(id = %id, filename = %filename, bytes = written, "upload accepted");
        state.runner.submit(id.clone(), dest, filename);

        return Ok(Reply::json(
            200,
            &UploadResponse {
                message: format!("File uploaded successfully. Analysis started with ID: {}", id),
                analysis_id: id,
                status: AnalysisStatus::Pending,
            },
        ));
    }
}

/// Copy at most `limit + 1` bytes, so the caller can tell an oversized body
fn store_upload<R: Read>(data: &mut R, dest: &Path, limit: u64) -> Result<u64> {
    let mut file = File::create(dest)?;
    Ok(io::copy(&mut data.take(limit + 1), &mut file)?)
}

/// Record a stored upload as `pending`. A file without a record would never
/// be processed or cleaned up, so it is removed when the insert fails.
fn register_upload(db: &Database, id: &str, filename: &str, dir: &Path) -> Result<()> {
    if let Err(e) = db.create_analysis(id, filename) {
        discard(dir);
        return Err(e);
    }
    Ok(())
}

fn too_large(limit: u64) -> Reply {
    Reply::detail(413, &format!("File too large (limit is {} MB)", limit / (1024 * 1024)))
}

fn file_looks_like_zip(path: &Path) -> Result<bool> {
    let mut head = Vec::with_capacity(4);
    File::open(path)?.take(4).read_to_end(&mut head)?;
    Ok(archive::looks_like_zip(&head))
}

fn discard(dir: &Path) {
    if let Err(e) = fs::remove_dir_all(dir) {
        warn!(dir = %dir.display(), error = %e, "could not remove rejected upload");
    }
}

fn get_analysis(state: &AppState, id: &str) -> Result<Reply> {
    match state.db().get_analysis(id)? {
        Some(record) => Ok(Reply::json(200, &record)),
        None => Ok(Reply::detail(404, "Analysis not found")),
    }
}

fn get_report(state: &AppState, id: &str) -> Result<Reply> {
    let record = match state.db().get_analysis(id)? {
        Some(r) => r,
        None => return Ok(Reply::detail(404, "Analysis not found")),
    };
    if record.status != AnalysisStatus::Completed {
        return Ok(Reply::detail(400, &format!("Analysis is {}", record.status)));
    }

    let body = match record.report_path.as_deref().map(fs::read) {
        Some(Ok(body)) => body,
        Some(Err(e)) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
        _ => return Ok(Reply::detail(404, "Report file not found")),
    };

    Ok(Reply::html(body).with_header(
        "Content-Disposition",
        format!("attachment; filename=\"{}\"", crate::report::report_file_name(id)),
    ))
}

fn list_analyses(state: &AppState, query: &str) -> Result<Reply> {
    let params = match serde_urlencoded::from_str::<ListParams>(query) {
        Ok(p) => p,
        Err(_) => return Ok(Reply::detail(400, "limit must be an integer")),
    };
    let records = state.db().list_recent(clamp_limit(params.limit))?;
    Ok(Reply::json(200, &records))
}
