//! Report generation for analysis results
//!
//! - **HTML**: self-contained compliance report (the only format the server
//!   produces)
//! - **JSON**: the raw [`AnalysisOutput`], for scripting from the CLI
//!
//! # Usage
//!
//! ```ignore
//! use misra_audit::report;
//!
//! // Picks the format from the extension
//! report::generate("report.html", &output, "firmware.zip")?;
//! report::generate("report.json", &output, "firmware.zip")?;
//! ```

pub mod html;
pub mod json;

use crate::analyzer::AnalysisOutput;
use crate::error::{Error, Result};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write a report to `path`, choosing the format from its extension
pub fn generate<P: AsRef<Path>>(path: P, output: &AnalysisOutput, project_name: &str) -> Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let write = || -> std::io::Result<()> {
        let mut file = BufWriter::new(std::fs::File::create(path)?);
        match ext.as_str() {
            "json" => json::write(&mut file, output)?,
            _ => html::write(&mut file, output, project_name)?,
        }
        file.flush()
    };

    write().map_err(|source| Error::Report {
        path: path.to_path_buf(),
        source,
    })
}

/// Report file name used by the server for one analysis
pub fn report_file_name(analysis_id: &str) -> String {
    format!("misra_report_{}.html", analysis_id)
}
