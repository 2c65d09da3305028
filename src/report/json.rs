//! JSON report output

use crate::analyzer::AnalysisOutput;
use std::io::{self, Write};

pub fn write<W: Write>(writer: &mut W, output: &AnalysisOutput) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, output)?;
    writeln!(writer)
}
