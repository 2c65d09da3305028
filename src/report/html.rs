//! HTML compliance report
//!
//! A single self-contained file: inline CSS, a few lines of inline script
//! for the severity filter, no external resources. Every piece of text that
//! came from a tool or an upload goes through [`html_escape`].

use crate::analyzer::{AnalysisOutput, Violation};
use crate::rules::Severity;
use std::collections::BTreeMap;
use std::io::{self, Write};

pub const REPORT_TITLE: &str = "MISRA C:2012 Compliance Report";

pub fn write<W: Write>(writer: &mut W, output: &AnalysisOutput, project_name: &str) -> io::Result<()> {
    let summary = &output.summary;
    let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

    // Group by file; violations are already sorted by (file, line)
    let mut by_file: BTreeMap<&str, Vec<&Violation>> = BTreeMap::new();
    for v in &output.violations {
        by_file.entry(v.file.as_str()).or_default().push(v);
    }

    write!(writer, r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - {project}</title>
    <style>
        :root {{
            --bg: #0d1117;
            --card: #161b22;
            --border: #30363d;
            --text: #e6edf3;
            --dim: #7d8590;
            --mandatory: #f85149;
            --required: #d29922;
            --advisory: #58a6ff;
            --ok: #3fb950;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
            background: var(--bg);
            color: var(--text);
            line-height: 1.5;
        }}
        .container {{ max-width: 1400px; margin: 0 auto; padding: 2rem; }}

        /* Header */
        .header {{
            margin-bottom: 2rem;
            padding-bottom: 1rem;
            border-bottom: 1px solid var(--border);
        }}
        .title {{ font-size: 2rem; font-weight: 800; }}
        .subtitle {{ color: var(--dim); font-size: 0.95rem; }}
        .subtitle code {{ color: var(--text); }}

        /* Stats Row */
        .stats {{
            display: grid;
            grid-template-columns: repeat(5, 1fr);
            gap: 1rem;
            margin-bottom: 2rem;
        }}
        .stat {{
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 12px;
            padding: 1.25rem;
            text-align: center;
        }}
        .stat-value {{ font-size: 2.5rem; font-weight: 700; line-height: 1; }}
        .stat-label {{ color: var(--dim); font-size: 0.8rem; text-transform: uppercase; letter-spacing: 0.05em; margin-top: 0.5rem; }}
        .stat.required .stat-value {{ color: var(--required); }}
        .stat.advisory .stat-value {{ color: var(--advisory); }}
        .stat.clean .stat-value {{ color: var(--ok); }}

        /* Cards and tables */
        .card {{
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 12px;
            margin-bottom: 2rem;
            overflow: hidden;
        }}
        .card-title {{
            font-size: 1rem;
            font-weight: 600;
            padding: 1rem 1.25rem;
            border-bottom: 1px solid var(--border);
            font-family: 'SF Mono', 'Fira Code', monospace;
        }}
        table {{ width: 100%; border-collapse: collapse; }}
        th, td {{ padding: 0.6rem 1rem; text-align: left; vertical-align: top; }}
        th {{
            background: rgba(255,255,255,0.03);
            font-weight: 600;
            font-size: 0.75rem;
            text-transform: uppercase;
            letter-spacing: 0.05em;
            color: var(--dim);
            border-bottom: 1px solid var(--border);
        }}
        td {{ border-bottom: 1px solid var(--border); font-size: 0.875rem; }}
        tr:last-child td {{ border-bottom: none; }}
        td.num {{ text-align: right; font-variant-numeric: tabular-nums; }}
        .mono {{ font-family: 'SF Mono', 'Fira Code', monospace; }}
        .dim {{ color: var(--dim); }}

        .severity {{
            display: inline-block;
            padding: 0.1rem 0.6rem;
            border-radius: 20px;
            font-size: 0.7rem;
            font-weight: 600;
            text-transform: uppercase;
        }}
        .severity.mandatory {{ background: rgba(248,81,73,0.15); color: var(--mandatory); }}
        .severity.required {{ background: rgba(210,153,34,0.15); color: var(--required); }}
        .severity.advisory {{ background: rgba(88,166,255,0.15); color: var(--advisory); }}

        /* Filter */
        .filters {{ display: flex; gap: 0.5rem; margin-bottom: 1rem; }}
        .filters button {{
            background: var(--card);
            color: var(--text);
            border: 1px solid var(--border);
            border-radius: 6px;
            padding: 0.35rem 0.9rem;
            cursor: pointer;
        }}
        .filters button.active {{ border-color: var(--advisory); color: var(--advisory); }}

        .empty {{ padding: 2rem; text-align: center; color: var(--ok); }}
        .footer {{ color: var(--dim); font-size: 0.8rem; text-align: center; margin-top: 2rem; }}
    </style>
</head>
<body>
<div class="container">
    <div class="header">
        <div class="title">{title}</div>
        <div class="subtitle">Project <code>{project}</code> &middot; generated {generated}</div>
    </div>

    <div class="stats">
        <div class="stat"><div class="stat-value">{files}</div><div class="stat-label">Files analyzed</div></div>
        <div class="stat"><div class="stat-value">{lines}</div><div class="stat-label">Lines analyzed</div></div>
        <div class="stat{total_class}"><div class="stat-value">{total}</div><div class="stat-label">Violations</div></div>
        <div class="stat required"><div class="stat-value">{required}</div><div class="stat-label">Required</div></div>
        <div class="stat advisory"><div class="stat-value">{advisory}</div><div class="stat-label">Advisory</div></div>
    </div>
"#,
        title = REPORT_TITLE,
        project = html_escape(project_name),
        generated = generated,
        files = summary.files_analyzed,
        lines = summary.lines_analyzed,
        total = summary.total_violations,
        total_class = if summary.total_violations == 0 { " clean" } else { "" },
        required = summary.severity_counts.required + summary.severity_counts.mandatory,
        advisory = summary.severity_counts.advisory,
    )?;

    if by_file.is_empty() {
        writeln!(writer, r#"    <div class="card"><div class="empty">No violations found.</div></div>"#)?;
    } else {
        write_file_table(writer, output)?;
        write_filters(writer)?;
        // Same keys and order as `summary.file_stats`, so indexes line up with the table
        for (index, (file, violations)) in by_file.iter().enumerate() {
            write_file_section(writer, index, file, violations)?;
        }
    }

    write!(writer, r#"
    <div class="footer">Findings are produced by external analyzers and mapped onto MISRA C:2012 rule identifiers.</div>
</div>
<script>
    document.querySelectorAll('.filters button').forEach(btn => {{
        btn.addEventListener('click', () => {{
            const wanted = btn.dataset.filter;
            document.querySelectorAll('.filters button').forEach(b => b.classList.toggle('active', b === btn));
            document.querySelectorAll('tr[data-severity]').forEach(row => {{
                row.style.display = (wanted === 'all' || row.dataset.severity === wanted) ? '' : 'none';
            }});
        }});
    }});
</script>
</body>
</html>
"#)
}

fn write_file_table<W: Write>(writer: &mut W, output: &AnalysisOutput) -> io::Result<()> {
    writeln!(writer, r#"    <div class="card">
        <div class="card-title">Files</div>
        <table>
            <thead><tr><th>File</th><th>Messages</th><th>Error</th><th>Warning</th><th>Info</th><th>Note</th><th>Mandatory</th><th>Required</th><th>Advisory</th></tr></thead>
            <tbody>"#)?;

    for (index, (file, s)) in output.summary.file_stats.iter().enumerate() {
        writeln!(
            writer,
            r##"                <tr><td class="mono"><a href="#{anchor}" style="color: inherit">{file}</a></td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td></tr>"##,
            s.messages,
            s.error,
            s.warning,
            s.info,
            s.note,
            s.mandatory,
            s.required,
            s.advisory,
            anchor = anchor_for(index, file),
            file = html_escape(file),
        )?;
    }

    writeln!(writer, "            </tbody>\n        </table>\n    </div>")
}

fn write_filters<W: Write>(writer: &mut W) -> io::Result<()> {
    writeln!(writer, r#"    <div class="filters">
        <button class="active" data-filter="all">All</button>
        <button data-filter="mandatory">Mandatory</button>
        <button data-filter="required">Required</button>
        <button data-filter="advisory">Advisory</button>
    </div>"#)
}

fn write_file_section<W: Write>(
    writer: &mut W,
    index: usize,
    file: &str,
    violations: &[&Violation],
) -> io::Result<()> {
    writeln!(
        writer,
        r#"    <div class="card" id="{anchor}">
        <div class="card-title">{file} <span class="dim">({count})</span></div>
        <table>
            <thead><tr><th>Line</th><th>Severity</th><th>Rule</th><th>Message</th><th>Description</th><th>Solution</th><th>Tool</th></tr></thead>
            <tbody>"#,
        anchor = anchor_for(index, file),
        file = html_escape(file),
        count = violations.len(),
    )?;

    for v in violations {
        let class = severity_class(v.severity);
        writeln!(
            writer,
            r#"                <tr data-severity="{class}"><td class="num mono">{line}</td><td><span class="severity {class}">{severity}</span></td><td class="mono">{rule}</td><td>{message}</td><td class="dim">{description}</td><td>{solution}</td><td class="dim">{tool} <span class="mono">({raw})</span></td></tr>"#,
            class = class,
            line = v.line,
            severity = v.severity,
            rule = html_escape(&v.rule),
            message = html_escape(&v.message),
            description = html_escape(&v.description),
            solution = html_escape(&v.solution),
            tool = html_escape(&v.tool),
            raw = html_escape(&v.tool_severity),
        )?;
    }

    writeln!(writer, "            </tbody>\n        </table>\n    </div>")
}

fn severity_class(severity: Severity) -> &'static str {
    match severity {
        Severity::Mandatory => "mandatory",
        Severity::Required => "required",
        Severity::Advisory => "advisory",
    }
}

/// Element id for a file section. The slug alone is not unique
/// (`a-b.c` and `a/b.c` share one), the index makes it so.
fn anchor_for(index: usize, file: &str) -> String {
    let slug: String = file
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    format!("file-{}-{}", index, slug)
}

pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
