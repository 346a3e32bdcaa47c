//! Human-readable rendering of command reports.

use std::io::{self, Write};

use super::models::{
    BracketItem, BracketsReport, CheckReport, FeatureItems, Position, Report, RunReport, Span,
};

/// Longest snippet shown before the text is elided.
const SNIPPET_LIMIT: usize = 40;

pub(crate) fn render(report: &Report, out: &mut impl Write) -> io::Result<()> {
    match report {
        Report::Check(check) => render_check(check, out),
        Report::Run(run) => render_run(run, out),
        Report::Brackets(brackets) => render_brackets(brackets, out),
    }
}

fn render_check(report: &CheckReport, out: &mut impl Write) -> io::Result<()> {
    for file in &report.files {
        let status = if file.ok { "ok" } else { "failed" };
        writeln!(
            out,
            "{}: {status} ({} of {} rules usable)",
            file.path, file.usable, file.declared
        )?;
        for diagnostic in &file.diagnostics {
            writeln!(out, "  {diagnostic}")?;
            for note in diagnostic.notes() {
                writeln!(out, "    note: {note}")?;
            }
        }
    }
    Ok(())
}

fn render_run(report: &RunReport, out: &mut impl Write) -> io::Result<()> {
    let path = &report.path;
    match &report.items {
        FeatureItems::Highlights(items) => {
            for item in items {
                writeln!(
                    out,
                    "{path}:{} {} {}",
                    range(&item.span),
                    item.tag,
                    snippet(&item.span.text)
                )?;
            }
        }
        FeatureItems::Indents(items) => {
            for item in items {
                writeln!(
                    out,
                    "{path}:{} {} depth {} @{}",
                    point(item.at),
                    item.direction,
                    item.depth,
                    item.capture
                )?;
            }
        }
        FeatureItems::Injections(items) => {
            for item in items {
                let indent = "  ".repeat(item.depth.saturating_sub(1));
                writeln!(
                    out,
                    "{indent}{path}:{} {} ({}) {}",
                    range(&item.span),
                    item.language,
                    item.state,
                    snippet(&item.span.text)
                )?;
            }
        }
        FeatureItems::Brackets(items) => render_pairs(path.as_str(), items, out)?,
        FeatureItems::TextObjects(items) => {
            for item in items {
                writeln!(
                    out,
                    "{path}:{} {}.{} {}",
                    range(&item.span),
                    item.object,
                    item.variant,
                    snippet(&item.span.text)
                )?;
            }
        }
    }
    for warning in &report.warnings {
        writeln!(out, "warning: {warning}")?;
    }
    Ok(())
}

fn render_brackets(report: &BracketsReport, out: &mut impl Write) -> io::Result<()> {
    let path = report.path.as_str();
    render_pairs(path, &report.pairs, out)?;
    for span in &report.unmatched {
        writeln!(out, "{path}:{} unmatched {}", point(span.from), span.text)?;
    }
    Ok(())
}

fn render_pairs(path: &str, pairs: &[BracketItem], out: &mut impl Write) -> io::Result<()> {
    for pair in pairs {
        writeln!(
            out,
            "{path}:{} {} .. {} {}",
            point(pair.open.from),
            pair.open.text,
            point(pair.close.from),
            pair.close.text
        )?;
    }
    Ok(())
}

fn point(position: Position) -> String {
    format!("{}:{}", position.line, position.column)
}

fn range(span: &Span) -> String {
    format!("{}-{}", point(span.from), point(span.to))
}

fn snippet(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    let mut shown: String = first_line.chars().take(SNIPPET_LIMIT).collect();
    if shown.len() < text.len() {
        shown.push_str("...");
    }
    format!("`{shown}`")
}
