//! Rendering of command reports as human-readable lines or JSON.
//!
//! Positions are one-based. JSON output is pretty-printed and always ends with
//! a newline.

mod models;
mod render;

use std::io::Write;

pub(crate) use models::{
    BracketItem, BracketsReport, CheckReport, CheckedFile, FeatureItems, HighlightItem, IndentItem,
    InjectionItem, Position, Report, RunReport, Span, TextObjectItem,
};

use crate::cli::ResolvedOutputFormat;
use crate::errors::AppError;

/// Writes `report` to `out` in the requested format.
pub(crate) fn write_report(
    report: &Report,
    format: ResolvedOutputFormat,
    out: &mut impl Write,
) -> Result<(), AppError> {
    match format {
        ResolvedOutputFormat::Human => render::render(report, out).map_err(AppError::Write),
        ResolvedOutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report).map_err(AppError::Serialise)?;
            writeln!(out).map_err(AppError::Write)
        }
    }
}
