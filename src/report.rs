//! CSV trimming report.
//!
//! One record per line and side in table order, followed by a short summary
//! block. Values come straight from the session's deviation report so the
//! file always matches what the diagram shows.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::session::Session;

pub const REPORT_EXTENSION: &str = "csv";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRecord {
    pub row: String,
    pub position: usize,
    pub side: String,
    pub theoretical_mm: f64,
    pub measured_mm: Option<f64>,
    pub deviation_mm: Option<f64>,
}

/// Records in table order, Left before Right. Unmeasured lines carry empty
/// measured/deviation cells.
pub fn records(session: &Session) -> Vec<ReportRecord> {
    let profile = session.profile();
    let report = session.report();
    profile
        .keys()
        .filter_map(|key| {
            let theoretical = profile.theoretical(key.line)?;
            let row = profile.row(key.line.row)?;
            Some(ReportRecord {
                row: row.name.clone(),
                position: key.line.position + 1,
                side: key.side.to_string(),
                theoretical_mm: theoretical,
                measured_mm: session.ledger().get(key),
                deviation_mm: report.get(key).map(round_tenth),
            })
        })
        .collect()
}

pub fn write_report<W: Write>(session: &Session, date: NaiveDate, out: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(out);
    for record in records(session) {
        writer.serialize(record)?;
    }

    let report = session.report();
    let date = date.format("%Y-%m-%d").to_string();
    let offset = format!("{:.1}", report.offset);
    let measured = format!("{}/{}", report.measured(), report.total());

    writer.write_record([""])?;
    writer.write_record(["identification", session.identification()])?;
    writer.write_record(["date", date.as_str()])?;
    writer.write_record(["offset_mm", offset.as_str()])?;
    writer.write_record(["measured", measured.as_str()])?;
    if let Some(spread) = report.spread() {
        let spread = format!("{spread:.1}");
        writer.write_record(["spread_mm", spread.as_str()])?;
    }
    writer.flush().map_err(|e| Error::io("<report>", e))?;
    Ok(())
}

/// Write the report to `path`, creating parent directories.
pub fn export(session: &Session, date: NaiveDate, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let file = fs::File::create(path).map_err(|e| Error::io(path, e))?;
    write_report(session, date, file)?;
    info!(path = %path.display(), "report exported");
    Ok(())
}

/// "2024-05-01-Alpha_4_M.csv"
pub fn default_file_name(session: &Session, date: NaiveDate) -> String {
    format!(
        "{}-{}.{}",
        date.format("%Y-%m-%d"),
        session.slug(),
        REPORT_EXTENSION
    )
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
