//! Theoretical line length tables.
//!
//! A table is plain text: a line starting with `*` opens a row whose name is
//! the rest of the line, and every following non-blank line is the length in
//! millimetres of the next position in that row.
//!
//! ```text
//! *A
//! 7312
//! 7268
//! *B
//! 7205
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, ProfileError, Result};
use crate::line::{LineId, MeasurementKey, Side};

const ROW_MARKER: char = '*';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub name: String,
    pub lengths: Vec<f64>,
}

impl Row {
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}

/// Read-only set of line definitions, in row order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    rows: Vec<Row>,
    source: Option<PathBuf>,
}

impl Profile {
    /// Build a profile from already validated rows (used when restoring a
    /// project file).
    pub fn from_rows(
        rows: Vec<Row>,
        source: Option<PathBuf>,
    ) -> std::result::Result<Self, ProfileError> {
        if rows.is_empty() {
            return Err(ProfileError::NoRows);
        }
        for row in &rows {
            if row.is_empty() {
                return Err(ProfileError::EmptyRow {
                    name: row.name.clone(),
                });
            }
            if let Some(&value) = row.lengths.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
                return Err(ProfileError::NonPositiveLength { line: 0, value });
            }
        }
        Ok(Self { rows, source })
    }

    pub fn parse(content: &str) -> std::result::Result<Self, ProfileError> {
        let mut rows: Vec<Row> = Vec::new();

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            if raw.starts_with(ROW_MARKER) {
                let name = raw.trim_start_matches(ROW_MARKER).trim().to_string();
                if let Some(prev) = rows.last() {
                    if prev.is_empty() {
                        return Err(ProfileError::EmptyRow {
                            name: prev.name.clone(),
                        });
                    }
                }
                rows.push(Row {
                    name,
                    lengths: Vec::new(),
                });
                continue;
            }

            let text = raw.trim();
            if text.is_empty() {
                continue;
            }

            let value: f64 = text.parse().map_err(|_| ProfileError::InvalidLength {
                line: line_no,
                text: text.to_string(),
            })?;
            if !(value.is_finite() && value > 0.0) {
                return Err(ProfileError::NonPositiveLength {
                    line: line_no,
                    value,
                });
            }

            match rows.last_mut() {
                Some(row) => row.lengths.push(value),
                None => return Err(ProfileError::LengthOutsideRow { line: line_no }),
            }
        }

        Self::from_rows(rows, None)
    }

    /// Read and parse a table from disk. Nothing is returned unless the whole
    /// file parses, so callers can swap profiles atomically.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut profile = Self::parse(&content)?;
        profile.source = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            rows = profile.rows.len(),
            lines = profile.line_count(),
            "loaded line length table"
        );
        debug!(rows = ?profile.row_names(), "row layout");
        Ok(profile)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, row: usize) -> Option<&Row> {
        self.rows.get(row)
    }

    pub fn row_names(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row_len(&self, row: usize) -> usize {
        self.rows.get(row).map_or(0, Row::len)
    }

    /// Longest row, which sets the width of the diagram.
    pub fn max_positions(&self) -> usize {
        self.rows.iter().map(Row::len).max().unwrap_or(0)
    }

    pub fn line_count(&self) -> usize {
        self.rows.iter().map(Row::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn theoretical(&self, line: LineId) -> Option<f64> {
        self.rows
            .get(line.row)
            .and_then(|r| r.lengths.get(line.position))
            .copied()
    }

    pub fn contains(&self, line: LineId) -> bool {
        self.theoretical(line).is_some()
    }

    pub fn lines(&self) -> impl Iterator<Item = LineId> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(r, row)| (0..row.len()).map(move |p| LineId::new(r, p)))
    }

    /// Every measurement key in profile order, Left before Right.
    pub fn keys(&self) -> impl Iterator<Item = MeasurementKey> + '_ {
        self.lines()
            .flat_map(|line| Side::ALL.into_iter().map(move |side| line.on(side)))
    }

    /// Label such as "A03": row name with spaces replaced, 1-based position.
    pub fn label(&self, line: LineId) -> String {
        let name = self
            .rows
            .get(line.row)
            .map(|r| r.name.replace(' ', "_"))
            .unwrap_or_else(|| "?".to_string());
        format!("{}{:02}", name, line.position + 1)
    }

    pub fn key_label(&self, key: MeasurementKey) -> String {
        format!("{}-{}", self.label(key.line), key.side.initial())
    }

    /// File stem of the source table, used to name autosaves.
    pub fn stem(&self) -> Option<String> {
        self.source
            .as_ref()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
    }
}
