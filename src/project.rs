//! Project files: a JSON snapshot of a whole session.
//!
//! Files are written next to their destination and renamed into place, so a
//! crash mid-save leaves the previous snapshot intact.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use crate::cursor::Direction;
use crate::entry_policy::EntryPolicy;
use crate::error::{Error, Result};
use crate::line::{MeasurementKey, Side};
use crate::profile::{Profile, Row};
use crate::session::{Session, PROJECT_EXTENSION};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub row: usize,
    pub position: usize,
    pub side: Side,
    pub value: f64,
}

impl MeasurementRecord {
    fn key(&self) -> MeasurementKey {
        MeasurementKey::new(self.row, self.position, self.side)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub version: u32,
    pub identification: String,
    #[serde(default)]
    pub profile_source: Option<PathBuf>,
    pub rows: Vec<Row>,
    pub measurements: Vec<MeasurementRecord>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Local>>,
}

impl ProjectFile {
    pub fn from_session(session: &Session) -> Self {
        let measurements = session
            .ledger()
            .measured()
            .map(|(key, value)| MeasurementRecord {
                row: key.line.row,
                position: key.line.position,
                side: key.side,
                value,
            })
            .collect();

        Self {
            version: FORMAT_VERSION,
            identification: session.identification().to_string(),
            profile_source: session.profile().source().map(Path::to_path_buf),
            rows: session.profile().rows().to_vec(),
            measurements,
            saved_at: Some(Local::now()),
        }
    }

    /// Validate and turn the snapshot back into a live session.
    pub fn into_session(self, policy: EntryPolicy, direction: Direction) -> Result<Session> {
        if self.version != FORMAT_VERSION {
            return Err(Error::project(format!(
                "unsupported format version {}",
                self.version
            )));
        }

        let profile = if self.rows.is_empty() {
            Profile::default()
        } else {
            Profile::from_rows(self.rows, self.profile_source)?
        };

        if let Some(bad) = self
            .measurements
            .iter()
            .find(|m| !profile.contains(m.key().line) || !m.value.is_finite())
        {
            return Err(Error::project(format!(
                "measurement for row {} position {} does not match the saved table",
                bad.row,
                bad.position + 1
            )));
        }

        let measurements = self.measurements.iter().map(|m| (m.key(), m.value));
        Ok(Session::restore(
            profile,
            measurements,
            self.identification,
            policy,
            direction,
        ))
    }
}

/// Write `session` to `path`, replacing any previous file atomically.
pub fn save(session: &Session, path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| Error::io(&parent, e))?;

    let snapshot = ProjectFile::from_session(session);
    let data = serde_json::to_vec_pretty(&snapshot)?;

    let mut tmp = NamedTempFile::new_in(&parent).map_err(|e| Error::io(&parent, e))?;
    tmp.write_all(&data).map_err(|e| Error::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| Error::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|source| Error::Persist {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        path = %path.display(),
        measured = snapshot.measurements.len(),
        "project saved"
    );
    Ok(())
}

/// Read a project file. The returned session remembers `path` for later
/// saves.
pub fn load(path: &Path, policy: EntryPolicy, direction: Direction) -> Result<Session> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    let snapshot: ProjectFile = serde_json::from_slice(&bytes)?;
    let mut session = snapshot.into_session(policy, direction)?;
    session.set_project_path(Some(path.to_path_buf()));
    info!(
        path = %path.display(),
        measured = session.ledger().measured_count(),
        "project opened"
    );
    Ok(session)
}

/// "2024-05-01-Alpha_4_M.ltf"
pub fn default_file_name(session: &Session, date: NaiveDate) -> String {
    format!(
        "{}-{}.{}",
        date.format("%Y-%m-%d"),
        session.slug(),
        PROJECT_EXTENSION
    )
}

/// Append the project extension when the user left it out.
pub fn with_extension(path: PathBuf) -> PathBuf {
    if path.extension().is_some_and(|e| e == PROJECT_EXTENSION) {
        path
    } else {
        let mut name = path.into_os_string();
        name.push(".");
        name.push(PROJECT_EXTENSION);
        PathBuf::from(name)
    }
}
