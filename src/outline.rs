//! Planform outline of the wing, drawn behind the line diagram.
//!
//! The outline is a table of chord stations `x y_leading y_trailing` in
//! canvas units (1600 x 900). A copy ships inside the binary; a config entry
//! can point at another file. The diagram cannot be drawn without it, so a
//! broken outline is a startup error.

use std::fs;
use std::path::Path;

use include_dir::{include_dir, Dir};

use crate::error::{Error, Result};
use crate::profile::Profile;

static RESOURCES: Dir = include_dir!("resources");

const BUNDLED_OUTLINE: &str = "outline.txt";
const TABLES_DIR: &str = "tables";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Station {
    pub x: f64,
    pub leading: f64,
    pub trailing: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    stations: Vec<Station>,
}

impl Outline {
    pub fn parse(content: &str) -> Result<Self> {
        let mut stations = Vec::new();
        for (idx, raw) in content.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let values = line
                .split_whitespace()
                .map(str::parse::<f64>)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::outline(idx + 1, e.to_string()))?;
            match values.as_slice() {
                [x, leading, trailing] if values.iter().all(|v| v.is_finite()) => {
                    stations.push(Station {
                        x: *x,
                        leading: *leading,
                        trailing: *trailing,
                    })
                }
                _ => {
                    return Err(Error::outline(
                        idx + 1,
                        format!("expected 3 finite columns, found {}", values.len()),
                    ))
                }
            }
        }
        if stations.len() < 2 {
            return Err(Error::outline(0, "at least two stations are required"));
        }
        Ok(Self { stations })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&content)
    }

    pub fn bundled() -> Result<Self> {
        let content = RESOURCES
            .get_file(BUNDLED_OUTLINE)
            .and_then(|f| f.contents_utf8())
            .ok_or_else(|| Error::outline(0, "bundled outline is missing"))?;
        Self::parse(content)
    }

    /// The configured outline, or the bundled one when none is configured.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Self::bundled(),
        }
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// Closed polygon: leading edge left to right, trailing edge back.
    pub fn polygon(&self) -> Vec<(f64, f64)> {
        let mut points: Vec<(f64, f64)> =
            self.stations.iter().map(|s| (s.x, s.leading)).collect();
        points.extend(self.stations.iter().rev().map(|s| (s.x, s.trailing)));
        if let Some(first) = points.first().copied() {
            points.push(first);
        }
        points
    }
}

/// Parse one of the bundled line tables by name.
pub fn bundled_table(name: &str) -> Result<Profile> {
    let path = format!("{TABLES_DIR}/{name}.txt");
    let content = RESOURCES
        .get_file(&path)
        .and_then(|f| f.contents_utf8())
        .ok_or_else(|| Error::io(&path, std::io::ErrorKind::NotFound.into()))?;
    Ok(Profile::parse(content)?)
}
