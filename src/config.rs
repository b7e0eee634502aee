use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::cursor::Direction;
use crate::entry_policy::EntryPolicy;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub direction: Direction,
    pub sound: bool,
    /// Largest accepted |reading - theoretical|, exclusive.
    pub tolerance_mm: f64,
    /// Readings below this are treated as a cancel gesture.
    pub cancel_below_mm: f64,
    /// Readings below this are taken as metres.
    pub meters_below: f64,
    /// Deviation that maps to the end of the colour scale.
    pub colour_range_mm: f64,
    /// Planform outline drawn behind the diagram; bundled one when unset.
    pub outline_path: Option<PathBuf>,
    pub autosave: bool,
}

impl Default for Config {
    fn default() -> Self {
        let policy = EntryPolicy::default();
        Self {
            direction: Direction::default(),
            sound: true,
            tolerance_mm: policy.tolerance_mm,
            cancel_below_mm: policy.cancel_below_mm,
            meters_below: policy.meters_below,
            colour_range_mm: 24.0,
            outline_path: None,
            autosave: true,
        }
    }
}

impl Config {
    pub fn entry_policy(&self) -> EntryPolicy {
        EntryPolicy {
            tolerance_mm: self.tolerance_mm,
            cancel_below_mm: self.cancel_below_mm,
            meters_below: self.meters_below,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("tolerance_mm", self.tolerance_mm),
            ("cancel_below_mm", self.cancel_below_mm),
            ("colour_range_mm", self.colour_range_mm),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::config(format!("{name} must be positive, got {value}")));
            }
        }
        if !(self.meters_below.is_finite() && self.meters_below >= 0.0) {
            return Err(Error::config(format!(
                "meters_below must not be negative, got {}",
                self.meters_below
            )));
        }
        Ok(())
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("linetrim_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing, unreadable or invalid files fall back to defaults.
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) if cfg.validate().is_ok() => cfg,
            Ok(_) | Err(_) => {
                tracing::warn!(path = %self.path.display(), "ignoring invalid config file");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data).map_err(|e| Error::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            direction: Direction::LeadingToTrailing,
            sound: false,
            tolerance_mm: 500.0,
            cancel_below_mm: 800.0,
            meters_below: 20.0,
            colour_range_mm: 15.0,
            outline_path: Some(PathBuf::from("/tmp/outline.txt")),
            autosave: false,
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"sound": false}"#).unwrap();
        let cfg = FileConfigStore::with_path(&path).load();
        assert!(!cfg.sound);
        assert_eq!(cfg.tolerance_mm, 800.0);
        assert_eq!(cfg.direction, Direction::CenterToTip);
    }

    #[test]
    fn invalid_file_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"tolerance_mm": -3}"#).unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
        fs::write(&path, "not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }

    #[test]
    fn entry_policy_mirrors_thresholds() {
        let cfg = Config {
            tolerance_mm: 300.0,
            ..Config::default()
        };
        let policy = cfg.entry_policy();
        assert_eq!(policy.tolerance_mm, 300.0);
        assert_eq!(policy.cancel_below_mm, 1000.0);
        assert_eq!(policy.meters_below, 10.0);
    }
}
