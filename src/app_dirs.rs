use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "linetrim";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", APP_NAME)
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|pd| pd.config_dir().join("config.json"))
    }

    /// Where logs go; the terminal itself belongs to the TUI.
    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join(format!("{APP_NAME}.log")))
    }

    pub fn projects_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|pd| pd.data_dir().join("projects"))
    }

    pub fn autosave_dir() -> Option<PathBuf> {
        Self::projects_dir().map(|dir| dir.join("autosave"))
    }

    pub fn reports_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|pd| pd.data_dir().join("reports"))
    }

    fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(PathBuf::from(home).join(".local").join("state").join(APP_NAME))
        } else {
            Self::project_dirs().map(|pd| pd.data_local_dir().to_path_buf())
        }
    }
}
