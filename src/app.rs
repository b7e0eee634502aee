//! Application state behind the TUI: translates key presses and rangefinder
//! readings into `Session` calls and keeps the status line up to date.

use std::path::{Path, PathBuf};

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{info, warn};

use crate::app_dirs::AppDirs;
use crate::config::{Config, ConfigStore};
use crate::error::Result;
use crate::outline::Outline;
use crate::project;
use crate::report;
use crate::runtime::AppEvent;
use crate::session::{Cue, Session, SubmitOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum PromptKind {
    #[strum(to_string = "Load line table")]
    LoadProfile,
    #[strum(to_string = "Open project")]
    OpenProject,
    #[strum(to_string = "Save project as")]
    SaveAs,
    #[strum(to_string = "Export report to")]
    ExportReport,
    #[strum(to_string = "Glider identification")]
    Identification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Measure,
    Prompt(PromptKind),
    Summary,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Good,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub text: String,
}

/// What the event loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Directories used for default file locations.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    pub autosave_dir: Option<PathBuf>,
    pub projects_dir: Option<PathBuf>,
    pub reports_dir: Option<PathBuf>,
}

impl Workspace {
    pub fn from_app_dirs() -> Self {
        Self {
            autosave_dir: AppDirs::autosave_dir(),
            projects_dir: AppDirs::projects_dir(),
            reports_dir: AppDirs::reports_dir(),
        }
    }

    /// Everything under one directory; used by tests and `--demo`.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            autosave_dir: Some(root.join("autosave")),
            projects_dir: Some(root.join("projects")),
            reports_dir: Some(root.join("reports")),
        }
    }
}

pub struct App {
    pub session: Session,
    pub config: Config,
    pub outline: Outline,
    pub mode: Mode,
    pub input: String,
    pub prompt_input: String,
    pub status: Option<Status>,
    pub last_cue: Option<Cue>,
    store: Box<dyn ConfigStore>,
    workspace: Workspace,
    bell: bool,
}

impl App {
    pub fn new(
        session: Session,
        config: Config,
        store: Box<dyn ConfigStore>,
        outline: Outline,
        workspace: Workspace,
    ) -> Self {
        Self {
            session,
            config,
            outline,
            mode: Mode::Measure,
            input: String::new(),
            prompt_input: String::new(),
            status: None,
            last_cue: None,
            store,
            workspace,
            bell: false,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// True once per audible cue; the caller rings the terminal bell.
    pub fn take_bell(&mut self) -> bool {
        std::mem::take(&mut self.bell)
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Control {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Reading(text) => {
                self.submit(&text);
                Control::Continue
            }
            AppEvent::Resize | AppEvent::Tick => Control::Continue,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Control {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Control::Quit;
        }
        match self.mode {
            Mode::Measure => self.measure_key(key),
            Mode::Prompt(kind) => {
                self.prompt_key(kind, key);
                Control::Continue
            }
            Mode::Summary | Mode::Help => {
                if matches!(
                    key.code,
                    KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('t') | KeyCode::Char('?')
                ) {
                    self.mode = Mode::Measure;
                }
                Control::Continue
            }
        }
    }

    fn measure_key(&mut self, key: KeyEvent) -> Control {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Control::Quit,
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => self.input.push(c),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Enter => {
                let raw = std::mem::take(&mut self.input);
                if !raw.is_empty() {
                    self.submit(&raw);
                }
            }
            KeyCode::Tab | KeyCode::BackTab => self.session.toggle_side(),
            KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down => {
                self.move_selection(key.code)
            }
            KeyCode::Char('d') => {
                let direction = self.session.cycle_direction();
                self.config.direction = direction;
                self.persist_config();
                self.set_status(StatusKind::Info, format!("Direction: {direction}"));
            }
            KeyCode::Char('b') => {
                self.config.sound = !self.config.sound;
                self.persist_config();
                let state = if self.config.sound { "on" } else { "off" };
                self.set_status(StatusKind::Info, format!("Sound {state}"));
            }
            KeyCode::Char('w') => self.save(),
            KeyCode::Char('W') => self.open_prompt(PromptKind::SaveAs),
            KeyCode::Char('o') => self.open_prompt(PromptKind::OpenProject),
            KeyCode::Char('l') => self.open_prompt(PromptKind::LoadProfile),
            KeyCode::Char('e') => self.open_prompt(PromptKind::ExportReport),
            KeyCode::Char('i') => self.open_prompt(PromptKind::Identification),
            KeyCode::Char('t') => self.mode = Mode::Summary,
            KeyCode::Char('?') => self.mode = Mode::Help,
            _ => {}
        }
        Control::Continue
    }

    fn move_selection(&mut self, code: KeyCode) {
        let cursor = self.session.cursor();
        let (row, position) = match code {
            KeyCode::Up => (cursor.row.saturating_sub(1), cursor.position),
            KeyCode::Down => (cursor.row + 1, cursor.position),
            KeyCode::Left => (cursor.row, cursor.position.saturating_sub(1)),
            KeyCode::Right => (cursor.row, cursor.position + 1),
            _ => return,
        };
        self.session.select(row, position);
    }

    /// Submit typed or rangefinder input and react to the outcome.
    pub fn submit(&mut self, raw: &str) -> SubmitOutcome {
        let outcome = self.session.submit_measurement(raw);
        let profile = self.session.profile();

        let status = match outcome {
            SubmitOutcome::Invalid => Some((StatusKind::Warn, format!("Not a length: '{raw}'"))),
            SubmitOutcome::Armed { value } => Some((
                StatusKind::Warn,
                format!("Short reading ({value:.0} mm): repeat to step back"),
            )),
            SubmitOutcome::Undone { key } => {
                Some((StatusKind::Info, format!("Back to {}", profile.key_label(key))))
            }
            SubmitOutcome::Accepted { key, value } => {
                Some((StatusKind::Good, format!("{} = {value:.0} mm", profile.key_label(key))))
            }
            SubmitOutcome::NoActiveLine => {
                Some((StatusKind::Warn, "Load a line table first (l)".to_string()))
            }
            SubmitOutcome::OutOfTolerance { .. } => None,
        };
        if let Some((kind, text)) = status {
            self.set_status(kind, text);
        }

        self.last_cue = outcome.cue();
        if self.last_cue.is_some() && self.config.sound {
            self.bell = true;
        }
        if outcome.changed_state() {
            self.autosave();
        }
        outcome
    }

    fn autosave(&mut self) {
        if !self.config.autosave {
            return;
        }
        let Some(path) = self.session.project_path().map(Path::to_path_buf) else {
            return;
        };
        if let Err(e) = project::save(&self.session, &path) {
            warn!(error = %e, "autosave failed");
            self.set_status(StatusKind::Error, format!("Autosave failed: {e}"));
        }
    }

    /// Save to the current project file, or ask for one.
    pub fn save(&mut self) {
        match self.session.project_path().map(Path::to_path_buf) {
            Some(path) => self.save_to(path),
            None => self.open_prompt(PromptKind::SaveAs),
        }
    }

    fn save_to(&mut self, path: PathBuf) {
        let path = project::with_extension(path);
        match project::save(&self.session, &path) {
            Ok(()) => {
                self.session.set_project_path(Some(path.clone()));
                self.set_status(StatusKind::Good, format!("Saved {}", path.display()));
            }
            Err(e) => self.set_status(StatusKind::Error, format!("Save failed: {e}")),
        }
    }

    pub fn open_prompt(&mut self, kind: PromptKind) {
        self.prompt_input = self.prompt_default(kind);
        self.mode = Mode::Prompt(kind);
    }

    fn prompt_default(&self, kind: PromptKind) -> String {
        let today = Local::now().date_naive();
        let in_dir = |dir: &Option<PathBuf>, name: String| match dir {
            Some(d) => d.join(name).display().to_string(),
            None => name,
        };
        match kind {
            PromptKind::Identification => self.session.identification().to_string(),
            PromptKind::SaveAs => match self.session.project_path() {
                Some(p) => p.display().to_string(),
                None => in_dir(
                    &self.workspace.projects_dir,
                    project::default_file_name(&self.session, today),
                ),
            },
            PromptKind::ExportReport => in_dir(
                &self.workspace.reports_dir,
                report::default_file_name(&self.session, today),
            ),
            PromptKind::LoadProfile | PromptKind::OpenProject => String::new(),
        }
    }

    fn prompt_key(&mut self, kind: PromptKind, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.prompt_input.clear();
                self.mode = Mode::Measure;
            }
            KeyCode::Backspace => {
                self.prompt_input.pop();
            }
            KeyCode::Char(c) => self.prompt_input.push(c),
            KeyCode::Enter => {
                let text = std::mem::take(&mut self.prompt_input);
                self.mode = Mode::Measure;
                self.commit_prompt(kind, text.trim());
            }
            _ => {}
        }
    }

    /// Apply a completed prompt. Empty input cancels, except for the
    /// identification which may be cleared.
    pub fn commit_prompt(&mut self, kind: PromptKind, text: &str) {
        if text.is_empty() && kind != PromptKind::Identification {
            return;
        }
        let path = PathBuf::from(text);
        match kind {
            PromptKind::Identification => {
                self.session.set_identification(text);
                self.autosave();
            }
            PromptKind::SaveAs => self.save_to(path),
            PromptKind::LoadProfile => self.load_profile(&path),
            PromptKind::OpenProject => self.open_project(&path),
            PromptKind::ExportReport => self.export_report(&path),
        }
    }

    pub fn load_profile(&mut self, path: &Path) {
        let autosave_dir = self.workspace.autosave_dir.clone();
        match self.session.load_profile(path, autosave_dir.as_deref()) {
            Ok(()) => {
                self.set_status(
                    StatusKind::Good,
                    format!(
                        "Loaded {} lines from {}",
                        self.session.profile().line_count(),
                        path.display()
                    ),
                );
                self.autosave();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "line table rejected");
                self.set_status(StatusKind::Error, format!("Cannot load table: {e}"));
            }
        }
    }

    pub fn open_project(&mut self, path: &Path) {
        match self.try_open_project(path) {
            Ok(()) => self.set_status(
                StatusKind::Good,
                format!(
                    "Opened {} ({} measured)",
                    path.display(),
                    self.session.ledger().measured_count()
                ),
            ),
            Err(e) => self.set_status(StatusKind::Error, format!("Cannot open project: {e}")),
        }
    }

    fn try_open_project(&mut self, path: &Path) -> Result<()> {
        self.session = project::load(path, self.config.entry_policy(), self.config.direction)?;
        self.input.clear();
        Ok(())
    }

    pub fn export_report(&mut self, path: &Path) {
        let today = Local::now().date_naive();
        match report::export(&self.session, today, path) {
            Ok(()) => self.set_status(
                StatusKind::Good,
                format!("Report written to {}", path.display()),
            ),
            Err(e) => self.set_status(StatusKind::Error, format!("Export failed: {e}")),
        }
    }

    fn persist_config(&mut self) {
        if let Err(e) = self.store.save(&self.config) {
            warn!(error = %e, "could not write config");
        } else {
            info!(direction = %self.config.direction, sound = self.config.sound, "config saved");
        }
    }

    pub fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(Status {
            kind,
            text: text.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileConfigStore;
    use crate::cursor::Direction;
    use crate::line::{MeasurementKey, Side};
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    const TABLE: &str = "*A\n7000\n6900\n6800\n*B\n6950\n6850\n";

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_event(key(KeyCode::Char(c)));
        }
    }

    fn app_with_table() -> (App, TempDir) {
        let dir = tempdir().unwrap();
        let table = dir.path().join("Alpha_4_M.txt");
        fs::write(&table, TABLE).unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let mut app = App::new(
            Session::default(),
            Config::default(),
            Box::new(store),
            Outline::bundled().unwrap(),
            Workspace::rooted_at(dir.path()),
        );
        app.load_profile(&table);
        (app, dir)
    }

    #[test]
    fn test_typed_reading_is_recorded_and_autosaved() {
        let (mut app, _dir) = app_with_table();
        type_text(&mut app, "7010");
        assert_eq!(app.input, "7010");
        app.handle_event(key(KeyCode::Enter));

        assert!(app.input.is_empty());
        assert_eq!(
            app.session.ledger().get(MeasurementKey::new(0, 0, Side::Left)),
            Some(7010.0)
        );
        assert_eq!(app.last_cue, Some(Cue::Next));
        assert!(app.take_bell());
        assert!(!app.take_bell());

        let saved = app.session.project_path().unwrap();
        assert!(saved.exists());
        assert!(saved.starts_with(app.workspace().autosave_dir.as_ref().unwrap()));
    }

    #[test]
    fn test_letters_do_not_reach_the_input() {
        let (mut app, _dir) = app_with_table();
        app.handle_event(key(KeyCode::Char('x')));
        type_text(&mut app, "7.0");
        assert_eq!(app.input, "7.0");
        app.handle_event(key(KeyCode::Backspace));
        assert_eq!(app.input, "7.");
    }

    #[test]
    fn test_reading_event_goes_through_submit() {
        let (mut app, _dir) = app_with_table();
        app.handle_event(AppEvent::Reading("7005".into()));
        assert_eq!(app.session.ledger().measured_count(), 1);
        assert_matches!(app.status, Some(Status { kind: StatusKind::Good, .. }));
    }

    #[test]
    fn test_out_of_tolerance_is_silent() {
        let (mut app, _dir) = app_with_table();
        app.status = None;
        let outcome = app.submit("9000");
        assert_matches!(outcome, SubmitOutcome::OutOfTolerance { .. });
        assert!(app.status.is_none());
        assert!(!app.take_bell());
    }

    #[test]
    fn test_sound_toggle_mutes_bell_and_persists() {
        let (mut app, dir) = app_with_table();
        app.handle_event(key(KeyCode::Char('b')));
        assert!(!app.config.sound);
        app.submit("7000");
        assert!(!app.take_bell());

        let stored = FileConfigStore::with_path(dir.path().join("config.json")).load();
        assert!(!stored.sound);
    }

    #[test]
    fn test_direction_cycle_persists() {
        let (mut app, dir) = app_with_table();
        app.handle_event(key(KeyCode::Char('d')));
        assert_eq!(app.session.direction(), Direction::TipToCenter);
        let stored = FileConfigStore::with_path(dir.path().join("config.json")).load();
        assert_eq!(stored.direction, Direction::TipToCenter);
    }

    #[test]
    fn test_navigation_keys() {
        let (mut app, _dir) = app_with_table();
        app.handle_event(key(KeyCode::Right));
        app.handle_event(key(KeyCode::Right));
        app.handle_event(key(KeyCode::Right));
        assert_eq!(app.session.cursor().position, 2);
        app.handle_event(key(KeyCode::Down));
        // row B has two positions
        assert_eq!(app.session.cursor().row, 1);
        assert_eq!(app.session.cursor().position, 1);
        app.handle_event(key(KeyCode::Tab));
        assert_eq!(app.session.cursor().side, Side::Right);
        app.handle_event(key(KeyCode::Up));
        app.handle_event(key(KeyCode::Up));
        assert_eq!(app.session.cursor().row, 0);
    }

    #[test]
    fn test_identification_prompt() {
        let (mut app, _dir) = app_with_table();
        app.handle_event(key(KeyCode::Char('i')));
        assert_eq!(app.mode, Mode::Prompt(PromptKind::Identification));
        assert_eq!(app.prompt_input, "Alpha 4 M - Serial number...");
        // digits go to the prompt, not the reading input
        app.prompt_input.clear();
        type_text(&mut app, "Alpha 4 M 0231");
        app.handle_event(key(KeyCode::Enter));
        assert_eq!(app.mode, Mode::Measure);
        assert_eq!(app.session.identification(), "Alpha 4 M 0231");
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_prompt_escape_cancels() {
        let (mut app, _dir) = app_with_table();
        app.handle_event(key(KeyCode::Char('l')));
        type_text(&mut app, "/nowhere");
        app.handle_event(key(KeyCode::Esc));
        assert_eq!(app.mode, Mode::Measure);
        assert_eq!(app.session.profile().line_count(), 5);
    }

    #[test]
    fn test_bad_table_keeps_session() {
        let (mut app, dir) = app_with_table();
        app.submit("7000");
        let bad = dir.path().join("bad.txt");
        fs::write(&bad, "*A\n7000\nseven\n").unwrap();
        app.load_profile(&bad);
        assert_matches!(app.status, Some(Status { kind: StatusKind::Error, .. }));
        assert_eq!(app.session.ledger().measured_count(), 1);
    }

    #[test]
    fn test_save_as_then_open() {
        let (mut app, dir) = app_with_table();
        app.submit("7000");
        let target = dir.path().join("jobs").join("alpha");
        app.commit_prompt(PromptKind::SaveAs, target.to_str().unwrap());
        let saved = target.with_extension("ltf");
        assert!(saved.exists());
        assert_eq!(app.session.project_path(), Some(saved.as_path()));

        let (mut other, _other_dir) = app_with_table();
        other.open_project(&saved);
        assert_eq!(other.session.ledger().measured_count(), 1);
        assert_eq!(other.session.project_path(), Some(saved.as_path()));
    }

    #[test]
    fn test_open_missing_project_reports_error() {
        let (mut app, _dir) = app_with_table();
        app.open_project(Path::new("/nonexistent/job.ltf"));
        assert_matches!(app.status, Some(Status { kind: StatusKind::Error, .. }));
        assert_eq!(app.session.profile().line_count(), 5);
    }

    #[test]
    fn test_export_report() {
        let (mut app, dir) = app_with_table();
        app.submit("7000");
        let out = dir.path().join("out.csv");
        app.commit_prompt(PromptKind::ExportReport, out.to_str().unwrap());
        assert!(fs::read_to_string(&out).unwrap().starts_with("row,"));
    }

    #[test]
    fn test_export_prompt_defaults_to_reports_dir() {
        let (mut app, _dir) = app_with_table();
        app.handle_event(key(KeyCode::Char('e')));
        let reports = app.workspace().reports_dir.clone().unwrap();
        assert!(app.prompt_input.starts_with(reports.to_str().unwrap()));
        assert!(app.prompt_input.ends_with(".csv"));
    }

    #[test]
    fn test_screens_and_quit() {
        let (mut app, _dir) = app_with_table();
        app.handle_event(key(KeyCode::Char('t')));
        assert_eq!(app.mode, Mode::Summary);
        assert_eq!(app.handle_event(key(KeyCode::Esc)), Control::Continue);
        assert_eq!(app.mode, Mode::Measure);
        app.handle_event(key(KeyCode::Char('?')));
        assert_eq!(app.mode, Mode::Help);
        app.handle_event(key(KeyCode::Char('q')));
        assert_eq!(app.mode, Mode::Measure);
        assert_eq!(app.handle_event(key(KeyCode::Char('q'))), Control::Quit);

        let ctrl_c = AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        app.handle_event(key(KeyCode::Char('i')));
        assert_eq!(app.handle_event(ctrl_c), Control::Quit);
    }

    #[test]
    fn test_without_table_prompts_for_one() {
        let dir = tempdir().unwrap();
        let mut app = App::new(
            Session::default(),
            Config::default(),
            Box::new(FileConfigStore::with_path(dir.path().join("c.json"))),
            Outline::bundled().unwrap(),
            Workspace::default(),
        );
        assert_eq!(app.submit("7000"), SubmitOutcome::NoActiveLine);
        assert_matches!(app.status, Some(Status { kind: StatusKind::Warn, .. }));
        app.save();
        assert_eq!(app.mode, Mode::Prompt(PromptKind::SaveAs));
    }
}
