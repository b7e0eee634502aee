use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info};

use crate::cursor::{Cursor, Direction};
use crate::deviation::DeviationReport;
use crate::entry_policy::{Entry, EntryPolicy};
use crate::error::Result;
use crate::ledger::Ledger;
use crate::line::{MeasurementKey, Side};
use crate::profile::Profile;

/// Project files use this extension.
pub const PROJECT_EXTENSION: &str = "ltf";

const DEFAULT_IDENTIFICATION: &str = "Glider name, size, serial number";

/// Audible/visual feedback for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// Reading stored, cursor moved on.
    Next,
    /// Short reading held back; a second one undoes.
    Wrong,
    /// Cursor moved back to the previous line.
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubmitOutcome {
    /// Unparsable input; nothing changed.
    Invalid,
    /// Short reading: cancel armed, nothing recorded.
    Armed { value: f64 },
    /// Second short reading: cursor moved back to `key`.
    Undone { key: MeasurementKey },
    /// Reading stored at `key`.
    Accepted { key: MeasurementKey, value: f64 },
    /// Reading too far from the table; silently dropped.
    OutOfTolerance {
        key: MeasurementKey,
        value: f64,
        theoretical: f64,
    },
    /// No table loaded, so there is nothing to measure.
    NoActiveLine,
}

impl SubmitOutcome {
    pub fn cue(&self) -> Option<Cue> {
        match self {
            SubmitOutcome::Accepted { .. } => Some(Cue::Next),
            SubmitOutcome::Armed { .. } => Some(Cue::Wrong),
            SubmitOutcome::Undone { .. } => Some(Cue::Back),
            _ => None,
        }
    }

    /// Whether persisted state changed and an autosave is due.
    pub fn changed_state(&self) -> bool {
        matches!(
            self,
            SubmitOutcome::Accepted { .. } | SubmitOutcome::Undone { .. }
        )
    }
}

/// Everything one trimming job consists of. The only owner of measurement
/// state; every mutation goes through `&mut Session`.
#[derive(Debug, Clone)]
pub struct Session {
    profile: Profile,
    ledger: Ledger,
    identification: String,
    cursor: Cursor,
    direction: Direction,
    policy: EntryPolicy,
    pending_cancel: bool,
    last_accepted: Option<MeasurementKey>,
    report: DeviationReport,
    project_path: Option<PathBuf>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(EntryPolicy::default(), Direction::default())
    }
}

impl Session {
    pub fn new(policy: EntryPolicy, direction: Direction) -> Self {
        Self {
            profile: Profile::default(),
            ledger: Ledger::default(),
            identification: DEFAULT_IDENTIFICATION.to_string(),
            cursor: Cursor::default(),
            direction,
            policy,
            pending_cancel: false,
            last_accepted: None,
            report: DeviationReport::default(),
            project_path: None,
        }
    }

    /// Rebuild a session from persisted parts. Measurements for keys that
    /// are not in `profile` are dropped.
    pub fn restore(
        profile: Profile,
        measurements: impl IntoIterator<Item = (MeasurementKey, f64)>,
        identification: String,
        policy: EntryPolicy,
        direction: Direction,
    ) -> Self {
        let mut ledger = Ledger::for_profile(&profile);
        for (key, value) in measurements {
            ledger.record(key, value);
        }
        let mut session = Self {
            profile,
            ledger,
            identification,
            ..Self::new(policy, direction)
        };
        session.recompute();
        session
    }

    /// Install a freshly parsed profile, resetting every measurement.
    pub fn install_profile(&mut self, profile: Profile) {
        self.ledger = Ledger::for_profile(&profile);
        self.profile = profile;
        self.cursor.reset();
        self.pending_cancel = false;
        self.last_accepted = None;
        self.recompute();
    }

    /// Load a line length table from disk.
    ///
    /// The table is parsed completely before anything is replaced, so a
    /// malformed file leaves the session exactly as it was. When the session
    /// has no project file yet it gets an autosave path in `autosave_dir`
    /// and an identification derived from the table's file name.
    pub fn load_profile(
        &mut self,
        path: impl AsRef<Path>,
        autosave_dir: Option<&Path>,
    ) -> Result<()> {
        let profile = Profile::load(path)?;
        let stem = profile.stem();
        self.install_profile(profile);

        if self.project_path.is_none() {
            if let Some(stem) = stem {
                self.identification = format!("{} - Serial number...", stem.replace('_', " "));
                if let Some(dir) = autosave_dir {
                    let name = format!(
                        "{}_{}.{}",
                        Local::now().format("%Y-%m-%d"),
                        stem,
                        PROJECT_EXTENSION
                    );
                    self.project_path = Some(dir.join(name));
                }
            }
        }
        Ok(())
    }

    /// Interpret one submitted text: a reading, a cancel gesture, or noise.
    pub fn submit_measurement(&mut self, raw: &str) -> SubmitOutcome {
        let outcome = match self.policy.classify(raw) {
            Entry::Invalid => SubmitOutcome::Invalid,
            Entry::Short(value) => {
                if self.pending_cancel {
                    self.pending_cancel = false;
                    self.step_back();
                    SubmitOutcome::Undone {
                        key: self.cursor.key(),
                    }
                } else {
                    self.pending_cancel = true;
                    SubmitOutcome::Armed { value }
                }
            }
            Entry::Length(value) => self.record_active(value),
        };
        debug!(raw, ?outcome, "measurement submitted");
        outcome
    }

    /// Return the cursor to the line of the last accepted reading. The
    /// advance that followed it may have been clamped at a table edge, so
    /// stepping against the direction is only used when nothing was accepted.
    fn step_back(&mut self) {
        match self.last_accepted.take() {
            Some(key) => {
                self.cursor.select(key.line.row, key.line.position, &self.profile);
                self.cursor.set_side(key.side);
            }
            None => self.cursor.retreat(self.direction, &self.profile),
        }
    }

    /// Record `value` on the active line if it is within tolerance.
    ///
    /// Any reading long enough to get here disarms a pending cancel, so only
    /// two consecutive short readings undo.
    fn record_active(&mut self, value: f64) -> SubmitOutcome {
        let key = self.cursor.key();
        let Some(theoretical) = self.profile.theoretical(key.line) else {
            return SubmitOutcome::NoActiveLine;
        };
        self.pending_cancel = false;

        if !self.policy.within_tolerance(value, theoretical) {
            return SubmitOutcome::OutOfTolerance {
                key,
                value,
                theoretical,
            };
        }

        self.ledger.record(key, value);
        self.last_accepted = Some(key);
        self.cursor.advance(self.direction, &self.profile);
        self.recompute();
        info!(line = %self.profile.key_label(key), value, "measurement recorded");
        SubmitOutcome::Accepted { key, value }
    }

    pub fn recompute(&mut self) {
        self.report = DeviationReport::compute(&self.profile, &self.ledger);
    }

    pub fn select(&mut self, row: usize, position: usize) {
        self.cursor.select(row, position, &self.profile);
    }

    pub fn set_side(&mut self, side: Side) {
        self.cursor.set_side(side);
    }

    pub fn toggle_side(&mut self) {
        self.cursor.toggle_side();
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn cycle_direction(&mut self) -> Direction {
        self.direction = self.direction.next();
        self.direction
    }

    pub fn set_identification(&mut self, text: impl Into<String>) {
        self.identification = text.into();
    }

    pub fn set_project_path(&mut self, path: Option<PathBuf>) {
        self.project_path = path;
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn report(&self) -> &DeviationReport {
        &self.report
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn active_key(&self) -> MeasurementKey {
        self.cursor.key()
    }

    pub fn active_theoretical(&self) -> Option<f64> {
        self.profile.theoretical(self.cursor.key().line)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn policy(&self) -> EntryPolicy {
        self.policy
    }

    pub fn pending_cancel(&self) -> bool {
        self.pending_cancel
    }

    pub fn identification(&self) -> &str {
        &self.identification
    }

    pub fn project_path(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }

    /// File-name friendly identification ("Alpha 4 M" -> "Alpha_4_M").
    pub fn slug(&self) -> String {
        self.identification.trim().replace(' ', "_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::tempdir;

    const TABLE: &str = "*A\n7000\n6900\n6800\n*B\n6950\n6850\n";

    fn session() -> Session {
        let mut s = Session::default();
        s.install_profile(Profile::parse(TABLE).unwrap());
        s
    }

    #[test]
    fn test_metres_are_converted_before_recording() {
        let mut s = session();
        assert_matches!(
            s.submit_measurement("7.012"),
            SubmitOutcome::Accepted { value, .. } if (value - 7012.0).abs() < 1e-6
        );
        let key = MeasurementKey::new(0, 0, Side::Left);
        assert!((s.ledger().get(key).unwrap() - 7012.0).abs() < 1e-6);
        assert_eq!(s.cursor().position, 1);
    }

    #[test]
    fn test_millimetres_recorded_verbatim() {
        let mut s = session();
        assert_eq!(
            s.submit_measurement("7010"),
            SubmitOutcome::Accepted {
                key: MeasurementKey::new(0, 0, Side::Left),
                value: 7010.0
            }
        );
    }

    #[test]
    fn test_out_of_tolerance_is_dropped_without_moving() {
        let mut s = session();
        assert_matches!(
            s.submit_measurement("7900"),
            SubmitOutcome::OutOfTolerance { theoretical, .. } if theoretical == 7000.0
        );
        assert_eq!(s.ledger().measured_count(), 0);
        assert_eq!(s.active_key(), MeasurementKey::new(0, 0, Side::Left));
        assert_eq!(s.submit_measurement("7900").cue(), None);
    }

    #[test]
    fn test_two_short_readings_undo_the_last_step() {
        let mut s = session();
        s.submit_measurement("7005");
        s.submit_measurement("6905");
        assert_eq!(s.cursor().position, 2);

        assert_eq!(
            s.submit_measurement("0.5"),
            SubmitOutcome::Armed { value: 500.0 }
        );
        assert!(s.pending_cancel());
        assert_eq!(s.cursor().position, 2);

        assert_eq!(
            s.submit_measurement("150"),
            SubmitOutcome::Undone {
                key: MeasurementKey::new(0, 1, Side::Left)
            }
        );
        assert!(!s.pending_cancel());
        assert_eq!(s.ledger().measured_count(), 2);

        // The re-measured line overwrites the earlier value.
        s.submit_measurement("6901");
        assert_eq!(
            s.ledger().get(MeasurementKey::new(0, 1, Side::Left)),
            Some(6901.0)
        );
    }

    #[test]
    fn test_undo_at_row_end_returns_to_measured_line() {
        let mut s = session();
        for raw in ["7000", "6900", "6800"] {
            s.submit_measurement(raw);
        }
        // the advance after A03 was clamped at the end of the row
        assert_eq!(s.active_key(), MeasurementKey::new(0, 2, Side::Left));

        s.submit_measurement("200");
        assert_eq!(
            s.submit_measurement("200"),
            SubmitOutcome::Undone {
                key: MeasurementKey::new(0, 2, Side::Left)
            }
        );
        assert_matches!(
            s.submit_measurement("6810"),
            SubmitOutcome::Accepted { key, .. } if key == MeasurementKey::new(0, 2, Side::Left)
        );
        assert_eq!(
            s.ledger().get(MeasurementKey::new(0, 1, Side::Left)),
            Some(6900.0)
        );
        assert_eq!(
            s.ledger().get(MeasurementKey::new(0, 2, Side::Left)),
            Some(6810.0)
        );
    }

    #[test]
    fn test_undo_after_step_into_shorter_row() {
        let mut s = session();
        s.set_direction(Direction::LeadingToTrailing);
        s.select(0, 2);
        s.submit_measurement("6800");
        // row B has two lines, so the position was clamped
        assert_eq!(s.active_key(), MeasurementKey::new(1, 1, Side::Left));

        s.submit_measurement("0.2");
        assert_eq!(
            s.submit_measurement("0.2"),
            SubmitOutcome::Undone {
                key: MeasurementKey::new(0, 2, Side::Left)
            }
        );
    }

    #[test]
    fn test_undo_restores_side_of_measured_line() {
        let mut s = session();
        s.submit_measurement("7000");
        s.toggle_side();
        s.submit_measurement("200");
        assert_eq!(
            s.submit_measurement("200"),
            SubmitOutcome::Undone {
                key: MeasurementKey::new(0, 0, Side::Left)
            }
        );
    }

    #[test]
    fn test_undo_without_accepted_reading_steps_back() {
        let mut s = session();
        s.select(0, 2);
        s.submit_measurement("200");
        assert_eq!(
            s.submit_measurement("200"),
            SubmitOutcome::Undone {
                key: MeasurementKey::new(0, 1, Side::Left)
            }
        );
    }

    #[test]
    fn test_new_profile_forgets_last_accepted() {
        let mut s = session();
        s.submit_measurement("7000");
        s.install_profile(Profile::parse(TABLE).unwrap());
        s.select(0, 2);
        s.submit_measurement("200");
        assert_eq!(
            s.submit_measurement("200"),
            SubmitOutcome::Undone {
                key: MeasurementKey::new(0, 1, Side::Left)
            }
        );
    }

    #[test]
    fn test_accepted_reading_disarms_cancel() {
        let mut s = session();
        s.submit_measurement("31");
        assert!(s.pending_cancel());
        s.submit_measurement("7002");
        assert!(!s.pending_cancel());
        assert_matches!(s.submit_measurement("31"), SubmitOutcome::Armed { .. });
    }

    #[test]
    fn test_invalid_input_is_a_no_op() {
        let mut s = session();
        s.submit_measurement("31");
        assert_eq!(s.submit_measurement("abc"), SubmitOutcome::Invalid);
        assert!(s.pending_cancel());
        assert_eq!(s.ledger().measured_count(), 0);
    }

    #[test]
    fn test_zero_within_tolerance_counts_as_measured() {
        let mut s = Session::default();
        s.install_profile(Profile::parse("*Brake\n450\n").unwrap());
        assert_matches!(
            s.submit_measurement("0"),
            SubmitOutcome::Accepted { value, .. } if value == 0.0
        );
        assert!(s.ledger().is_measured(MeasurementKey::new(0, 0, Side::Left)));
        assert_eq!(s.report().measured(), 1);
        assert!((s.report().offset + 450.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_profile_means_no_active_line() {
        let mut s = Session::default();
        assert_eq!(s.submit_measurement("7000"), SubmitOutcome::NoActiveLine);
    }

    #[test]
    fn test_direction_drives_navigation() {
        let mut s = session();
        s.set_direction(Direction::LeadingToTrailing);
        s.submit_measurement("7000");
        assert_eq!(s.active_key(), MeasurementKey::new(1, 0, Side::Left));
        s.toggle_side();
        s.submit_measurement("6950");
        assert_eq!(s.active_key(), MeasurementKey::new(1, 0, Side::Right));
        assert!(s.ledger().is_measured(MeasurementKey::new(1, 0, Side::Right)));
    }

    #[test]
    fn test_recompute_keeps_mean_zero() {
        let mut s = session();
        for raw in ["7012", "6921", "6790"] {
            s.submit_measurement(raw);
        }
        s.set_side(Side::Right);
        s.select(1, 0);
        s.submit_measurement("6960");
        assert_eq!(s.report().measured(), 4);
        assert!(s.report().mean().unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_load_profile_resets_measurements_and_names_autosave() {
        let dir = tempdir().unwrap();
        let table = dir.path().join("Alpha_4_M.txt");
        fs::write(&table, TABLE).unwrap();

        let mut s = session();
        s.submit_measurement("7000");
        s.load_profile(&table, Some(dir.path())).unwrap();

        assert_eq!(s.ledger().measured_count(), 0);
        assert_eq!(s.ledger().len(), 10);
        assert_eq!(s.identification(), "Alpha 4 M - Serial number...");
        let project = s.project_path().unwrap();
        assert!(project.starts_with(dir.path()));
        assert!(project.to_string_lossy().ends_with("_Alpha_4_M.ltf"));
    }

    #[test]
    fn test_malformed_profile_leaves_session_untouched() {
        let dir = tempdir().unwrap();
        let bad = dir.path().join("bad.txt");
        fs::write(&bad, "*A\n7000\nseven\n").unwrap();

        let mut s = session();
        s.submit_measurement("7004");
        let before_ledger = s.ledger().clone();
        let before_profile = s.profile().clone();

        assert!(s.load_profile(&bad, Some(dir.path())).is_err());
        assert_eq!(s.ledger(), &before_ledger);
        assert_eq!(s.profile(), &before_profile);
        assert_eq!(s.project_path(), None);
    }

    #[test]
    fn test_existing_project_path_is_kept() {
        let dir = tempdir().unwrap();
        let table = dir.path().join("table.txt");
        fs::write(&table, TABLE).unwrap();

        let mut s = Session::default();
        s.set_project_path(Some(dir.path().join("job.ltf")));
        s.set_identification("Mentor 7 S");
        s.load_profile(&table, Some(dir.path())).unwrap();
        assert_eq!(s.project_path(), Some(dir.path().join("job.ltf").as_path()));
        assert_eq!(s.identification(), "Mentor 7 S");
        assert_eq!(s.slug(), "Mentor_7_S");
    }
}
