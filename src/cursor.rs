use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::line::{LineId, MeasurementKey, Side};
use crate::profile::Profile;

/// Order in which the cursor walks the table after each accepted reading.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
pub enum Direction {
    #[default]
    #[strum(to_string = "Center to tip")]
    CenterToTip,
    #[strum(to_string = "Tip to center")]
    TipToCenter,
    #[strum(to_string = "Leading to trailing edge")]
    LeadingToTrailing,
    #[strum(to_string = "Trailing to leading edge")]
    TrailingToLeading,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::CenterToTip,
        Direction::TipToCenter,
        Direction::LeadingToTrailing,
        Direction::TrailingToLeading,
    ];

    /// Step as `(row delta, position delta)`.
    pub fn step(self) -> (isize, isize) {
        match self {
            Direction::CenterToTip => (0, 1),
            Direction::TipToCenter => (0, -1),
            Direction::LeadingToTrailing => (1, 0),
            Direction::TrailingToLeading => (-1, 0),
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|d| *d == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

/// The active `(row, position, side)` that receives the next reading.
///
/// Indices saturate at the edges of the table: the row stays within
/// `0..rows` and the position within the length of the row it is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub row: usize,
    pub position: usize,
    pub side: Side,
}

impl Cursor {
    pub fn key(&self) -> MeasurementKey {
        LineId::new(self.row, self.position).on(self.side)
    }

    pub fn advance(&mut self, direction: Direction, profile: &Profile) {
        let (dr, dp) = direction.step();
        self.shift(dr, dp, profile);
    }

    pub fn retreat(&mut self, direction: Direction, profile: &Profile) {
        let (dr, dp) = direction.step();
        self.shift(-dr, -dp, profile);
    }

    pub fn select(&mut self, row: usize, position: usize, profile: &Profile) {
        self.row = row;
        self.position = position;
        self.clamp(profile);
    }

    pub fn set_side(&mut self, side: Side) {
        self.side = side;
    }

    pub fn toggle_side(&mut self) {
        self.side = self.side.other();
    }

    /// Back to the first line, keeping the side.
    pub fn reset(&mut self) {
        self.row = 0;
        self.position = 0;
    }

    fn shift(&mut self, dr: isize, dp: isize, profile: &Profile) {
        self.row = self.row.saturating_add_signed(dr);
        self.position = self.position.saturating_add_signed(dp);
        self.clamp(profile);
    }

    fn clamp(&mut self, profile: &Profile) {
        let rows = profile.row_count();
        self.row = self.row.min(rows.saturating_sub(1));
        self.position = self
            .position
            .min(profile.row_len(self.row).saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        // A: 3 lines, B: 2 lines, C: 3 lines
        Profile::parse("*A\n1\n2\n3\n*B\n4\n5\n*C\n6\n7\n8\n").unwrap()
    }

    #[test]
    fn test_direction_steps_and_cycle() {
        assert_eq!(Direction::CenterToTip.step(), (0, 1));
        assert_eq!(Direction::TrailingToLeading.step(), (-1, 0));
        assert_eq!(Direction::CenterToTip.next(), Direction::TipToCenter);
        assert_eq!(Direction::TrailingToLeading.next(), Direction::CenterToTip);
        assert_eq!(
            Direction::LeadingToTrailing.to_string(),
            "Leading to trailing edge"
        );
    }

    #[test]
    fn test_advance_along_row_saturates_at_tip() {
        let p = profile();
        let mut cursor = Cursor::default();
        for _ in 0..5 {
            cursor.advance(Direction::CenterToTip, &p);
        }
        assert_eq!((cursor.row, cursor.position), (0, 2));
        cursor.retreat(Direction::CenterToTip, &p);
        assert_eq!((cursor.row, cursor.position), (0, 1));
    }

    #[test]
    fn test_retreat_saturates_at_zero() {
        let p = profile();
        let mut cursor = Cursor::default();
        cursor.advance(Direction::TipToCenter, &p);
        cursor.advance(Direction::TrailingToLeading, &p);
        assert_eq!((cursor.row, cursor.position), (0, 0));
    }

    #[test]
    fn test_row_step_clamps_position_to_shorter_row() {
        let p = profile();
        let mut cursor = Cursor::default();
        cursor.select(0, 2, &p);
        cursor.advance(Direction::LeadingToTrailing, &p);
        assert_eq!((cursor.row, cursor.position), (1, 1));
        cursor.advance(Direction::LeadingToTrailing, &p);
        cursor.advance(Direction::LeadingToTrailing, &p);
        assert_eq!(cursor.row, 2);
    }

    #[test]
    fn test_side_is_never_stepped() {
        let p = profile();
        let mut cursor = Cursor::default();
        cursor.set_side(Side::Right);
        cursor.advance(Direction::CenterToTip, &p);
        cursor.retreat(Direction::LeadingToTrailing, &p);
        assert_eq!(cursor.side, Side::Right);
        cursor.toggle_side();
        assert_eq!(cursor.key(), MeasurementKey::new(0, 1, Side::Left));
    }

    #[test]
    fn test_select_is_clamped() {
        let p = profile();
        let mut cursor = Cursor::default();
        cursor.select(9, 9, &p);
        assert_eq!((cursor.row, cursor.position), (2, 2));
    }

    #[test]
    fn test_empty_profile_keeps_origin() {
        let mut cursor = Cursor::default();
        cursor.advance(Direction::CenterToTip, &Profile::default());
        assert_eq!((cursor.row, cursor.position), (0, 0));
    }
}
