use serde::{Deserialize, Serialize};

/// Wing half a line belongs to. Each physical line is measured once per side.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Default,
    strum_macros::Display,
)]
pub enum Side {
    #[default]
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    pub fn other(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Single letter used in compact labels ("A03-L").
    pub fn initial(self) -> char {
        match self {
            Side::Left => 'L',
            Side::Right => 'R',
        }
    }
}

/// One structural line of the table: a row and a 0-based position within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineId {
    pub row: usize,
    pub position: usize,
}

impl LineId {
    pub fn new(row: usize, position: usize) -> Self {
        Self { row, position }
    }

    pub fn on(self, side: Side) -> MeasurementKey {
        MeasurementKey { line: self, side }
    }
}

/// The unit of measurement: a line on a given side of the wing.
///
/// Ordering is row, then position, then side, which is the order reports and
/// project files list measurements in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeasurementKey {
    pub line: LineId,
    pub side: Side,
}

impl MeasurementKey {
    pub fn new(row: usize, position: usize, side: Side) -> Self {
        LineId::new(row, position).on(side)
    }
}
