use ratatui::style::Color;

use crate::line::{LineId, Side};
use crate::profile::Profile;

/// Diagram canvas size, shared with the outline resource.
pub const CANVAS_WIDTH: f64 = 1600.0;
pub const CANVAS_HEIGHT: f64 = 900.0;

const MARGIN_RATIO: f64 = 0.01;
/// Markers sit slightly inboard of each position's slot.
const SLOT_INSET: f64 = 0.3;

/// Spacing of line markers on the canvas for a given table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagramLayout {
    pub h_margin: f64,
    pub h_step: f64,
    pub v_step: f64,
}

impl DiagramLayout {
    pub fn for_profile(profile: &Profile) -> Self {
        let positions = profile.max_positions().max(1);
        let w_margin = MARGIN_RATIO * CANVAS_WIDTH;
        let h_margin = MARGIN_RATIO * CANVAS_HEIGHT;
        Self {
            h_margin,
            h_step: (0.5 * CANVAS_WIDTH - w_margin) / positions as f64,
            v_step: (CANVAS_HEIGHT - 2.0 * h_margin) / (profile.row_count() + 1) as f64,
        }
    }

    /// Canvas coordinates of a marker. Left is mirrored to the left of the
    /// centre line; row 0 (leading edge) is lowest.
    pub fn position(&self, line: LineId, side: Side) -> (f64, f64) {
        let offset = (line.position as f64 + 1.0 - SLOT_INSET) * self.h_step;
        let x = match side {
            Side::Left => 0.5 * CANVAS_WIDTH - offset,
            Side::Right => 0.5 * CANVAS_WIDTH + offset,
        };
        let y = self.h_margin + (line.row as f64 + 1.0) * self.v_step;
        (x, y)
    }
}

/// Map a deviation onto a blue-to-red scale spanning `-range..=range`.
pub fn deviation_colour(deviation: f64, range: f64) -> Color {
    let t = ((deviation + range) / (2.0 * range)).clamp(0.0, 1.0);
    let channel = |centre: f64| {
        let v = (1.5 - (4.0 * t - centre).abs()).clamp(0.0, 1.0);
        (v * 255.0).round() as u8
    };
    Color::Rgb(channel(3.0), channel(2.0), channel(1.0))
}

/// Millimetre value without decimals, as shown in cells.
pub fn format_mm(value: f64) -> String {
    format!("{value:.0}")
}

/// Signed deviation, e.g. "+4" or "-12".
pub fn format_deviation(value: f64) -> String {
    let rounded = value.round();
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{rounded:+.0}")
    }
}
