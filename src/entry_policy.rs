/// Thresholds that decide how a raw reading is interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryPolicy {
    /// A reading is accepted only if |reading - theoretical| is below this.
    pub tolerance_mm: f64,
    /// Positive readings below this are a cancel gesture, never a length.
    pub cancel_below_mm: f64,
    /// Values below this were typed in metres ("7.31" rather than "7310").
    pub meters_below: f64,
}

impl Default for EntryPolicy {
    fn default() -> Self {
        Self {
            tolerance_mm: 800.0,
            cancel_below_mm: 1000.0,
            meters_below: 10.0,
        }
    }
}

/// What a submitted text turned out to be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entry {
    /// Not a number, not finite, or negative.
    Invalid,
    /// Too short to be a line: first one arms the cancel, second one undoes.
    Short(f64),
    /// A length in millimetres, still to be checked against the table.
    Length(f64),
}

impl EntryPolicy {
    /// Parse and convert to millimetres.
    pub fn normalize(&self, raw: &str) -> Option<f64> {
        let value: f64 = raw.trim().parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        if value < self.meters_below {
            Some(value * 1000.0)
        } else {
            Some(value)
        }
    }

    pub fn classify(&self, raw: &str) -> Entry {
        match self.normalize(raw) {
            None => Entry::Invalid,
            Some(v) if v > 0.0 && v < self.cancel_below_mm => Entry::Short(v),
            Some(v) => Entry::Length(v),
        }
    }

    pub fn within_tolerance(&self, value: f64, theoretical: f64) -> bool {
        (value - theoretical).abs() < self.tolerance_mm
    }
}
