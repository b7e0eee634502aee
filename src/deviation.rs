//! Deviation of measured lengths from the table, corrected for the global
//! offset.
//!
//! Every measuring setup adds some constant error (the lead-in of the tape,
//! the attachment loops, stretch under the tensioner). The mean of all raw
//! deviations captures that bias; subtracting it leaves the asymmetric trim
//! errors that actually need fixing. By construction the corrected deviations
//! of a non-empty report average to zero.

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::ledger::Ledger;
use crate::line::{MeasurementKey, Side};
use crate::profile::Profile;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviationReport {
    /// Mean of `measured - theoretical` over measured keys, 0 when none.
    pub offset: f64,
    deviations: BTreeMap<MeasurementKey, f64>,
    total: usize,
}

/// Mean left-minus-right difference for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowAsymmetry {
    pub row: usize,
    pub pairs: usize,
    pub mean_left_minus_right: Option<f64>,
}

impl DeviationReport {
    pub fn compute(profile: &Profile, ledger: &Ledger) -> Self {
        let raw: BTreeMap<MeasurementKey, f64> = ledger
            .measured()
            .filter_map(|(key, value)| {
                profile
                    .theoretical(key.line)
                    .map(|theoretical| (key, value - theoretical))
            })
            .collect();

        let offset = mean(raw.values().copied()).unwrap_or(0.0);
        let deviations = raw
            .into_iter()
            .map(|(key, dev)| (key, dev - offset))
            .collect();

        Self {
            offset,
            deviations,
            total: ledger.len(),
        }
    }

    /// Offset-corrected deviation, `None` for unmeasured keys.
    pub fn get(&self, key: MeasurementKey) -> Option<f64> {
        self.deviations.get(&key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeasurementKey, f64)> + '_ {
        self.deviations.iter().map(|(k, v)| (*k, *v))
    }

    pub fn measured(&self) -> usize {
        self.deviations.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.deviations.is_empty()
    }

    /// Mean of the corrected deviations. Zero up to rounding when anything
    /// is measured.
    pub fn mean(&self) -> Option<f64> {
        mean(self.deviations.values().copied())
    }

    /// Population standard deviation of the corrected deviations.
    pub fn spread(&self) -> Option<f64> {
        let m = self.mean()?;
        let variance = self
            .deviations
            .values()
            .map(|d| (d - m) * (d - m))
            .sum::<f64>()
            / self.deviations.len() as f64;
        Some(variance.sqrt())
    }

    /// Key with the largest absolute corrected deviation.
    pub fn worst(&self) -> Option<(MeasurementKey, f64)> {
        self.iter()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
    }

    /// Per row, the mean of `left - right` over positions measured on both
    /// sides. A consistently signed value means the wing is trimmed
    /// asymmetrically on that row.
    pub fn row_asymmetry(&self, profile: &Profile) -> Vec<RowAsymmetry> {
        let by_row = self
            .iter()
            .into_group_map_by(|(key, _)| key.line.row);

        (0..profile.row_count())
            .map(|row| {
                let diffs: Vec<f64> = by_row
                    .get(&row)
                    .map(|entries| {
                        entries
                            .iter()
                            .filter(|(key, _)| key.side == Side::Left)
                            .filter_map(|(key, left)| {
                                self.get(key.line.on(Side::Right)).map(|right| left - right)
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                RowAsymmetry {
                    row,
                    pairs: diffs.len(),
                    mean_left_minus_right: mean(diffs.iter().copied()),
                }
            })
            .collect()
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    match count {
        0 => None,
        n => Some(sum / n as f64),
    }
}
