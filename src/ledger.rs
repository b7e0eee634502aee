use std::collections::BTreeMap;

use crate::line::MeasurementKey;
use crate::profile::Profile;

/// Measured lengths in millimetres, keyed by line and side.
///
/// A key that is present but `None` has not been measured yet. Measurements
/// are overwritten one at a time and only ever cleared wholesale by building
/// a new ledger for a new profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    entries: BTreeMap<MeasurementKey, Option<f64>>,
}

impl Ledger {
    /// Fresh ledger with every key of `profile` unmeasured.
    pub fn for_profile(profile: &Profile) -> Self {
        Self {
            entries: profile.keys().map(|k| (k, None)).collect(),
        }
    }

    /// Record a value. Returns false when the key is not part of the ledger.
    pub fn record(&mut self, key: MeasurementKey, value: f64) -> bool {
        match self.entries.get_mut(&key) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: MeasurementKey) -> Option<f64> {
        self.entries.get(&key).copied().flatten()
    }

    pub fn contains(&self, key: MeasurementKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn is_measured(&self, key: MeasurementKey) -> bool {
        self.get(key).is_some()
    }

    /// Measured keys and values in key order.
    pub fn measured(&self) -> impl Iterator<Item = (MeasurementKey, f64)> + '_ {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.map(|value| (*k, value)))
    }

    pub fn measured_count(&self) -> usize {
        self.entries.values().filter(|v| v.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
