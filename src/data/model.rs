use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// ScanKey – the (cell, wavelength, scan) triple
// ---------------------------------------------------------------------------

/// Compound key of one scan file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ScanKey {
    pub cell: u32,
    pub wavelength: u32,
    pub scan: u32,
}

impl ScanKey {
    pub fn new(cell: u32, wavelength: u32, scan: u32) -> Self {
        Self {
            cell,
            wavelength,
            scan,
        }
    }
}

impl fmt::Display for ScanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cell {} / {} nm / scan {}",
            self.cell, self.wavelength, self.scan
        )
    }
}

// ---------------------------------------------------------------------------
// TrimRange – inclusive index window into a scan's samples
// ---------------------------------------------------------------------------

/// Inclusive `[start, end]` index bounds into a record's value arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrimRange {
    pub start: usize,
    pub end: usize,
}

impl TrimRange {
    /// The range covering all `len` samples. `len` must be non-zero.
    pub fn full(len: usize) -> Self {
        Self {
            start: 0,
            end: len.saturating_sub(1),
        }
    }

    /// Number of samples covered.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

// ---------------------------------------------------------------------------
// ScanRecord – one parsed measurement file
// ---------------------------------------------------------------------------

/// A single absorbance scan: radial positions and their absorbance.
#[derive(Debug, Clone, Serialize)]
pub struct ScanRecord {
    pub run_id: String,
    pub key: ScanKey,
    /// Radial position axis (x).
    pub x_values: Vec<f64>,
    /// Absorbance axis (y) – same length as `x_values`.
    pub y_values: Vec<f64>,
    /// Disabled scans take part in no aggregation.
    pub enabled: bool,
    pub trim_range: TrimRange,
}

impl ScanRecord {
    /// Build an enabled, untrimmed record.
    ///
    /// Fails with [`Error::MalformedBody`] when there are no samples or when
    /// `x_values` and `y_values` differ in length.
    pub fn new(
        run_id: String,
        key: ScanKey,
        x_values: Vec<f64>,
        y_values: Vec<f64>,
    ) -> Result<Self> {
        let trim_range = TrimRange::full(x_values.len());
        let record = Self {
            run_id,
            key,
            x_values,
            y_values,
            enabled: true,
            trim_range,
        };
        record.validate()?;
        Ok(record)
    }

    /// Check that the value arrays are non-empty, of equal length, and that
    /// `trim_range` lies inside them.
    pub fn validate(&self) -> Result<()> {
        if self.x_values.is_empty() {
            return Err(Error::MalformedBody(format!("{}: no samples", self.key)));
        }
        if self.x_values.len() != self.y_values.len() {
            return Err(Error::MalformedBody(format!(
                "{}: {} x values but {} y values",
                self.key,
                self.x_values.len(),
                self.y_values.len()
            )));
        }
        let TrimRange { start, end } = self.trim_range;
        if start > end || end >= self.x_values.len() {
            return Err(Error::MalformedBody(format!(
                "{}: trim range {start}..={end} outside {} samples",
                self.key,
                self.x_values.len()
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.x_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x_values.is_empty()
    }

    /// The samples inside `trim_range`. Both slices are empty when the range
    /// does not fit the value arrays.
    pub fn trimmed(&self) -> (&[f64], &[f64]) {
        let TrimRange { start, end } = self.trim_range;
        match (
            self.x_values.get(start..=end),
            self.y_values.get(start..=end),
        ) {
            (Some(x), Some(y)) => (x, y),
            _ => (&self.x_values[..0], &self.y_values[..0]),
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – all records of one run, indexed cell → wavelength → scan
// ---------------------------------------------------------------------------

type ScanIndex = BTreeMap<u32, BTreeMap<u32, BTreeMap<u32, usize>>>;

/// The records of one run plus a three-level lookup into them.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    run_id: Option<String>,
    records: Vec<ScanRecord>,
    /// cell → wavelength → scan → position in `records`.
    index: ScanIndex,
}

impl Dataset {
    /// Build the index over `records`.
    ///
    /// Fails without building anything when the records carry more than one
    /// run id, or when no valid record is left. Records that fail
    /// [`ScanRecord::validate`] are dropped. A repeated key keeps the first
    /// record and drops the rest.
    pub fn from_records(records: Vec<ScanRecord>) -> Result<Self> {
        let records: Vec<ScanRecord> = records
            .into_iter()
            .filter(|r| match r.validate() {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("dropping record: {e}");
                    false
                }
            })
            .collect();
        let Some(first) = records.first() else {
            return Err(Error::EmptyDataset(Default::default()));
        };
        let run_id = first.run_id.clone();
        if let Some(other) = records.iter().find(|r| r.run_id != run_id) {
            return Err(Error::RunIdConflict {
                first: run_id,
                second: other.run_id.clone(),
            });
        }

        let mut kept = Vec::with_capacity(records.len());
        let mut index = ScanIndex::new();
        for record in records {
            let key = record.key;
            let scans = index
                .entry(key.cell)
                .or_default()
                .entry(key.wavelength)
                .or_default();
            if scans.contains_key(&key.scan) {
                log::warn!("duplicate scan file for {key}, keeping the first one");
                continue;
            }
            scans.insert(key.scan, kept.len());
            kept.push(record);
        }

        Ok(Self {
            run_id: Some(run_id),
            records: kept,
            index,
        })
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ScanRecord] {
        &self.records
    }

    /// Cell keys, ascending.
    pub fn cells(&self) -> Vec<u32> {
        self.index.keys().copied().collect()
    }

    /// Wavelengths recorded for `cell`, ascending. Empty for an unknown cell.
    pub fn wavelengths(&self, cell: u32) -> Vec<u32> {
        self.index
            .get(&cell)
            .map(|w| w.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Scan numbers recorded for `(cell, wavelength)`, ascending.
    pub fn scans(&self, cell: u32, wavelength: u32) -> Vec<u32> {
        self.index
            .get(&cell)
            .and_then(|w| w.get(&wavelength))
            .map(|s| s.keys().copied().collect())
            .unwrap_or_default()
    }

    fn position(&self, key: ScanKey) -> Option<usize> {
        self.index
            .get(&key.cell)?
            .get(&key.wavelength)?
            .get(&key.scan)
            .copied()
    }

    pub fn get(&self, cell: u32, wavelength: u32, scan: u32) -> Option<&ScanRecord> {
        self.position(ScanKey::new(cell, wavelength, scan))
            .map(|i| &self.records[i])
    }

    /// Enable or disable one scan. Unknown keys are ignored.
    pub fn set_enabled(&mut self, cell: u32, wavelength: u32, scan: u32, enabled: bool) {
        if let Some(i) = self.position(ScanKey::new(cell, wavelength, scan)) {
            self.records[i].enabled = enabled;
        }
    }

    /// Records of one `(cell, wavelength)` bucket in ascending scan order.
    pub fn bucket(&self, cell: u32, wavelength: u32) -> impl Iterator<Item = &ScanRecord> {
        self.index
            .get(&cell)
            .and_then(|w| w.get(&wavelength))
            .into_iter()
            .flat_map(move |scans| scans.values().map(move |&i| &self.records[i]))
    }

    /// Every record under `cell`, all wavelengths and scans.
    pub fn cell_records_mut(&mut self, cell: u32) -> impl Iterator<Item = &mut ScanRecord> {
        let positions: BTreeSet<usize> = self
            .index
            .get(&cell)
            .into_iter()
            .flat_map(|w| w.values())
            .flat_map(|s| s.values().copied())
            .collect();
        self.records
            .iter_mut()
            .enumerate()
            .filter(move |(i, _)| positions.contains(i))
            .map(|(_, r)| r)
    }

    /// One record per wavelength of `cell`: the one with the highest scan
    /// number. Ordered by wavelength.
    pub fn latest_scan_per_wavelength(&self, cell: u32) -> Vec<&ScanRecord> {
        self.index
            .get(&cell)
            .into_iter()
            .flat_map(|w| w.values())
            .filter_map(|scans| scans.values().next_back())
            .map(|&i| &self.records[i])
            .collect()
    }
}

// ---------------------------------------------------------------------------
// IntegralResult – per-cell aggregate
// ---------------------------------------------------------------------------

/// Mean and spread of the integrated absorbance of one cell, per wavelength.
/// The three vectors are parallel and sorted by wavelength.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegralResult {
    pub cell: u32,
    pub wavelengths: Vec<f64>,
    pub mean_area: Vec<f64>,
    pub std_area: Vec<f64>,
}

impl IntegralResult {
    pub fn len(&self) -> usize {
        self.wavelengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelengths.is_empty()
    }
}

/// Integrals of every loaded cell; `None` for cells without a result.
pub type CellIntegrals = BTreeMap<u32, Option<IntegralResult>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn record(run: &str, cell: u32, wavelength: u32, scan: u32) -> ScanRecord {
        ScanRecord::new(
            run.to_string(),
            ScanKey::new(cell, wavelength, scan),
            vec![6.0, 6.1, 6.2],
            vec![scan as f64; 3],
        )
        .unwrap()
    }

    fn sample() -> Dataset {
        Dataset::from_records(vec![
            record("R1", 2, 280, 1),
            record("R1", 1, 260, 3),
            record("R1", 1, 260, 1),
            record("R1", 1, 230, 2),
            record("R1", 1, 260, 2),
        ])
        .unwrap()
    }

    #[test]
    fn keys_enumerate_ascending() {
        let ds = sample();
        assert_eq!(ds.run_id(), Some("R1"));
        assert_eq!(ds.cells(), vec![1, 2]);
        assert_eq!(ds.wavelengths(1), vec![230, 260]);
        assert_eq!(ds.scans(1, 260), vec![1, 2, 3]);
        assert!(ds.wavelengths(9).is_empty());
        assert!(ds.scans(1, 999).is_empty());
    }

    #[test]
    fn get_and_toggle() {
        let mut ds = sample();
        assert!(ds.get(1, 260, 2).unwrap().enabled);
        ds.set_enabled(1, 260, 2, false);
        assert!(!ds.get(1, 260, 2).unwrap().enabled);
        // unknown triple is a no-op
        ds.set_enabled(7, 7, 7, false);
        assert!(ds.get(7, 7, 7).is_none());
        assert_eq!(ds.records().iter().filter(|r| !r.enabled).count(), 1);
    }

    #[test]
    fn conflicting_run_ids_are_rejected() {
        let err = Dataset::from_records(vec![record("R1", 1, 260, 1), record("R2", 1, 260, 2)])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::RunIdConflict { ref first, ref second } if first == "R1" && second == "R2"
        ));
    }

    #[test]
    fn duplicate_key_keeps_first() {
        let mut dup = record("R1", 1, 260, 1);
        dup.y_values = vec![9.0; 3];
        let ds = Dataset::from_records(vec![record("R1", 1, 260, 1), dup]).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.get(1, 260, 1).unwrap().y_values[0], 1.0);
    }

    #[test]
    fn latest_scan_is_highest_scan_number() {
        let ds = sample();
        let latest: Vec<ScanKey> = ds
            .latest_scan_per_wavelength(1)
            .iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(latest, vec![ScanKey::new(1, 230, 2), ScanKey::new(1, 260, 3)]);
    }

    #[test]
    fn cell_records_mut_covers_whole_cell() {
        let mut ds = sample();
        for r in ds.cell_records_mut(1) {
            r.enabled = false;
        }
        assert_eq!(ds.records().iter().filter(|r| !r.enabled).count(), 4);
        assert!(ds.get(2, 280, 1).unwrap().enabled);
    }

    #[test]
    fn trimmed_slices_are_inclusive() {
        let mut r = record("R1", 1, 260, 1);
        assert_eq!(r.trim_range, TrimRange::full(3));
        r.trim_range = TrimRange { start: 1, end: 2 };
        let (x, y) = r.trimmed();
        assert_eq!(x, &[6.1, 6.2]);
        assert_eq!(y.len(), 2);
    }

    #[test]
    fn record_without_samples_is_rejected() {
        let err = ScanRecord::new("R1".into(), ScanKey::new(1, 260, 1), vec![], vec![])
            .unwrap_err();
        assert!(matches!(err, Error::MalformedBody(_)));
    }

    #[test]
    fn record_with_mismatched_axes_is_rejected() {
        let err = ScanRecord::new(
            "R1".into(),
            ScanKey::new(1, 260, 1),
            vec![6.0, 6.1, 6.2],
            vec![1.0, 2.0],
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedBody(_)));
    }

    #[test]
    fn invalid_records_are_dropped_from_dataset() {
        let mut empty = record("R1", 1, 260, 2);
        empty.x_values.clear();
        empty.y_values.clear();
        let mut short = record("R1", 1, 260, 3);
        short.y_values.pop();
        let mut past_end = record("R1", 2, 260, 1);
        past_end.trim_range = TrimRange { start: 0, end: 7 };

        let ds = Dataset::from_records(vec![record("R1", 1, 260, 1), empty, short, past_end])
            .unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.cells(), vec![1]);
        assert_eq!(ds.scans(1, 260), vec![1]);
    }

    #[test]
    fn only_invalid_records_is_an_empty_dataset() {
        let mut empty = record("R1", 1, 260, 1);
        empty.x_values.clear();
        empty.y_values.clear();
        let err = Dataset::from_records(vec![empty]).unwrap_err();
        assert!(matches!(err, Error::EmptyDataset(_)));
    }

    #[test]
    fn trimmed_out_of_bounds_is_empty() {
        let mut r = record("R1", 1, 260, 1);
        r.trim_range = TrimRange { start: 2, end: 5 };
        let (x, y) = r.trimmed();
        assert!(x.is_empty() && y.is_empty());
        r.x_values.clear();
        r.y_values.clear();
        r.trim_range = TrimRange::full(0);
        let (x, y) = r.trimmed();
        assert!(x.is_empty() && y.is_empty());
    }
}
