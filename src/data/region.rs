use std::collections::BTreeMap;

use crate::config::AnalysisConfig;

use super::model::{Dataset, ScanRecord, TrimRange};

// ---------------------------------------------------------------------------
// Region – per-cell radial bound
// ---------------------------------------------------------------------------

/// Inclusive radial bound chosen for one cell. `None` means unset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Region {
    pub min_x: Option<f64>,
    pub max_x: Option<f64>,
}

impl Region {
    pub fn new(min_x: f64, max_x: f64) -> Self {
        Self {
            min_x: Some(min_x),
            max_x: Some(max_x),
        }
    }

    /// Both bounds present.
    pub fn is_set(&self) -> bool {
        self.min_x.is_some() && self.max_x.is_some()
    }

    /// The bound, with unset edges replaced by the admissible interval.
    pub fn bounds_or_default(&self, config: &AnalysisConfig) -> (f64, f64) {
        (
            self.min_x.unwrap_or(config.admissible_min),
            self.max_x.unwrap_or(config.admissible_max),
        )
    }
}

/// Region per cell. Cells that were never picked have no entry.
pub type RegionMap = BTreeMap<u32, Region>;

// ---------------------------------------------------------------------------
// Trimming
// ---------------------------------------------------------------------------

/// Index window of the samples of `x_values` inside `[min_x, max_x]`.
///
/// The window runs from the first to the last matching index, so samples in
/// between that fall outside the bound are kept. With fewer than
/// `min_samples` matches the full range is returned instead.
pub fn trim_indices(x_values: &[f64], min_x: f64, max_x: f64, min_samples: usize) -> TrimRange {
    let mut matches = x_values
        .iter()
        .enumerate()
        .filter(|(_, &x)| min_x <= x && x <= max_x)
        .map(|(i, _)| i);

    let full = TrimRange::full(x_values.len());
    let Some(first) = matches.next() else {
        return full;
    };
    let (count, last) = matches.fold((1, first), |(n, _), i| (n + 1, i));
    if count < min_samples.max(1) {
        return full;
    }
    TrimRange {
        start: first,
        end: last,
    }
}

/// Recompute the trim range of one record against a bound.
pub fn trim_record(record: &mut ScanRecord, min_x: f64, max_x: f64, min_samples: usize) {
    record.trim_range = trim_indices(&record.x_values, min_x, max_x, min_samples);
}

/// Trim every record of `cell` (any wavelength, any scan, enabled or not)
/// to `region`. Unset edges fall back to the admissible interval. Returns
/// how many records were visited.
pub fn apply_region(
    dataset: &mut Dataset,
    cell: u32,
    region: &Region,
    config: &AnalysisConfig,
) -> usize {
    let (min_x, max_x) = region.bounds_or_default(config);
    let mut visited = 0;
    for record in dataset.cell_records_mut(cell) {
        trim_record(record, min_x, max_x, config.min_region_samples);
        visited += 1;
    }
    log::info!("cell {cell}: trimmed {visited} scans to [{min_x}, {max_x}]");
    visited
}
