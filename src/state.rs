use std::path::{Path, PathBuf};

use crate::config::AnalysisConfig;
use crate::data::integral;
use crate::data::loader;
use crate::data::model::{CellIntegrals, Dataset, ScanKey, ScanRecord};
use crate::data::region::{self, Region, RegionMap};
use crate::data::report;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Selection and curve views
// ---------------------------------------------------------------------------

/// What the front end is currently looking at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub cell: Option<u32>,
    /// Selected wavelengths of `cell`, ascending.
    pub wavelengths: Vec<u32>,
}

/// The trimmed samples of one scan, borrowed from the dataset.
#[derive(Debug, Clone, Copy)]
pub struct Curve<'a> {
    pub key: ScanKey,
    pub x: &'a [f64],
    pub y: &'a [f64],
}

impl<'a> From<&'a ScanRecord> for Curve<'a> {
    fn from(record: &'a ScanRecord) -> Self {
        let (x, y) = record.trimmed();
        Curve {
            key: record.key,
            x,
            y,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The full analysis state of one run, independent of any front end.
#[derive(Debug, Default)]
pub struct Session {
    pub config: AnalysisConfig,

    /// Loaded dataset (None until a directory is loaded).
    dataset: Option<Dataset>,

    /// Region per loaded cell; unset until picked.
    regions: RegionMap,

    selection: Selection,

    /// Result of the last `compute_integrals`.
    integrals: CellIntegrals,
}

impl Session {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Load a run directory, replacing the current dataset.
    ///
    /// A run-id conflict clears the session. Other failures (nothing to
    /// load, unreadable directory) leave the previous dataset in place.
    pub fn load_directory(&mut self, dir: &Path) -> Result<&Dataset> {
        match loader::load_directory(dir, &self.config) {
            Ok(dataset) => Ok(self.set_dataset(dataset)),
            Err(e @ Error::RunIdConflict { .. }) => {
                log::warn!("{e}; discarding loaded data");
                self.clear();
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Ingest a dataset: every cell starts unregioned and unintegrated, and
    /// the first cell is selected.
    pub fn set_dataset(&mut self, dataset: Dataset) -> &Dataset {
        let cells = dataset.cells();
        self.regions = cells.iter().map(|&c| (c, Region::default())).collect();
        self.integrals = cells.iter().map(|&c| (c, None)).collect();
        self.selection = match cells.first() {
            Some(&cell) => Selection {
                cell: Some(cell),
                wavelengths: dataset.wavelengths(cell).into_iter().take(1).collect(),
            },
            None => Selection::default(),
        };
        self.dataset.insert(dataset)
    }

    pub fn clear(&mut self) {
        self.dataset = None;
        self.regions.clear();
        self.selection = Selection::default();
        self.integrals.clear();
    }

    // ---- enumeration ----

    pub fn list_cells(&self) -> Vec<u32> {
        self.dataset.as_ref().map(Dataset::cells).unwrap_or_default()
    }

    pub fn list_wavelengths(&self, cell: u32) -> Vec<u32> {
        self.dataset
            .as_ref()
            .map(|ds| ds.wavelengths(cell))
            .unwrap_or_default()
    }

    pub fn list_scans(&self, cell: u32, wavelength: u32) -> Vec<u32> {
        self.dataset
            .as_ref()
            .map(|ds| ds.scans(cell, wavelength))
            .unwrap_or_default()
    }

    // ---- mutation ----

    /// Enable or disable one scan. Unknown keys are ignored.
    pub fn toggle_scan(&mut self, cell: u32, wavelength: u32, scan: u32, enabled: bool) {
        if let Some(ds) = &mut self.dataset {
            ds.set_enabled(cell, wavelength, scan, enabled);
        }
    }

    /// The bound to start a region pick from: the stored one, or the
    /// admissible interval.
    pub fn begin_region_pick(&self, cell: u32) -> (f64, f64) {
        self.regions
            .get(&cell)
            .copied()
            .unwrap_or_default()
            .bounds_or_default(&self.config)
    }

    /// Store the region of `cell` and re-trim all its scans. Returns the
    /// number of scans trimmed.
    pub fn end_region_pick(&mut self, cell: u32, min_x: f64, max_x: f64) -> usize {
        let (lo, hi) = if min_x <= max_x {
            (min_x, max_x)
        } else {
            (max_x, min_x)
        };
        let bound = Region::new(lo, hi);
        self.regions.insert(cell, bound);
        match &mut self.dataset {
            Some(ds) => region::apply_region(ds, cell, &bound, &self.config),
            None => 0,
        }
    }

    /// The region stored for `cell`, if it has been picked.
    pub fn region(&self, cell: u32) -> Option<Region> {
        self.regions.get(&cell).copied().filter(Region::is_set)
    }

    // ---- integration / export ----

    /// Recompute the integral profile of every cell.
    pub fn compute_integrals(&mut self) -> &CellIntegrals {
        self.integrals = match &self.dataset {
            Some(ds) => integral::compute(ds, &self.regions),
            None => CellIntegrals::new(),
        };
        let n = self.integrals.values().flatten().count();
        log::info!("integrated {n} of {} cells", self.integrals.len());
        &self.integrals
    }

    pub fn integrals(&self) -> &CellIntegrals {
        &self.integrals
    }

    /// Write the last computed integrals as CSV. Returns the written path.
    pub fn export_csv(&self, path: &Path) -> Result<PathBuf> {
        report::export_csv(path, &self.integrals)
    }

    // ---- selection / preview ----

    /// Select a cell and its lowest wavelength. Unknown cells are ignored.
    pub fn select_cell(&mut self, cell: u32) -> bool {
        let wavelengths = self.list_wavelengths(cell);
        if wavelengths.is_empty() {
            return false;
        }
        self.selection = Selection {
            cell: Some(cell),
            wavelengths: wavelengths.into_iter().take(1).collect(),
        };
        true
    }

    /// Select wavelengths of the current cell. Unknown ones are dropped.
    pub fn select_wavelengths(&mut self, wavelengths: &[u32]) {
        let Some(cell) = self.selection.cell else {
            return;
        };
        let known = self.list_wavelengths(cell);
        let mut picked: Vec<u32> = wavelengths
            .iter()
            .copied()
            .filter(|w| known.contains(w))
            .collect();
        picked.sort_unstable();
        picked.dedup();
        self.selection.wavelengths = picked;
    }

    /// `(scan, enabled)` of the selected wavelength, when exactly one is
    /// selected.
    pub fn scan_states(&self) -> Vec<(u32, bool)> {
        let (Some(ds), Some(cell), [wavelength]) = (
            &self.dataset,
            self.selection.cell,
            self.selection.wavelengths.as_slice(),
        ) else {
            return Vec::new();
        };
        ds.bucket(cell, *wavelength)
            .map(|r| (r.key.scan, r.enabled))
            .collect()
    }

    /// Trimmed samples of every enabled scan under the current selection.
    pub fn selected_curves(&self) -> Vec<Curve<'_>> {
        let (Some(ds), Some(cell)) = (&self.dataset, self.selection.cell) else {
            return Vec::new();
        };
        self.selection
            .wavelengths
            .iter()
            .flat_map(move |&w| ds.bucket(cell, w))
            .filter(|r| r.enabled)
            .map(Curve::from)
            .collect()
    }

    /// Trimmed samples of the latest scan of each wavelength of `cell`.
    pub fn preview_curves(&self, cell: u32) -> Vec<Curve<'_>> {
        self.dataset
            .as_ref()
            .map(|ds| {
                ds.latest_scan_per_wavelength(cell)
                    .into_iter()
                    .map(Curve::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}
