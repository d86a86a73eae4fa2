use super::model::{CellIntegrals, Dataset, IntegralResult};
use super::region::RegionMap;

// ---------------------------------------------------------------------------
// Numerics
// ---------------------------------------------------------------------------

/// Trapezoidal area under `y` over `x`. A single sample has zero area.
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum()
}

/// Mean and population standard deviation. `None` for an empty slice.
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, var.sqrt()))
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Integrate every cell that has a region.
///
/// Each loaded cell gets an entry. It is `None` when the cell has no region
/// or when none of its wavelengths kept an enabled scan.
pub fn compute(dataset: &Dataset, regions: &RegionMap) -> CellIntegrals {
    dataset
        .cells()
        .into_iter()
        .map(|cell| {
            let has_region = regions.get(&cell).is_some_and(|r| r.is_set());
            let result = if has_region {
                integrate_cell(dataset, cell)
            } else {
                None
            };
            (cell, result)
        })
        .collect()
}

/// Mean/std of the trimmed areas per wavelength of one cell, over enabled
/// scans only. Wavelengths with no enabled scan are left out.
pub fn integrate_cell(dataset: &Dataset, cell: u32) -> Option<IntegralResult> {
    let mut result = IntegralResult {
        cell,
        wavelengths: Vec::new(),
        mean_area: Vec::new(),
        std_area: Vec::new(),
    };

    // `wavelengths` comes back ascending, so the result is already sorted.
    for wavelength in dataset.wavelengths(cell) {
        let areas: Vec<f64> = dataset
            .bucket(cell, wavelength)
            .filter(|r| r.enabled)
            .map(|r| {
                let (x, y) = r.trimmed();
                trapezoid(x, y)
            })
            .collect();
        let Some((mean, std)) = mean_std(&areas) else {
            continue;
        };
        result.wavelengths.push(f64::from(wavelength));
        result.mean_area.push(mean);
        result.std_area.push(std);
    }

    log::debug!("cell {cell}: {} wavelengths integrated", result.len());
    (!result.is_empty()).then_some(result)
}
