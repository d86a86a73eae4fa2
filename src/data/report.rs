use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::model::{CellIntegrals, IntegralResult};

/// Render integral profiles as CSV.
///
/// Every cell with a result contributes three columns (wavelength, mean
/// area, std), cells in ascending order. Shorter columns are padded with
/// empty fields; rows stop once every cell is exhausted.
pub fn render(results: &CellIntegrals) -> Result<String> {
    let cells: Vec<&IntegralResult> = results.values().flatten().collect();
    if cells.is_empty() {
        return Err(Error::NoIntegralData);
    }

    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let header: Vec<String> = cells
        .iter()
        .flat_map(|r| {
            [
                format!("Cell_{}_lambda", r.cell),
                format!("Cell_{}_OD", r.cell),
                format!("Cell_{}_STD", r.cell),
            ]
        })
        .collect();
    wtr.write_record(&header)?;

    let n_rows = cells.iter().map(|r| r.len()).max().unwrap_or(0);
    for row in 0..n_rows {
        let mut fields = Vec::with_capacity(cells.len() * 3);
        for r in &cells {
            if row < r.len() {
                fields.push(number(r.wavelengths[row]));
                fields.push(number(r.mean_area[row]));
                fields.push(number(r.std_area[row]));
            } else {
                fields.extend(std::iter::repeat(String::new()).take(3));
            }
        }
        wtr.write_record(&fields)?;
    }

    let bytes = wtr.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Shortest round-trip form that always keeps a decimal point, so a whole
/// wavelength prints as `260.0`.
fn number(v: f64) -> String {
    format!("{v:?}")
}

/// `path` with `.csv` appended unless it already ends in `.csv` (any case).
pub fn normalize_csv_path(path: &Path) -> PathBuf {
    let has_ext = path
        .to_str()
        .is_some_and(|s| s.to_ascii_lowercase().ends_with(".csv"));
    if has_ext {
        return path.to_path_buf();
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(".csv");
    PathBuf::from(name)
}

/// Render and write the report. Nothing is written when there is no data.
/// Returns the path actually written.
pub fn export_csv(path: &Path, results: &CellIntegrals) -> Result<PathBuf> {
    let text = render(results)?;
    let path = normalize_csv_path(path);
    std::fs::write(&path, text)?;
    log::info!("wrote integral report to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(cell: u32, n: usize) -> IntegralResult {
        IntegralResult {
            cell,
            wavelengths: (0..n).map(|i| 230.0 + 10.0 * i as f64).collect(),
            mean_area: (0..n).map(|i| i as f64 + 0.5).collect(),
            std_area: vec![0.25; n],
        }
    }

    #[test]
    fn ragged_columns_are_padded() {
        let mut results = CellIntegrals::new();
        results.insert(1, Some(result(1, 1)));
        results.insert(2, None);
        results.insert(3, Some(result(3, 3)));

        let text = render(&results).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Cell_1_lambda,Cell_1_OD,Cell_1_STD,Cell_3_lambda,Cell_3_OD,Cell_3_STD",
                "230.0,0.5,0.25,230.0,0.5,0.25",
                ",,,240.0,1.5,0.25",
                ",,,250.0,2.5,0.25",
            ]
        );
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn trailing_cell_padding() {
        let mut results = CellIntegrals::new();
        results.insert(1, Some(result(1, 2)));
        results.insert(2, Some(result(2, 1)));
        let text = render(&results).unwrap();
        assert_eq!(text.lines().nth(2), Some("240.0,1.5,0.25,,,"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn whole_numbers_keep_a_decimal_point() {
        let mut results = CellIntegrals::new();
        results.insert(
            2,
            Some(IntegralResult {
                cell: 2,
                wavelengths: vec![260.0, 280.0],
                mean_area: vec![3.0, 0.125],
                std_area: vec![0.0, 1.5],
            }),
        );
        let text = render(&results).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "260.0,3.0,0.0");
        assert_eq!(lines[2], "280.0,0.125,1.5");
    }

    #[test]
    fn nothing_to_export() {
        let mut results = CellIntegrals::new();
        assert!(matches!(render(&results), Err(Error::NoIntegralData)));
        results.insert(4, None);
        assert!(matches!(render(&results), Err(Error::NoIntegralData)));
    }

    #[test]
    fn csv_extension_is_enforced() {
        assert_eq!(normalize_csv_path(Path::new("out")), PathBuf::from("out.csv"));
        assert_eq!(
            normalize_csv_path(Path::new("dir/out.txt")),
            PathBuf::from("dir/out.txt.csv")
        );
        assert_eq!(normalize_csv_path(Path::new("OUT.CSV")), PathBuf::from("OUT.CSV"));
    }

    #[test]
    fn export_refuses_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("report");
        let err = export_csv(&target, &CellIntegrals::new()).unwrap_err();
        assert!(matches!(err, Error::NoIntegralData));
        assert!(!dir.path().join("report.csv").exists());

        let mut results = CellIntegrals::new();
        results.insert(1, Some(result(1, 2)));
        let written = export_csv(&target, &results).unwrap();
        assert_eq!(written, dir.path().join("report.csv"));
        let text = std::fs::read_to_string(written).unwrap();
        assert!(text.starts_with("Cell_1_lambda,Cell_1_OD,Cell_1_STD\n"));
    }
}
