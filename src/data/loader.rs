use std::path::{Path, PathBuf};

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};

use super::model::{Dataset, ScanKey, ScanRecord};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load every scan file of one run from `dir`.
///
/// Every regular file is a candidate; files that cannot be read or whose
/// name or body does not parse are skipped. Fails when the directory holds
/// no valid scan file or when the valid files belong to more than one run.
pub fn load_directory(dir: &Path, config: &AnalysisConfig) -> Result<Dataset> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut records = Vec::new();
    for path in &paths {
        match load_scan_file(path, config) {
            Ok(record) => records.push(record),
            Err(Error::Io(e)) => log::warn!("could not read {}: {e}", path.display()),
            Err(_) => {}
        }
    }

    if records.is_empty() {
        log::warn!("no scan files found in {}", dir.display());
        return Err(Error::EmptyDataset(dir.to_path_buf()));
    }

    let dataset = Dataset::from_records(records)?;
    log::info!(
        "loaded run {} from {}: {} scans in {} cells",
        dataset.run_id().unwrap_or("?"),
        dir.display(),
        dataset.len(),
        dataset.cells().len()
    );
    Ok(dataset)
}

/// Read and parse one file. The name is checked before the file is read.
pub fn load_scan_file(path: &Path, config: &AnalysisConfig) -> Result<ScanRecord> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::MalformedFilename(path.display().to_string()))?;
    let info = parse_filename(name).inspect_err(|e| log::debug!("skipping {name}: {e}"))?;
    let content = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            log::debug!("skipping {name}: not UTF-8 text");
            return Err(Error::MalformedBody(name.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    build_record(name, info, &content, config)
}

/// Parse a file given its name and body, without touching the filesystem.
pub fn parse_scan_file(name: &str, content: &str, config: &AnalysisConfig) -> Result<ScanRecord> {
    let info = parse_filename(name)?;
    build_record(name, info, content, config)
}

fn build_record(
    name: &str,
    info: FileInfo,
    content: &str,
    config: &AnalysisConfig,
) -> Result<ScanRecord> {
    let (x_values, y_values) =
        parse_body(content, config).inspect_err(|e| log::debug!("skipping {name}: {e}"))?;
    ScanRecord::new(info.run_id, info.key, x_values, y_values)
}

// ---------------------------------------------------------------------------
// File name
// ---------------------------------------------------------------------------

/// What a scan file name encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub run_id: String,
    pub key: ScanKey,
}

/// Decode `<run>-<any>-c<cell>-s<scan>-<p><www><...>-<any>-<any>.<ext>`.
///
/// `<ext>` is three characters starting with `ra` or `ri`, and the stem must
/// have exactly seven `-` separated fields. The third and fourth fields carry
/// a literal `c` and `s` ahead of their digits. The wavelength is read from
/// characters 1..4 of the fifth field, whose first character is free.
pub fn parse_filename(name: &str) -> Result<FileInfo> {
    let malformed = || Error::MalformedFilename(name.to_string());

    let (stem, ext) = name.split_once('.').ok_or_else(malformed)?;
    if ext.contains('.') || ext.chars().count() != 3 {
        return Err(malformed());
    }
    if !(ext.starts_with("ra") || ext.starts_with("ri")) {
        return Err(malformed());
    }

    let fields: Vec<&str> = stem.split('-').collect();
    if fields.len() != 7 {
        return Err(malformed());
    }

    let cell = fields[2]
        .strip_prefix('c')
        .and_then(|rest| numeric_field(rest, ..))
        .ok_or_else(malformed)?;
    let scan = fields[3]
        .strip_prefix('s')
        .and_then(|rest| numeric_field(rest, ..))
        .ok_or_else(malformed)?;
    let wavelength = numeric_field(fields[4], 1..4).ok_or_else(malformed)?;

    Ok(FileInfo {
        run_id: fields[0].to_string(),
        key: ScanKey::new(cell, wavelength, scan),
    })
}

/// Parse the characters of `field` in `range` as an unsigned integer.
fn numeric_field<R>(field: &str, range: R) -> Option<u32>
where
    R: std::slice::SliceIndex<str, Output = str>,
{
    let digits = field.get(range)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// ---------------------------------------------------------------------------
// File body
// ---------------------------------------------------------------------------

/// Extract `(x, y)` columns from a scan file body.
///
/// The first two lines are headers. A data row has exactly three
/// whitespace-separated tokens, the first two finite numbers; the third is
/// ignored. Rows outside the admissible radial interval are dropped, as is
/// anything that does not look like a data row.
pub fn parse_body(content: &str, config: &AnalysisConfig) -> Result<(Vec<f64>, Vec<f64>)> {
    if content.lines().count() < 3 {
        return Err(Error::MalformedBody("fewer than three lines".to_string()));
    }

    let mut x_values = Vec::new();
    let mut y_values = Vec::new();
    for line in content.lines().skip(2) {
        let Some((x, y)) = parse_row(line) else {
            continue;
        };
        if config.is_admissible(x) {
            x_values.push(x);
            y_values.push(y);
        }
    }

    if x_values.is_empty() {
        return Err(Error::MalformedBody(
            "no data rows in the admissible interval".to_string(),
        ));
    }
    Ok((x_values, y_values))
}

fn parse_row(line: &str) -> Option<(f64, f64)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [x, y, _] = tokens[..] else {
        return None;
    };
    let x: f64 = x.parse().ok()?;
    let y: f64 = y.parse().ok()?;
    (x.is_finite() && y.is_finite()).then_some((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "header\n\
                        C 260 1 20.0 12000 1\n\
                        5.7000 0.100 0.01\n\
                        5.8000 0.200 0.01\n\
                        6.0000 0.300 0.01\n\
                        6.5000 0.400\n\
                        7.2000 0.500 0.01\n\
                        7.3000 0.600 0.01\n\
                        bad row here\n";

    #[test]
    fn filename_fields_are_decoded() {
        let info = parse_filename("AB12-x-c3-s17-A260-y-z.ra1").unwrap();
        assert_eq!(info.run_id, "AB12");
        assert_eq!(info.key, ScanKey::new(3, 260, 17));

        let info = parse_filename("RUN-0-c1-s2-W28012-q-r.ri2").unwrap();
        assert_eq!(info.key, ScanKey::new(1, 280, 2));
    }

    #[test]
    fn filename_roundtrips_key_range() {
        for (cell, scan, wavelength) in [(0, 0, 0), (999, 999, 999), (12, 5, 7), (1, 100, 450)] {
            let name = format!("RID-a-c{cell}-s{scan}-A{wavelength:03}-b-c.ra1");
            let info = parse_filename(&name).unwrap();
            assert_eq!(info.run_id, "RID");
            assert_eq!(info.key, ScanKey::new(cell, wavelength, scan));
        }
    }

    #[test]
    fn bad_filenames_are_rejected() {
        for name in [
            "RID-a-c1-s1-A260-b-c.txt",
            "RID-a-c1-s1-A260-b-c.ra",
            "RID-a-c1-s1-A260-b-c.raw1",
            "RID-a-c1-s1-A260-b-c",
            "RID-a-c1-s1-A260-b.c.ra1",
            "RID-a-c1-s1-A260-b.ra1",
            "RID-a-c1-s1-A260-b-c-d.ra1",
            "RID-a-cX-s1-A260-b-c.ra1",
            "RID-a-c-s1-A260-b-c.ra1",
            "RID-a-c1-sZ-A260-b-c.ra1",
            "RID-a-c1-s1-A2x0-b-c.ra1",
            "RID-a-c1-s1-A-b-c.ra1",
            "RID-a-c1-s1-A26-b-c.ra1",
            "RID-a-c-1-s1-A260-c.ra1",
            "",
        ] {
            assert!(
                matches!(parse_filename(name), Err(Error::MalformedFilename(_))),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn cell_and_scan_prefixes_are_required() {
        for name in [
            "RID-a-x1-z2-A260-b-c.ra1",
            "RID-a-s1-c2-A260-b-c.ra1",
            "RID-a-C1-s2-A260-b-c.ra1",
            "RID-a-c1-S2-A260-b-c.ra1",
            "RID-a-1-s2-A260-b-c.ra1",
        ] {
            assert!(
                matches!(parse_filename(name), Err(Error::MalformedFilename(_))),
                "{name} should be rejected"
            );
        }
        let info = parse_filename("RID-a-c1-s2-A260-b-c.ra1").unwrap();
        assert_eq!(info.key, ScanKey::new(1, 260, 2));
    }

    #[test]
    fn body_keeps_admissible_three_token_rows() {
        let (x, y) = parse_body(BODY, &AnalysisConfig::default()).unwrap();
        assert_eq!(x, vec![5.8, 6.0, 7.2]);
        assert_eq!(y, vec![0.2, 0.3, 0.5]);
    }

    #[test]
    fn body_skips_header_lines_even_if_numeric() {
        let body = "5.9 1.0 0.0\n6.0 1.0 0.0\n6.1 2.0 0.0\n";
        let (x, _) = parse_body(body, &AnalysisConfig::default()).unwrap();
        assert_eq!(x, vec![6.1]);
    }

    #[test]
    fn body_rejects_non_finite_values() {
        let body = "h\nh\n6.0 NaN 0\ninf 1.0 0\n";
        assert!(matches!(
            parse_body(body, &AnalysisConfig::default()),
            Err(Error::MalformedBody(_))
        ));
    }

    #[test]
    fn short_or_empty_bodies_yield_nothing() {
        let cfg = AnalysisConfig::default();
        assert!(parse_body("h\nh\n", &cfg).is_err());
        assert!(parse_body("h\nh\n8.0 1.0 0.0\n", &cfg).is_err());
    }

    #[test]
    fn parse_scan_file_builds_enabled_full_record() {
        let rec =
            parse_scan_file("R-x-c2-s4-A230-y-z.ra1", BODY, &AnalysisConfig::default()).unwrap();
        assert_eq!(rec.run_id, "R");
        assert_eq!(rec.key, ScanKey::new(2, 230, 4));
        assert!(rec.enabled);
        assert_eq!(rec.trim_range.start, 0);
        assert_eq!(rec.trim_range.end, 2);
    }
}
