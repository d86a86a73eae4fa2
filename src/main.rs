use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use absorbance_auc::{AnalysisConfig, Session};

/// Absorbance integral analysis for multi-cell scan runs.
#[derive(Parser)]
#[command(name = "absorbance-auc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file overriding the analysis defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the cells, wavelengths and scans of a run directory
    List {
        /// Directory holding the scan files of one run
        dir: PathBuf,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Integrate every regioned cell and optionally export CSV
    Integrate {
        /// Directory holding the scan files of one run
        dir: PathBuf,

        /// Region of a cell as CELL:MIN:MAX (repeatable)
        #[arg(short, long, value_parser = parse_region)]
        region: Vec<(u32, f64, f64)>,

        /// Scan to leave out as CELL:WAVELENGTH:SCAN (repeatable)
        #[arg(short, long, value_parser = parse_scan_key)]
        disable: Vec<(u32, u32, u32)>,

        /// CSV report path (".csv" is appended if missing)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AnalysisConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    let mut session = Session::new(config);

    match cli.command {
        Commands::List { dir, json } => list(&mut session, &dir, json),
        Commands::Integrate {
            dir,
            region,
            disable,
            output,
        } => integrate(&mut session, &dir, &region, &disable, output.as_deref()),
    }
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ScanEntry {
    scan: u32,
    enabled: bool,
    samples: usize,
}

#[derive(Serialize)]
struct WavelengthEntry {
    wavelength: u32,
    scans: Vec<ScanEntry>,
}

#[derive(Serialize)]
struct CellEntry {
    cell: u32,
    wavelengths: Vec<WavelengthEntry>,
}

#[derive(Serialize)]
struct RunSummary {
    run_id: Option<String>,
    cells: Vec<CellEntry>,
}

fn summarize(session: &Session) -> RunSummary {
    let Some(ds) = session.dataset() else {
        return RunSummary {
            run_id: None,
            cells: Vec::new(),
        };
    };
    let cells = ds
        .cells()
        .into_iter()
        .map(|cell| CellEntry {
            cell,
            wavelengths: ds
                .wavelengths(cell)
                .into_iter()
                .map(|wavelength| WavelengthEntry {
                    wavelength,
                    scans: ds
                        .bucket(cell, wavelength)
                        .map(|r| ScanEntry {
                            scan: r.key.scan,
                            enabled: r.enabled,
                            samples: r.len(),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();
    RunSummary {
        run_id: ds.run_id().map(str::to_string),
        cells,
    }
}

fn list(session: &mut Session, dir: &Path, json: bool) -> Result<()> {
    session
        .load_directory(dir)
        .with_context(|| format!("loading {}", dir.display()))?;
    let summary = summarize(session);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Run {}", summary.run_id.as_deref().unwrap_or("?"));
    for cell in &summary.cells {
        println!("Cell {}", cell.cell);
        for wl in &cell.wavelengths {
            let scans: Vec<String> = wl
                .scans
                .iter()
                .map(|s| format!("{}({})", s.scan, s.samples))
                .collect();
            println!("  {:>4} nm: {}", wl.wavelength, scans.join(" "));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// integrate
// ---------------------------------------------------------------------------

fn integrate(
    session: &mut Session,
    dir: &Path,
    regions: &[(u32, f64, f64)],
    disabled: &[(u32, u32, u32)],
    output: Option<&Path>,
) -> Result<()> {
    session
        .load_directory(dir)
        .with_context(|| format!("loading {}", dir.display()))?;

    for &(cell, wavelength, scan) in disabled {
        session.toggle_scan(cell, wavelength, scan, false);
    }
    for &(cell, min_x, max_x) in regions {
        let n = session.end_region_pick(cell, min_x, max_x);
        if n == 0 {
            log::warn!("cell {cell} is not in this run; region ignored");
        }
    }

    for (cell, result) in session.compute_integrals() {
        let Some(result) = result else {
            println!("Cell {cell}: no integral (no region or no enabled scans)");
            continue;
        };
        println!("Cell {cell}");
        for i in 0..result.len() {
            println!(
                "  {:>6} nm  {:>12.6}  ± {:.6}",
                result.wavelengths[i], result.mean_area[i], result.std_area[i]
            );
        }
    }

    if let Some(path) = output {
        let written = session
            .export_csv(path)
            .with_context(|| format!("exporting {}", path.display()))?;
        println!("Wrote {}", written.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// argument parsers
// ---------------------------------------------------------------------------

fn split3(s: &str) -> Result<[&str; 3], String> {
    let parts: Vec<&str> = s.split(':').collect();
    <[&str; 3]>::try_from(parts)
        .map_err(|_| format!("expected three ':' separated values, got '{s}'"))
}

fn parse_region(s: &str) -> Result<(u32, f64, f64), String> {
    let [cell, min_x, max_x] = split3(s)?;
    let cell = cell.parse().map_err(|_| format!("bad cell '{cell}'"))?;
    let min_x = min_x.parse().map_err(|_| format!("bad bound '{min_x}'"))?;
    let max_x = max_x.parse().map_err(|_| format!("bad bound '{max_x}'"))?;
    Ok((cell, min_x, max_x))
}

fn parse_scan_key(s: &str) -> Result<(u32, u32, u32), String> {
    let [cell, wavelength, scan] = split3(s)?;
    let num = |v: &str| v.parse::<u32>().map_err(|_| format!("bad number '{v}'"));
    Ok((num(cell)?, num(wavelength)?, num(scan)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_argument() {
        assert_eq!(parse_region("2:5.9:7.05"), Ok((2, 5.9, 7.05)));
        assert!(parse_region("2:5.9").is_err());
        assert!(parse_region("x:5.9:7").is_err());
    }

    #[test]
    fn scan_key_argument() {
        assert_eq!(parse_scan_key("1:260:3"), Ok((1, 260, 3)));
        assert!(parse_scan_key("1:260:3:4").is_err());
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
