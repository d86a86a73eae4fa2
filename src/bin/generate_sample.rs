use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const RUN_ID: &str = "A1B2C3";
const CELLS: [u32; 3] = [1, 2, 3];

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Sedimentation-like boundary: low meniscus side, plateau, rising base.
fn boundary_profile(r: f64, plateau: f64) -> f64 {
    let step = plateau / (1.0 + (-(r - 6.3) / 0.04).exp());
    step + gaussian(r, 7.1, 0.05, 0.6 * plateau)
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One scan file body in the instrument's text layout.
fn scan_body(cell: u32, wavelength: u32, scan: u32, plateau: f64, rng: &mut SimpleRng) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Synthetic absorbance scan, cell {cell}, scan {scan}");
    let _ = writeln!(out, "R {cell} 20.0 {} 42000 {wavelength} 1", 300 * scan);
    // 5.70 .. 7.30 cm, outer rows fall outside the admissible window
    for i in 0..=160 {
        let r = 5.70 + f64::from(i) * 0.01;
        let od = boundary_profile(r, plateau) + rng.gauss(0.0, 0.004);
        let _ = writeln!(out, "{r:.4} {od:.5} {:.5}", rng.next_f64() * 0.01);
    }
    // trailer rows the parser must skip
    let _ = writeln!(out, "END");
    let _ = writeln!(out, "7.4000 overflow");
    out
}

/// Write the synthetic run into `out_dir`. Returns how many scan files were
/// written, not counting the junk files.
fn write_run(out_dir: &Path) -> Result<usize> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let wavelengths = [230u32, 240, 250, 260, 270, 280, 290, 300];
    let scans = 1..=3u32;

    let mut written = 0;
    for &cell in &CELLS {
        for (w_idx, &wavelength) in wavelengths.iter().enumerate() {
            // cell 3 was only read at the first half of the wavelengths
            if cell == 3 && w_idx >= wavelengths.len() / 2 {
                continue;
            }
            let plateau =
                0.3 * f64::from(cell) + gaussian(f64::from(wavelength), 260.0, 15.0, 0.8);
            for scan in scans.clone() {
                let name =
                    format!("{RUN_ID}-00-c{cell}-s{scan}-A{wavelength:03}-20C-42K.ra{cell}");
                let body = scan_body(cell, wavelength, scan, plateau, &mut rng);
                let path = out_dir.join(&name);
                std::fs::write(&path, body)
                    .with_context(|| format!("writing {}", path.display()))?;
                log::debug!("wrote {name}");
                written += 1;
            }
        }
    }

    // Files the loader must ignore.
    std::fs::write(out_dir.join("notes.txt"), "not a scan\n")?;
    std::fs::write(
        out_dir.join(format!("{RUN_ID}-00-c1-s9-A260-20C-42K.ra1")),
        "header\nheader\n",
    )?;
    Ok(written)
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_run"));
    let written = write_run(&out_dir)?;
    log::info!("sample run {RUN_ID} written to {}", out_dir.display());

    println!(
        "Wrote {written} scans ({} cells) to {}",
        CELLS.len(),
        out_dir.display()
    );
    Ok(())
}
