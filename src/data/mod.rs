/// Data layer: scan records, the run index, trimming, integration, export.
///
/// Architecture:
/// ```text
///  <run>-..-c<cell>-s<scan>-<p><nnn>-..-...ra?
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  name + body → ScanRecord
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  Vec<ScanRecord>, cell → wavelength → scan index
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  region   │  per-cell radial bound → trim_range of each record
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ integral  │  trapezoid area, mean / std per (cell, wavelength)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  report   │  ragged per-cell columns → CSV
///   └──────────┘
/// ```

pub mod integral;
pub mod loader;
pub mod model;
pub mod region;
pub mod report;
