//! Absorbance integral analysis for multi-cell, multi-wavelength scan runs.
//!
//! Load a directory of scan files into a [`Session`], restrict each cell to
//! a radial region, toggle individual scans, then compute and export the
//! per-wavelength integral profile of every cell.

pub mod config;
pub mod data;
pub mod error;
pub mod state;

pub use config::AnalysisConfig;
pub use data::model::{CellIntegrals, Dataset, IntegralResult, ScanKey, ScanRecord, TrimRange};
pub use data::region::Region;
pub use error::{Error, Result};
pub use state::Session;
