use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Lower edge of the radial window kept at parse time.
pub const ADMISSIBLE_MIN: f64 = 5.8;
/// Upper edge of the radial window kept at parse time.
pub const ADMISSIBLE_MAX: f64 = 7.2;
/// A region that keeps fewer samples than this is ignored for a scan.
pub const MIN_REGION_SAMPLES: usize = 10;

/// Numeric knobs of the analysis. The defaults match the instrument export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rows whose radial position is below this are dropped when parsing.
    pub admissible_min: f64,
    /// Rows whose radial position is above this are dropped when parsing.
    pub admissible_max: f64,
    /// Minimum number of in-bound samples for a region trim to take effect.
    pub min_region_samples: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            admissible_min: ADMISSIBLE_MIN,
            admissible_max: ADMISSIBLE_MAX,
            min_region_samples: MIN_REGION_SAMPLES,
        }
    }
}

impl AnalysisConfig {
    /// Read a config from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Whether `x` lies in the closed admissible interval.
    pub fn is_admissible(&self, x: f64) -> bool {
        self.admissible_min <= x && x <= self.admissible_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = AnalysisConfig::from_json_str(r#"{ "min_region_samples": 4 }"#).unwrap();
        assert_eq!(cfg.min_region_samples, 4);
        assert_eq!(cfg.admissible_min, ADMISSIBLE_MIN);
        assert_eq!(cfg.admissible_max, ADMISSIBLE_MAX);
    }

    #[test]
    fn admissible_interval_is_closed() {
        let cfg = AnalysisConfig::default();
        assert!(cfg.is_admissible(5.8));
        assert!(cfg.is_admissible(7.2));
        assert!(!cfg.is_admissible(5.79));
        assert!(!cfg.is_admissible(7.21));
    }

    #[test]
    fn bad_json_is_config_error() {
        let err = AnalysisConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, crate::error::Error::Config(_)));
    }
}
