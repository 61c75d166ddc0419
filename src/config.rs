//! Analysis configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ThroughputError;
use crate::layout::DEFAULT_AMPLITUDE_TOLERANCE;
use crate::miss::MissRule;
use crate::outlier::OutlierPolicy;

/// Settings for how sequences are analysed and screened
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Miss test applied to every trial
    pub miss_rule: MissRule,
    /// Outlier criterion deciding whether a sequence is repeated
    pub outlier: OutlierPolicy,
    /// Allowed difference (px) between measured and task-adjusted amplitude
    pub amplitude_tolerance: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            miss_rule: MissRule::default(),
            outlier: OutlierPolicy::default(),
            amplitude_tolerance: DEFAULT_AMPLITUDE_TOLERANCE,
        }
    }
}

impl AnalysisConfig {
    pub fn from_json(json: &str) -> Result<Self, ThroughputError> {
        let config: AnalysisConfig = serde_json::from_str(json)
            .map_err(|e| ThroughputError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ThroughputError> {
        let json = fs::read_to_string(path).map_err(|e| {
            ThroughputError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Check values are within acceptable ranges
    pub fn validate(&self) -> Result<(), ThroughputError> {
        if !self.outlier.fraction.is_finite() || !(0.0..=1.0).contains(&self.outlier.fraction) {
            return Err(ThroughputError::ConfigError(format!(
                "outlier.fraction must be within [0, 1], got {}",
                self.outlier.fraction
            )));
        }
        if !self.amplitude_tolerance.is_finite() || self.amplitude_tolerance < 0.0 {
            return Err(ThroughputError::ConfigError(format!(
                "amplitude_tolerance must be non-negative, got {}",
                self.amplitude_tolerance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outlier::OutlierBasis;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(AnalysisConfig::from_json("{}").unwrap(), AnalysisConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = AnalysisConfig::from_json(
            r#"{ "miss_rule": "radial_distance", "outlier": { "basis": "effective_amplitude" } }"#,
        )
        .unwrap();

        assert_eq!(config.miss_rule, MissRule::RadialDistance);
        assert_eq!(config.outlier.basis, OutlierBasis::EffectiveAmplitude);
        assert_eq!(config.outlier.fraction, 0.5);
        assert_eq!(config.amplitude_tolerance, DEFAULT_AMPLITUDE_TOLERANCE);
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        assert!(AnalysisConfig::from_json(r#"{ "outlier": { "fraction": 1.5 } }"#).is_err());
        assert!(AnalysisConfig::from_json(r#"{ "amplitude_tolerance": -1 }"#).is_err());
        assert!(matches!(
            AnalysisConfig::from_json("not json"),
            Err(ThroughputError::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = AnalysisConfig::load(Path::new("/nonexistent/fitts-config.json")).unwrap_err();
        assert!(matches!(err, ThroughputError::ConfigError(_)));
    }
}
