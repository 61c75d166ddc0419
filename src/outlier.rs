//! Outlier detection
//!
//! A trial whose movement covered less than half the specified amplitude is
//! most likely an inadvertent double-tap or a missed tap. A sequence with one
//! or more such trials is an outlier sequence; its measures are discarded and
//! the sequence is run again. The retry decision belongs to the caller; this
//! module only finds the offending trials.

use serde::{Deserialize, Serialize};

use crate::types::{Condition, TrialAnalysis};

/// Default share of the nominal amplitude below which a trial is an outlier
pub const DEFAULT_OUTLIER_FRACTION: f64 = 0.5;

/// Which per-trial distance is compared against the nominal amplitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierBasis {
    /// Straight-line distance from the from-target center to the selection (c)
    #[default]
    TravelDistance,
    /// a + deltaX, without the serial carry-over
    SimpleAmplitude,
    /// a + deltaX plus the previous trial's deltaX in serial tasks
    EffectiveAmplitude,
}

impl OutlierBasis {
    pub fn distance(&self, trial: &TrialAnalysis) -> f64 {
        match self {
            OutlierBasis::TravelDistance => trial.travel_distance,
            OutlierBasis::SimpleAmplitude => trial.simple_amplitude,
            OutlierBasis::EffectiveAmplitude => trial.effective_amplitude,
        }
    }
}

/// Outlier criterion for a sequence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierPolicy {
    pub basis: OutlierBasis,
    /// Trials shorter than `fraction × A` are outliers
    pub fraction: f64,
}

impl Default for OutlierPolicy {
    fn default() -> Self {
        Self {
            basis: OutlierBasis::default(),
            fraction: DEFAULT_OUTLIER_FRACTION,
        }
    }
}

impl OutlierPolicy {
    pub fn new(basis: OutlierBasis, fraction: f64) -> Self {
        Self { basis, fraction }
    }

    pub fn threshold(&self, condition: &Condition) -> f64 {
        condition.amplitude * self.fraction
    }

    pub fn is_outlier(&self, trial: &TrialAnalysis, condition: &Condition) -> bool {
        self.basis.distance(trial) < self.threshold(condition)
    }

    /// Indices of all outlier trials, in order
    pub fn find_outliers(&self, trials: &[TrialAnalysis], condition: &Condition) -> Vec<usize> {
        trials
            .iter()
            .filter(|t| self.is_outlier(t, condition))
            .map(|t| t.index)
            .collect()
    }

    pub fn is_outlier_sequence(&self, trials: &[TrialAnalysis], condition: &Condition) -> bool {
        trials.iter().any(|t| self.is_outlier(t, condition))
    }
}
