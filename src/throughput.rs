//! Fitts' throughput calculation
//!
//! Turns a completed [`Sequence`] into effective amplitude, effective width,
//! effective index of difficulty and throughput:
//!
//! ```text
//! We  = 4.133 × SDx
//! IDe = log2(Ae / We + 1)
//! TP  = IDe / MT
//! ```
//!
//! `SDx` is the standard deviation of the selection coordinates projected on
//! the task axis, `Ae` the mean movement amplitude projected on the same axis.

use crate::error::ThroughputError;
use crate::geometry::TrialGeometry;
use crate::miss::{MissCriterion, ProjectedDeviation};
use crate::stats::RunningStats;
use crate::types::{ResponseType, Sequence, SequenceAnalysis, SequenceMetrics, TrialAnalysis};

/// Multiplier turning SDx into an effective width, √(2πe) rounded to 4.133
pub const EFFECTIVE_WIDTH_FACTOR: f64 = 4.133;

/// Minimum number of trials for which SDx is defined
pub const MIN_TRIALS: usize = 2;

/// SDx at or below this share of the projection's rounding scale counts as zero
const ZERO_SPREAD_TOLERANCE: f64 = 1e3 * f64::EPSILON;

/// Stateless throughput calculator
pub struct ThroughputCalculator {
    miss_criterion: Box<dyn MissCriterion>,
}

impl Default for ThroughputCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ThroughputCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThroughputCalculator")
            .field("miss_criterion", &self.miss_criterion.name())
            .finish()
    }
}

impl ThroughputCalculator {
    /// Calculator using the projected-deviation miss test
    pub fn new() -> Self {
        Self::with_miss_criterion(ProjectedDeviation)
    }

    pub fn with_miss_criterion(criterion: impl MissCriterion + 'static) -> Self {
        Self {
            miss_criterion: Box::new(criterion),
        }
    }

    pub fn with_boxed_criterion(criterion: Box<dyn MissCriterion>) -> Self {
        Self {
            miss_criterion: criterion,
        }
    }

    pub fn miss_criterion(&self) -> &dyn MissCriterion {
        self.miss_criterion.as_ref()
    }

    /// Compute per-trial deviations, amplitudes and misses
    pub fn analyze_trials(&self, sequence: &Sequence) -> Result<Vec<TrialAnalysis>, ThroughputError> {
        let condition = sequence.condition();
        condition.validate()?;

        if sequence.len() < MIN_TRIALS {
            return Err(ThroughputError::InsufficientData {
                trials: sequence.len(),
            });
        }

        let serial = sequence.response_type() == ResponseType::Serial;
        let mut analyses: Vec<TrialAnalysis> = Vec::with_capacity(sequence.len());
        let mut previous_delta_x: Option<f64> = None;

        for (index, trial) in sequence.trials().iter().enumerate() {
            let geometry = TrialGeometry::measure(index, trial)?;
            let delta_x = geometry.delta_x();
            if !delta_x.is_finite() {
                return Err(ThroughputError::malformed(index, "non-finite projection"));
            }
            let simple_amplitude = geometry.a + delta_x;

            // In a serial task the trial started wherever the previous one ended
            let effective_amplitude = match previous_delta_x {
                Some(prev) if serial => simple_amplitude + prev,
                _ => simple_amplitude,
            };

            analyses.push(TrialAnalysis {
                index,
                amplitude: geometry.a,
                distance_from_target: geometry.b,
                travel_distance: geometry.c,
                delta_x,
                simple_amplitude,
                effective_amplitude,
                miss: self
                    .miss_criterion
                    .is_miss(&geometry, delta_x, condition.width),
            });

            previous_delta_x = Some(delta_x);
        }

        Ok(analyses)
    }

    /// Aggregate per-trial values into sequence measures
    pub fn summarize(
        &self,
        sequence: &Sequence,
        trials: &[TrialAnalysis],
    ) -> Result<SequenceMetrics, ThroughputError> {
        let condition = sequence.condition();
        condition.validate()?;

        if trials.len() < MIN_TRIALS {
            return Err(ThroughputError::InsufficientData {
                trials: trials.len(),
            });
        }
        if trials.len() != sequence.len() {
            return Err(ThroughputError::ParseError(format!(
                "{} trial analyses supplied for a sequence of {} trials",
                trials.len(),
                sequence.len()
            )));
        }

        let delta_x: RunningStats = trials.iter().map(|t| t.delta_x).collect();
        let amplitude: RunningStats = trials.iter().map(|t| t.effective_amplitude).collect();
        let movement_time: RunningStats =
            sequence.trials().iter().map(|t| t.movement_time_ms).collect();
        // deltaX carries a rounding error of about ε·c²/a per trial
        let rounding_scale: RunningStats = trials
            .iter()
            .map(|t| t.travel_distance * t.travel_distance / t.amplitude)
            .collect();

        let insufficient = || ThroughputError::InsufficientData {
            trials: trials.len(),
        };
        let sd_x = delta_x.sample_std_dev().ok_or_else(insufficient)?;
        let mean_delta_x = delta_x.mean().ok_or_else(insufficient)?;
        let effective_amplitude = amplitude.mean().ok_or_else(insufficient)?;
        let mean_movement_time_ms = movement_time.mean().ok_or_else(insufficient)?;
        let zero_spread = ZERO_SPREAD_TOLERANCE * rounding_scale.mean().ok_or_else(insufficient)?;

        let effective_width = EFFECTIVE_WIDTH_FACTOR * sd_x;
        if !effective_width.is_finite() || sd_x <= zero_spread {
            return Err(ThroughputError::DegenerateSequence(format!(
                "effective width is {effective_width} (SDx = {sd_x})"
            )));
        }

        let ratio = effective_amplitude / effective_width + 1.0;
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(ThroughputError::DegenerateSequence(format!(
                "Ae/We + 1 = {ratio} (Ae = {effective_amplitude}, We = {effective_width})"
            )));
        }

        let effective_index_of_difficulty = ratio.log2();
        let throughput_bps = effective_index_of_difficulty / (mean_movement_time_ms / 1000.0);
        if !throughput_bps.is_finite() {
            return Err(ThroughputError::DegenerateSequence(format!(
                "throughput is {throughput_bps} (MT = {mean_movement_time_ms} ms)"
            )));
        }

        let misses = trials.iter().filter(|t| t.miss).count();

        Ok(SequenceMetrics {
            trials: trials.len(),
            amplitude: condition.amplitude,
            width: condition.width,
            index_of_difficulty: condition.index_of_difficulty(),
            effective_amplitude,
            effective_width,
            effective_index_of_difficulty,
            mean_movement_time_ms,
            misses,
            error_rate_percent: misses as f64 / trials.len() as f64 * 100.0,
            mean_delta_x,
            sd_x,
            throughput_bps,
        })
    }

    /// Sequence measures only
    pub fn compute(&self, sequence: &Sequence) -> Result<SequenceMetrics, ThroughputError> {
        let trials = self.analyze_trials(sequence)?;
        self.summarize(sequence, &trials)
    }

    /// Per-trial values and sequence measures
    pub fn analyze(&self, sequence: &Sequence) -> Result<SequenceAnalysis, ThroughputError> {
        let trials = self.analyze_trials(sequence)?;
        let metrics = self.summarize(sequence, &trials)?;

        Ok(SequenceAnalysis {
            code: sequence.code().map(str::to_string),
            task_type: sequence.task_type(),
            response_type: sequence.response_type(),
            trials,
            metrics,
        })
    }
}
