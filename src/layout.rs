//! Task-adjusted amplitudes
//!
//! For a 1D task the specified amplitude is the center-to-center distance of
//! the two targets, identical for every trial. For a 2D task the specified
//! amplitude is the diameter of the layout circle, which is not necessarily
//! the distance of a perfectly executed movement:
//!
//! - Even number of targets: even-indexed trials go straight across the
//!   circle; odd-indexed trials end beside the start target and are shorter.
//! - Odd number of targets: every trial ends slightly off the opposite point,
//!   so every movement is the same, somewhat shorter, distance.
//!
//! Comparing the measured from→to distance against these values catches
//! mis-recorded target centers before they reach the throughput calculation.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::types::{Sequence, TaskType};

/// Allowed difference (px) between measured and task-adjusted amplitude
pub const DEFAULT_AMPLITUDE_TOLERANCE: f64 = 2.0;

/// Ideal movement amplitude for a trial
///
/// `number_of_targets` is the number of targets on the layout circle, which
/// equals the number of trials in a 2D sequence.
pub fn task_adjusted_amplitude(
    task_type: TaskType,
    amplitude: f64,
    trial_index: usize,
    number_of_targets: usize,
) -> f64 {
    match task_type {
        TaskType::OneDimensional => amplitude,
        TaskType::TwoDimensional if number_of_targets < 2 => amplitude,
        TaskType::TwoDimensional => {
            let n = number_of_targets as f64;
            let chord = amplitude * (PI / n).sin();

            if number_of_targets % 2 == 0 {
                if trial_index % 2 == 0 {
                    amplitude
                } else {
                    let theta = 0.5 * PI * (n - 2.0) / n;
                    let c = chord * theta.sin();
                    let x = chord * theta.cos();
                    ((amplitude - x).powi(2) + c * c).sqrt()
                }
            } else {
                let m = 2.0 * n;
                let theta = 0.5 * (PI * (m - 2.0) / m);
                let x = (chord / 2.0) / theta.tan();
                let h = amplitude - x;
                (h * h + (chord / 2.0).powi(2)).sqrt()
            }
        }
    }
}

/// A trial whose measured amplitude disagrees with the task layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmplitudeMismatch {
    pub index: usize,
    /// From→to distance as recorded
    pub measured: f64,
    /// Distance expected from the task layout
    pub expected: f64,
}

impl AmplitudeMismatch {
    pub fn difference(&self) -> f64 {
        (self.measured - self.expected).abs()
    }
}

/// Compare every trial's from→to distance with its task-adjusted amplitude
pub fn verify_amplitudes(sequence: &Sequence, tolerance: f64) -> Vec<AmplitudeMismatch> {
    let condition = sequence.condition();
    let n = sequence.len();

    sequence
        .trials()
        .iter()
        .enumerate()
        .filter_map(|(index, trial)| {
            let measured = trial.from.distance_to(&trial.to);
            let expected =
                task_adjusted_amplitude(sequence.task_type(), condition.amplitude, index, n);
            ((measured - expected).abs() > tolerance).then_some(AmplitudeMismatch {
                index,
                measured,
                expected,
            })
        })
        .collect()
}
