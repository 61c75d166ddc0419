//! Trial geometry
//!
//! The from-target center, the to-target center and the selection point form
//! a triangle with sides:
//!
//! - `a`: from → to (the amplitude of the trial)
//! - `b`: select → to (how far the selection landed from the target center)
//! - `c`: from → select (the distance actually travelled)
//!
//! By the law of cosines the selection error projected onto the task axis is
//! `(c² − b² − a²) / 2a`. It is negative on the near side of the target
//! center (undershoot, acute triangle) and positive on the far side
//! (overshoot, obtuse triangle).

use crate::error::ThroughputError;
use crate::types::Trial;

/// Triangle side lengths for one trial
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialGeometry {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl TrialGeometry {
    /// Measure a trial, rejecting data the projection cannot handle
    pub fn measure(index: usize, trial: &Trial) -> Result<Self, ThroughputError> {
        if !trial.from.is_finite() || !trial.to.is_finite() || !trial.select.is_finite() {
            return Err(ThroughputError::malformed(index, "non-finite coordinate"));
        }
        if !trial.movement_time_ms.is_finite() {
            return Err(ThroughputError::malformed(index, "non-finite movement time"));
        }
        if trial.movement_time_ms <= 0.0 {
            return Err(ThroughputError::malformed(
                index,
                format!("movement time must be positive, got {}", trial.movement_time_ms),
            ));
        }

        let a = trial.from.distance_to(&trial.to);
        if a <= 0.0 {
            return Err(ThroughputError::malformed(
                index,
                "from- and to-target centers coincide",
            ));
        }

        Ok(Self {
            a,
            b: trial.select.distance_to(&trial.to),
            c: trial.from.distance_to(&trial.select),
        })
    }

    /// Signed deviation of the selection along the task axis
    pub fn delta_x(&self) -> f64 {
        (self.c * self.c - self.b * self.b - self.a * self.a) / (2.0 * self.a)
    }
}
