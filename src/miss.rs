//! Miss criteria
//!
//! Whether a trial missed its target is not recorded by the trial recorder; it
//! is inferred from the geometry. Two strategies share one interface:
//!
//! - [`ProjectedDeviation`]: the one-dimensional test, `|deltaX| > W/2`. This
//!   is the default for every task type.
//! - [`RadialDistance`]: circular targets, `b > W/2`.
//!
//! The task type never selects a strategy on its own; callers opt in.

use serde::{Deserialize, Serialize};

use crate::geometry::TrialGeometry;

/// Decides whether a trial is a miss given its geometry and the nominal width
pub trait MissCriterion: Send + Sync {
    fn is_miss(&self, geometry: &TrialGeometry, delta_x: f64, width: f64) -> bool;

    /// Short name used in reports
    fn name(&self) -> &'static str;
}

/// Miss when the deviation along the task axis exceeds half the width
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectedDeviation;

impl MissCriterion for ProjectedDeviation {
    fn is_miss(&self, _geometry: &TrialGeometry, delta_x: f64, width: f64) -> bool {
        delta_x.abs() > width / 2.0
    }

    fn name(&self) -> &'static str {
        "projected_deviation"
    }
}

/// Miss when the selection lies outside a circular target of diameter W
#[derive(Debug, Clone, Copy, Default)]
pub struct RadialDistance;

impl MissCriterion for RadialDistance {
    fn is_miss(&self, geometry: &TrialGeometry, _delta_x: f64, width: f64) -> bool {
        geometry.b > width / 2.0
    }

    fn name(&self) -> &'static str {
        "radial_distance"
    }
}

/// Serializable selector for a miss criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissRule {
    #[default]
    ProjectedDeviation,
    RadialDistance,
}

impl MissRule {
    pub fn criterion(&self) -> Box<dyn MissCriterion> {
        match self {
            MissRule::ProjectedDeviation => Box::new(ProjectedDeviation),
            MissRule::RadialDistance => Box::new(RadialDistance),
        }
    }
}
