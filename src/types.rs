//! Core types for throughput analysis
//!
//! This module defines the data that flows into the calculator (trials grouped
//! into sequences) and the values it derives from them.

use serde::{Deserialize, Serialize};

use crate::error::ThroughputError;

/// A point in the device's pixel coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Task layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Back-and-forth selections between two targets on one axis
    #[default]
    OneDimensional,
    /// Selections across a layout circle of targets
    TwoDimensional,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::OneDimensional => "1D",
            TaskType::TwoDimensional => "2D",
        }
    }
}

/// How consecutive trials are chained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Each trial starts where the previous one ended
    #[default]
    Serial,
    /// Each trial starts independently from a fixed start target
    Discrete,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Serial => "Serial",
            ResponseType::Discrete => "Discrete",
        }
    }
}

/// Nominal amplitude/width condition shared by every trial of a sequence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Specified amplitude A (pixels). Layout-circle diameter for 2D tasks.
    pub amplitude: f64,
    /// Specified target width W (pixels). Target diameter for 2D tasks.
    pub width: f64,
}

impl Condition {
    pub const fn new(amplitude: f64, width: f64) -> Self {
        Self { amplitude, width }
    }

    /// Check that A and W describe a usable condition
    pub fn validate(&self) -> Result<(), ThroughputError> {
        if !self.amplitude.is_finite() || self.amplitude < 0.0 {
            return Err(ThroughputError::InvalidCondition(format!(
                "amplitude must be finite and non-negative, got {}",
                self.amplitude
            )));
        }
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(ThroughputError::InvalidCondition(format!(
                "width must be finite and positive, got {}",
                self.width
            )));
        }
        Ok(())
    }

    /// Nominal index of difficulty, ID = log2(A/W + 1)
    pub fn index_of_difficulty(&self) -> f64 {
        (self.amplitude / self.width + 1.0).log2()
    }
}

/// One target acquisition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// Center of the target the movement started from
    pub from: Point,
    /// Center of the target the movement was aimed at
    pub to: Point,
    /// Finger-lift coordinate
    pub select: Point,
    /// Movement time in milliseconds
    pub movement_time_ms: f64,
}

impl Trial {
    pub fn new(
        from: impl Into<Point>,
        to: impl Into<Point>,
        select: impl Into<Point>,
        movement_time_ms: f64,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            select: select.into(),
            movement_time_ms,
        }
    }
}

/// An ordered block of trials under one condition; the unit of analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    /// Free-text label carried through to results (participant, device, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    condition: Condition,
    #[serde(default)]
    task_type: TaskType,
    #[serde(default)]
    response_type: ResponseType,
    #[serde(default)]
    trials: Vec<Trial>,
}

impl Sequence {
    /// Create an empty sequence
    pub fn new(condition: Condition, task_type: TaskType, response_type: ResponseType) -> Self {
        Self {
            code: None,
            condition,
            task_type,
            response_type,
            trials: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Build a sequence from parallel columns of trial data
    pub fn from_columns(
        condition: Condition,
        task_type: TaskType,
        response_type: ResponseType,
        from: &[Point],
        to: &[Point],
        select: &[Point],
        movement_time_ms: &[f64],
    ) -> Result<Self, ThroughputError> {
        let n = movement_time_ms.len();
        if from.len() != n || to.len() != n || select.len() != n {
            return Err(ThroughputError::LengthMismatch {
                from: from.len(),
                to: to.len(),
                select: select.len(),
                movement_time: n,
            });
        }

        let mut sequence = Self::new(condition, task_type, response_type);
        sequence.trials = (0..n)
            .map(|i| Trial {
                from: from[i],
                to: to[i],
                select: select[i],
                movement_time_ms: movement_time_ms[i],
            })
            .collect();
        Ok(sequence)
    }

    /// Append the next trial
    pub fn push(&mut self, trial: Trial) {
        self.trials.push(trial);
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn task_type(&self) -> TaskType {
        self.task_type
    }

    pub fn response_type(&self) -> ResponseType {
        self.response_type
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

/// Values derived for a single trial
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialAnalysis {
    pub index: usize,
    /// Distance between the from- and to-target centers (a)
    pub amplitude: f64,
    /// Distance from the selection point to the target center (b)
    pub distance_from_target: f64,
    /// Distance actually travelled from the from-target center (c)
    pub travel_distance: f64,
    /// Signed deviation along the task axis; positive is an overshoot
    pub delta_x: f64,
    /// a + deltaX, ignoring where the previous trial ended
    pub simple_amplitude: f64,
    /// Movement amplitude as projected on the task axis, with the serial carry-over
    pub effective_amplitude: f64,
    pub miss: bool,
}

/// Sequence-level Fitts' law measures
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequenceMetrics {
    pub trials: usize,
    /// Nominal amplitude A
    pub amplitude: f64,
    /// Nominal width W
    pub width: f64,
    /// Nominal index of difficulty (bits); informational only
    pub index_of_difficulty: f64,
    /// Ae
    pub effective_amplitude: f64,
    /// We
    pub effective_width: f64,
    /// IDe (bits)
    pub effective_index_of_difficulty: f64,
    pub mean_movement_time_ms: f64,
    pub misses: usize,
    pub error_rate_percent: f64,
    /// Mean of deltaX
    pub mean_delta_x: f64,
    /// Sample standard deviation of deltaX
    pub sd_x: f64,
    /// TP (bits per second)
    pub throughput_bps: f64,
}

/// Per-trial values together with the sequence measures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub task_type: TaskType,
    pub response_type: ResponseType,
    pub trials: Vec<TrialAnalysis>,
    pub metrics: SequenceMetrics,
}
