//! Fitts Throughput - Fitts' law throughput engine for touch-pointing experiments
//!
//! Turns a recorded sequence of pointing trials into the ISO 9241-9 measures
//! through a deterministic pipeline: trial geometry → projected deviation →
//! effective amplitude and width → effective index of difficulty → throughput.
//!
//! ## Modules
//!
//! - **Calculator**: pure per-sequence analysis ([`ThroughputCalculator`])
//! - **Block processing**: outlier screening and sd2 summary records ([`BlockProcessor`])

pub mod config;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod miss;
pub mod outlier;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod throughput;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::AnalysisConfig;
pub use error::ThroughputError;
pub use miss::{MissCriterion, MissRule, ProjectedDeviation, RadialDistance};
pub use outlier::{OutlierBasis, OutlierPolicy};
pub use pipeline::{analyze_sequence_json, BlockProcessor, SequenceOutcome};
pub use report::{AnalysisReport, SessionMetadata, SummaryRecord, TrialRecord};
pub use throughput::ThroughputCalculator;
pub use types::{
    Condition, Point, ResponseType, Sequence, SequenceAnalysis, SequenceMetrics, TaskType, Trial,
    TrialAnalysis,
};

/// Library version embedded in all reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "fitts-throughput";
