//! Result records
//!
//! A [`SummaryRecord`] is one row of sd2 summary data: the session metadata
//! identifying the block, the number of outlier repeats the sequence needed,
//! and the sequence measures. An [`AnalysisReport`] wraps a batch of records
//! with producer metadata for JSON output. A [`TrialRecord`] is one row of
//! sd1 per-trial data for an accepted sequence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ThroughputError;
use crate::types::{Condition, SequenceMetrics, Trial, TrialAnalysis};
use crate::{PRODUCER_NAME, VERSION};

/// Column header for sd2 summary data
pub const SD2_HEADER: [&str; 18] = [
    "App",
    "Participant",
    "Session",
    "Block",
    "Group",
    "Condition",
    "Mode",
    "Trials",
    "SequenceRepeatCount",
    "A",
    "W",
    "ID",
    "Ae",
    "We",
    "IDe",
    "MT(ms)",
    "ErrorRate(%)",
    "TP(bps)",
];

/// Column header for sd1 per-trial data
pub const SD1_HEADER: [&str; 23] = [
    "App",
    "Participant",
    "Session",
    "Block",
    "Group",
    "Condition",
    "Mode",
    "Sequence",
    "Trial",
    "A",
    "W",
    "FromX",
    "FromY",
    "ToX",
    "ToY",
    "SelectX",
    "SelectY",
    "MT(ms)",
    "DistanceFromTargetCenter",
    "DeltaX",
    "SimpleAmplitude",
    "EffectiveAmplitude",
    "IsMiss",
];

/// Identifying codes for a block of trials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionMetadata {
    pub app: String,
    pub participant: String,
    pub session: String,
    pub block: String,
    pub group: String,
    pub condition: String,
    pub mode: String,
}

impl Default for SessionMetadata {
    fn default() -> Self {
        Self {
            app: "FittsTouch".to_string(),
            participant: "P01".to_string(),
            session: "S01".to_string(),
            block: "B01".to_string(),
            group: "G01".to_string(),
            condition: "C01".to_string(),
            mode: "1D".to_string(),
        }
    }
}

/// Summary of one accepted sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    #[serde(flatten)]
    pub metadata: SessionMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Times the sequence was run again because of outliers before this one was kept
    pub sequence_repeat_count: u32,
    pub metrics: SequenceMetrics,
}

impl SummaryRecord {
    /// Values in [`SD2_HEADER`] order, at full precision
    pub fn to_sd2_row(&self) -> Vec<String> {
        let m = &self.metrics;
        vec![
            self.metadata.app.clone(),
            self.metadata.participant.clone(),
            self.metadata.session.clone(),
            self.metadata.block.clone(),
            self.metadata.group.clone(),
            self.metadata.condition.clone(),
            self.metadata.mode.clone(),
            m.trials.to_string(),
            self.sequence_repeat_count.to_string(),
            m.amplitude.to_string(),
            m.width.to_string(),
            m.index_of_difficulty.to_string(),
            m.effective_amplitude.to_string(),
            m.effective_width.to_string(),
            m.effective_index_of_difficulty.to_string(),
            m.mean_movement_time_ms.to_string(),
            m.error_rate_percent.to_string(),
            m.throughput_bps.to_string(),
        ]
    }
}

/// One trial of an accepted sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    #[serde(flatten)]
    pub metadata: SessionMetadata,
    /// Position of the sequence among the accepted sequences of the block
    pub sequence: usize,
    /// Nominal amplitude and width of the sequence
    pub nominal: Condition,
    pub trial: Trial,
    pub analysis: TrialAnalysis,
}

impl TrialRecord {
    /// Values in [`SD1_HEADER`] order
    pub fn to_sd1_row(&self) -> Vec<String> {
        let t = &self.trial;
        let a = &self.analysis;
        vec![
            self.metadata.app.clone(),
            self.metadata.participant.clone(),
            self.metadata.session.clone(),
            self.metadata.block.clone(),
            self.metadata.group.clone(),
            self.metadata.condition.clone(),
            self.metadata.mode.clone(),
            self.sequence.to_string(),
            a.index.to_string(),
            self.nominal.amplitude.to_string(),
            self.nominal.width.to_string(),
            t.from.x.to_string(),
            t.from.y.to_string(),
            t.to.x.to_string(),
            t.to.y.to_string(),
            t.select.x.to_string(),
            t.select.y.to_string(),
            t.movement_time_ms.to_string(),
            a.distance_from_target.to_string(),
            a.delta_x.to_string(),
            a.simple_amplitude.to_string(),
            a.effective_amplitude.to_string(),
            u8::from(a.miss).to_string(),
        ]
    }
}

/// Producer identity embedded in every report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// A batch of summary records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub producer: ReportProducer,
    pub computed_at_utc: DateTime<Utc>,
    pub records: Vec<SummaryRecord>,
}

/// Builds reports stamped with a stable instance id
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create an encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn encode(&self, records: &[SummaryRecord]) -> AnalysisReport {
        AnalysisReport {
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now(),
            records: records.to_vec(),
        }
    }

    pub fn encode_to_json(&self, records: &[SummaryRecord]) -> Result<String, ThroughputError> {
        serde_json::to_string_pretty(&self.encode(records)).map_err(ThroughputError::JsonError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_record() -> SummaryRecord {
        SummaryRecord {
            metadata: SessionMetadata {
                participant: "P07".to_string(),
                ..Default::default()
            },
            code: None,
            sequence_repeat_count: 1,
            metrics: SequenceMetrics {
                trials: 20,
                amplitude: 500.0,
                width: 100.0,
                index_of_difficulty: 6.0_f64.log2(),
                effective_amplitude: 498.5,
                effective_width: 82.66,
                effective_index_of_difficulty: 2.8,
                mean_movement_time_ms: 512.5,
                misses: 1,
                error_rate_percent: 5.0,
                mean_delta_x: 1.2,
                sd_x: 20.0,
                throughput_bps: 5.46,
            },
        }
    }

    #[test]
    fn test_sd2_row_matches_header() {
        let row = sample_record().to_sd2_row();
        assert_eq!(row.len(), SD2_HEADER.len());
        assert_eq!(row[1], "P07");
        assert_eq!(row[7], "20");
        assert_eq!(row[8], "1");
        assert_eq!(row[15], "512.5");
        assert_eq!(row[17], "5.46");
    }

    #[test]
    fn test_sd1_row_matches_header() {
        let record = TrialRecord {
            metadata: SessionMetadata::default(),
            sequence: 2,
            nominal: Condition::new(300.0, 50.0),
            trial: Trial::new((0.0, 0.0), (300.0, 0.0), (340.0, 3.0), 412.5),
            analysis: TrialAnalysis {
                index: 4,
                amplitude: 300.0,
                distance_from_target: 40.0,
                travel_distance: 340.0,
                delta_x: 40.0,
                simple_amplitude: 340.0,
                effective_amplitude: 335.0,
                miss: true,
            },
        };
        let row = record.to_sd1_row();

        assert_eq!(row.len(), SD1_HEADER.len());
        assert_eq!(row[7], "2");
        assert_eq!(row[8], "4");
        assert_eq!(row[15], "340");
        assert_eq!(row[17], "412.5");
        assert_eq!(row[21], "335");
        assert_eq!(row[22], "1");
    }

    #[test]
    fn test_record_json_is_flat_metadata() {
        let value = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(value["participant"], "P07");
        assert_eq!(value["app"], "FittsTouch");
        assert_eq!(value["sequence_repeat_count"], 1);
        assert_eq!(value["metrics"]["throughput_bps"], 5.46);
        assert!(value.get("code").is_none());
    }

    #[test]
    fn test_encoder_stamps_producer() {
        let encoder = ReportEncoder::with_instance_id("fixed-id".to_string());
        let report = encoder.encode(&[sample_record()]);

        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.version, VERSION);
        assert_eq!(report.producer.instance_id, "fixed-id");
        assert_eq!(report.records.len(), 1);

        let json = encoder.encode_to_json(&[sample_record()]).unwrap();
        let parsed: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.producer, report.producer);
        assert_eq!(parsed.records[0].metadata, report.records[0].metadata);
        assert_eq!(parsed.records[0].metrics.trials, 20);
    }

    #[test]
    fn test_new_encoders_have_distinct_ids() {
        assert_ne!(ReportEncoder::new().instance_id(), ReportEncoder::new().instance_id());
    }
}
