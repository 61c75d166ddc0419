//! Pipeline orchestration
//!
//! This module provides the public API for analysing recorded sequences:
//! a stateless one-shot call for a single sequence document, and a stateful
//! processor that screens a block of sequences for outliers and keeps the
//! sd2 summary records of the accepted ones.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::error::ThroughputError;
use crate::layout::verify_amplitudes;
use crate::report::{AnalysisReport, ReportEncoder, SessionMetadata, SummaryRecord, TrialRecord};
use crate::throughput::ThroughputCalculator;
use crate::types::Sequence;

/// Parse a sequence document
pub fn parse_sequence(json: &str) -> Result<Sequence, ThroughputError> {
    serde_json::from_str(json).map_err(|e| ThroughputError::ParseError(e.to_string()))
}

/// Parse newline-delimited sequence documents, skipping blank lines
pub fn parse_ndjson(input: &str) -> Result<Vec<Sequence>, ThroughputError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(line_no, line)| {
            serde_json::from_str(line.trim())
                .map_err(|e| ThroughputError::ParseError(format!("line {}: {}", line_no + 1, e)))
        })
        .collect()
}

/// Parse a JSON array of sequence documents
pub fn parse_array(input: &str) -> Result<Vec<Sequence>, ThroughputError> {
    serde_json::from_str(input).map_err(|e| ThroughputError::ParseError(e.to_string()))
}

/// Analyse a sequence document with default settings (stateless, one-shot).
///
/// # Arguments
/// * `sequence_json` - Sequence document (condition, task/response type, trials)
///
/// # Returns
/// Pretty-printed JSON of the per-trial values and sequence measures
///
/// # Example
/// ```ignore
/// let analysis_json = analyze_sequence_json(&sequence_json)?;
/// ```
pub fn analyze_sequence_json(sequence_json: &str) -> Result<String, ThroughputError> {
    let sequence = parse_sequence(sequence_json)?;
    let analysis = ThroughputCalculator::new().analyze(&sequence)?;
    serde_json::to_string_pretty(&analysis).map_err(ThroughputError::JsonError)
}

/// What the caller should do with a processed sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SequenceOutcome {
    /// Measures kept
    Accepted { record: SummaryRecord },
    /// Outlier sequence: nothing kept, run the sequence again
    Repeat {
        outliers: Vec<usize>,
        repeat_count: u32,
    },
}

impl SequenceOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SequenceOutcome::Accepted { .. })
    }
}

/// Stateful processor for one block of sequences.
///
/// Tracks how many times the current sequence had to be repeated and
/// collects the summary and per-trial records of accepted sequences.
pub struct BlockProcessor {
    config: AnalysisConfig,
    metadata: SessionMetadata,
    calculator: ThroughputCalculator,
    encoder: ReportEncoder,
    pending_repeats: u32,
    records: Vec<SummaryRecord>,
    trial_records: Vec<TrialRecord>,
}

impl Default for BlockProcessor {
    fn default() -> Self {
        Self::new(AnalysisConfig::default(), SessionMetadata::default())
    }
}

impl BlockProcessor {
    pub fn new(config: AnalysisConfig, metadata: SessionMetadata) -> Self {
        Self {
            calculator: ThroughputCalculator::with_boxed_criterion(config.miss_rule.criterion()),
            config,
            metadata,
            encoder: ReportEncoder::new(),
            pending_repeats: 0,
            records: Vec::new(),
            trial_records: Vec::new(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    /// Process a completed sequence
    ///
    /// Errors leave the repeat counter untouched; the caller decides whether
    /// to rerun the sequence or abort the block.
    pub fn process(&mut self, sequence: &Sequence) -> Result<SequenceOutcome, ThroughputError> {
        let condition = sequence.condition();

        for mismatch in verify_amplitudes(sequence, self.config.amplitude_tolerance) {
            warn!(
                trial = mismatch.index,
                measured = mismatch.measured,
                expected = mismatch.expected,
                "trial amplitude differs from task layout"
            );
        }

        let trials = self.calculator.analyze_trials(sequence)?;

        let outliers = self.config.outlier.find_outliers(&trials, &condition);
        if !outliers.is_empty() {
            self.pending_repeats += 1;
            warn!(
                outliers = ?outliers,
                repeat_count = self.pending_repeats,
                "outlier sequence, repeat required"
            );
            return Ok(SequenceOutcome::Repeat {
                outliers,
                repeat_count: self.pending_repeats,
            });
        }

        let metrics = self.calculator.summarize(sequence, &trials)?;
        let record = SummaryRecord {
            metadata: self.metadata.clone(),
            code: sequence.code().map(str::to_string),
            sequence_repeat_count: self.pending_repeats,
            metrics,
        };
        debug!(
            miss_criterion = self.calculator.miss_criterion().name(),
            amplitude = metrics.amplitude,
            width = metrics.width,
            throughput_bps = metrics.throughput_bps,
            error_rate_percent = metrics.error_rate_percent,
            "sequence accepted"
        );

        let position = self.records.len();
        self.trial_records.extend(sequence.trials().iter().zip(&trials).map(
            |(trial, analysis)| TrialRecord {
                metadata: self.metadata.clone(),
                sequence: position,
                nominal: condition,
                trial: *trial,
                analysis: *analysis,
            },
        ));

        self.pending_repeats = 0;
        self.records.push(record.clone());
        Ok(SequenceOutcome::Accepted { record })
    }

    /// Process a sequence document and return the outcome as JSON
    pub fn process_json(&mut self, sequence_json: &str) -> Result<String, ThroughputError> {
        let sequence = parse_sequence(sequence_json)?;
        let outcome = self.process(&sequence)?;
        serde_json::to_string(&outcome).map_err(ThroughputError::JsonError)
    }

    /// Repeats accumulated by the sequence currently being rerun
    pub fn pending_repeats(&self) -> u32 {
        self.pending_repeats
    }

    pub fn records(&self) -> &[SummaryRecord] {
        &self.records
    }

    pub fn take_records(&mut self) -> Vec<SummaryRecord> {
        std::mem::take(&mut self.records)
    }

    /// Per-trial records of every accepted sequence, in order
    pub fn trial_records(&self) -> &[TrialRecord] {
        &self.trial_records
    }

    /// Accepted records wrapped with producer metadata
    pub fn report(&self) -> AnalysisReport {
        self.encoder.encode(&self.records)
    }

    /// Accepted records as a JSON report
    pub fn report_json(&self) -> Result<String, ThroughputError> {
        self.encoder.encode_to_json(&self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miss::MissRule;
    use crate::outlier::{OutlierBasis, OutlierPolicy};
    use crate::types::{Condition, Point, ResponseType, TaskType, Trial};
    use pretty_assertions::assert_eq;

    fn sample_sequence_json() -> &'static str {
        r#"{
            "code": "P01-S01",
            "condition": { "amplitude": 400, "width": 60 },
            "task_type": "one_dimensional",
            "response_type": "serial",
            "trials": [
                { "from": {"x": 0, "y": 0},   "to": {"x": 400, "y": 0}, "select": {"x": 408, "y": 5},   "movement_time_ms": 420 },
                { "from": {"x": 400, "y": 0}, "to": {"x": 0, "y": 0},   "select": {"x": -6, "y": -3},  "movement_time_ms": 455 },
                { "from": {"x": 0, "y": 0},   "to": {"x": 400, "y": 0}, "select": {"x": 391, "y": 1},   "movement_time_ms": 398 },
                { "from": {"x": 400, "y": 0}, "to": {"x": 0, "y": 0},   "select": {"x": 12, "y": 4},   "movement_time_ms": 441 },
                { "from": {"x": 0, "y": 0},   "to": {"x": 400, "y": 0}, "select": {"x": 436, "y": -2},  "movement_time_ms": 407 }
            ]
        }"#
    }

    fn clean_sequence() -> Sequence {
        parse_sequence(sample_sequence_json()).unwrap()
    }

    fn outlier_sequence() -> Sequence {
        let mut sequence = Sequence::new(
            Condition::new(400.0, 60.0),
            TaskType::OneDimensional,
            ResponseType::Serial,
        );
        sequence.push(Trial::new((0.0, 0.0), (400.0, 0.0), (404.0, 0.0), 420.0));
        // Double-tap: lifted 15 px from where the movement began
        sequence.push(Trial::new((400.0, 0.0), (0.0, 0.0), (385.0, 0.0), 90.0));
        sequence.push(Trial::new((0.0, 0.0), (400.0, 0.0), (396.0, 3.0), 410.0));
        sequence
    }

    #[test]
    fn test_analyze_sequence_json() {
        let json = analyze_sequence_json(sample_sequence_json()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["code"], "P01-S01");
        assert_eq!(value["response_type"], "serial");
        assert_eq!(value["trials"].as_array().unwrap().len(), 5);
        assert_eq!(value["metrics"]["trials"], 5);
        assert!(value["metrics"]["throughput_bps"].as_f64().unwrap() > 0.0);
        // 436 overshoots a 60 px target by 36
        assert_eq!(value["trials"][4]["miss"], true);
        assert_eq!(value["metrics"]["misses"], 1);
    }

    #[test]
    fn test_invalid_json() {
        let result = analyze_sequence_json("not valid json");
        assert!(matches!(result, Err(ThroughputError::ParseError(_))));
    }

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let one_line = sample_sequence_json().replace('\n', " ");
        let input = format!("{one_line}\n\n   \n{one_line}\n");
        let sequences = parse_ndjson(&input).unwrap();

        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[1].len(), 5);
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let one_line = sample_sequence_json().replace('\n', " ");
        let input = format!("{one_line}\n{{ broken\n");
        match parse_ndjson(&input) {
            Err(ThroughputError::ParseError(msg)) => assert!(msg.starts_with("line 2:"), "{msg}"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_array() {
        let input = format!("[{}, {}]", sample_sequence_json(), sample_sequence_json());
        assert_eq!(parse_array(&input).unwrap().len(), 2);
        assert!(parse_array("{}").is_err());
    }

    #[test]
    fn test_clean_sequence_accepted() {
        let mut processor = BlockProcessor::default();
        let outcome = processor.process(&clean_sequence()).unwrap();

        assert!(outcome.is_accepted());
        assert_eq!(processor.records().len(), 1);
        assert_eq!(processor.records()[0].sequence_repeat_count, 0);
        assert_eq!(processor.records()[0].code.as_deref(), Some("P01-S01"));
        assert_eq!(processor.pending_repeats(), 0);
    }

    #[test]
    fn test_outlier_repeats_counted_until_accepted() {
        let mut processor = BlockProcessor::default();

        let first = processor.process(&outlier_sequence()).unwrap();
        assert_eq!(
            first,
            SequenceOutcome::Repeat {
                outliers: vec![1],
                repeat_count: 1
            }
        );

        let second = processor.process(&outlier_sequence()).unwrap();
        assert!(matches!(second, SequenceOutcome::Repeat { repeat_count: 2, .. }));
        assert!(processor.records().is_empty());

        let accepted = processor.process(&clean_sequence()).unwrap();
        match accepted {
            SequenceOutcome::Accepted { record } => assert_eq!(record.sequence_repeat_count, 2),
            other => panic!("expected acceptance, got {other:?}"),
        }
        assert_eq!(processor.pending_repeats(), 0);

        // Next sequence starts from a clean count
        processor.process(&clean_sequence()).unwrap();
        assert_eq!(processor.records()[1].sequence_repeat_count, 0);
    }

    #[test]
    fn test_trial_records_kept_for_accepted_sequences_only() {
        let mut processor = BlockProcessor::default();

        processor.process(&outlier_sequence()).unwrap();
        assert!(processor.trial_records().is_empty());

        processor.process(&clean_sequence()).unwrap();
        processor.process(&clean_sequence()).unwrap();

        let trials = processor.trial_records();
        assert_eq!(trials.len(), 10);
        assert_eq!(trials[0].sequence, 0);
        assert_eq!(trials[5].sequence, 1);
        assert_eq!(trials[5].analysis.index, 0);
        assert_eq!(trials[4].trial.select, Point::new(436.0, -2.0));
        assert!(trials[4].analysis.miss);
        assert_eq!(trials[4].nominal, Condition::new(400.0, 60.0));
    }

    #[test]
    fn test_errors_propagate_without_counting() {
        let mut processor = BlockProcessor::default();
        let mut short = Sequence::new(
            Condition::new(400.0, 60.0),
            TaskType::OneDimensional,
            ResponseType::Serial,
        );
        short.push(Trial::new((0.0, 0.0), (400.0, 0.0), (404.0, 0.0), 420.0));

        let err = processor.process(&short).unwrap_err();
        assert!(matches!(err, ThroughputError::InsufficientData { trials: 1 }));
        assert_eq!(processor.pending_repeats(), 0);
        assert!(processor.records().is_empty());
    }

    #[test]
    fn test_config_drives_miss_rule_and_outlier_basis() {
        let config = AnalysisConfig {
            miss_rule: MissRule::RadialDistance,
            outlier: OutlierPolicy::new(OutlierBasis::TravelDistance, 0.0),
            ..Default::default()
        };
        let mut processor = BlockProcessor::new(config, SessionMetadata::default());

        // With a zero fraction nothing is an outlier
        let outcome = processor.process(&outlier_sequence()).unwrap();
        assert!(outcome.is_accepted());
        assert_eq!(processor.config().miss_rule, MissRule::RadialDistance);
    }

    #[test]
    fn test_metadata_flows_into_records() {
        let metadata = SessionMetadata {
            participant: "P12".to_string(),
            block: "B03".to_string(),
            ..Default::default()
        };
        let mut processor = BlockProcessor::new(AnalysisConfig::default(), metadata);
        processor.process(&clean_sequence()).unwrap();

        let records = processor.take_records();
        assert_eq!(records[0].metadata.participant, "P12");
        assert_eq!(records[0].metadata.block, "B03");
        assert!(processor.records().is_empty());
    }

    #[test]
    fn test_process_json_outcome() {
        let mut processor = BlockProcessor::default();
        let json = processor.process_json(sample_sequence_json()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["status"], "accepted");
        assert_eq!(value["record"]["participant"], "P01");
        assert_eq!(value["record"]["metrics"]["trials"], 5);

        let report: serde_json::Value =
            serde_json::from_str(&processor.report_json().unwrap()).unwrap();
        assert_eq!(report["records"].as_array().unwrap().len(), 1);
    }
}
