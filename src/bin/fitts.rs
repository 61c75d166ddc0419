//! Fitts CLI - Command-line interface for the throughput engine
//!
//! Commands:
//! - analyze: Process recorded sequences into summary (sd2) and per-trial (sd1) records
//! - validate: Check sequences against their task layout
//! - schema: Print input/output schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::warn;
use tracing_subscriber::EnvFilter;

use fitts_throughput::layout::{verify_amplitudes, DEFAULT_AMPLITUDE_TOLERANCE};
use fitts_throughput::pipeline::{parse_array, parse_ndjson};
use fitts_throughput::report::{TrialRecord, SD1_HEADER, SD2_HEADER};
use fitts_throughput::types::Sequence;
use fitts_throughput::{
    AnalysisConfig, AnalysisReport, BlockProcessor, SequenceOutcome, SessionMetadata,
    ThroughputCalculator, ThroughputError, VERSION,
};

/// Fitts - Fitts' law throughput analysis for touch-pointing experiments
#[derive(Parser)]
#[command(name = "fitts")]
#[command(author = "FittsTouch contributors")]
#[command(version = VERSION)]
#[command(about = "Compute effective throughput from recorded pointing trials", long_about = None)]
struct Cli {
    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a block of sequences into summary records
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Analysis configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        metadata: MetadataArgs,

        /// Skip sequences that fail analysis instead of aborting
        #[arg(long)]
        keep_going: bool,
    },

    /// Check sequences against their condition and task layout
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Allowed amplitude difference in pixels
        #[arg(long, default_value_t = DEFAULT_AMPLITUDE_TOLERANCE)]
        tolerance: f64,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

/// Session codes written into every summary record
#[derive(clap::Args)]
struct MetadataArgs {
    #[arg(long)]
    app: Option<String>,
    #[arg(long)]
    participant: Option<String>,
    #[arg(long)]
    session: Option<String>,
    #[arg(long)]
    block: Option<String>,
    #[arg(long)]
    group: Option<String>,
    #[arg(long)]
    condition: Option<String>,
    #[arg(long)]
    mode: Option<String>,
}

impl MetadataArgs {
    fn into_metadata(self) -> SessionMetadata {
        let defaults = SessionMetadata::default();
        SessionMetadata {
            app: self.app.unwrap_or(defaults.app),
            participant: self.participant.unwrap_or(defaults.participant),
            session: self.session.unwrap_or(defaults.session),
            block: self.block.unwrap_or(defaults.block),
            group: self.group.unwrap_or(defaults.group),
            condition: self.condition.unwrap_or(defaults.condition),
            mode: self.mode.unwrap_or(defaults.mode),
        }
    }
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one sequence per line)
    Ndjson,
    /// JSON array of sequences
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one summary record per line)
    Ndjson,
    /// JSON report
    Json,
    /// Pretty-printed JSON report
    JsonPretty,
    /// sd2 summary CSV (one row per accepted sequence)
    Sd2,
    /// sd1 per-trial CSV (one row per trial of an accepted sequence)
    Sd1,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (sequence document)
    Input,
    /// Output schema (analysis report)
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), FittsCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            input_format,
            output_format,
            config,
            metadata,
            keep_going,
        } => cmd_analyze(
            &input,
            &output,
            input_format,
            output_format,
            config.as_deref(),
            metadata.into_metadata(),
            keep_going,
        ),

        Commands::Validate {
            input,
            input_format,
            tolerance,
            json,
        } => cmd_validate(&input, input_format, tolerance, json),

        Commands::Schema { schema_type, json_schema } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_analyze(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&Path>,
    metadata: SessionMetadata,
    keep_going: bool,
) -> Result<(), FittsCliError> {
    let sequences = read_sequences(input, &input_format)?;
    if sequences.is_empty() {
        return Err(FittsCliError::NoSequences);
    }

    let config = match config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };

    let mut processor = BlockProcessor::new(config, metadata);

    for (index, sequence) in sequences.iter().enumerate() {
        match processor.process(sequence) {
            Ok(SequenceOutcome::Accepted { .. }) => {}
            Ok(SequenceOutcome::Repeat { .. }) => {
                // Logged by the processor; the next sequence is the rerun
            }
            Err(e) if keep_going => {
                warn!(sequence = index, error = %e, "skipping sequence");
            }
            Err(e) => return Err(FittsCliError::Sequence { index, source: e }),
        }
    }

    let output_data = format_output(
        &processor.report(),
        processor.trial_records(),
        &output_format,
    )?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    tolerance: f64,
    json: bool,
) -> Result<(), FittsCliError> {
    let sequences = read_sequences(input, &input_format)?;
    let calculator = ThroughputCalculator::new();

    let mut issues: Vec<ValidationIssue> = Vec::new();
    let mut invalid_sequences = 0;

    for (index, sequence) in sequences.iter().enumerate() {
        let before = issues.len();

        if let Err(e) = calculator.analyze_trials(sequence) {
            issues.push(ValidationIssue {
                sequence: index,
                code: sequence.code().map(str::to_string),
                trial: match e {
                    ThroughputError::MalformedTrial { index, .. } => Some(index),
                    _ => None,
                },
                error: e.to_string(),
            });
        }

        for mismatch in verify_amplitudes(sequence, tolerance) {
            issues.push(ValidationIssue {
                sequence: index,
                code: sequence.code().map(str::to_string),
                trial: Some(mismatch.index),
                error: format!(
                    "amplitude {:.2} px differs from task layout {:.2} px",
                    mismatch.measured, mismatch.expected
                ),
            });
        }

        if issues.len() > before {
            invalid_sequences += 1;
        }
    }

    let report = ValidationReport {
        total_sequences: sequences.len(),
        valid_sequences: sequences.len() - invalid_sequences,
        invalid_sequences,
        tolerance,
        issues,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total sequences:   {}", report.total_sequences);
        println!("Valid sequences:   {}", report.valid_sequences);
        println!("Invalid sequences: {}", report.invalid_sequences);

        if !report.issues.is_empty() {
            println!("\nIssues:");
            for issue in &report.issues {
                let trial = issue
                    .trial
                    .map(|t| format!(", trial {}", t))
                    .unwrap_or_default();
                println!(
                    "  - Sequence {} ({}{}): {}",
                    issue.sequence,
                    issue.code.as_deref().unwrap_or("no code"),
                    trial,
                    issue.error
                );
            }
        }
    }

    if report.invalid_sequences > 0 {
        Err(FittsCliError::ValidationFailed(report.invalid_sequences))
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), FittsCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input: one sequence document per record");
                println!();
                println!("- code: optional participant/device label");
                println!("- condition: {{ amplitude, width }} in pixels (width > 0)");
                println!("- task_type: one_dimensional | two_dimensional");
                println!("- response_type: serial | discrete");
                println!("- trials: at least 2, each containing:");
                println!("  - from: {{ x, y }} center of the origin target");
                println!("  - to: {{ x, y }} center of the aimed-at target");
                println!("  - select: {{ x, y }} finger-lift coordinate");
                println!("  - movement_time_ms: > 0");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output: analysis report");
                println!();
                println!("- producer: {{ name, version, instance_id }}");
                println!("- computed_at_utc: RFC 3339 timestamp");
                println!("- records: one per accepted sequence, containing:");
                println!("  - app, participant, session, block, group, condition, mode");
                println!("  - code, sequence_repeat_count");
                println!("  - metrics: {{ trials, amplitude, width, index_of_difficulty,");
                println!("      effective_amplitude, effective_width, effective_index_of_difficulty,");
                println!("      mean_movement_time_ms, misses, error_rate_percent,");
                println!("      mean_delta_x, sd_x, throughput_bps }}");
                println!();
                println!("sd2 columns: {}", SD2_HEADER.join(","));
                println!("sd1 columns: {}", SD1_HEADER.join(","));
            }
        }
    }

    Ok(())
}

// Helper functions

fn read_sequences(input: &Path, format: &InputFormat) -> Result<Vec<Sequence>, FittsCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let sequences = match format {
        InputFormat::Ndjson => parse_ndjson(&input_data)?,
        InputFormat::Json => parse_array(&input_data)?,
    };
    Ok(sequences)
}

fn format_output(
    report: &AnalysisReport,
    trials: &[TrialRecord],
    format: &OutputFormat,
) -> Result<String, FittsCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for record in &report.records {
                lines.push(serde_json::to_string(record)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(report)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Sd2 => write_csv(
            &SD2_HEADER,
            report.records.iter().map(|record| record.to_sd2_row()),
        ),
        OutputFormat::Sd1 => write_csv(&SD1_HEADER, trials.iter().map(|t| t.to_sd1_row())),
    }
}

fn write_csv(
    header: &[&str],
    rows: impl Iterator<Item = Vec<String>>,
) -> Result<String, FittsCliError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| FittsCliError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| FittsCliError::Encoding(e.to_string()))
}

fn get_input_json_schema() -> String {
    let point = serde_json::json!({
        "type": "object",
        "required": ["x", "y"],
        "properties": {
            "x": { "type": "number" },
            "y": { "type": "number" }
        }
    });

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "fitts.sequence",
        "description": "Recorded sequence of pointing trials",
        "type": "object",
        "required": ["condition", "trials"],
        "properties": {
            "code": { "type": "string" },
            "condition": {
                "type": "object",
                "required": ["amplitude", "width"],
                "properties": {
                    "amplitude": { "type": "number", "minimum": 0 },
                    "width": { "type": "number", "exclusiveMinimum": 0 }
                }
            },
            "task_type": {
                "type": "string",
                "enum": ["one_dimensional", "two_dimensional"],
                "default": "one_dimensional"
            },
            "response_type": {
                "type": "string",
                "enum": ["serial", "discrete"],
                "default": "serial"
            },
            "trials": {
                "type": "array",
                "minItems": 2,
                "items": {
                    "type": "object",
                    "required": ["from", "to", "select", "movement_time_ms"],
                    "properties": {
                        "from": point,
                        "to": point,
                        "select": point,
                        "movement_time_ms": { "type": "number", "exclusiveMinimum": 0 }
                    }
                }
            }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "fitts.analysis_report",
        "description": "Summary records of accepted sequences",
        "type": "object",
        "required": ["producer", "computed_at_utc", "records"],
        "properties": {
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" }
                }
            },
            "computed_at_utc": { "type": "string", "format": "date-time" },
            "records": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "app": { "type": "string" },
                        "participant": { "type": "string" },
                        "session": { "type": "string" },
                        "block": { "type": "string" },
                        "group": { "type": "string" },
                        "condition": { "type": "string" },
                        "mode": { "type": "string" },
                        "code": { "type": "string" },
                        "sequence_repeat_count": { "type": "integer", "minimum": 0 },
                        "metrics": {
                            "type": "object",
                            "properties": {
                                "trials": { "type": "integer" },
                                "amplitude": { "type": "number" },
                                "width": { "type": "number" },
                                "index_of_difficulty": { "type": "number" },
                                "effective_amplitude": { "type": "number" },
                                "effective_width": { "type": "number" },
                                "effective_index_of_difficulty": { "type": "number" },
                                "mean_movement_time_ms": { "type": "number" },
                                "misses": { "type": "integer" },
                                "error_rate_percent": { "type": "number" },
                                "mean_delta_x": { "type": "number" },
                                "sd_x": { "type": "number" },
                                "throughput_bps": { "type": "number" }
                            }
                        }
                    }
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum FittsCliError {
    Io(io::Error),
    Analysis(ThroughputError),
    Sequence { index: usize, source: ThroughputError },
    Json(serde_json::Error),
    Csv(csv::Error),
    Encoding(String),
    NoSequences,
    ValidationFailed(usize),
}

impl From<io::Error> for FittsCliError {
    fn from(e: io::Error) -> Self {
        FittsCliError::Io(e)
    }
}

impl From<ThroughputError> for FittsCliError {
    fn from(e: ThroughputError) -> Self {
        FittsCliError::Analysis(e)
    }
}

impl From<serde_json::Error> for FittsCliError {
    fn from(e: serde_json::Error) -> Self {
        FittsCliError::Json(e)
    }
}

impl From<csv::Error> for FittsCliError {
    fn from(e: csv::Error) -> Self {
        FittsCliError::Csv(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

fn analysis_hint(e: &ThroughputError) -> &'static str {
    match e {
        ThroughputError::ParseError(_) | ThroughputError::JsonError(_) => {
            "Ensure input matches the sequence schema ('fitts schema input')"
        }
        ThroughputError::ConfigError(_) => "Check the configuration file",
        ThroughputError::DegenerateSequence(_) => {
            "Sequence has no spread of selection points; rerun it"
        }
        _ => "Run 'fitts validate' for details, or pass --keep-going to skip bad sequences",
    }
}

impl From<FittsCliError> for CliError {
    fn from(e: FittsCliError) -> Self {
        match e {
            FittsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FittsCliError::Analysis(e) => CliError {
                code: match e {
                    ThroughputError::ParseError(_) | ThroughputError::JsonError(_) => "PARSE_ERROR",
                    ThroughputError::ConfigError(_) => "CONFIG_ERROR",
                    _ => "ANALYSIS_ERROR",
                }
                .to_string(),
                hint: Some(analysis_hint(&e).to_string()),
                message: e.to_string(),
            },
            FittsCliError::Sequence { index, source } => CliError {
                code: "ANALYSIS_ERROR".to_string(),
                hint: Some(analysis_hint(&source).to_string()),
                message: format!("Sequence {}: {}", index, source),
            },
            FittsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            FittsCliError::Csv(e) => CliError {
                code: "CSV_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            FittsCliError::Encoding(msg) => CliError {
                code: "ENCODING_ERROR".to_string(),
                message: msg,
                hint: None,
            },
            FittsCliError::NoSequences => CliError {
                code: "NO_SEQUENCES".to_string(),
                message: "No sequences found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            FittsCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} sequences failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_sequences: usize,
    valid_sequences: usize,
    invalid_sequences: usize,
    tolerance: f64,
    issues: Vec<ValidationIssue>,
}

#[derive(serde::Serialize)]
struct ValidationIssue {
    sequence: usize,
    code: Option<String>,
    trial: Option<usize>,
    error: String,
}
