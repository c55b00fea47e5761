//! Pulsecam CLI - Command-line interface for Pulsecam
//!
//! Commands:
//! - replay: Run a recorded frame-event stream through a monitor
//! - validate: Validate frame-event schema
//! - config: Print the default monitor configuration
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pulsecam::encoder::{MonitorReport, SnapshotEncoder};
use pulsecam::logging::{init_tracing, LogConfig};
use pulsecam::pipeline;
use pulsecam::schema::{FrameEventAdapter, SCHEMA_VERSION};
use pulsecam::{MonitorConfig, PRODUCER_NAME, PULSECAM_VERSION};

/// Pulsecam - Camera-only vital signs and drowsiness estimation
#[derive(Parser)]
#[command(name = "pulsecam")]
#[command(version = PULSECAM_VERSION)]
#[command(about = "Estimate vitals and drowsiness from recorded face signals", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Write logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a frame-event recording and emit reports
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Monitor configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Validate frame-event schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default monitor configuration
    Config,

    /// Diagnose configuration and environment
    Doctor {
        /// Check a monitor configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one report per line)
    Ndjson,
    /// JSON array of reports
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(&LogConfig {
        log_level: cli.log_level.clone(),
        json: cli.log_json,
    });

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PulsecamCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            config,
            output_format,
        } => cmd_replay(&input, &output, config.as_deref(), output_format),

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Config => cmd_config(),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    config: Option<&Path>,
    output_format: OutputFormat,
) -> Result<(), PulsecamCliError> {
    let config = match config {
        Some(path) => MonitorConfig::from_file(path)?,
        None => MonitorConfig::default(),
    };

    let events = FrameEventAdapter::parse(&read_input(input)?)?;
    if events.is_empty() {
        return Err(PulsecamCliError::NoEvents);
    }

    let summary = pipeline::replay(&events, &config)?;
    for failure in &summary.failures {
        tracing::warn!(t_ms = failure.t_ms, error = %failure.error, "session produced no report");
    }

    let reports = summary.to_reports(&SnapshotEncoder::new());
    let output_data = format_output(&reports, &output_format)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), PulsecamCliError> {
    let events = FrameEventAdapter::parse(&read_input(input)?)?;
    let results = FrameEventAdapter::validate_events(&events);

    let mut invalid_indices: Vec<usize> = results.iter().map(|r| r.index).collect();
    invalid_indices.dedup();

    let report = ValidationReport {
        schema: SCHEMA_VERSION.to_string(),
        total_events: events.len(),
        valid_events: events.len() - invalid_indices.len(),
        invalid_events: invalid_indices.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                t_ms: r.t_ms,
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Schema:         {}", report.schema);
        println!("Total events:   {}", report.total_events);
        println!("Valid events:   {}", report.valid_events);
        println!("Invalid events: {}", report.invalid_events);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Event {} at {} ms: {}", err.index, err.t_ms, err.error);
            }
        }
    }

    if report.invalid_events > 0 {
        Err(PulsecamCliError::ValidationFailed(report.invalid_events))
    } else {
        Ok(())
    }
}

fn cmd_config() -> Result<(), PulsecamCliError> {
    println!("{}", MonitorConfig::default().to_json_pretty()?);
    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), PulsecamCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "pulsecam_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Pulsecam version {}", PULSECAM_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", SCHEMA_VERSION),
    });

    let config_check = match config {
        None => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "Using built-in defaults".to_string(),
        },
        Some(path) if !path.exists() => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Config file does not exist".to_string(),
        },
        Some(path) => match MonitorConfig::from_file(path) {
            Ok(config) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Config valid ({} samples per session, {} frame EAR window)",
                    config.vitals.session_capacity(),
                    config.drowsiness.ear_window_frames()
                ),
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        },
    };
    checks.push(config_check);

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass recordings with -i <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for -i -)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: PULSECAM_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Pulsecam Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PulsecamCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, PulsecamCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn format_output(
    reports: &[MonitorReport],
    format: &OutputFormat,
) -> Result<String, PulsecamCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for report in reports {
                lines.push(serde_json::to_string(report)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(reports)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(reports)?),
    }
}

// Error types

#[derive(Debug)]
enum PulsecamCliError {
    Io(io::Error),
    Compute(pulsecam::ComputeError),
    Json(serde_json::Error),
    NoEvents,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for PulsecamCliError {
    fn from(e: io::Error) -> Self {
        PulsecamCliError::Io(e)
    }
}

impl From<pulsecam::ComputeError> for PulsecamCliError {
    fn from(e: pulsecam::ComputeError) -> Self {
        PulsecamCliError::Compute(e)
    }
}

impl From<serde_json::Error> for PulsecamCliError {
    fn from(e: serde_json::Error) -> Self {
        PulsecamCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PulsecamCliError> for CliError {
    fn from(e: PulsecamCliError) -> Self {
        match e {
            PulsecamCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PulsecamCliError::Compute(pulsecam::ComputeError::InvalidConfig(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'pulsecam config' for a valid starting point".to_string()),
            },
            PulsecamCliError::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches the {} schema", SCHEMA_VERSION)),
            },
            PulsecamCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PulsecamCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            PulsecamCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} events failed validation", count),
                hint: Some("Run 'pulsecam validate' for details".to_string()),
            },
            PulsecamCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    schema: String,
    total_events: usize,
    valid_events: usize,
    invalid_events: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    t_ms: u64,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
