//! Vitalink CLI - run the telemetry engine against a device transport
//!
//! Commands:
//! - run: ingest frames from a transport path (or stdin) with the daily
//!   flush scheduler attached
//! - parse-check: validate a file of frames and report defects

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use vitalink::config::EngineConfig;
use vitalink::scheduler::DailyFlushScheduler;
use vitalink::{
    AlertError, AlertMessage, EmergencyDispatcher, EngineError, InMemoryGateway, TelemetryEngine,
    VITALINK_VERSION,
};

/// Vitalink - telemetry ingestion and daily aggregation for wearables
#[derive(Parser)]
#[command(name = "vitalink")]
#[command(version = VITALINK_VERSION)]
#[command(about = "Ingest wearable telemetry frames", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine against a device transport
    Run {
        /// Transport path (use - for stdin); falls back to VITALINK_TRANSPORT
        #[arg(short, long)]
        transport: Option<String>,

        /// Alert recipient token to register at startup
        #[arg(long)]
        recipient: Option<String>,

        /// Daily flush time as HH:MM (local clock); falls back to VITALINK_FLUSH_AT
        #[arg(long)]
        flush_at: Option<String>,
    },

    /// Validate a file of frames and report defects
    ParseCheck {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Stand-in dispatcher for the push-notification collaborator: the alert
/// payload goes to the log, where a supervising process can pick it up.
struct LogDispatcher;

impl EmergencyDispatcher for LogDispatcher {
    fn dispatch(&self, _recipient_token: &str, message: &AlertMessage) -> Result<(), AlertError> {
        let payload = serde_json::to_string(message)
            .map_err(|e| AlertError::Dispatch(e.to_string()))?;
        log::error!("EMERGENCY ALERT: {}", payload);
        Ok(())
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run {
            transport,
            recipient,
            flush_at,
        } => cmd_run(transport, recipient, flush_at),
        Commands::ParseCheck { input, json } => cmd_parse_check(&input, json),
    }
}

fn cmd_run(
    transport: Option<String>,
    recipient: Option<String>,
    flush_at: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = EngineConfig::from_env();
    if let Some(path) = transport {
        config.transport = Some(path);
    }
    if let Some(raw) = flush_at {
        config.flush_at = chrono::NaiveTime::parse_from_str(&raw, "%H:%M")
            .map_err(|_| format!("invalid --flush-at '{}', expected HH:MM", raw))?;
    }
    let path = config.require_transport()?.to_string();

    let engine = TelemetryEngine::new(LogDispatcher);
    if let Some(token) = recipient {
        engine.register_recipient(&token);
    }

    let _scheduler = engine.spawn_scheduler(
        DailyFlushScheduler::new(config.flush_at),
        Box::new(InMemoryGateway::new()),
    );

    log::info!("ingesting frames from {}", path);
    let handle = if path == "-" {
        engine.spawn_ingestion(BufReader::new(io::stdin()))
    } else {
        engine.spawn_ingestion(BufReader::new(File::open(&path)?))
    };

    match handle.join() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(EngineError::TransportFatal(reason))) => {
            Err(format!("transport failure: {}", reason).into())
        }
        Err(_) => Err("ingestion thread panicked".into()),
    }
}

fn cmd_parse_check(input: &PathBuf, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(input)?
    };

    let mut report = ParseReport::default();

    for (index, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        report.total_frames += 1;
        match vitalink::parse(line) {
            Ok(frame) => {
                report.events += frame.events.len();
                for warning in frame.warnings {
                    report.warnings.push(LineDefect {
                        line: index + 1,
                        detail: warning.to_string(),
                    });
                }
            }
            Err(e) => {
                report.rejected_frames += 1;
                report.errors.push(LineDefect {
                    line: index + 1,
                    detail: e.to_string(),
                });
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Frame Report");
        println!("============");
        println!("Total frames:    {}", report.total_frames);
        println!("Rejected frames: {}", report.rejected_frames);
        println!("Events decoded:  {}", report.events);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for defect in &report.errors {
                println!("  - line {}: {}", defect.line, defect.detail);
            }
        }
        if !report.warnings.is_empty() {
            println!("\nWarnings:");
            for defect in &report.warnings {
                println!("  - line {}: {}", defect.line, defect.detail);
            }
        }
    }

    if report.rejected_frames > 0 {
        Err(format!("{} frames rejected", report.rejected_frames).into())
    } else {
        Ok(())
    }
}

#[derive(Default, serde::Serialize)]
struct ParseReport {
    total_frames: usize,
    rejected_frames: usize,
    events: usize,
    errors: Vec<LineDefect>,
    warnings: Vec<LineDefect>,
}

#[derive(serde::Serialize)]
struct LineDefect {
    line: usize,
    detail: String,
}
