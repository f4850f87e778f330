use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, ValueEnum};
use readalong_rs::replay::{run_replay, ReplayScript};
use readalong_rs::{EngineConfig, RecognitionMode};
use tracing_subscriber::EnvFilter;

#[path = "follow_replay/json_report_formatter.rs"]
mod json_report_formatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeChoice {
    Precise,
    Speed,
}

impl ModeChoice {
    fn mode(self) -> RecognitionMode {
        match self {
            Self::Precise => RecognitionMode::Precise,
            Self::Speed => RecognitionMode::Speed,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "follow_replay")]
#[command(about = "Replay a scripted read-along session and report every highlight decision")]
struct Args {
    /// Replay script (JSON): reference text plus timed recognizer steps.
    #[arg(long, env = "READALONG_REPLAY_SCRIPT")]
    script: PathBuf,
    /// Engine config (JSON); defaults are used for missing fields.
    #[arg(long, env = "READALONG_CONFIG")]
    config: Option<PathBuf>,
    /// Overrides both the config and the script's mode.
    #[arg(long, value_enum)]
    mode: Option<ModeChoice>,
    /// Report path; printed to stdout when omitted.
    #[arg(long, env = "READALONG_REPLAY_OUT")]
    out: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();

    let config = match args.config.as_ref() {
        Some(path) => EngineConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => EngineConfig::default(),
    };
    let mut script = ReplayScript::load(&args.script)
        .map_err(|err| format!("Failed to load script '{}': {err}", args.script.display()))?;
    if let Some(choice) = args.mode {
        script.mode = Some(choice.mode());
    }

    let report = run_replay(&script, config, Utc::now().to_rfc3339())
        .map_err(|err| format!("Replay failed: {err}"))?;
    tracing::info!(
        events = report.events.len(),
        cursor = ?report.final_state.cursor,
        "replay complete"
    );

    match args.out.as_ref() {
        Some(path) => json_report_formatter::write_report(path, &report),
        None => json_report_formatter::print_report(&report),
    }
}
