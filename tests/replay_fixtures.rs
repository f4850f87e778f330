use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use libtest_mimic::{Arguments, Failed, Trial};
use readalong_rs::replay::{run_replay, ReplayReport, ReplayScript};
use readalong_rs::{EngineConfig, Progress, WordState};
use serde::Deserialize;

const SUITE_NAME: &str = "replay_fixture_matches_expectation";

#[derive(Debug, Deserialize)]
struct ReplayFixture {
    #[serde(default)]
    config: EngineConfig,
    script: ReplayScript,
    expect: Expectation,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Expectation {
    cursor: Option<usize>,
    cursor_none: bool,
    progress: Option<Progress>,
    matched: Vec<usize>,
    missed: Vec<usize>,
    pending: Vec<usize>,
    rollbacks: Option<usize>,
    restarts: Option<usize>,
    pending_gap: Option<bool>,
}

fn main() {
    let args = Arguments::from_args();
    let repo_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let fixture_dir = repo_root.join("test-data/replays");

    let paths = match list_fixtures(&fixture_dir) {
        Ok(paths) => paths,
        Err(err) => {
            run_setup_failure(&args, err);
            return;
        }
    };
    if paths.is_empty() {
        run_setup_failure(
            &args,
            "No replay fixtures found under test-data/replays.".to_string(),
        );
        return;
    }

    let tests = paths
        .into_iter()
        .map(|path| {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            Trial::test(format!("{SUITE_NAME}::{name}"), move || {
                run_fixture(&path).map_err(Failed::from)
            })
        })
        .collect();
    libtest_mimic::run(&args, tests).exit();
}

fn run_setup_failure(args: &Arguments, message: String) {
    let test = Trial::test(format!("{SUITE_NAME}::setup"), move || {
        Err(Failed::from(message))
    });
    libtest_mimic::run(args, vec![test]).exit();
}

fn list_fixtures(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let entries = fs::read_dir(dir)
        .map_err(|err| format!("Failed to read fixture dir '{}': {err}", dir.display()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|err| format!("Failed to list fixture dir '{}': {err}", dir.display()))?
            .path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn load_fixture(path: &Path) -> Result<ReplayFixture, String> {
    let file = File::open(path)
        .map_err(|err| format!("Failed to open fixture '{}': {err}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|err| format!("Failed to parse fixture '{}': {err}", path.display()))
}

fn run_fixture(path: &Path) -> Result<(), String> {
    let fixture = load_fixture(path)?;
    let report = run_replay(&fixture.script, fixture.config, "fixture".to_string())
        .map_err(|err| format!("Replay failed: {err}"))?;
    check_expectation(&fixture.expect, &report)
}

fn check_expectation(expect: &Expectation, report: &ReplayReport) -> Result<(), String> {
    let state = &report.final_state;
    if let Some(cursor) = expect.cursor {
        if state.cursor != Some(cursor) {
            return Err(format!("cursor: expected {cursor}, got {:?}", state.cursor));
        }
    }
    if expect.cursor_none && state.cursor.is_some() {
        return Err(format!("cursor: expected none, got {:?}", state.cursor));
    }
    if let Some(progress) = expect.progress {
        if state.progress != progress {
            return Err(format!(
                "progress: expected {progress:?}, got {:?}",
                state.progress
            ));
        }
    }
    for (indices, wanted) in [
        (&expect.matched, WordState::Matched),
        (&expect.missed, WordState::Missed),
        (&expect.pending, WordState::Pending),
    ] {
        for &index in indices {
            let got = state.word_states.get(index).copied();
            if got != Some(wanted) {
                return Err(format!("word {index}: expected {wanted:?}, got {got:?}"));
            }
        }
    }
    if let Some(rollbacks) = expect.rollbacks {
        let got = report.highlight_count("rollback");
        if got != rollbacks {
            return Err(format!("rollbacks: expected {rollbacks}, got {got}"));
        }
    }
    if let Some(restarts) = expect.restarts {
        if report.restarts.len() != restarts {
            return Err(format!(
                "restarts: expected {restarts}, got {}",
                report.restarts.len()
            ));
        }
    }
    if let Some(gap) = expect.pending_gap {
        if state.pending_gap != gap {
            return Err(format!(
                "pending_gap: expected {gap}, got {}",
                state.pending_gap
            ));
        }
    }
    Ok(())
}
