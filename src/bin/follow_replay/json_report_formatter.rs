use std::fs;
use std::io::{self, Write};
use std::path::Path;

use readalong_rs::replay::ReplayReport;

fn render(report: &ReplayReport) -> Result<Vec<u8>, String> {
    let mut json = serde_json::to_vec_pretty(report)
        .map_err(|err| format!("Failed to serialize replay report: {err}"))?;
    json.push(b'\n');
    Ok(json)
}

/// Writes the report to `path`, creating missing parent directories.
pub fn write_report(path: &Path, report: &ReplayReport) -> Result<(), String> {
    let json = render(report)?;
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .map_err(|err| format!("Failed to create '{}': {err}", dir.display()))?;
    }
    fs::write(path, json)
        .map_err(|err| format!("Failed to write replay report '{}': {err}", path.display()))
}

pub fn print_report(report: &ReplayReport) -> Result<(), String> {
    let json = render(report)?;
    io::stdout()
        .lock()
        .write_all(&json)
        .map_err(|err| format!("Failed to print replay report: {err}"))
}
