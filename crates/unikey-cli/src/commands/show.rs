//! Show command - render a saved report.

use std::path::PathBuf;

use unikey::report::render_text;
use unikey::AnalysisResult;

pub fn run(report: PathBuf, trace: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !report.exists() {
        return Err(format!("Report not found: {}", report.display()).into());
    }

    let result = AnalysisResult::load(&report)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_text(&result, trace));
    }

    Ok(())
}
