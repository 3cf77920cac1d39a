//! Recompute the summary of a session export.

use std::path::PathBuf;

use faceit_analytics::SessionAnalyzer;
use faceit_common::config::AppConfig;
use faceit_session_model::SessionExport;

pub fn run(config: &AppConfig, path: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    let export =
        SessionExport::load(&path).map_err(|e| anyhow::anyhow!("Failed to load export: {e}"))?;
    let data = export.data();
    if let Err(violation) = data.check_invariants() {
        tracing::warn!(
            path = %path.display(),
            %violation,
            "Export is inconsistent; analyzing anyway"
        );
    }

    let summary = SessionAnalyzer::new(config.analytics.clone()).summarize(&data);

    match output {
        Some(out) => {
            summary
                .write_to(&out)
                .map_err(|e| anyhow::anyhow!("Failed to write summary: {e}"))?;
            println!("Summary saved to: {}", out.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}
