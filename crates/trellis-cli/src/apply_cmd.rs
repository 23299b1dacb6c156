//! CLI handlers that write scaffolds to disk: `trellis apply` and `trellis new`.

use std::path::Path;

use anyhow::Result;
use tracing::debug;

use trellis_core::materialize::{Materializer, RunResult, RunSummary};
use trellis_core::plan::{Plan, artifact_path, load_plan, save_plan};

use crate::config::TrellisConfig;
use crate::plan_cmds::{acquire_or_bail, backend_from_config};
use crate::prompt::StdinPrompter;

/// Materialize a persisted plan.
pub async fn run_apply(
    config: &TrellisConfig,
    root: &Path,
    plan_file: Option<&Path>,
    only: &[String],
) -> Result<()> {
    let path = plan_file
        .map(Path::to_path_buf)
        .unwrap_or_else(|| artifact_path(root));
    let plan = load_plan(&path)?;

    materialize(config, &plan, root, only).await
}

/// Acquire a plan, persist it, then materialize it.
pub async fn run_new(
    config: &TrellisConfig,
    description: &str,
    root: &Path,
    only: &[String],
) -> Result<()> {
    let plan = acquire_or_bail(config, description).await?;
    let saved = save_plan(root, &plan)?;
    println!("Plan for {} saved to {}", plan.project_name(), saved.display());

    materialize(config, &plan, root, only).await
}

async fn materialize(
    config: &TrellisConfig,
    plan: &Plan,
    root: &Path,
    only: &[String],
) -> Result<()> {
    let selection = select_files(plan, only);
    debug!(files = selection.len(), root = %root.display(), "file selection resolved");
    let backend = backend_from_config(config);
    let prompter = StdinPrompter;

    let result = Materializer::new(&backend, &prompter)
        .run(plan, &selection, root, config.conflict_mode)
        .await?;

    print_report(&result);
    Ok(())
}

/// `--only` paths when given, otherwise every planned file in plan order.
fn select_files(plan: &Plan, only: &[String]) -> Vec<String> {
    if only.is_empty() {
        plan.file_paths()
    } else {
        only.to_vec()
    }
}

fn print_report(result: &RunResult) {
    println!();
    match result.summary() {
        RunSummary::NothingGenerated => println!("No files were generated."),
        RunSummary::Completed { generated, skipped } => {
            println!("Generated {generated} file(s), skipped {skipped}.");
        }
    }

    if !result.failures.is_empty() {
        println!();
        println!("Failures:");
        for failure in &result.failures {
            println!("  - {}: {}", failure.path, failure.reason);
        }
    }

    if result.cancelled {
        println!();
        println!("Cancelled. Files written before the cancel were kept.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trellis_core::plan::validate_plan;

    fn plan() -> Plan {
        validate_plan(&json!({
            "version": "1.0.0",
            "projectName": "demo",
            "description": "demo",
            "directories": [],
            "files": [{"path": "b.txt"}, {"path": "a.txt"}],
            "steps": [],
            "dependencies": [],
            "metadata": {}
        }))
        .unwrap()
    }

    #[test]
    fn default_selection_is_plan_order() {
        assert_eq!(select_files(&plan(), &[]), vec!["b.txt", "a.txt"]);
    }

    #[test]
    fn only_overrides_selection() {
        let only = vec!["a.txt".to_string(), "extra.md".to_string()];
        assert_eq!(select_files(&plan(), &only), only);
    }
}
