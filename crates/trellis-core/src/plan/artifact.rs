//! The persisted plan artifact.
//!
//! Before anything is materialized, the validated plan is written as pretty
//! JSON to [`PLAN_ARTIFACT_PATH`] under the project root so a run can be
//! audited (or re-applied) later. Loading goes back through the validator;
//! an edited artifact gets no more trust than a fresh generator reply.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use super::model::Plan;
use super::validate::validate_plan;

/// Location of the plan artifact, relative to the project root.
pub const PLAN_ARTIFACT_PATH: &str = ".trellis/plan.json";

/// Absolute location of the plan artifact for a project root.
pub fn artifact_path(project_root: &Path) -> PathBuf {
    project_root.join(PLAN_ARTIFACT_PATH)
}

/// Write the plan to its well-known location under `project_root`.
///
/// Returns the path written.
pub fn save_plan(project_root: &Path, plan: &Plan) -> Result<PathBuf> {
    let path = artifact_path(project_root);
    write_plan(&path, plan)?;
    Ok(path)
}

/// Write the plan as pretty JSON to an arbitrary path.
pub fn write_plan(path: &Path, plan: &Plan) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create plan directory {}", dir.display()))?;
    }

    let mut contents = serde_json::to_string_pretty(plan).context("failed to serialize plan")?;
    contents.push('\n');
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write plan artifact at {}", path.display()))?;

    info!(path = %path.display(), "plan artifact written");
    Ok(())
}

/// Read and re-validate a plan artifact.
pub fn load_plan(path: &Path) -> Result<Plan> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read plan file at {}", path.display()))?;
    let raw: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("plan file at {} is not valid JSON", path.display()))?;
    let plan = validate_plan(&raw)
        .with_context(|| format!("plan file at {} is invalid", path.display()))?;
    Ok(plan)
}
