//! CLI handlers for plan acquisition and inspection.
//!
//! Implements:
//! - `trellis plan <description>` -- acquire, validate, and persist a plan
//! - `trellis show`               -- print a persisted plan

use std::path::Path;

use anyhow::{Result, bail};

use trellis_core::backend::ClaudeCodeBackend;
use trellis_core::plan::{Plan, acquire_plan_detailed, artifact_path, load_plan, save_plan, write_plan};

use crate::config::TrellisConfig;

/// Build the backend the resolved config points at.
pub fn backend_from_config(config: &TrellisConfig) -> ClaudeCodeBackend {
    ClaudeCodeBackend::with_binary(&config.backend_binary).model(config.model.clone())
}

/// Acquire a plan or fail with the reason it was rejected.
pub async fn acquire_or_bail(config: &TrellisConfig, description: &str) -> Result<Plan> {
    let backend = backend_from_config(config);
    match acquire_plan_detailed(&backend, description).await {
        Ok(plan) => Ok(plan),
        Err(e) => bail!("no plan produced: {e}"),
    }
}

// -----------------------------------------------------------------------
// trellis plan <description>
// -----------------------------------------------------------------------

pub async fn run_plan(
    config: &TrellisConfig,
    description: &str,
    root: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let plan = acquire_or_bail(config, description).await?;

    let written = match output {
        Some(path) => {
            write_plan(path, &plan)?;
            path.to_path_buf()
        }
        None => save_plan(root, &plan)?,
    };

    println!("Plan created successfully.");
    println!();
    print_summary(&plan);
    println!();
    println!("Saved to {}", written.display());

    Ok(())
}

// -----------------------------------------------------------------------
// trellis show
// -----------------------------------------------------------------------

pub fn run_show(root: &Path, plan_file: Option<&Path>) -> Result<()> {
    let path = plan_file
        .map(Path::to_path_buf)
        .unwrap_or_else(|| artifact_path(root));
    let plan = load_plan(&path)?;

    print_summary(&plan);

    if !plan.directories().is_empty() {
        println!();
        println!("Directories:");
        for dir in plan.directories() {
            println!("  {dir}/");
        }
    }

    if !plan.files().is_empty() {
        println!();
        println!("Files:");
        let path_w = plan.files().iter().map(|f| f.path.len()).max().unwrap_or(4).max(4);
        for file in plan.files() {
            let overwrite = if file.overwrite_hint { "  (overwrite)" } else { "" };
            println!(
                "  {:<path_w$}  [{}] {}{overwrite}",
                file.path, file.language, file.purpose
            );
        }
    }

    if !plan.steps().is_empty() {
        println!();
        println!("Steps:");
        for step in plan.steps() {
            println!("  {}. {} ({})", step.id, step.name, step.action);
        }
    }

    if !plan.dependencies().is_empty() {
        println!();
        let deps: Vec<String> = plan
            .dependencies()
            .iter()
            .map(|d| d.as_str().map_or_else(|| d.to_string(), str::to_string))
            .collect();
        println!("Dependencies: {}", deps.join(", "));
    }

    Ok(())
}

fn print_summary(plan: &Plan) {
    let meta = plan.metadata();
    println!("  Project:      {}", plan.project_name());
    println!("  Description:  {}", plan.description());
    println!("  Version:      {}", plan.version());
    println!("  Directories:  {}", plan.directories().len());
    println!("  Files:        {}", plan.files().len());
    println!("  Steps:        {}", plan.steps().len());
    if !meta.generated_at.is_empty() {
        println!("  Generated at: {}", meta.generated_at);
    }
    if !meta.model.is_empty() {
        println!("  Model:        {}", meta.model);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::backend::Backend;
    use trellis_core::conflict::ConflictMode;

    fn config(binary: &str) -> TrellisConfig {
        TrellisConfig {
            backend_binary: binary.to_string(),
            model: Some("sonnet".to_string()),
            conflict_mode: ConflictMode::Ask,
        }
    }

    #[test]
    fn backend_uses_configured_binary() {
        let backend = backend_from_config(&config("/opt/bin/claude"));
        assert_eq!(backend.binary_path(), "/opt/bin/claude");
        assert_eq!(backend.name(), "claude-code");
    }

    #[tokio::test]
    async fn acquire_reports_backend_failure() {
        let err = acquire_or_bail(&config("/nonexistent/claude"), "x")
            .await
            .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("no plan produced"), "got: {msg}");
        assert!(msg.contains("failed to spawn claude binary"), "got: {msg}");
    }

    #[test]
    fn show_missing_artifact_is_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = run_show(tmp.path(), None).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read plan file"));
    }
}
