//! Materialization: create a plan's directories and generate its files.
//!
//! A run has two stages with different failure policies:
//!
//! 1. **Directories** -- the plan's directories plus the parent of every
//!    selected file are created up front. Any creation error aborts the run
//!    before a single file is touched.
//! 2. **Files** -- each selected file is handled in order, one backend
//!    round-trip at a time. Failures (path outside the root, empty reply,
//!    write error) are recorded and the loop moves on. Only a `Cancel`
//!    answer from the conflict prompt stops it early.
//!
//! Nothing is rolled back: files written before a cancel stay on disk.

pub mod paths;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::Backend;
use crate::conflict::{ConflictAction, ConflictMode, ConflictPrompter, ConflictResolver};
use crate::plan::{FileSpec, Plan, normalize_path};

use paths::{absolute_root, resolve_within};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("cannot resolve project root {path}: {source}")]
    ProjectRoot {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize plan for generation: {0}")]
    SerializePlan(#[from] serde_json::Error),
}

/// Why a single file was not written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The resolved path is not inside the project root.
    OutsideRoot,
    /// The resolved path is the project root itself.
    IsProjectRoot,
    /// The backend replied with nothing.
    EmptyContent,
    /// The backend request itself failed.
    Backend(String),
    /// Writing the generated content failed.
    Write(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutsideRoot => write!(f, "path resolves outside the project root"),
            Self::IsProjectRoot => write!(f, "path resolves to the project root itself"),
            Self::EmptyContent => write!(f, "backend returned no content"),
            Self::Backend(e) => write!(f, "generation failed: {e}"),
            Self::Write(e) => write!(f, "write failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub reason: FailureReason,
}

/// Outcome of a materialization run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    /// Correlates the log lines of one run.
    pub run_id: Uuid,
    pub generated: usize,
    pub skipped: usize,
    pub failures: Vec<FileFailure>,
    /// The conflict prompt was answered with `Cancel` (or dismissed).
    pub cancelled: bool,
}

/// User-facing digest of a [`RunResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSummary {
    NothingGenerated,
    Completed { generated: usize, skipped: usize },
}

impl RunResult {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated: 0,
            skipped: 0,
            failures: vec![],
            cancelled: false,
        }
    }

    fn fail(&mut self, path: &str, reason: FailureReason) {
        warn!(run_id = %self.run_id, path, reason = %reason, "file not generated");
        self.failures.push(FileFailure {
            path: path.to_string(),
            reason,
        });
    }

    pub fn summary(&self) -> RunSummary {
        if self.generated == 0 {
            RunSummary::NothingGenerated
        } else {
            RunSummary::Completed {
                generated: self.generated,
                skipped: self.skipped,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Prompt construction
// ---------------------------------------------------------------------------

/// Build the prompt for generating a single file.
///
/// `plan_json` is the whole plan, serialized once per run.
pub fn build_file_prompt(plan_json: &str, spec: &FileSpec) -> String {
    let mut prompt = String::with_capacity(plan_json.len() + 1024);

    prompt.push_str("# Generate One Project File\n\n");
    prompt.push_str(&format!(
        "Write the complete contents of `{}`. \
         Respond with ONLY the raw file contents: no markdown fences, \
         no explanations, nothing before or after the file.\n\n",
        spec.path
    ));

    prompt.push_str("## Target File\n\n");
    prompt.push_str(&format!("- **Path:** `{}`\n", spec.path));
    prompt.push_str(&format!("- **Purpose:** {}\n", spec.purpose));
    prompt.push_str(&format!("- **Language:** {}\n", spec.language));
    if spec.dependencies.is_empty() {
        prompt.push_str("- **Dependencies:** none\n");
    } else {
        prompt.push_str(&format!(
            "- **Dependencies:** {}\n",
            spec.dependencies.join(", ")
        ));
    }

    prompt.push_str("\n## Full Project Plan\n\n");
    prompt.push_str("```json\n");
    prompt.push_str(plan_json);
    prompt.push_str("\n```\n");

    prompt
}

/// Remove one markdown fence wrapping the entire reply, if present.
///
/// The reply must open and close with the same fence: any other fence line
/// inside means it holds several blocks, and it is returned untouched.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return content;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return content;
    };
    // Drop the info string (e.g. "rust") on the opening fence line.
    let Some(newline) = body.find('\n') else {
        return content;
    };
    let inner = &body[newline + 1..];
    if inner.lines().any(|line| line.trim_start().starts_with("```")) {
        return content;
    }
    inner.trim_end_matches([' ', '\t'])
}

// ---------------------------------------------------------------------------
// Materializer
// ---------------------------------------------------------------------------

/// Drives a plan onto disk using a backend for file contents and a prompter
/// for conflicts.
pub struct Materializer<'a> {
    backend: &'a dyn Backend,
    prompter: &'a dyn ConflictPrompter,
}

impl<'a> Materializer<'a> {
    pub fn new(backend: &'a dyn Backend, prompter: &'a dyn ConflictPrompter) -> Self {
        Self { backend, prompter }
    }

    /// Materialize `selected_files` from `plan` under `project_root`.
    ///
    /// Files are processed strictly in the given order; each backend call
    /// finishes (and its file is written or skipped) before the next begins.
    pub async fn run(
        &self,
        plan: &Plan,
        selected_files: &[String],
        project_root: &Path,
        mode: ConflictMode,
    ) -> Result<RunResult, MaterializeError> {
        let root = absolute_root(project_root)?;
        let mut result = RunResult::new();
        info!(
            run_id = %result.run_id,
            root = %root.display(),
            files = selected_files.len(),
            mode = %mode,
            "materialization started"
        );

        create_directories(plan, selected_files, &root)?;

        let plan_json = serde_json::to_string_pretty(plan)?;
        let mut resolver = ConflictResolver::new(mode, self.prompter);

        for selected in selected_files {
            let normalized = normalize_path(selected, false).ok();
            let relative = normalized.as_deref().unwrap_or(selected.as_str());

            let Some(target) = resolve_within(&root, relative) else {
                result.fail(selected, FailureReason::OutsideRoot);
                continue;
            };
            if target == root {
                result.fail(selected, FailureReason::IsProjectRoot);
                continue;
            }

            if target.exists() {
                match resolver.decide(relative).await {
                    ConflictAction::Write => {}
                    ConflictAction::SkipFile => {
                        debug!(path = relative, "existing file skipped");
                        result.skipped += 1;
                        continue;
                    }
                    ConflictAction::CancelRun => {
                        info!(run_id = %result.run_id, path = relative, "run cancelled at conflict prompt");
                        result.cancelled = true;
                        break;
                    }
                }
            }

            let spec = normalized
                .as_deref()
                .and_then(|p| plan.file(p))
                .cloned()
                .unwrap_or_else(|| FileSpec::placeholder(relative));

            let reply = match self.backend.complete(&build_file_prompt(&plan_json, &spec)).await {
                Ok(Some(text)) => text,
                Ok(None) => {
                    result.fail(relative, FailureReason::EmptyContent);
                    continue;
                }
                Err(e) => {
                    result.fail(relative, FailureReason::Backend(format!("{e:#}")));
                    continue;
                }
            };

            let body = strip_code_fence(&reply);
            if body.trim().is_empty() {
                result.fail(relative, FailureReason::EmptyContent);
                continue;
            }

            if let Err(e) = std::fs::write(&target, body) {
                result.fail(relative, FailureReason::Write(e.to_string()));
                continue;
            }

            info!(path = relative, bytes = body.len(), "file generated");
            result.generated += 1;
        }

        match result.summary() {
            RunSummary::NothingGenerated => {
                warn!(run_id = %result.run_id, skipped = result.skipped, "no files were generated");
            }
            RunSummary::Completed { generated, skipped } => {
                info!(run_id = %result.run_id, generated, skipped, "materialization finished");
            }
        }

        Ok(result)
    }
}

/// The directories a run needs: the plan's own, then the parent of each
/// selected file. Insertion-ordered, without duplicates, root excluded.
pub fn collect_directories(plan: &Plan, selected_files: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dirs = Vec::new();

    let parents = selected_files.iter().filter_map(|selected| {
        let relative = normalize_path(selected, false).unwrap_or_else(|_| selected.clone());
        Path::new(&relative)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
    });

    for dir in plan.directories().iter().cloned().chain(parents) {
        if dir.is_empty() {
            continue;
        }
        if seen.insert(dir.clone()) {
            dirs.push(dir);
        }
    }
    dirs
}

/// Create every directory the run needs under `root`.
///
/// Existing directories are left alone, so calling this twice is harmless.
/// Directories that would land outside `root` are never created. Returns the
/// number of directories created.
pub fn create_directories(
    plan: &Plan,
    selected_files: &[String],
    root: &Path,
) -> Result<usize, MaterializeError> {
    let root = absolute_root(root)?;
    let mut created = 0;

    for dir in collect_directories(plan, selected_files) {
        let Some(path) = resolve_within(&root, &dir) else {
            warn!(dir = %dir, "directory resolves outside the project root, not creating");
            continue;
        };
        if path.exists() {
            continue;
        }
        std::fs::create_dir_all(&path).map_err(|source| MaterializeError::CreateDirectory {
            path: path.clone(),
            source,
        })?;
        debug!(dir = %path.display(), "directory created");
        created += 1;
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::validate_plan;
    use serde_json::json;

    fn plan_with(directories: serde_json::Value, files: serde_json::Value) -> Plan {
        validate_plan(&json!({
            "version": "1.0.0",
            "projectName": "demo",
            "description": "demo project",
            "directories": directories,
            "files": files,
            "steps": [],
            "dependencies": [],
            "metadata": {}
        }))
        .unwrap()
    }

    fn paths(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    // -- build_file_prompt ---------------------------------------------------

    #[test]
    fn file_prompt_names_target_and_embeds_plan() {
        let spec = FileSpec {
            path: "src/app.ts".to_string(),
            purpose: "entry point".to_string(),
            language: "typescript".to_string(),
            dependencies: vec!["src/util.ts".to_string()],
            overwrite_hint: false,
        };
        let prompt = build_file_prompt("{\"projectName\":\"demo\"}", &spec);
        assert!(prompt.contains("`src/app.ts`"));
        assert!(prompt.contains("**Purpose:** entry point"));
        assert!(prompt.contains("**Language:** typescript"));
        assert!(prompt.contains("**Dependencies:** src/util.ts"));
        assert!(prompt.contains("{\"projectName\":\"demo\"}"));
        assert!(prompt.contains("ONLY the raw file contents"));
    }

    #[test]
    fn file_prompt_handles_no_dependencies() {
        let prompt = build_file_prompt("{}", &FileSpec::placeholder("x.txt"));
        assert!(prompt.contains("**Dependencies:** none"));
        assert!(prompt.contains("**Purpose:** Generated file"));
    }

    // -- strip_code_fence ----------------------------------------------------

    #[test]
    fn strips_wrapping_fence_with_language() {
        let reply = "```rust\nfn main() {}\n```";
        assert_eq!(strip_code_fence(reply), "fn main() {}\n");
    }

    #[test]
    fn leaves_unfenced_content_alone() {
        let reply = "# Title\n\n```sh\nmake\n```\nmore text\n";
        assert_eq!(strip_code_fence(reply), reply);
    }

    #[test]
    fn leaves_multiple_blocks_alone() {
        let reply = "```sh\nmake\n```\n\nSome docs.\n\n```sh\nmake test\n```";
        assert_eq!(strip_code_fence(reply), reply);
    }

    #[test]
    fn bare_fence_strips_to_nothing() {
        assert_eq!(strip_code_fence("```\n```"), "");
    }

    #[test]
    fn leaves_single_line_fence_alone() {
        assert_eq!(strip_code_fence("```x```"), "```x```");
    }

    // -- collect_directories -------------------------------------------------

    #[test]
    fn directories_include_parents_of_selected_files() {
        let plan = plan_with(json!(["src"]), json!([]));
        let dirs = collect_directories(&plan, &paths(&["src/a.ts", "lib/deep/b.ts", "README.md"]));
        assert_eq!(dirs, vec!["src", "lib/deep"]);
    }

    #[test]
    fn directories_are_deduplicated_in_insertion_order() {
        let plan = plan_with(json!(["tests", "src"]), json!([]));
        let dirs = collect_directories(&plan, &paths(&["./src/a.ts", "docs/x.md", "docs/y.md"]));
        // Plan directories come first (set order), then new parents.
        assert_eq!(dirs, vec!["src", "tests", "docs"]);
    }

    // -- RunResult -----------------------------------------------------------

    #[test]
    fn summary_distinguishes_nothing_generated() {
        let mut result = RunResult::new();
        result.skipped = 3;
        assert_eq!(result.summary(), RunSummary::NothingGenerated);

        result.generated = 2;
        assert_eq!(
            result.summary(),
            RunSummary::Completed {
                generated: 2,
                skipped: 3
            }
        );
    }

    #[test]
    fn failure_reason_display() {
        assert_eq!(
            FailureReason::OutsideRoot.to_string(),
            "path resolves outside the project root"
        );
        assert_eq!(
            FailureReason::Write("denied".to_string()).to_string(),
            "write failed: denied"
        );
    }
}
