//! Plan acquisition: prompt construction, lenient JSON extraction, and a
//! single repair round-trip.
//!
//! ```text
//! description --plan prompt--> Backend --text--> parse --ok--> validate
//!                                                  |
//!                                               unparsed
//!                                                  |
//!                              Backend <--repair prompt (once)
//!                                 |
//!                               text --> parse --> validate
//! ```

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::Backend;

use super::model::Plan;
use super::validate::{PLAN_VERSION, PlanValidationError, validate_plan};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Why acquisition produced no plan.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("backend returned no text")]
    EmptyResponse,

    #[error("backend reply is not valid JSON, even after one repair attempt")]
    Unparseable,

    #[error("generated plan is invalid: {0}")]
    Invalid(#[from] PlanValidationError),

    #[error("backend request failed: {0:#}")]
    Backend(anyhow::Error),
}

// ---------------------------------------------------------------------------
// Prompt construction
// ---------------------------------------------------------------------------

/// JSON schema reference included in the plan and repair prompts.
const SCHEMA_REFERENCE: &str = r#"## Plan JSON Schema

```json
{
  "version": "1.0.0",                 // REQUIRED. Must be exactly "1.0.0".
  "projectName": "string",            // REQUIRED. Non-empty.
  "description": "string",            // REQUIRED. Non-empty.
  "directories": ["src", "tests"],    // REQUIRED. Relative directory paths.
  "files": [                          // REQUIRED. Every file to generate.
    {
      "path": "src/main.ts",          // Relative path, forward slashes, no "..".
      "purpose": "string",            // What the file does.
      "language": "typescript",       // Language or format.
      "dependencies": ["src/util.ts"],// Files or packages it relies on.
      "overwrite": false              // May replace an existing file.
    }
  ],
  "steps": [                          // REQUIRED. Ordered setup steps (may be empty).
    {
      "id": "1",
      "name": "string",
      "description": "string",
      "dependencies": [],
      "action": "create",             // create | modify | delete | run | test
      "target": "src"
    }
  ],
  "dependencies": ["express@4"],      // REQUIRED. Package specifiers (may be empty).
  "metadata": {                       // REQUIRED.
    "generatedAt": "ISO-8601 timestamp",
    "generatorVersion": "string",
    "model": "string"
  }
}
```

### Path rules
- Paths are relative to the project root and use `/`.
- Never start a path with `/` and never use `..`.
- `directories` lists directories only; a name like `index.ts` is a file and belongs in `files`.
"#;

/// Build the prompt asking the backend for a plan.
pub fn build_plan_prompt(description: &str) -> String {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut prompt = String::with_capacity(4096);

    prompt.push_str("# Project Scaffold Planner\n\n");
    prompt.push_str(
        "You design the file layout of a new software project. \
         Respond with ONLY a single JSON object that follows the schema below. \
         Do not wrap it in markdown, do not add commentary before or after it.\n\n",
    );

    prompt.push_str(SCHEMA_REFERENCE);
    prompt.push('\n');

    prompt.push_str("## Project Description\n\n");
    prompt.push_str(description.trim());
    prompt.push_str("\n\n");

    prompt.push_str("## Required Values\n\n");
    prompt.push_str(&format!("- `version`: `{PLAN_VERSION}`\n"));
    prompt.push_str(&format!("- `metadata.generatedAt`: `{now}`\n"));
    prompt.push_str(&format!(
        "- `metadata.generatorVersion`: `{}`\n",
        env!("CARGO_PKG_VERSION")
    ));

    prompt
}

/// Build the one-shot prompt asking the backend to fix its own output.
pub fn build_repair_prompt(draft: &str) -> String {
    let mut prompt = String::with_capacity(draft.len() + 2048);

    prompt.push_str("# Repair Project Plan\n\n");
    prompt.push_str(
        "The text below was supposed to be a JSON project plan but it could not be parsed. \
         Return a corrected version as ONLY a single valid JSON object that follows the schema. \
         Keep the original intent; fix syntax and structure only.\n\n",
    );

    prompt.push_str(SCHEMA_REFERENCE);
    prompt.push('\n');

    prompt.push_str("## Malformed Draft\n\n");
    prompt.push_str(draft);
    prompt.push('\n');

    prompt
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse backend text as JSON, leniently.
///
/// Tries the whole text first, then the slice between the first `{` and the
/// last `}` (which strips markdown fences and chatter around the object).
pub fn parse_plan_text(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end]).ok()
}

// ---------------------------------------------------------------------------
// Acquisition
// ---------------------------------------------------------------------------

/// Ask the backend for a plan and validate it.
///
/// Returns `None` on any failure; use [`acquire_plan_detailed`] when the
/// reason matters.
pub async fn acquire_plan(backend: &dyn Backend, description: &str) -> Option<Plan> {
    acquire_plan_detailed(backend, description).await.ok()
}

/// Ask the backend for a plan, with at most one repair round-trip.
pub async fn acquire_plan_detailed(
    backend: &dyn Backend,
    description: &str,
) -> Result<Plan, AcquireError> {
    info!(backend = backend.name(), "requesting project plan");

    let draft = request(backend, &build_plan_prompt(description))
        .await?
        .ok_or(AcquireError::EmptyResponse)?;

    let raw = match parse_plan_text(&draft) {
        Some(value) => value,
        None => {
            warn!("plan reply is not valid JSON, requesting one repair");
            let repaired = request(backend, &build_repair_prompt(&draft))
                .await?
                .ok_or(AcquireError::EmptyResponse)?;
            parse_plan_text(&repaired).ok_or(AcquireError::Unparseable)?
        }
    };

    let plan = validate_plan(&raw).inspect_err(|e| warn!(reason = %e, "plan failed validation"))?;

    info!(
        project = plan.project_name(),
        directories = plan.directories().len(),
        files = plan.files().len(),
        "plan acquired"
    );
    Ok(plan)
}

async fn request(backend: &dyn Backend, prompt: &str) -> Result<Option<String>, AcquireError> {
    debug!(prompt_bytes = prompt.len(), "sending prompt");
    let reply = backend.complete(prompt).await.map_err(AcquireError::Backend)?;
    Ok(reply.filter(|text| !text.trim().is_empty()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
