//! Plan schema validation.
//!
//! Turns loosely-typed JSON from a generator into a [`Plan`]. Checks run in a
//! fixed order and stop at the first failure:
//! - `version` equals [`PLAN_VERSION`].
//! - `projectName` and `description` are non-empty strings.
//! - `directories`, `files`, `steps`, `dependencies` are arrays.
//! - `metadata` is an object.
//! - Every directory and file path normalizes cleanly.
//!
//! Duplicate file paths are dropped silently, keeping the first entry.

use std::collections::{BTreeSet, HashSet};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use super::model::{FileSpec, Plan, PlanMetadata, StepSpec};
use super::path::normalize_path;

/// The only plan format version this engine accepts.
pub const PLAN_VERSION: &str = "1.0.0";

/// Reasons a plan fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanValidationError {
    #[error("plan must be a JSON object")]
    NotAnObject,

    #[error("unsupported plan version {found:?} (expected {:?})", PLAN_VERSION)]
    UnsupportedVersion { found: String },

    #[error("plan field {0:?} must be a non-empty string")]
    EmptyField(&'static str),

    #[error("plan field {0:?} must be an array")]
    NotAnArray(&'static str),

    #[error("plan field \"metadata\" must be an object")]
    MetadataNotAnObject,

    #[error("invalid directory path at directories[{index}]")]
    InvalidDirectory { index: usize },

    #[error("invalid file path at files[{index}]")]
    InvalidFilePath { index: usize },

    #[error("malformed entry at {field}[{index}]: {reason}")]
    MalformedEntry {
        field: &'static str,
        index: usize,
        reason: String,
    },

    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),
}

/// Validate raw plan JSON and build a [`Plan`] with canonical paths.
pub fn validate_plan(raw: &Value) -> Result<Plan, PlanValidationError> {
    let obj = raw.as_object().ok_or(PlanValidationError::NotAnObject)?;

    match obj.get("version").and_then(Value::as_str) {
        Some(PLAN_VERSION) => {}
        Some(other) => {
            return Err(PlanValidationError::UnsupportedVersion {
                found: other.to_string(),
            });
        }
        None => {
            return Err(PlanValidationError::UnsupportedVersion {
                found: obj.get("version").map(Value::to_string).unwrap_or_default(),
            });
        }
    }

    let project_name = non_empty_str(obj, "projectName")?;
    let description = non_empty_str(obj, "description")?;

    let raw_directories = array(obj, "directories")?;
    let raw_files = array(obj, "files")?;
    let raw_steps = array(obj, "steps")?;
    let raw_dependencies = array(obj, "dependencies")?;

    let metadata = match obj.get("metadata") {
        Some(m @ Value::Object(_)) => serde_json::from_value::<PlanMetadata>(m.clone())
            .map_err(|e| PlanValidationError::MalformedMetadata(e.to_string()))?,
        _ => return Err(PlanValidationError::MetadataNotAnObject),
    };

    let mut directories = BTreeSet::new();
    for (index, entry) in raw_directories.iter().enumerate() {
        let normalized = entry
            .as_str()
            .and_then(|s| normalize_path(s, true).ok())
            .ok_or(PlanValidationError::InvalidDirectory { index })?;
        directories.insert(normalized);
    }

    let mut seen = HashSet::new();
    let mut files = Vec::with_capacity(raw_files.len());
    for (index, entry) in raw_files.iter().enumerate() {
        let mut spec: FileSpec = entry_as("files", index, entry)?;
        spec.path = normalize_path(&spec.path, false)
            .map_err(|_| PlanValidationError::InvalidFilePath { index })?;
        if seen.insert(spec.path.clone()) {
            files.push(spec);
        }
    }

    let steps = raw_steps
        .iter()
        .enumerate()
        .map(|(index, entry)| entry_as::<StepSpec>("steps", index, entry))
        .collect::<Result<Vec<_>, _>>()?;

    let dependencies = raw_dependencies.clone();

    Ok(Plan {
        version: PLAN_VERSION.to_string(),
        project_name,
        description,
        directories,
        files,
        steps,
        dependencies,
        metadata,
    })
}

fn non_empty_str(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<String, PlanValidationError> {
    match obj.get(field).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        _ => Err(PlanValidationError::EmptyField(field)),
    }
}

fn array<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Vec<Value>, PlanValidationError> {
    obj.get(field)
        .and_then(Value::as_array)
        .ok_or(PlanValidationError::NotAnArray(field))
}

fn entry_as<T: DeserializeOwned>(
    field: &'static str,
    index: usize,
    entry: &Value,
) -> Result<T, PlanValidationError> {
    serde_json::from_value(entry.clone()).map_err(|e| PlanValidationError::MalformedEntry {
        field,
        index,
        reason: e.to_string(),
    })
}
