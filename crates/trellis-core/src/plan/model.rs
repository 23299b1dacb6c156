//! Plan types.
//!
//! The JSON wire format uses camelCase keys. A [`Plan`] can only be built by
//! [`super::validate_plan`]; once built it is read-only.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A validated scaffold specification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub(super) version: String,
    pub(super) project_name: String,
    pub(super) description: String,
    pub(super) directories: BTreeSet<String>,
    pub(super) files: Vec<FileSpec>,
    pub(super) steps: Vec<StepSpec>,
    pub(super) dependencies: Vec<Value>,
    pub(super) metadata: PlanMetadata,
}

impl Plan {
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Canonical relative directory paths declared by the plan.
    pub fn directories(&self) -> &BTreeSet<String> {
        &self.directories
    }

    /// File entries in order of first occurrence, unique by path.
    pub fn files(&self) -> &[FileSpec] {
        &self.files
    }

    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    /// Package specifiers, carried exactly as the generator wrote them.
    pub fn dependencies(&self) -> &[Value] {
        &self.dependencies
    }

    pub fn metadata(&self) -> &PlanMetadata {
        &self.metadata
    }

    /// Look up a file entry by its canonical path.
    pub fn file(&self, path: &str) -> Option<&FileSpec> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Canonical paths of every declared file, in plan order.
    pub fn file_paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

/// Provenance recorded by the plan generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMetadata {
    #[serde(default, deserialize_with = "lenient_string")]
    pub generated_at: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub generator_version: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub model: String,
}

/// A single entry in `files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSpec {
    /// Project-relative path (canonical once validated).
    pub path: String,
    /// What the file is for; fed back to the backend when generating it.
    #[serde(default, deserialize_with = "lenient_string")]
    pub purpose: String,
    /// Language or format of the file (e.g. `typescript`, `json`).
    #[serde(default, deserialize_with = "lenient_string")]
    pub language: String,
    /// Other plan files or packages this file relies on.
    #[serde(default, deserialize_with = "lenient_strings")]
    pub dependencies: Vec<String>,
    /// Generator hint that the file may replace existing content.
    #[serde(
        default,
        rename = "overwrite",
        alias = "overwriteHint",
        deserialize_with = "null_as_default"
    )]
    pub overwrite_hint: bool,
}

impl FileSpec {
    /// Minimal spec for a selected path that the plan does not declare.
    pub fn placeholder(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            purpose: "Generated file".to_string(),
            language: "unknown".to_string(),
            dependencies: vec![],
            overwrite_hint: false,
        }
    }
}

/// An informational step. Carried through the plan, never executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSpec {
    /// Empty when the generator left it out.
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub dependencies: Vec<String>,
    pub action: StepAction,
    #[serde(default, deserialize_with = "lenient_string")]
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    Create,
    Modify,
    Delete,
    Run,
    Test,
}

impl std::fmt::Display for StepAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Delete => "delete",
            Self::Run => "run",
            Self::Test => "test",
        };
        f.write_str(s)
    }
}

// Generators are loose with scalar types: ids come back as `1` or `"1"`,
// timestamps as epoch numbers, optional fields as `null`.

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Any JSON value as a string; `null` becomes empty.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(scalar_to_string)
}

/// An array of any JSON values as strings; `null` becomes empty.
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().map(scalar_to_string).collect(),
        single => vec![scalar_to_string(single)],
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
