//! Conflict resolution for files that already exist.
//!
//! A run starts in a [`ConflictMode`] seeded from configuration. In `Ask`
//! mode every conflict goes to a [`ConflictPrompter`]; the two "all" answers
//! escalate the mode for the rest of the run:
//!
//! ```text
//! ask -> overwrite_all
//! ask -> skip_all
//! ```
//!
//! There is no edge back to `ask`, and the mode is never persisted.

use async_trait::async_trait;
use tracing::{debug, info};

/// Per-run conflict policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictMode {
    Ask,
    OverwriteAll,
    SkipAll,
}

impl ConflictMode {
    /// Map a configuration value to a starting mode.
    ///
    /// `"ask"` and `"overwrite"` select their modes; every other value,
    /// including `"skip"` and `"merge"`, selects `SkipAll`.
    pub fn from_setting(setting: &str) -> Self {
        let setting = setting.trim();
        if setting.eq_ignore_ascii_case("ask") {
            Self::Ask
        } else if setting.eq_ignore_ascii_case("overwrite") {
            Self::OverwriteAll
        } else {
            Self::SkipAll
        }
    }

    /// Check whether `from -> to` is an edge in the mode graph.
    pub fn is_valid_transition(from: ConflictMode, to: ConflictMode) -> bool {
        matches!(
            (from, to),
            (ConflictMode::Ask, ConflictMode::OverwriteAll)
                | (ConflictMode::Ask, ConflictMode::SkipAll)
        )
    }
}

impl std::fmt::Display for ConflictMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ask => "ask",
            Self::OverwriteAll => "overwrite_all",
            Self::SkipAll => "skip_all",
        };
        f.write_str(s)
    }
}

/// An answer to a conflict prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    /// Overwrite this file only.
    Overwrite,
    /// Overwrite this file and every later conflict.
    OverwriteAll,
    /// Skip this file only.
    Skip,
    /// Skip this file and every later conflict.
    SkipAll,
    /// Stop the run.
    Cancel,
}

/// What the materializer should do with a conflicting file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    Write,
    SkipFile,
    CancelRun,
}

/// Source of answers for conflicts in `Ask` mode.
///
/// `None` means the prompt was dismissed without an answer, which cancels
/// the run.
#[async_trait]
pub trait ConflictPrompter: Send + Sync {
    async fn choose(&self, path: &str) -> Option<ConflictChoice>;
}

/// Conflict state for a single run.
pub struct ConflictResolver<'a> {
    mode: ConflictMode,
    prompter: &'a dyn ConflictPrompter,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(mode: ConflictMode, prompter: &'a dyn ConflictPrompter) -> Self {
        Self { mode, prompter }
    }

    pub fn mode(&self) -> ConflictMode {
        self.mode
    }

    /// Decide the fate of an existing file at `path`.
    ///
    /// Only called for files that exist; new files are always written.
    pub async fn decide(&mut self, path: &str) -> ConflictAction {
        match self.mode {
            ConflictMode::SkipAll => return ConflictAction::SkipFile,
            ConflictMode::OverwriteAll => return ConflictAction::Write,
            ConflictMode::Ask => {}
        }

        let choice = self.prompter.choose(path).await;
        debug!(path, ?choice, "conflict prompt answered");

        match choice {
            Some(ConflictChoice::Overwrite) => ConflictAction::Write,
            Some(ConflictChoice::OverwriteAll) => {
                self.escalate(ConflictMode::OverwriteAll);
                ConflictAction::Write
            }
            Some(ConflictChoice::Skip) => ConflictAction::SkipFile,
            Some(ConflictChoice::SkipAll) => {
                self.escalate(ConflictMode::SkipAll);
                ConflictAction::SkipFile
            }
            Some(ConflictChoice::Cancel) | None => ConflictAction::CancelRun,
        }
    }

    fn escalate(&mut self, to: ConflictMode) {
        if ConflictMode::is_valid_transition(self.mode, to) {
            info!(from = %self.mode, to = %to, "conflict mode escalated");
            self.mode = to;
        }
    }
}
