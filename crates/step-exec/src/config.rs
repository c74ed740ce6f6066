// Declarative configuration of one build step. Immutable, deserialized
// once, and shared across every invocation of the step.

use serde::{Deserialize, Serialize};

/// The build-step form as the host pipeline persists it.
///
/// Exactly one resolution strategy is active: when `use_wrapper` is true
/// the project-committed wrapper script is used and `tool_name` is never
/// consulted; otherwise `tool_name` selects a named installation, with a
/// bare-command fallback when nothing matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StepConfig {
    /// Free-text description shown by the host; never interpreted.
    pub description: Option<String>,

    /// Command-line switches, macro-expandable, whitespace-tokenized.
    pub switches: String,

    /// Task names, macro-expandable, whitespace-tokenized.
    pub tasks: String,

    /// Directory of the root build script, relative to the module root
    /// unless absolute. Doubles as the working directory when set.
    pub root_build_script_dir: Option<String>,

    /// Explicit build-file path passed with `-b`.
    pub build_file: Option<String>,

    /// Name of the installed tool to use when `use_wrapper` is false.
    pub tool_name: Option<String>,

    /// Use the project's wrapper script instead of an installation.
    pub use_wrapper: bool,

    /// Set the execute bit on the wrapper before running it.
    pub make_executable: bool,

    /// Look for the wrapper under `root_build_script_dir` instead of the
    /// module root.
    pub from_root_build_script_dir: bool,

    /// Point the tool's user home at the workspace so caches are not
    /// shared between builds.
    pub use_workspace_as_home: bool,
}

impl StepConfig {
    /// True when a build file is configured and non-blank.
    pub fn has_build_file(&self) -> bool {
        self.build_file
            .as_deref()
            .map(|f| !f.trim().is_empty())
            .unwrap_or(false)
    }
}
