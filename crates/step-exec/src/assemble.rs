// Command assembly: the exact argument order handed to the launcher, and
// the fully resolved command (arguments + environment + working directory).

use crate::expand::NormalizedFields;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use step_common::constants::{BUILD_FILE_SWITCH, PROPERTY_PREFIX};
use step_common::TargetPlatform;
use step_sdk::CommandLine;

/// Everything the launcher needs for one invocation.
#[derive(Debug, Clone)]
pub struct ResolvedCommand {
    pub command: CommandLine,
    pub environment: std::collections::HashMap<String, String>,
    pub working_dir: PathBuf,
}

impl ResolvedCommand {
    pub fn argv(&self) -> Vec<String> {
        self.command.argv()
    }

    /// Masked, human-readable command line for the build log.
    pub fn display(&self) -> String {
        self.command.display()
    }
}

/// Build the argument vector in the fixed order: executable, `-D`
/// property pairs (stable key order), tokenized switches, tokenized
/// tasks, then `-b <buildfile>` when configured. On non-Unix targets the
/// vector is re-encoded once, last, into the platform's single-command-line
/// form.
pub fn assemble_arguments(
    executable: &str,
    properties: &BTreeMap<String, Option<String>>,
    sensitive: &HashSet<String>,
    fields: &NormalizedFields,
    platform: TargetPlatform,
) -> CommandLine {
    let mut line = CommandLine::new();
    line.add(executable);
    line.add_key_value_pairs(PROPERTY_PREFIX, properties, sensitive);
    line.add_tokenized(&fields.switches);
    line.add_tokenized(&fields.tasks);
    if let Some(ref build_file) = fields.build_file {
        line.add(BUILD_FILE_SWITCH);
        line.add(build_file.clone());
    }

    if platform.is_unix() {
        line
    } else {
        line.to_windows_command()
    }
}
