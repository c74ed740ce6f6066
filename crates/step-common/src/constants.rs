// Fixed vocabulary of the build-step executor: platform detection, tool
// command names, well-known environment variables, and the reserved
// property-key denylist.

use std::fmt;

/// The platform a command line is built for.
///
/// Carried as a value (not a `cfg!`) so that Windows command assembly is
/// testable on any host. `Unix` covers Linux and macOS, which share the
/// wrapper script name and quoting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetPlatform {
    Unix,
    Windows,
}

impl TargetPlatform {
    pub fn is_unix(self) -> bool {
        self == TargetPlatform::Unix
    }

    /// The path separator the platform's build-file paths use.
    pub fn separator(self) -> char {
        match self {
            TargetPlatform::Unix => '/',
            TargetPlatform::Windows => '\\',
        }
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetPlatform::Unix => write!(f, "Unix"),
            TargetPlatform::Windows => write!(f, "Windows"),
        }
    }
}

/// The platform this executor was compiled for.
#[cfg(target_os = "windows")]
pub const CURRENT_PLATFORM: TargetPlatform = TargetPlatform::Windows;
#[cfg(not(target_os = "windows"))]
pub const CURRENT_PLATFORM: TargetPlatform = TargetPlatform::Unix;

// ---------------------------------------------------------------------------
// Tool commands
// ---------------------------------------------------------------------------

/// Executable names for the project-committed wrapper script and the
/// installed tool, per platform.
pub mod command {
    use super::TargetPlatform;

    pub const UNIX_WRAPPER: &str = "gradlew";
    pub const WINDOWS_WRAPPER: &str = "gradlew.bat";
    pub const UNIX_COMMAND: &str = "gradle";
    pub const WINDOWS_COMMAND: &str = "gradle.bat";

    /// The wrapper script name for `platform`.
    pub fn wrapper(platform: TargetPlatform) -> &'static str {
        if platform.is_unix() {
            UNIX_WRAPPER
        } else {
            WINDOWS_WRAPPER
        }
    }

    /// The bare tool command for `platform`, resolved by the launcher's
    /// PATH search.
    pub fn bare(platform: TargetPlatform) -> &'static str {
        if platform.is_unix() {
            UNIX_COMMAND
        } else {
            WINDOWS_COMMAND
        }
    }
}

// ---------------------------------------------------------------------------
// Well-known environment variables
// ---------------------------------------------------------------------------

pub mod env_vars {
    /// Extra switches appended to the configured ones when present.
    pub const EXTRA_SWITCHES: &str = "GRADLE_EXT_SWITCHES";
    /// Extra tasks appended to the configured ones when present.
    pub const EXTRA_TASKS: &str = "GRADLE_EXT_TASKS";
    /// Written when an installed tool is resolved; points at its home.
    pub const TOOL_HOME: &str = "GRADLE_HOME";
    /// Overridden to the workspace root when per-workspace caches are
    /// requested, so state is not shared between builds.
    pub const USER_HOME: &str = "GRADLE_USER_HOME";
}

// ---------------------------------------------------------------------------
// Switch tokens
// ---------------------------------------------------------------------------

/// Appended to the switches for a dry-run invocation.
pub const DRY_RUN_SWITCH: &str = "--dry-run";

/// Prefix for injected build-variable properties.
pub const PROPERTY_PREFIX: &str = "-D";

/// Switch preceding an explicit build-file path.
pub const BUILD_FILE_SWITCH: &str = "-b";

// ---------------------------------------------------------------------------
// Reserved build-variable keys
// ---------------------------------------------------------------------------

/// Pipeline configuration-domain keys that must never be forwarded to the
/// tool as properties. The set is a configuration constant, not derived.
pub const RESERVED_PROPERTY_KEYS: &[&str] = &[
    "DEPENDENCY_CONFIG",
    "PLATFORM_CONFIG",
    "HARDWARE_CONFIG",
    "I18N_CONFIG",
    "PACKAGE_CONFIG",
    "DEBUG_CONFIG",
    "GAME_CONFIG",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapper_names_differ_per_platform() {
        assert_eq!(command::wrapper(TargetPlatform::Unix), "gradlew");
        assert_eq!(command::wrapper(TargetPlatform::Windows), "gradlew.bat");
    }

    #[test]
    fn bare_commands_differ_per_platform() {
        assert_eq!(command::bare(TargetPlatform::Unix), "gradle");
        assert_eq!(command::bare(TargetPlatform::Windows), "gradle.bat");
    }

    #[test]
    fn separators() {
        assert_eq!(TargetPlatform::Unix.separator(), '/');
        assert_eq!(TargetPlatform::Windows.separator(), '\\');
    }

    #[test]
    fn reserved_keys_is_the_fixed_set() {
        assert_eq!(RESERVED_PROPERTY_KEYS.len(), 7);
        assert!(RESERVED_PROPERTY_KEYS.contains(&"DEBUG_CONFIG"));
    }
}
