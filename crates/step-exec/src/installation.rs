// Named tool installations and the injected read-only lookup service.
// Persistence of the registry belongs to the host; the executor only ever
// consumes `InstallationLookup`.

use crate::expand::MacroExpander;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use step_common::constants::command;
use step_common::TargetPlatform;

/// One configured installation: a display name and a home directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradleInstallation {
    pub name: String,
    /// Home directory; may contain `${VAR}` macros resolved per
    /// environment via `for_environment`.
    pub home: String,
}

impl GradleInstallation {
    pub fn new(name: impl Into<String>, home: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            home: home.into(),
        }
    }

    /// Adapt the installation for the current execution node: a node can
    /// pin a tool to a different location than the controller's default.
    pub fn for_node(&self, tool_locations: &HashMap<String, PathBuf>) -> GradleInstallation {
        match tool_locations.get(&self.name) {
            Some(location) => GradleInstallation {
                name: self.name.clone(),
                home: location.to_string_lossy().into_owned(),
            },
            None => self.clone(),
        }
    }

    /// Adapt the installation for the invocation environment by expanding
    /// macros in the home path. Unknown macros stay literal.
    pub fn for_environment(
        &self,
        expander: &dyn MacroExpander,
        environment: &HashMap<String, String>,
    ) -> GradleInstallation {
        GradleInstallation {
            name: self.name.clone(),
            home: expander.expand(&self.home, &|name| environment.get(name).cloned()),
        }
    }

    pub fn home(&self) -> PathBuf {
        PathBuf::from(&self.home)
    }

    /// The platform executable under `<home>/bin`, or `None` when it does
    /// not exist on disk.
    pub fn executable(&self, platform: TargetPlatform) -> Option<PathBuf> {
        let candidate = Path::new(&self.home)
            .join("bin")
            .join(command::bare(platform));
        if candidate.is_file() {
            Some(candidate)
        } else {
            None
        }
    }
}

/// Read-only lookup of configured installations by name.
pub trait InstallationLookup: Send + Sync {
    /// Exact-name match; first match wins.
    fn find(&self, name: &str) -> Option<GradleInstallation>;
}

/// An in-memory lookup over a fixed list, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct StaticInstallationLookup {
    installations: Vec<GradleInstallation>,
}

impl StaticInstallationLookup {
    pub fn new(installations: Vec<GradleInstallation>) -> Self {
        Self { installations }
    }

    /// A lookup with nothing configured.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl InstallationLookup for StaticInstallationLookup {
    fn find(&self, name: &str) -> Option<GradleInstallation> {
        self.installations.iter().find(|i| i.name == name).cloned()
    }
}
