// Decides which executable a step invokes. Two top-level branches keyed
// off `use_wrapper`, each with named outcomes so every path is testable
// in isolation.

use crate::config::StepConfig;
use crate::expand::{MacroExpander, NormalizedFields};
use crate::installation::InstallationLookup;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use step_common::constants::{command, env_vars};
use step_common::{StepError, TargetPlatform, Tracing};
use step_sdk::TraceWriter;

/// The resolved executable, tagged with the branch that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutableResolution {
    /// Wrapper directly under the root build-script directory; taken on
    /// faith, execution fails downstream if it is absent.
    WrapperAtRootDir(PathBuf),

    /// Wrapper found next to the configured build file, for projects not
    /// at the repository root.
    WrapperAtProjectDir(PathBuf),

    /// Wrapper under the module root, the default candidate.
    WrapperAtModuleRoot(PathBuf),

    /// Executable of a named installation.
    InstalledTool { executable: PathBuf, home: PathBuf },

    /// Bare command name, resolved by the launcher's PATH search.
    FallbackCommand(String),
}

impl ExecutableResolution {
    /// The string placed at position zero of the argument vector.
    pub fn command_string(&self) -> String {
        match self {
            ExecutableResolution::WrapperAtRootDir(path)
            | ExecutableResolution::WrapperAtProjectDir(path)
            | ExecutableResolution::WrapperAtModuleRoot(path) => {
                path.to_string_lossy().into_owned()
            }
            ExecutableResolution::InstalledTool { executable, .. } => {
                executable.to_string_lossy().into_owned()
            }
            ExecutableResolution::FallbackCommand(name) => name.clone(),
        }
    }

    /// The wrapper path, when a wrapper branch was taken.
    pub fn wrapper_path(&self) -> Option<&Path> {
        match self {
            ExecutableResolution::WrapperAtRootDir(path)
            | ExecutableResolution::WrapperAtProjectDir(path)
            | ExecutableResolution::WrapperAtModuleRoot(path) => Some(path),
            _ => None,
        }
    }
}

/// Resolver over the injected installation lookup and macro expander.
pub struct ExecutableResolver<'a> {
    pub lookup: &'a dyn InstallationLookup,
    pub expander: &'a dyn MacroExpander,
    pub trace: &'a Tracing,
}

impl<'a> ExecutableResolver<'a> {
    pub fn resolve(
        &self,
        config: &StepConfig,
        fields: &NormalizedFields,
        root_dir: Option<&Path>,
        module_root: &Path,
        platform: TargetPlatform,
        tool_locations: &HashMap<String, PathBuf>,
        environment: &mut HashMap<String, String>,
    ) -> Result<ExecutableResolution, StepError> {
        if config.use_wrapper {
            self.resolve_wrapper(config, fields, root_dir, module_root, platform)
        } else {
            self.resolve_installed(config, platform, tool_locations, environment)
        }
    }

    /// Wrapper branch: root-dir candidate wins outright when configured;
    /// otherwise the module root is the default, displaced by a wrapper
    /// sitting next to the configured build file.
    fn resolve_wrapper(
        &self,
        config: &StepConfig,
        fields: &NormalizedFields,
        root_dir: Option<&Path>,
        module_root: &Path,
        platform: TargetPlatform,
    ) -> Result<ExecutableResolution, StepError> {
        let wrapper_name = command::wrapper(platform);

        let resolution = if config.from_root_build_script_dir && root_dir.is_some() {
            let root = root_dir.unwrap_or(module_root);
            ExecutableResolution::WrapperAtRootDir(root.join(wrapper_name))
        } else {
            let mut chosen =
                ExecutableResolution::WrapperAtModuleRoot(module_root.join(wrapper_name));
            if let Some(ref build_file) = fields.build_file {
                if let Some(project_dir) =
                    wrapper_project_dir(build_file, module_root, platform, wrapper_name)
                {
                    chosen =
                        ExecutableResolution::WrapperAtProjectDir(project_dir.join(wrapper_name));
                }
            }
            chosen
        };

        if config.make_executable {
            if let Some(path) = resolution.wrapper_path() {
                if let Err(err) = make_executable(path) {
                    self.trace.warning(&format!(
                        "Could not mark '{}' executable: {err}",
                        path.display()
                    ));
                }
            }
        }

        Ok(resolution)
    }

    /// Installed-tool branch: exact-name lookup, adaptation for node and
    /// environment, executable probe, tool-home recording, bare-command
    /// fallback when nothing is configured under that name.
    fn resolve_installed(
        &self,
        config: &StepConfig,
        platform: TargetPlatform,
        tool_locations: &HashMap<String, PathBuf>,
        environment: &mut HashMap<String, String>,
    ) -> Result<ExecutableResolution, StepError> {
        let installation = config
            .tool_name
            .as_deref()
            .and_then(|name| self.lookup.find(name));

        match installation {
            Some(installation) => {
                let installation = installation
                    .for_node(tool_locations)
                    .for_environment(self.expander, environment);
                match installation.executable(platform) {
                    Some(executable) => {
                        environment
                            .insert(env_vars::TOOL_HOME.to_string(), installation.home.clone());
                        Ok(ExecutableResolution::InstalledTool {
                            executable,
                            home: installation.home(),
                        })
                    }
                    None => Err(StepError::ExecutableUnresolved {
                        name: installation.name,
                    }),
                }
            }
            None => {
                let name = command::bare(platform);
                match which::which(name) {
                    Ok(found) => self.trace.verbose(&format!(
                        "No installation configured; '{name}' found on PATH at '{}'.",
                        found.display()
                    )),
                    Err(_) => self.trace.verbose(&format!(
                        "No installation configured and '{name}' is not on PATH; \
                         relying on the launcher's resolution."
                    )),
                }
                Ok(ExecutableResolution::FallbackCommand(name.to_string()))
            }
        }
    }
}

/// The directory of `build_file` under the module root, when the path has
/// a platform separator and the directory actually holds the wrapper.
fn wrapper_project_dir(
    build_file: &str,
    module_root: &Path,
    platform: TargetPlatform,
    wrapper_name: &str,
) -> Option<PathBuf> {
    let separator = platform.separator();
    let idx = build_file.rfind(separator)?;
    if idx == 0 {
        return None;
    }
    let candidate = module_root.join(&build_file[..idx]);
    if candidate.is_dir() && candidate.join(wrapper_name).is_file() {
        Some(candidate)
    } else {
        None
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o744))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
