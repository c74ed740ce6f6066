// Macro normalization: append the tool-specific "extra" environment
// variables, collapse embedded line breaks, and expand `${VAR}`-style
// macros in two passes (environment first, then build variables).
// Unresolvable macros stay literal.

use crate::config::StepConfig;
use crate::variables::BuildVariables;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use step_common::constants::{env_vars, DRY_RUN_SWITCH};

/// Runs of tabs and line breaks collapse to a single space before
/// expansion, so multi-line form input becomes one command line.
static LINE_BREAK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\t\r\n]+").expect("static regex"));

/// The host pipeline's variable-substitution service.
///
/// `lookup` returns the value for a macro name, or `None` to leave the
/// macro as literal text.
pub trait MacroExpander: Send + Sync {
    fn expand(&self, text: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String;
}

/// Default expander: `${NAME}` and `$NAME` forms, `$$` for a literal
/// dollar, unknown macros untouched.
#[derive(Debug, Clone, Default)]
pub struct DefaultMacroExpander;

impl MacroExpander for DefaultMacroExpander {
    fn expand(&self, text: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch != '$' {
                out.push(ch);
                continue;
            }

            match chars.peek() {
                Some('$') => {
                    chars.next();
                    out.push('$');
                }
                Some('{') => {
                    chars.next();
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    match (closed, lookup(&name)) {
                        (true, Some(value)) => out.push_str(&value),
                        (true, None) => {
                            out.push_str("${");
                            out.push_str(&name);
                            out.push('}');
                        }
                        // Unterminated brace: literal tail
                        (false, _) => {
                            out.push_str("${");
                            out.push_str(&name);
                        }
                    }
                }
                Some(c) if c.is_ascii_alphabetic() || *c == '_' => {
                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            name.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    match lookup(&name) {
                        Some(value) => out.push_str(&value),
                        None => {
                            out.push('$');
                            out.push_str(&name);
                        }
                    }
                }
                _ => out.push('$'),
            }
        }

        out
    }
}

/// The four normalized step fields, ready for the assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFields {
    pub switches: String,
    pub tasks: String,
    pub root_build_script_dir: Option<String>,
    pub build_file: Option<String>,
}

/// Normalize one raw field: append `extra` space-separated when present,
/// collapse line-break runs, expand against the environment and then the
/// build variables, and trim. Blank input yields the empty string.
pub fn normalize_field(
    raw: &str,
    extra: Option<&str>,
    expander: &dyn MacroExpander,
    environment: &HashMap<String, String>,
    variables: &BuildVariables,
) -> String {
    let joined = match extra {
        Some(extra) if !extra.is_empty() => format!("{raw} {extra}"),
        _ => raw.to_string(),
    };
    let collapsed = LINE_BREAK_RUN.replace_all(&joined, " ");
    let env_pass = expander.expand(&collapsed, &|name| environment.get(name).cloned());
    let var_pass = expander.expand(&env_pass, &|name| {
        variables.get(name).map(str::to_string)
    });
    var_pass.trim().to_string()
}

/// Normalize every macro-bearing field of the step configuration.
/// Dry-run appends the literal dry-run token to the switches, after
/// normalization; nothing else changes.
pub fn normalize_step(
    config: &StepConfig,
    dry_run: bool,
    expander: &dyn MacroExpander,
    environment: &HashMap<String, String>,
    variables: &BuildVariables,
) -> NormalizedFields {
    let extra_switches = environment.get(env_vars::EXTRA_SWITCHES).map(String::as_str);
    let mut switches = normalize_field(
        &config.switches,
        extra_switches,
        expander,
        environment,
        variables,
    );
    if dry_run {
        if switches.is_empty() {
            switches = DRY_RUN_SWITCH.to_string();
        } else {
            switches = format!("{switches} {DRY_RUN_SWITCH}");
        }
    }

    let extra_tasks = environment.get(env_vars::EXTRA_TASKS).map(String::as_str);
    let tasks = normalize_field(&config.tasks, extra_tasks, expander, environment, variables);

    let root_build_script_dir = config
        .root_build_script_dir
        .as_deref()
        .map(|raw| normalize_field(raw.trim(), None, expander, environment, variables))
        .filter(|dir| !dir.is_empty());

    let build_file = config
        .build_file
        .as_deref()
        .map(|raw| normalize_field(raw.trim(), None, expander, environment, variables))
        .filter(|file| !file.is_empty());

    NormalizedFields {
        switches,
        tasks,
        root_build_script_dir,
        build_file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn expand(text: &str, environment: &HashMap<String, String>) -> String {
        DefaultMacroExpander.expand(text, &|name| environment.get(name).cloned())
    }

    #[test]
    fn expands_braced_and_bare_macros() {
        let environment = env(&[("VERSION", "1.2")]);
        assert_eq!(expand("v=${VERSION}", &environment), "v=1.2");
        assert_eq!(expand("v=$VERSION", &environment), "v=1.2");
    }

    #[test]
    fn unknown_macros_stay_literal() {
        let environment = env(&[]);
        assert_eq!(expand("v=${MISSING}", &environment), "v=${MISSING}");
        assert_eq!(expand("v=$MISSING", &environment), "v=$MISSING");
    }

    #[test]
    fn double_dollar_is_a_literal_dollar() {
        let environment = env(&[("A", "x")]);
        assert_eq!(expand("$$A", &environment), "$A");
    }

    #[test]
    fn trailing_dollar_is_kept() {
        assert_eq!(expand("cost$", &env(&[])), "cost$");
    }

    #[test]
    fn normalization_is_idempotent_without_macros() {
        let environment = env(&[]);
        let variables = BuildVariables::new();
        let once = normalize_field(
            "-q\n--stacktrace",
            None,
            &DefaultMacroExpander,
            &environment,
            &variables,
        );
        let twice = normalize_field(&once, None, &DefaultMacroExpander, &environment, &variables);
        assert_eq!(once, "-q --stacktrace");
        assert_eq!(once, twice);
    }

    #[test]
    fn collapses_line_break_runs_to_one_space() {
        let out = normalize_field(
            "clean\t\r\n\nbuild",
            None,
            &DefaultMacroExpander,
            &env(&[]),
            &BuildVariables::new(),
        );
        assert_eq!(out, "clean build");
    }

    #[test]
    fn second_pass_sees_build_variables_missing_from_environment() {
        let environment = env(&[("FROM_ENV", "env-value")]);
        let mut variables = BuildVariables::new();
        variables.set("FROM_VARS", "var-value");
        let out = normalize_field(
            "${FROM_ENV} ${FROM_VARS}",
            None,
            &DefaultMacroExpander,
            &environment,
            &variables,
        );
        assert_eq!(out, "env-value var-value");
    }

    #[test]
    fn environment_pass_runs_first() {
        let environment = env(&[("NAME", "from-env")]);
        let mut variables = BuildVariables::new();
        variables.set("NAME", "from-vars");
        let out = normalize_field(
            "${NAME}",
            None,
            &DefaultMacroExpander,
            &environment,
            &variables,
        );
        assert_eq!(out, "from-env");
    }

    #[test]
    fn extra_switches_are_appended_from_environment() {
        let environment = env(&[(env_vars::EXTRA_SWITCHES, "--info")]);
        let fields = normalize_step(
            &StepConfig {
                switches: "-q".to_string(),
                ..StepConfig::default()
            },
            false,
            &DefaultMacroExpander,
            &environment,
            &BuildVariables::new(),
        );
        assert_eq!(fields.switches, "-q --info");
    }

    #[test]
    fn extra_tasks_are_appended_from_environment() {
        let environment = env(&[(env_vars::EXTRA_TASKS, "check")]);
        let fields = normalize_step(
            &StepConfig {
                tasks: "build".to_string(),
                ..StepConfig::default()
            },
            false,
            &DefaultMacroExpander,
            &environment,
            &BuildVariables::new(),
        );
        assert_eq!(fields.tasks, "build check");
    }

    #[test]
    fn dry_run_appends_exactly_one_token_and_nothing_else() {
        let config = StepConfig {
            switches: "-q".to_string(),
            tasks: "build".to_string(),
            ..StepConfig::default()
        };
        let normal = normalize_step(
            &config,
            false,
            &DefaultMacroExpander,
            &env(&[]),
            &BuildVariables::new(),
        );
        let dry = normalize_step(
            &config,
            true,
            &DefaultMacroExpander,
            &env(&[]),
            &BuildVariables::new(),
        );
        assert_eq!(dry.switches, format!("{} {}", normal.switches, DRY_RUN_SWITCH));
        assert_eq!(dry.tasks, normal.tasks);
        assert_eq!(dry.build_file, normal.build_file);
        assert_eq!(dry.root_build_script_dir, normal.root_build_script_dir);
    }

    #[test]
    fn dry_run_with_blank_switches_is_just_the_flag() {
        let fields = normalize_step(
            &StepConfig::default(),
            true,
            &DefaultMacroExpander,
            &env(&[]),
            &BuildVariables::new(),
        );
        assert_eq!(fields.switches, DRY_RUN_SWITCH);
    }

    #[test]
    fn blank_fields_normalize_to_empty_or_none() {
        let fields = normalize_step(
            &StepConfig {
                switches: "  \n ".to_string(),
                root_build_script_dir: Some("  ".to_string()),
                build_file: Some("".to_string()),
                ..StepConfig::default()
            },
            false,
            &DefaultMacroExpander,
            &env(&[]),
            &BuildVariables::new(),
        );
        assert_eq!(fields.switches, "");
        assert_eq!(fields.root_build_script_dir, None);
        assert_eq!(fields.build_file, None);
    }

    #[test]
    fn paths_are_macro_expanded() {
        let environment = env(&[("PROJECT", "app")]);
        let fields = normalize_step(
            &StepConfig {
                root_build_script_dir: Some("${PROJECT}/scripts".to_string()),
                build_file: Some("${PROJECT}/build.gradle".to_string()),
                ..StepConfig::default()
            },
            false,
            &DefaultMacroExpander,
            &environment,
            &BuildVariables::new(),
        );
        assert_eq!(fields.root_build_script_dir.as_deref(), Some("app/scripts"));
        assert_eq!(fields.build_file.as_deref(), Some("app/build.gradle"));
    }
}
