// Ordered argument-vector builder for external tool invocations.
// Tracks a display form alongside the real values so that secret arguments
// render masked in logs while the child process receives them in full.

use std::collections::{BTreeMap, HashSet};

/// Replacement text used when rendering a masked argument.
const MASK: &str = "***";

/// A single argument with an optional display override for logs.
#[derive(Debug, Clone)]
struct CommandArg {
    value: String,
    display: Option<String>,
}

impl CommandArg {
    fn plain(value: String) -> Self {
        Self {
            value,
            display: None,
        }
    }

    fn masked(value: String, display: String) -> Self {
        Self {
            value,
            display: Some(display),
        }
    }

    fn display(&self) -> &str {
        self.display.as_deref().unwrap_or(&self.value)
    }
}

/// An ordered command line under construction.
///
/// The first argument added is the executable; everything after is passed
/// verbatim to the process launcher. `display()` renders a human-readable
/// form with masked arguments replaced by `***`.
#[derive(Debug, Clone, Default)]
pub struct CommandLine {
    args: Vec<CommandArg>,
}

impl CommandLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one argument.
    pub fn add(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(CommandArg::plain(arg.into()));
        self
    }

    /// Append one argument whose value must not appear in logs.
    pub fn add_masked(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args
            .push(CommandArg::masked(arg.into(), MASK.to_string()));
        self
    }

    /// Append `<prefix><key>=<value>` pairs in the map's (sorted) key order.
    ///
    /// A `None` value yields `<prefix><key>=` with an empty value. Pairs
    /// whose key is in `sensitive` are passed to the child in full but
    /// render as `<prefix><key>=***`.
    pub fn add_key_value_pairs(
        &mut self,
        prefix: &str,
        pairs: &BTreeMap<String, Option<String>>,
        sensitive: &HashSet<String>,
    ) -> &mut Self {
        for (key, value) in pairs {
            let value = value.as_deref().unwrap_or("");
            let real = format!("{prefix}{key}={value}");
            if sensitive.contains(key) {
                let display = format!("{prefix}{key}={MASK}");
                self.args.push(CommandArg::masked(real, display));
            } else {
                self.args.push(CommandArg::plain(real));
            }
        }
        self
    }

    /// Split `input` on whitespace, respecting single and double quotes,
    /// and append each token.
    pub fn add_tokenized(&mut self, input: &str) -> &mut Self {
        for token in tokenize(input) {
            self.add(token);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// The real argument vector handed to the process launcher.
    pub fn argv(&self) -> Vec<String> {
        self.args.iter().map(|a| a.value.clone()).collect()
    }

    /// Human-readable rendering with masked arguments replaced by `***`.
    /// Arguments containing whitespace are quoted for readability.
    pub fn display(&self) -> String {
        self.args
            .iter()
            .map(|a| {
                let d = a.display();
                if d.is_empty() || d.contains(char::is_whitespace) {
                    format!("\"{d}\"")
                } else {
                    d.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Re-encode the whole vector into the `cmd.exe` single-command-line
    /// convention: `cmd.exe /C "<args..> && exit %%ERRORLEVEL%%"`.
    ///
    /// The transform is pure and order-preserving; arguments containing
    /// cmd metacharacters are quoted with embedded quotes doubled, and the
    /// trailing `exit` preserves the child's exit code through the shell.
    /// Display overrides carry through so masked arguments stay masked.
    pub fn to_windows_command(&self) -> CommandLine {
        let joined = |pick: &dyn Fn(&CommandArg) -> String| -> String {
            let body = self
                .args
                .iter()
                .map(|a| quote_for_cmd(&pick(a)))
                .collect::<Vec<_>>()
                .join(" ");
            format!("{body} && exit %%ERRORLEVEL%%")
        };

        let real = joined(&|a: &CommandArg| a.value.clone());
        let display = joined(&|a: &CommandArg| a.display().to_string());

        let mut out = CommandLine::new();
        out.add("cmd.exe");
        out.add("/C");
        if real == display {
            out.add(real);
        } else {
            out.args.push(CommandArg::masked(real, display));
        }
        out
    }
}

/// Quote an argument for inclusion in a `cmd.exe /C` command string.
/// Embedded double quotes are doubled.
fn quote_for_cmd(arg: &str) -> String {
    let needs_quotes =
        arg.is_empty() || arg.chars().any(|c| " \t\"^&<>|".contains(c));
    if needs_quotes {
        format!("\"{}\"", arg.replace('"', "\"\""))
    } else {
        arg.to_string()
    }
}

/// Split a string on whitespace, respecting double-quoted and
/// single-quoted sections and backslash escapes outside single quotes.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut escape_next = false;
    let mut has_token = false;

    for ch in input.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if !in_single => escape_next = true,
            '\'' if !in_double => {
                in_single = !in_single;
                has_token = true;
            }
            '"' if !in_single => {
                in_double = !in_double;
                has_token = true;
            }
            c if c.is_whitespace() && !in_single && !in_double => {
                if has_token || !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            _ => current.push(ch),
        }
    }

    if has_token || !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_simple() {
        assert_eq!(tokenize("clean build"), vec!["clean", "build"]);
    }

    #[test]
    fn tokenize_collapses_runs_of_whitespace() {
        assert_eq!(tokenize("  -q   build  "), vec!["-q", "build"]);
    }

    #[test]
    fn tokenize_double_quoted() {
        assert_eq!(
            tokenize(r#"-Pgreeting="hello world" build"#),
            vec!["-Pgreeting=hello world", "build"]
        );
    }

    #[test]
    fn tokenize_single_quoted() {
        assert_eq!(tokenize("run 'two words'"), vec!["run", "two words"]);
    }

    #[test]
    fn tokenize_empty_quoted_token_survives() {
        assert_eq!(tokenize("a \"\" b"), vec!["a", "", "b"]);
    }

    #[test]
    fn tokenize_blank() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn key_value_pairs_are_sorted_and_formatted() {
        let mut pairs = BTreeMap::new();
        pairs.insert("beta".to_string(), Some("2".to_string()));
        pairs.insert("alpha".to_string(), Some("1".to_string()));
        let mut line = CommandLine::new();
        line.add("gradle");
        line.add_key_value_pairs("-D", &pairs, &HashSet::new());
        assert_eq!(line.argv(), vec!["gradle", "-Dalpha=1", "-Dbeta=2"]);
    }

    #[test]
    fn none_value_renders_empty() {
        let mut pairs = BTreeMap::new();
        pairs.insert("flag".to_string(), None);
        let mut line = CommandLine::new();
        line.add_key_value_pairs("-D", &pairs, &HashSet::new());
        assert_eq!(line.argv(), vec!["-Dflag="]);
    }

    #[test]
    fn sensitive_pairs_masked_in_display_but_real_in_argv() {
        let mut pairs = BTreeMap::new();
        pairs.insert("TOKEN".to_string(), Some("hunter2".to_string()));
        let sensitive: HashSet<String> = ["TOKEN".to_string()].into();
        let mut line = CommandLine::new();
        line.add("gradle");
        line.add_key_value_pairs("-D", &pairs, &sensitive);
        assert_eq!(line.argv(), vec!["gradle", "-DTOKEN=hunter2"]);
        assert_eq!(line.display(), "gradle -DTOKEN=***");
    }

    #[test]
    fn display_quotes_args_with_whitespace() {
        let mut line = CommandLine::new();
        line.add("gradle").add("two words");
        assert_eq!(line.display(), "gradle \"two words\"");
    }

    #[test]
    fn windows_command_preserves_order() {
        let mut line = CommandLine::new();
        line.add("gradle").add("-q").add("build");
        let win = line.to_windows_command();
        assert_eq!(
            win.argv(),
            vec![
                "cmd.exe",
                "/C",
                "gradle -q build && exit %%ERRORLEVEL%%"
            ]
        );
    }

    #[test]
    fn windows_command_quotes_metacharacters() {
        let mut line = CommandLine::new();
        line.add("gradle").add("-Dv=\"a\"").add("two words");
        let win = line.to_windows_command();
        let argv = win.argv();
        assert_eq!(argv[2], "gradle \"-Dv=\"\"a\"\"\" \"two words\" && exit %%ERRORLEVEL%%");
    }

    #[test]
    fn windows_command_keeps_masking() {
        let mut line = CommandLine::new();
        line.add("gradle").add_masked("-DTOKEN=hunter2");
        let win = line.to_windows_command();
        assert!(win.argv()[2].contains("hunter2"));
        assert!(win.display().contains("***"));
        assert!(!win.display().contains("hunter2"));
    }
}
