//! Shell literal encoding and assignment statements for POSIX shells,
//! PowerShell and Windows cmd.

use crate::detect::{ShellDetector, ShellError};
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

/// The shell requested on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellType {
    /// Detect the invoking shell from the parent processes
    #[default]
    Auto,
    /// POSIX shells (sh, bash, zsh, ...)
    #[value(aliases = ["bash", "zsh", "posix"])]
    Sh,
    /// Windows PowerShell and PowerShell Core
    #[value(alias = "pwsh")]
    Powershell,
    /// Windows cmd.exe
    Cmd,
}

/// A concrete output syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Dialect {
    Posix,
    PowerShell,
    Cmd,
}

impl Dialect {
    /// Separator placed between emitted statements.
    pub fn line_separator(&self) -> &'static str {
        match self {
            Dialect::Posix | Dialect::PowerShell => "\n",
            Dialect::Cmd => "\r\n",
        }
    }

    /// Encode `value` as a literal of this dialect.
    pub fn literal(&self, value: &str) -> String {
        match self {
            Dialect::Posix => posix_literal(value),
            Dialect::PowerShell => powershell_literal(value),
            Dialect::Cmd => cmd_literal(value),
        }
    }

    /// A statement assigning `value` to the environment variable `name`.
    ///
    /// With `persist` set, POSIX exports the variable, while PowerShell and
    /// cmd write it to the user registry. The registry forms do not touch the
    /// current session.
    pub fn assignment(&self, name: &str, value: &str, persist: bool) -> String {
        let literal = self.literal(value);
        match (self, persist) {
            (Dialect::Posix, false) => format!("{}={}", name, literal),
            (Dialect::Posix, true) => format!("export {}={}", name, literal),
            (Dialect::PowerShell, false) => format!("$Env:{} = {}", name, literal),
            (Dialect::PowerShell, true) => format!(
                "[System.Environment]::SetEnvironmentVariable({}, {}, 'User')",
                powershell_literal(name),
                literal
            ),
            (Dialect::Cmd, false) => format!("set \"{}={}\"", name, strip_outer_quotes(&literal)),
            (Dialect::Cmd, true) => format!("setx {} {}", name, literal),
        }
    }

    /// Map a shell executable name to its dialect; unknown shells are POSIX.
    pub fn from_shell_name(name: &str) -> Dialect {
        let name = name.to_lowercase();
        if name.contains("powershell") || name.contains("pwsh") {
            Dialect::PowerShell
        } else if name.contains("cmd") {
            Dialect::Cmd
        } else {
            Dialect::Posix
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dialect::Posix => "sh",
            Dialect::PowerShell => "powershell",
            Dialect::Cmd => "cmd",
        })
    }
}

/// Pick the output dialect. An explicit shell wins; `auto` asks `detector`.
pub fn resolve_dialect(
    shell: ShellType,
    detector: &dyn ShellDetector,
) -> Result<Dialect, ShellError> {
    match shell {
        ShellType::Sh => Ok(Dialect::Posix),
        ShellType::Powershell => Ok(Dialect::PowerShell),
        ShellType::Cmd => Ok(Dialect::Cmd),
        ShellType::Auto => {
            let name = detector.detect()?;
            let dialect = Dialect::from_shell_name(&name);
            tracing::debug!(shell = %name, %dialect, "detected invoking shell");
            Ok(dialect)
        }
    }
}

/// Convert a flag name to its environment variable name.
///
/// An explicit name wins; otherwise the flag name is upper-cased with
/// hyphens turned into underscores. The prefix is prepended either way.
pub fn env_var_name(flag: &str, explicit: Option<&str>, prefix: &str) -> String {
    let name = match explicit {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => flag.to_uppercase().replace('-', "_"),
    };
    format!("{}{}", prefix, name)
}

/// Split `s` into text runs and single line breaks (`\r\n`, `\r` or `\n`).
///
/// `"a\r\nb\nc\r"` becomes `["a", "\r\n", "b", "\n", "c", "\r"]`.
pub fn split_preserve_newlines(s: &str) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let len = match bytes[i] {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => 2,
            b'\r' | b'\n' => 1,
            _ => {
                i += 1;
                continue;
            }
        };
        if start < i {
            parts.push(&s[start..i]);
        }
        parts.push(&s[i..i + len]);
        i += len;
        start = i;
    }
    if start < bytes.len() {
        parts.push(&s[start..]);
    }
    parts
}

/// POSIX single-quoted literal. Line breaks need no escaping inside single
/// quotes; an embedded `'` becomes `'\''`.
pub fn posix_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// PowerShell expression: single-quoted text runs (with `''` for `'`) and
/// double-quoted backtick escapes for line breaks, joined with ` + `.
pub fn powershell_literal(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    split_preserve_newlines(s)
        .into_iter()
        .map(|part| match part {
            "\n" => "\"`n\"".to_string(),
            "\r" => "\"`r\"".to_string(),
            "\r\n" => "\"`r`n\"".to_string(),
            text => format!("'{}'", text.replace('\'', "''")),
        })
        .collect::<Vec<_>>()
        .join(" + ")
}

/// cmd literal: double-quoted runs concatenated by adjacency, `"` escaped as
/// `\"`, and line breaks written as the escape text `\n`, `\r` or `\r\n`.
pub fn cmd_literal(s: &str) -> String {
    if s.is_empty() {
        return "\"\"".to_string();
    }
    split_preserve_newlines(s)
        .into_iter()
        .map(|part| match part {
            "\n" => r#""\n""#.to_string(),
            "\r" => r#""\r""#.to_string(),
            "\r\n" => r#""\r\n""#.to_string(),
            text => format!("\"{}\"", text.replace('"', "\\\"")),
        })
        .collect()
}

fn strip_outer_quotes(literal: &str) -> &str {
    literal
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(literal)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedShell(&'static str);

    impl ShellDetector for FixedShell {
        fn detect(&self) -> Result<String, ShellError> {
            Ok(self.0.to_string())
        }
    }

    struct NoShell;

    impl ShellDetector for NoShell {
        fn detect(&self) -> Result<String, ShellError> {
            Err(ShellError::Undetected)
        }
    }

    #[test]
    fn test_split_preserve_newlines() {
        assert_eq!(
            split_preserve_newlines("a\r\nb\nc\r"),
            vec!["a", "\r\n", "b", "\n", "c", "\r"]
        );
        assert_eq!(split_preserve_newlines("\n\n"), vec!["\n", "\n"]);
        assert_eq!(split_preserve_newlines("\n\r"), vec!["\n", "\r"]);
        assert_eq!(split_preserve_newlines("plain"), vec!["plain"]);
        assert!(split_preserve_newlines("").is_empty());
    }

    #[test]
    fn test_posix_literal() {
        assert_eq!(posix_literal(""), "''");
        assert_eq!(posix_literal("hello world"), "'hello world'");
        assert_eq!(posix_literal("$HOME `x`"), "'$HOME `x`'");
        assert_eq!(posix_literal("it's"), r"'it'\''s'");
        assert_eq!(posix_literal("a\nb"), "'a\nb'");
    }

    #[test]
    fn test_powershell_literal() {
        assert_eq!(powershell_literal(""), "''");
        assert_eq!(powershell_literal("it's"), "'it''s'");
        assert_eq!(powershell_literal("$x"), "'$x'");
        assert_eq!(
            powershell_literal("it's\na \"test\""),
            "'it''s' + \"`n\" + 'a \"test\"'"
        );
        assert_eq!(
            powershell_literal("a\r\nb\r"),
            "'a' + \"`r`n\" + 'b' + \"`r\""
        );
    }

    #[test]
    fn test_cmd_literal() {
        assert_eq!(cmd_literal(""), r#""""#);
        assert_eq!(cmd_literal("plain"), r#""plain""#);
        assert_eq!(cmd_literal(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(cmd_literal("a\nb"), r#""a""\n""b""#);
        assert_eq!(cmd_literal("a\r\nb\r"), r#""a""\r\n""b""\r""#);
    }

    #[test]
    fn test_assignments() {
        assert_eq!(Dialect::Posix.assignment("X", "v", false), "X='v'");
        assert_eq!(Dialect::Posix.assignment("X", "v", true), "export X='v'");
        assert_eq!(Dialect::PowerShell.assignment("X", "v", false), "$Env:X = 'v'");
        assert_eq!(
            Dialect::PowerShell.assignment("X", "v", true),
            "[System.Environment]::SetEnvironmentVariable('X', 'v', 'User')"
        );
        assert_eq!(Dialect::Cmd.assignment("X", "v", false), r#"set "X=v""#);
        assert_eq!(Dialect::Cmd.assignment("X", "a\nb", false), r#"set "X=a""\n""b""#);
        assert_eq!(Dialect::Cmd.assignment("X", "", false), r#"set "X=""#);
        assert_eq!(Dialect::Cmd.assignment("X", "v", true), r#"setx X "v""#);
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("log-level", None, ""), "LOG_LEVEL");
        assert_eq!(env_var_name("log-level", None, "APP_"), "APP_LOG_LEVEL");
        assert_eq!(env_var_name("log-level", Some("LVL"), "APP_"), "APP_LVL");
        assert_eq!(env_var_name("x", Some(""), ""), "X");
    }

    #[test]
    fn test_dialect_from_shell_name() {
        assert_eq!(Dialect::from_shell_name("pwsh"), Dialect::PowerShell);
        assert_eq!(Dialect::from_shell_name("powershell.exe"), Dialect::PowerShell);
        assert_eq!(Dialect::from_shell_name("cmd.exe"), Dialect::Cmd);
        assert_eq!(Dialect::from_shell_name("zsh"), Dialect::Posix);
        assert_eq!(Dialect::from_shell_name("fish"), Dialect::Posix);
    }

    #[test]
    fn test_resolve_dialect() {
        assert_eq!(resolve_dialect(ShellType::Cmd, &NoShell).unwrap(), Dialect::Cmd);
        assert_eq!(resolve_dialect(ShellType::Sh, &NoShell).unwrap(), Dialect::Posix);
        assert_eq!(
            resolve_dialect(ShellType::Auto, &FixedShell("pwsh.exe")).unwrap(),
            Dialect::PowerShell
        );
        assert_eq!(
            resolve_dialect(ShellType::Auto, &FixedShell("bash")).unwrap(),
            Dialect::Posix
        );
        assert!(matches!(
            resolve_dialect(ShellType::Auto, &NoShell),
            Err(ShellError::Undetected)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_posix_literal_evaluates_to_same_bytes() {
        use std::process::Command;

        let values = [
            "it's\na \"test\"",
            "mixed\r\nline\rendings\n",
            "$HOME `whoami` \\ ! *",
            "'''",
            "",
        ];
        for value in values {
            let script = format!(
                "{}; printf '%s' \"$V\"",
                Dialect::Posix.assignment("V", value, false)
            );
            let output = Command::new("sh").arg("-c").arg(&script).output().unwrap();
            assert!(output.status.success());
            assert_eq!(String::from_utf8(output.stdout).unwrap(), value);
        }
    }
}
