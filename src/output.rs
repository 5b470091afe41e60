//! Rendering bound values as shell assignment statements.

use crate::config::CmdSpec;
use crate::multi::{serialize_multi_values, MultiValueError};
use crate::shell::{env_var_name, Dialect};
use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use tempfile::Builder;

/// Render one assignment per flag in name order, then the positional
/// arguments if an args variable was declared.
///
/// Statements are joined with the dialect's line separator, without a
/// trailing one; printing the text terminates it.
pub fn render_exports(spec: &CmdSpec, dialect: Dialect) -> Result<String, MultiValueError> {
    let mut statements = Vec::with_capacity(spec.flags.len() + 1);

    for (name, flag) in &spec.flags {
        let var_name = env_var_name(name, flag.env_name.as_deref(), &spec.prefix);
        let value = serialize_multi_values(flag.effective_formats(), &flag.value)?;
        statements.push(dialect.assignment(&var_name, &value, flag.export));
    }

    if let Some(ref args_var) = spec.args_var {
        let value = serialize_multi_values(&spec.args_formats, &spec.args)?;
        statements.push(dialect.assignment(args_var, &value, false));
    }

    Ok(statements.join(dialect.line_separator()))
}

/// Render the assignment of the help text to the declared help variable.
/// Returns `None` when no help variable was declared.
pub fn render_help_var(spec: &CmdSpec, dialect: Dialect, help_text: &str) -> Option<String> {
    let var = spec.help_var.as_deref()?;
    Some(dialect.assignment(var, help_text, spec.help_export))
}

fn file_suffix(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Posix => ".sh",
        Dialect::PowerShell => ".ps1",
        Dialect::Cmd => ".cmd",
    }
}

/// Write statements to a temporary file and return its path.
///
/// The file persists after the process exits; the caller sources it and is
/// responsible for removing it.
pub fn write_output_file(content: &str, dialect: Dialect) -> Result<PathBuf> {
    let mut file = Builder::new()
        .prefix("argbind-")
        .suffix(file_suffix(dialect))
        .tempfile()?;
    file.write_all(content.as_bytes())?;
    let path = file.into_temp_path().keep()?;
    tracing::debug!(path = %path.display(), "wrote statements to file");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlagSpec;
    use crate::multi::MultiFormat;

    fn strings(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    fn make_spec() -> CmdSpec {
        let mut spec = CmdSpec {
            name: "test".to_string(),
            prefix: "APP_".to_string(),
            ..CmdSpec::default()
        };
        spec.flags.insert(
            "out-dir".to_string(),
            FlagSpec {
                value: strings(&["/tmp/x y"]),
                ..FlagSpec::default()
            },
        );
        spec.flags.insert(
            "tags".to_string(),
            FlagSpec {
                multi: true,
                multi_formats: vec![MultiFormat::Space],
                value: strings(&["a", "b"]),
                export: true,
                ..FlagSpec::default()
            },
        );
        spec.flags.insert(
            "level".to_string(),
            FlagSpec {
                env_name: Some("LOG".to_string()),
                value: strings(&["it's"]),
                ..FlagSpec::default()
            },
        );
        spec
    }

    #[test]
    fn test_render_posix() {
        let output = render_exports(&make_spec(), Dialect::Posix).unwrap();
        assert_eq!(
            output,
            "APP_LOG='it'\\''s'\nAPP_OUT_DIR='/tmp/x y'\nexport APP_TAGS='a b'"
        );
    }

    #[test]
    fn test_render_empty_value() {
        let mut spec = CmdSpec::default();
        spec.flags.insert("x".to_string(), FlagSpec::default());
        assert_eq!(render_exports(&spec, Dialect::Posix).unwrap(), "X=''");
    }

    #[test]
    fn test_render_args_var() {
        let mut spec = CmdSpec {
            args_var: Some("FILES".to_string()),
            args_formats: vec![MultiFormat::Json],
            args: strings(&["a b", "c"]),
            ..CmdSpec::default()
        };
        assert_eq!(
            render_exports(&spec, Dialect::Posix).unwrap(),
            "FILES='[\"a b\",\"c\"]'"
        );

        spec.args_var = None;
        assert_eq!(render_exports(&spec, Dialect::Posix).unwrap(), "");
    }

    #[test]
    fn test_render_cmd_uses_crlf() {
        let output = render_exports(&make_spec(), Dialect::Cmd).unwrap();
        assert_eq!(output.matches("\r\n").count(), 2);
        assert!(output.contains("setx APP_TAGS "));
    }

    #[test]
    fn test_render_powershell() {
        let output = render_exports(&make_spec(), Dialect::PowerShell).unwrap();
        assert!(output.contains("$Env:APP_LOG = 'it''s'"));
        assert!(output.contains("SetEnvironmentVariable('APP_TAGS', 'a b', 'User')"));
    }

    #[test]
    fn test_render_help_var() {
        let mut spec = CmdSpec::default();
        assert!(render_help_var(&spec, Dialect::Posix, "usage").is_none());

        spec.help_var = Some("HELP".to_string());
        assert_eq!(
            render_help_var(&spec, Dialect::Posix, "usage: x").unwrap(),
            "HELP='usage: x'"
        );
        spec.help_export = true;
        assert_eq!(
            render_help_var(&spec, Dialect::Posix, "usage: x").unwrap(),
            "export HELP='usage: x'"
        );
    }

    #[test]
    fn test_write_output_file() {
        let path = write_output_file("X='1'\n", Dialect::Posix).unwrap();
        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("sh"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "X='1'\n");
        std::fs::remove_file(&path).unwrap();

        let path = write_output_file("set \"X=1\"\r\n", Dialect::Cmd).unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("cmd"));
        std::fs::remove_file(&path).unwrap();
    }
}
