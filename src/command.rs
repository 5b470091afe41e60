//! The target script's command line, built with clap from its declarations.

use crate::config::{CmdSpec, FlagSpec};
use clap::{Arg, ArgAction, Command};

/// Id of the positional argument collector. Brackets keep it apart from any
/// valid flag name.
pub const ARGS_ID: &str = "[ARGS]";

/// Build a Clap Command for the target script.
pub fn build_command(spec: &CmdSpec) -> Command {
    let mut cmd = Command::new(spec.name.clone())
        .no_binary_name(true)
        .disable_version_flag(true)
        .disable_help_subcommand(true);

    if let Some(ref short) = spec.short_desc {
        cmd = cmd.about(short.clone());
    }
    if let Some(ref long) = spec.long_desc {
        cmd = cmd.long_about(long.clone());
    }

    for (name, flag) in &spec.flags {
        cmd = cmd.arg(build_arg(name, flag));
    }

    cmd.arg(
        Arg::new(ARGS_ID)
            .value_name("ARGS")
            .num_args(0..)
            .action(ArgAction::Append),
    )
}

/// Build a Clap Arg for one flag.
///
/// Every occurrence is kept; the binder decides how occurrences combine.
/// Defaults and choices are shown in the help text but enforced by the binder.
fn build_arg(name: &str, flag: &FlagSpec) -> Arg {
    let mut arg = Arg::new(name.to_string())
        .long(name.to_string())
        .action(ArgAction::Append)
        .value_name(if flag.multi { "VALUES" } else { "VALUE" });

    if let Some(short) = flag.short {
        arg = arg.short(short);
    }

    // pflag style: a bare `--name` takes the no-option default, a value needs `=`
    if let Some(ref missing) = flag.no_opt_default {
        arg = arg
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value(missing.clone());
    }

    let mut help = flag.help.clone().unwrap_or_default();
    let mut note = |text: String| {
        if !help.is_empty() {
            help.push(' ');
        }
        help.push_str(&text);
    };
    if flag.required {
        note("[required]".to_string());
    }
    if let Some(ref defaults) = flag.default {
        if !defaults.is_empty() {
            note(format!("[default: {}]", defaults.join(", ")));
        }
    }
    if !flag.choices.is_empty() {
        note(format!("[possible values: {}]", flag.choices.join(", ")));
    }
    if !help.is_empty() {
        arg = arg.help(help);
    }

    arg
}

/// Generate the full help text for the target script.
pub fn generate_help(spec: &CmdSpec) -> String {
    let mut cmd = build_command(spec);
    if spec.long_desc.is_some() {
        cmd.render_long_help().to_string()
    } else {
        cmd.render_help().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_spec(flags: Vec<(&str, FlagSpec)>) -> CmdSpec {
        CmdSpec {
            name: "myscript".to_string(),
            short_desc: Some("My awesome script".to_string()),
            flags: flags
                .into_iter()
                .map(|(n, f)| (n.to_string(), f))
                .collect(),
            ..CmdSpec::default()
        }
    }

    #[test]
    fn test_command_is_well_formed() {
        let spec = make_spec(vec![
            (
                "verbose",
                FlagSpec {
                    short: Some('v'),
                    no_opt_default: Some("true".to_string()),
                    ..FlagSpec::default()
                },
            ),
            (
                "tags",
                FlagSpec {
                    multi: true,
                    ..FlagSpec::default()
                },
            ),
        ]);
        build_command(&spec).debug_assert();
    }

    #[test]
    fn test_generate_help() {
        let spec = make_spec(vec![
            (
                "level",
                FlagSpec {
                    short: Some('l'),
                    default: Some(vec!["info".to_string()]),
                    choices: vec!["debug".to_string(), "info".to_string()],
                    help: Some("Log level".to_string()),
                    ..FlagSpec::default()
                },
            ),
            (
                "out",
                FlagSpec {
                    required: true,
                    ..FlagSpec::default()
                },
            ),
        ]);

        let help = generate_help(&spec);

        assert!(help.contains("myscript"), "Help should contain script name");
        assert!(help.contains("My awesome script"), "Help should contain description");
        assert!(help.contains("-l, --level"), "Help should contain level flag");
        assert!(help.contains("Log level"));
        assert!(help.contains("[default: info]"));
        assert!(help.contains("[possible values: debug, info]"));
        assert!(help.contains("--out"));
        assert!(help.contains("[required]"));
        assert!(help.contains("--help"), "Help should contain help option");
    }

    #[test]
    fn test_generate_help_prefers_long_description() {
        let mut spec = make_spec(vec![]);
        spec.long_desc = Some("A much longer description".to_string());
        let help = generate_help(&spec);
        assert!(help.contains("A much longer description"));
    }

    #[test]
    fn test_no_opt_default() {
        let spec = make_spec(vec![(
            "color",
            FlagSpec {
                no_opt_default: Some("always".to_string()),
                ..FlagSpec::default()
            },
        )]);

        let m = build_command(&spec)
            .try_get_matches_from(["--color", "x"])
            .unwrap();
        let color: Vec<_> = m.get_many::<String>("color").unwrap().collect();
        assert_eq!(color, vec!["always"]);
        let args: Vec<_> = m.get_many::<String>(ARGS_ID).unwrap().collect();
        assert_eq!(args, vec!["x"]);

        let m = build_command(&spec)
            .try_get_matches_from(["--color=never"])
            .unwrap();
        let color: Vec<_> = m.get_many::<String>("color").unwrap().collect();
        assert_eq!(color, vec!["never"]);
    }
}
