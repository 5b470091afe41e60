//! Reading the flag declarations that precede `--` in a `bind` invocation.
//!
//! Declarations are read in two passes. The first pass parses the static
//! options for `--flag` names and scans their multiplicity, which is enough
//! to register the per-flag options. The second pass parses every token with
//! a `clap::Command` built from those names.

use crate::config::{validate_name, CmdSpec, ConfigError, FlagSpec};
use crate::multi::{parse_format_list, parse_multi_values, MultiFormat};
use crate::range::IntRange;
use crate::shell::ShellType;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::collections::BTreeMap;

/// What the first pass learns about a declared flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub multi: bool,
    pub multi_formats: Vec<MultiFormat>,
}

/// A parsed `bind` invocation: the declarations and the script's own tokens.
#[derive(Debug)]
pub struct Invocation {
    pub spec: CmdSpec,
    /// Tokens to bind, without `$0`
    pub user_args: Vec<String>,
}

/// Split `tokens` at the first `--`. Without a separator every token is a
/// bind option and there are no user tokens.
pub fn split_at_separator(tokens: &[String]) -> (&[String], &[String]) {
    match tokens.iter().position(|t| t == "--") {
        Some(i) => (&tokens[..i], &tokens[i + 1..]),
        None => (tokens, &[]),
    }
}

/// Options every declared flag gets, as `--flag-NAME-OPTION`.
const FLAG_OPTIONS: &[&str] = &[
    "short",
    "default",
    "no-opt-default",
    "choices",
    "required",
    "multi",
    "multi-format",
    "helper",
    "env",
    "export",
];

/// Id of the first pass' collector for values of per-flag options.
const SKIPPED_ID: &str = "[SKIPPED]";

fn flag_option_id(name: &str, option: &str) -> String {
    format!("flag-{}-{}", name, option)
}

fn is_flag_option(token: &str) -> bool {
    token.starts_with("--flag-")
}

/// Collect the values given to a long option as `--long V` or `--long=V`.
fn scan_long_values(tokens: &[String], long: &str) -> Vec<String> {
    let long_flag = format!("--{}", long);
    let long_eq = format!("--{}=", long);

    let mut values = Vec::new();
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        if *token == long_flag {
            if let Some(value) = iter.next() {
                values.push(value.clone());
            }
        } else if let Some(value) = token.strip_prefix(&long_eq) {
            values.push(value.to_string());
        }
    }
    values
}

fn scan_switch(tokens: &[String], long: &str) -> bool {
    let long_flag = format!("--{}", long);
    tokens.iter().any(|t| *t == long_flag)
}

/// The raw `--flag` values, read by the same static options the second pass
/// has, so clusters such as `-rf a` or `-df=a` count as declarations.
///
/// Per-flag options are unknown at this point. They are dropped from the
/// tokens and their detached values land in a hidden positional. Parse
/// errors are left to the second pass.
fn scan_flag_values(tokens: &[String]) -> Vec<String> {
    let cmd = build_bind_command(&[])
        .disable_help_flag(true)
        .ignore_errors(true)
        .arg(
            Arg::new("help")
                .short('h')
                .long("help")
                .action(ArgAction::SetTrue)
                .hide(true),
        )
        .arg(
            Arg::new(SKIPPED_ID)
                .num_args(1..)
                .action(ArgAction::Append)
                .hide(true),
        );

    let static_tokens = tokens.iter().filter(|t| !is_flag_option(t));
    match cmd.try_get_matches_from(static_tokens) {
        Ok(matches) => get_strings(&matches, "flag"),
        Err(e) => {
            tracing::debug!(error = %e, "first pass found no declarations");
            Vec::new()
        }
    }
}

/// Reject names whose generated options coincide, like `x` and `x-no-opt`
/// which would both own `--flag-x-no-opt-default`.
fn check_option_ids(declarations: &[Declaration]) -> Result<(), ConfigError> {
    let mut owners: BTreeMap<String, &str> = BTreeMap::new();
    for decl in declarations {
        for option in FLAG_OPTIONS {
            let id = flag_option_id(&decl.name, option);
            if let Some(owner) = owners.insert(id.clone(), decl.name.as_str()) {
                return Err(ConfigError::ConflictingFlagOptions(
                    id,
                    owner.to_string(),
                    decl.name.clone(),
                ));
            }
        }
    }
    Ok(())
}

/// First pass: find declared flag names with their multiplicity and formats.
///
/// Names are returned once each, in declaration order.
pub fn scan_declarations(tokens: &[String]) -> Result<Vec<Declaration>, ConfigError> {
    let mut declarations: Vec<Declaration> = Vec::new();

    for value in scan_flag_values(tokens) {
        for name in value.split(',').map(str::trim) {
            validate_name(name)?;
            if declarations.iter().any(|d| d.name == name) {
                continue;
            }

            let multi = scan_switch(tokens, &flag_option_id(name, "multi"));
            let raw_formats = scan_long_values(tokens, &flag_option_id(name, "multi-format"));
            let multi_formats = if raw_formats.is_empty() {
                vec![MultiFormat::Comma]
            } else {
                parse_format_list(&raw_formats)
                    .map_err(|e| ConfigError::MultiValue(name.to_string(), e))?
            };

            declarations.push(Declaration {
                name: name.to_string(),
                multi,
                multi_formats,
            });
        }
    }
    check_option_ids(&declarations)?;

    tracing::debug!(
        flags = ?declarations.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
        "scanned flag declarations"
    );
    Ok(declarations)
}

fn value_arg(id: String, help: String) -> Arg {
    Arg::new(id.clone())
        .long(id)
        .action(ArgAction::Set)
        .value_name("VALUE")
        .help(help)
}

fn switch_arg(id: String, help: String) -> Arg {
    Arg::new(id.clone())
        .long(id)
        .action(ArgAction::SetTrue)
        .help(help)
}

/// Second pass: the `bind` option surface for the given declarations.
pub fn build_bind_command(declarations: &[Declaration]) -> Command {
    let mut cmd = Command::new("bind")
        .no_binary_name(true)
        .disable_version_flag(true)
        .about("Declare, bind and validate script arguments, then print them as shell variable assignments")
        .override_usage("argbind bind [OPTIONS] -- <$0> [ARGS]...")
        .arg(
            Arg::new("name")
                .short('n')
                .long("name")
                .value_name("NAME")
                .help("The name of the command, defaults to $0"),
        )
        .arg(
            Arg::new("short")
                .short('s')
                .long("short")
                .value_name("TEXT")
                .help("The short description of the command"),
        )
        .arg(
            Arg::new("long")
                .short('l')
                .long("long")
                .value_name("TEXT")
                .help("The long description of the command"),
        )
        .arg(
            Arg::new("prefix")
                .short('p')
                .long("prefix")
                .value_name("PREFIX")
                .default_value("")
                .hide_default_value(true)
                .help("Prefix of every emitted variable name"),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Log the resolved declarations to stderr"),
        )
        .arg(
            Arg::new("args-range")
                .short('a')
                .long("args-range")
                .value_name("RANGE")
                .help("Allowed number of positional arguments, e.g. 2, >=1, [1,3]; unbounded when empty"),
        )
        .arg(
            Arg::new("args-var")
                .long("args-var")
                .value_name("VAR")
                .help("Variable receiving the positional arguments"),
        )
        .arg(
            Arg::new("args-multi-format")
                .long("args-multi-format")
                .value_name("FORMAT")
                .action(ArgAction::Append)
                .default_value("comma")
                .help("How positional arguments are joined: comma, newline, space or json"),
        )
        .arg(
            Arg::new("shell")
                .long("shell")
                .value_name("SHELL")
                .value_parser(clap::value_parser!(ShellType))
                .default_value("auto")
                .help("Syntax of the emitted statements"),
        )
        .arg(
            Arg::new("help-var")
                .long("help-var")
                .value_name("VAR")
                .help("Assign the help text to this variable instead of printing it"),
        )
        .arg(
            Arg::new("help-export")
                .long("help-export")
                .action(ArgAction::SetTrue)
                .help("Export the help variable"),
        )
        .arg(
            Arg::new("output-file")
                .long("output-file")
                .action(ArgAction::SetTrue)
                .help("Write the statements to a temporary file and print its path"),
        )
        .arg(
            Arg::new("allow-repeated-flags")
                .short('r')
                .long("allow-repeated-flags")
                .action(ArgAction::SetTrue)
                .help("Allow a flag name to be declared more than once"),
        )
        .arg(
            Arg::new("flag")
                .short('f')
                .long("flag")
                .value_name("NAMES")
                .action(ArgAction::Append)
                .help("Declare flags, comma separated"),
        );

    for decl in declarations {
        let name = &decl.name;
        let default = if decl.multi {
            value_arg(
                flag_option_id(name, "default"),
                format!("Default values for flag {}", name),
            )
            .action(ArgAction::Append)
        } else {
            value_arg(
                flag_option_id(name, "default"),
                format!("Default value for flag {}", name),
            )
        };

        cmd = cmd
            .arg(value_arg(
                flag_option_id(name, "short"),
                format!("Short name for flag {}", name),
            ))
            .arg(default)
            .arg(value_arg(
                flag_option_id(name, "no-opt-default"),
                format!("Value of flag {} when given without a value", name),
            ))
            .arg(
                value_arg(
                    flag_option_id(name, "choices"),
                    format!("Allowed values for flag {}, comma separated", name),
                )
                .action(ArgAction::Append),
            )
            .arg(switch_arg(
                flag_option_id(name, "required"),
                format!("Whether flag {} is required", name),
            ))
            .arg(switch_arg(
                flag_option_id(name, "multi"),
                format!("Whether flag {} is multi-valued", name),
            ))
            .arg(
                value_arg(
                    flag_option_id(name, "multi-format"),
                    format!(
                        "Multi value format for flag {}: any of comma, newline, space, or json alone",
                        name
                    ),
                )
                .action(ArgAction::Append),
            )
            .arg(value_arg(
                flag_option_id(name, "helper"),
                format!("Help text for flag {}", name),
            ))
            .arg(value_arg(
                flag_option_id(name, "env"),
                format!("Variable name for flag {}", name),
            ))
            .arg(switch_arg(
                flag_option_id(name, "export"),
                format!("Export the variable of flag {}", name),
            ));
    }

    cmd
}

fn get_string(matches: &ArgMatches, id: &str) -> Option<String> {
    matches
        .get_one::<String>(id)
        .filter(|s| !s.is_empty())
        .cloned()
}

fn get_strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn repeated_names(names: &[String]) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for name in names {
        *counts.entry(name.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name.to_string())
        .collect()
}

fn flag_from_matches(
    matches: &ArgMatches,
    decl: &Declaration,
) -> Result<FlagSpec, ConfigError> {
    let name = &decl.name;
    let id = |option: &str| flag_option_id(name, option);

    let short = match get_string(matches, &id("short")) {
        None => None,
        Some(short) => {
            let mut chars = short.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => return Err(ConfigError::InvalidShortOption(name.clone(), short)),
            }
        }
    };

    let raw_defaults = matches
        .get_many::<String>(&id("default"))
        .map(|values| values.cloned().collect::<Vec<_>>());
    let default = if decl.multi {
        parse_multi_values(&decl.multi_formats, raw_defaults.as_deref(), name)
            .map_err(|e| ConfigError::MultiValue(name.clone(), e))?
    } else {
        raw_defaults
    };

    let choices = parse_multi_values(
        &[MultiFormat::Comma],
        Some(get_strings(matches, &id("choices")).as_slice()),
        name,
    )
    .map_err(|e| ConfigError::MultiValue(name.clone(), e))?
    .unwrap_or_default();

    Ok(FlagSpec {
        short,
        default,
        no_opt_default: matches.get_one::<String>(&id("no-opt-default")).cloned(),
        choices,
        required: matches.get_flag(&id("required")),
        multi: decl.multi,
        multi_formats: decl.multi_formats.clone(),
        help: get_string(matches, &id("helper")),
        env_name: get_string(matches, &id("env")),
        export: matches.get_flag(&id("export")),
        value: Vec::new(),
    })
}

/// Read a whole `bind` invocation: options, `--`, then `$0` and the script's
/// arguments.
pub fn declare(tokens: &[String]) -> Result<Invocation, ConfigError> {
    let (options, user) = split_at_separator(tokens);
    let declarations = scan_declarations(options)?;

    let matches = build_bind_command(&declarations).try_get_matches_from(options)?;

    let Some((script, user_args)) = user.split_first() else {
        return Err(ConfigError::MissingScriptName);
    };

    let declared = get_strings(&matches, "flag");
    let declared: Vec<String> = declared
        .iter()
        .flat_map(|v| v.split(','))
        .map(|n| n.trim().to_string())
        .collect();
    let allow_repeated_flags = matches.get_flag("allow-repeated-flags");
    let repeated = repeated_names(&declared);
    if !repeated.is_empty() && !allow_repeated_flags {
        return Err(ConfigError::RepeatedNames(repeated.join(", ")));
    }

    let args_range = match matches.get_one::<String>("args-range") {
        Some(literal) => IntRange::parse(literal, true)?,
        None => IntRange::unbounded(),
    };

    let mut flags = BTreeMap::new();
    for decl in &declarations {
        flags.insert(decl.name.clone(), flag_from_matches(&matches, decl)?);
    }

    let spec = CmdSpec {
        name: get_string(&matches, "name").unwrap_or_else(|| script.clone()),
        short_desc: get_string(&matches, "short"),
        long_desc: get_string(&matches, "long"),
        prefix: matches
            .get_one::<String>("prefix")
            .cloned()
            .unwrap_or_default(),
        debug: matches.get_flag("debug"),
        args_range,
        args_var: get_string(&matches, "args-var"),
        args_formats: parse_format_list(&get_strings(&matches, "args-multi-format"))
            .map_err(|e| ConfigError::MultiValue("args".to_string(), e))?,
        shell: matches
            .get_one::<ShellType>("shell")
            .copied()
            .unwrap_or_default(),
        help_var: get_string(&matches, "help-var"),
        help_export: matches.get_flag("help-export"),
        output_file: matches.get_flag("output-file"),
        allow_repeated_flags,
        flags,
        args: Vec::new(),
    };
    spec.validate()?;

    Ok(Invocation {
        spec,
        user_args: user_args.to_vec(),
    })
}
