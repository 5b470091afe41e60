//! Declared flags and the resolved configuration of one `bind` invocation.

use crate::multi::{MultiFormat, MultiValueError};
use crate::range::{IntRange, RangeError};
use crate::shell::ShellType;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Flag names the generated command reserves for itself.
pub const RESERVED_NAMES: &[&str] = &["help"];

/// Errors that can occur while declaring flags.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("bind options: {0}")]
    Options(#[from] clap::Error),

    #[error("repeated flag names: {0}")]
    RepeatedNames(String),

    #[error("invalid flag name '{0}': use ASCII letters, digits, '-' and '_'")]
    InvalidName(String),

    #[error("flag name '{0}' is reserved")]
    ReservedName(String),

    #[error("invalid short option '{1}' for flag {0}: must be a single ASCII letter or digit other than 'h'")]
    InvalidShortOption(String, String),

    #[error("option --{0} would belong to both flag {1} and flag {2}")]
    ConflictingFlagOptions(String, String, String),

    #[error("short option '{0}' is used by both {1} and {2}")]
    DuplicateShortOption(char, String, String),

    #[error("'choices' on flag {0} has duplicate value: {1}")]
    DuplicateChoice(String, String),

    #[error("default value {1} for flag {0} is not in allowed choices {2:?}")]
    DefaultNotInChoices(String, String, Vec<String>),

    #[error("flag {0} is not multi-valued but has {1} default values")]
    TooManyDefaults(String, usize),

    #[error("flag {0}: {1}")]
    MultiValue(String, #[source] MultiValueError),

    #[error("invalid args range: {0}")]
    ArgsRange(#[from] RangeError),

    #[error("args range {0} does not allow any number of arguments")]
    EmptyArgsRange(IntRange),

    #[error("no user arguments provided after '--', at least $0 should be provided")]
    MissingScriptName,
}

/// One declared flag of the target script.
#[derive(Debug, Clone, Serialize)]
pub struct FlagSpec {
    /// Single-character alias (e.g. 'v' for -v)
    pub short: Option<char>,
    /// Values used when the flag is absent
    pub default: Option<Vec<String>>,
    /// Value used when the flag is given without an argument
    pub no_opt_default: Option<String>,
    /// Allowed values, empty for any value
    pub choices: Vec<String>,
    pub required: bool,
    /// Accept several values
    pub multi: bool,
    /// How several values are packed, on input and on output
    pub multi_formats: Vec<MultiFormat>,
    pub help: Option<String>,
    /// Environment variable name, overriding the one derived from the flag name
    pub env_name: Option<String>,
    /// Persist the variable (export / registry) instead of a session assignment
    pub export: bool,
    /// Values resolved by binding
    pub value: Vec<String>,
}

impl Default for FlagSpec {
    fn default() -> Self {
        Self {
            short: None,
            default: None,
            no_opt_default: None,
            choices: Vec::new(),
            required: false,
            multi: false,
            multi_formats: vec![MultiFormat::Comma],
            help: None,
            env_name: None,
            export: false,
            value: Vec::new(),
        }
    }
}

impl FlagSpec {
    /// The formats used to split and join this flag's values. Single-valued
    /// flags keep their value verbatim.
    pub fn effective_formats(&self) -> &[MultiFormat] {
        if self.multi {
            &self.multi_formats
        } else {
            &[]
        }
    }

    /// Whether `value` is allowed by the declared choices.
    pub fn allows(&self, value: &str) -> bool {
        self.choices.is_empty() || self.choices.iter().any(|c| c == value)
    }
}

/// Everything a `bind` invocation declared, plus the bound values.
#[derive(Debug, Clone, Serialize)]
pub struct CmdSpec {
    /// Name of the target script (defaults to its `$0`)
    pub name: String,
    pub short_desc: Option<String>,
    pub long_desc: Option<String>,
    /// Prepended to every emitted variable name
    pub prefix: String,
    pub debug: bool,
    /// Allowed number of positional arguments
    pub args_range: IntRange,
    /// Variable receiving the positional arguments, if any
    pub args_var: Option<String>,
    pub args_formats: Vec<MultiFormat>,
    pub shell: ShellType,
    /// Variable receiving the help text when help is requested
    pub help_var: Option<String>,
    pub help_export: bool,
    /// Write the statements to a temporary file and print its path
    pub output_file: bool,
    /// Declaring a flag name twice is not an error
    pub allow_repeated_flags: bool,
    pub flags: BTreeMap<String, FlagSpec>,
    /// Positional arguments resolved by binding
    pub args: Vec<String>,
}

impl Default for CmdSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            short_desc: None,
            long_desc: None,
            prefix: String::new(),
            debug: false,
            args_range: IntRange::unbounded(),
            args_var: None,
            args_formats: vec![MultiFormat::Comma],
            shell: ShellType::Auto,
            help_var: None,
            help_export: false,
            output_file: false,
            allow_repeated_flags: false,
            flags: BTreeMap::new(),
            args: Vec::new(),
        }
    }
}

impl CmdSpec {
    /// Validate the declarations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.args_range.has_intersect(&IntRange::at_least(0)) {
            return Err(ConfigError::EmptyArgsRange(self.args_range));
        }

        let mut shorts: Vec<(char, &str)> = Vec::new();

        for (name, flag) in &self.flags {
            validate_name(name)?;

            if let Some(short) = flag.short {
                if !short.is_ascii_alphanumeric() || short == 'h' {
                    return Err(ConfigError::InvalidShortOption(
                        name.clone(),
                        short.to_string(),
                    ));
                }
                if let Some((_, other)) = shorts.iter().find(|(c, _)| *c == short) {
                    return Err(ConfigError::DuplicateShortOption(
                        short,
                        other.to_string(),
                        name.clone(),
                    ));
                }
                shorts.push((short, name));
            }

            Self::validate_choices(name, flag)?;
        }

        Ok(())
    }

    fn validate_choices(name: &str, flag: &FlagSpec) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for choice in &flag.choices {
            if !seen.insert(choice) {
                return Err(ConfigError::DuplicateChoice(
                    name.to_string(),
                    choice.clone(),
                ));
            }
        }

        if let Some(ref defaults) = flag.default {
            if !flag.multi && defaults.len() > 1 {
                return Err(ConfigError::TooManyDefaults(name.to_string(), defaults.len()));
            }
            if let Some(bad) = defaults.iter().find(|d| !flag.allows(d)) {
                return Err(ConfigError::DefaultNotInChoices(
                    name.to_string(),
                    bad.clone(),
                    flag.choices.clone(),
                ));
            }
        }
        Ok(())
    }
}

/// Check that `name` can be used as a long option and a variable name.
pub fn validate_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty()
        || name.starts_with('-')
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::InvalidName(name.to_string()));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(ConfigError::ReservedName(name.to_string()));
    }
    Ok(())
}
