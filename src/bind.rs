//! Binding the target script's arguments against its declarations.

use crate::command::{build_command, generate_help, ARGS_ID};
use crate::config::CmdSpec;
use crate::multi::{parse_multi_values, MultiValueError};
use crate::range::IntRange;
use clap::error::ErrorKind;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during binding.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("{0}")]
    Usage(#[from] clap::Error),

    #[error("required flag(s) {} not set", quoted(.0))]
    MissingRequired(Vec<String>),

    #[error("invalid value \"{value}\" for flag --{flag}, allowed values are: {}", .choices.join(", "))]
    InvalidChoice {
        flag: String,
        value: String,
        choices: Vec<String>,
    },

    #[error("flag {0}: {1}")]
    MultiValue(String, #[source] MultiValueError),

    #[error("{0}")]
    ArgsCount(String),
}

fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("\"{}\"", n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome of binding arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// Values were stored into the command declarations.
    Bound,
    /// User requested help (-h or --help); carries the help text.
    Help(String),
}

/// Accepted number of positional arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgsCount {
    Arbitrary,
    Exact(usize),
    AtMost(usize),
    AtLeast(usize),
    Between(usize, usize),
}

fn to_count(n: i64) -> usize {
    usize::try_from(n.max(0)).unwrap_or(usize::MAX)
}

impl ArgsCount {
    /// Derive the accepted counts from an integer range. Negative members are
    /// ignored; a range without natural members accepts no arguments.
    pub fn from_range(range: &IntRange) -> ArgsCount {
        let natural = range.intersect(&IntRange::at_least(0));
        if !natural.is_not_empty() {
            return ArgsCount::Exact(0);
        }
        let closed = natural.try_my_best_to_closed_interval();

        if let Some(n) = closed.single_value() {
            ArgsCount::Exact(to_count(n))
        } else if closed.is_greater_or_equal_than() {
            match to_count(closed.min) {
                0 => ArgsCount::Arbitrary,
                n => ArgsCount::AtLeast(n),
            }
        } else if closed.min == 0 {
            ArgsCount::AtMost(to_count(closed.max))
        } else {
            ArgsCount::Between(to_count(closed.min), to_count(closed.max))
        }
    }

    pub fn check(&self, received: usize) -> Result<(), BindError> {
        let message = match *self {
            ArgsCount::Exact(n) if received != n => {
                format!("accepts {} arg(s), received {}", n, received)
            }
            ArgsCount::AtMost(n) if received > n => {
                format!("accepts at most {} arg(s), received {}", n, received)
            }
            ArgsCount::AtLeast(n) if received < n => {
                format!("requires at least {} arg(s), only received {}", n, received)
            }
            ArgsCount::Between(min, max) if !(min..=max).contains(&received) => format!(
                "accepts between {} and {} arg(s), received {}",
                min, max, received
            ),
            _ => return Ok(()),
        };
        Err(BindError::ArgsCount(message))
    }
}

impl fmt::Display for ArgsCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ArgsCount::Arbitrary => f.write_str("any number of args"),
            ArgsCount::Exact(n) => write!(f, "exactly {} arg(s)", n),
            ArgsCount::AtMost(n) => write!(f, "at most {} arg(s)", n),
            ArgsCount::AtLeast(n) => write!(f, "at least {} arg(s)", n),
            ArgsCount::Between(min, max) => write!(f, "between {} and {} arg(s)", min, max),
        }
    }
}

/// Bind the script's arguments, storing values into `spec`.
///
/// Returns `BindOutcome::Help` if -h or --help appears before any `--`.
/// On error `spec` may be partially bound and must not be rendered.
pub fn bind_args(spec: &mut CmdSpec, args: &[String]) -> Result<BindOutcome, BindError> {
    if args
        .iter()
        .take_while(|a| *a != "--")
        .any(|a| a == "-h" || a == "--help")
    {
        return Ok(BindOutcome::Help(generate_help(spec)));
    }

    let matches = match build_command(spec).try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(e) if e.kind() == ErrorKind::DisplayHelp => {
            return Ok(BindOutcome::Help(generate_help(spec)));
        }
        Err(e) => return Err(BindError::Usage(e)),
    };

    let mut missing = Vec::new();
    for (name, flag) in spec.flags.iter_mut() {
        let raw: Option<Vec<String>> = matches
            .get_many::<String>(name)
            .map(|values| values.cloned().collect());

        let values = match raw {
            Some(raw) if flag.multi => {
                parse_multi_values(flag.effective_formats(), Some(raw.as_slice()), name)
                    .map_err(|e| BindError::MultiValue(name.clone(), e))?
                    .unwrap_or_default()
            }
            Some(mut raw) => raw.pop().into_iter().collect(),
            None => match flag.default {
                Some(ref defaults) => defaults.clone(),
                None if flag.required => {
                    missing.push(name.clone());
                    continue;
                }
                None => Vec::new(),
            },
        };

        if let Some(bad) = values.iter().find(|v| !flag.allows(v)) {
            return Err(BindError::InvalidChoice {
                flag: name.clone(),
                value: bad.clone(),
                choices: flag.choices.clone(),
            });
        }
        tracing::debug!(flag = %name, ?values, "bound flag");
        flag.value = values;
    }
    if !missing.is_empty() {
        return Err(BindError::MissingRequired(missing));
    }

    let positional: Vec<String> = matches
        .get_many::<String>(ARGS_ID)
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let count = ArgsCount::from_range(&spec.args_range);
    tracing::debug!(%count, received = positional.len(), "checking positional arguments");
    count.check(positional.len())?;
    spec.args = positional;

    Ok(BindOutcome::Bound)
}
