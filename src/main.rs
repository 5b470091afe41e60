//! argbind - declare, bind and validate shell script arguments.

use anyhow::{bail, Context, Result};
use argbind::declare::split_at_separator;
use argbind::{
    bind_args, declare, render_exports, render_help_var, resolve_dialect, write_output_file,
    BindOutcome, CmdSpec, ConfigError, Dialect, NaturalRangeFilter, ProcessShellDetector,
};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Declare, bind and validate shell script arguments.
#[derive(Parser, Debug)]
#[command(name = "argbind", version, about, disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bind script arguments and print them as shell variable assignments
    #[command(disable_help_flag = true)]
    Bind {
        /// Bind options, then `--`, then the script's $0 and arguments
        #[arg(
            trailing_var_arg = true,
            allow_hyphen_values = true,
            num_args = 0..,
            value_name = "OPTIONS"
        )]
        tokens: Vec<String>,
    },

    /// Test numbers against a natural range filter such as 1-3_5_7-
    Filter {
        /// Filter literal
        #[arg(allow_hyphen_values = true)]
        filter: String,

        /// Numbers that must all pass the filter
        #[arg(allow_negative_numbers = true)]
        numbers: Vec<i64>,

        /// Normalize the filter before printing or testing it
        #[arg(long)]
        normalize: bool,
    },
}

/// Install the stderr subscriber. `RUST_LOG` wins over `--debug`.
fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// clap consumes a `--` that precedes every bind option; put it back.
fn bind_tokens(tokens: Vec<String>, raw_tail: &[String]) -> Vec<String> {
    if raw_tail.len() == tokens.len() + 1 && raw_tail.first().map(String::as_str) == Some("--") {
        let mut restored = Vec::with_capacity(raw_tail.len());
        restored.push("--".to_string());
        restored.extend(tokens);
        return restored;
    }
    tokens
}

fn wants_debug(tokens: &[String]) -> bool {
    let (options, _) = split_at_separator(tokens);
    options.iter().any(|t| t == "--debug" || t == "-d")
}

/// Terminate the last statement, if any, with the dialect's line separator.
fn terminated(content: &str, dialect: Dialect) -> String {
    if content.is_empty() {
        String::new()
    } else {
        format!("{}{}", content, dialect.line_separator())
    }
}

/// Print statements, or write them to a file and print its path.
fn emit(spec: &CmdSpec, dialect: Dialect, content: &str) -> Result<()> {
    let content = terminated(content, dialect);
    if spec.output_file {
        let path =
            write_output_file(&content, dialect).context("failed to write output file")?;
        println!("{}", path.display());
    } else {
        print!("{}", content);
    }
    Ok(())
}

fn run_bind(tokens: &[String]) -> Result<()> {
    let invocation = match declare(tokens) {
        Err(ConfigError::Options(e))
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
        {
            e.exit()
        }
        other => other.context("invalid bind declarations")?,
    };
    let mut spec = invocation.spec;

    let dialect = resolve_dialect(spec.shell, &ProcessShellDetector)
        .context("failed to choose the output shell")?;
    tracing::debug!(%dialect, "output dialect");

    let name = spec.name.clone();
    let outcome = bind_args(&mut spec, &invocation.user_args).context(name)?;

    match outcome {
        BindOutcome::Help(text) => match render_help_var(&spec, dialect, &text) {
            Some(statement) => emit(&spec, dialect, &statement)?,
            None => eprint!("{}", text),
        },
        BindOutcome::Bound => {
            if spec.debug {
                tracing::debug!(spec = %serde_json::to_string(&spec)?, "bound command");
            }
            let content =
                render_exports(&spec, dialect).context("failed to render assignments")?;
            emit(&spec, dialect, &content)?;
        }
    }
    Ok(())
}

fn run_filter(filter: &str, numbers: &[i64], normalize: bool) -> Result<()> {
    let mut parsed = NaturalRangeFilter::parse(filter)
        .with_context(|| format!("invalid filter '{}'", filter))?;
    if normalize {
        parsed = parsed.normalize();
    }

    if numbers.is_empty() {
        println!("{}", parsed);
        return Ok(());
    }

    let rejected: Vec<String> = numbers
        .iter()
        .filter(|n| !parsed.test(**n))
        .map(|n| n.to_string())
        .collect();
    if !rejected.is_empty() {
        bail!("not matched by filter '{}': {}", parsed, rejected.join(", "));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bind { tokens } => {
            let raw_tail: Vec<String> = std::env::args().skip(2).collect();
            let tokens = bind_tokens(tokens, &raw_tail);
            init_tracing(wants_debug(&tokens));
            run_bind(&tokens)?;
        }
        Commands::Filter {
            filter,
            numbers,
            normalize,
        } => {
            init_tracing(false);
            run_filter(&filter, &numbers, normalize)?;
        }
    }

    Ok(())
}
