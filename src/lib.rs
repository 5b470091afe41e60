//! argbind - declare, bind and validate shell script arguments.
//!
//! This library provides the core functionality for declaring a script's
//! flags, binding its command line against them, and printing the bound
//! values as assignment statements for POSIX shells, PowerShell or cmd.
//! It also carries the integer range algebra used for argument counts.

pub mod bind;
pub mod command;
pub mod config;
pub mod declare;
pub mod detect;
pub mod filter;
pub mod multi;
pub mod output;
pub mod range;
pub mod shell;

pub use bind::{bind_args, ArgsCount, BindError, BindOutcome};
pub use command::{build_command, generate_help};
pub use config::{CmdSpec, ConfigError, FlagSpec};
pub use declare::{declare, Invocation};
pub use detect::{ProcessShellDetector, ShellDetector, ShellError};
pub use filter::{FilterError, NaturalRangeFilter};
pub use multi::{MultiFormat, MultiValueError};
pub use output::{render_exports, render_help_var, write_output_file};
pub use range::{IntRange, RangeError};
pub use shell::{resolve_dialect, Dialect, ShellType};
