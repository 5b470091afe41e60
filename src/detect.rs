//! Detection of the shell that invoked the current process.

use std::collections::HashSet;
use std::path::Path;
use sysinfo::{Pid, ProcessesToUpdate, System};
use thiserror::Error;

/// Shell names recognised while walking the process tree.
const KNOWN_SHELLS: &[&str] = &[
    "bash",
    "zsh",
    "fish",
    "ksh",
    "dash",
    "tcsh",
    "csh",
    "powershell",
    "pwsh",
    "cmd",
    "sh",
];

/// Errors that can occur during shell detection.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("cannot get current process: {0}")]
    CurrentProcess(String),

    #[error("user shell not detected, use --shell to choose one")]
    Undetected,
}

/// Something that can name the shell that invoked us.
pub trait ShellDetector {
    /// The shell executable name, such as `bash`, `pwsh.exe` or `cmd.exe`.
    fn detect(&self) -> Result<String, ShellError>;
}

/// Walks the parent process chain looking for a known shell, then falls back
/// to the `SHELL` and `COMSPEC` environment variables.
#[derive(Debug, Default)]
pub struct ProcessShellDetector;

impl ShellDetector for ProcessShellDetector {
    fn detect(&self) -> Result<String, ShellError> {
        let current = sysinfo::get_current_pid()
            .map_err(|e| ShellError::CurrentProcess(e.to_string()))?;

        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::All, true);

        if let Some(name) = walk_parents(&sys, current) {
            return Ok(name);
        }

        // these only name the default shell, not necessarily the running one
        for var in ["SHELL", "COMSPEC"] {
            if let Some(value) = std::env::var_os(var).filter(|v| !v.is_empty()) {
                if let Some(base) = Path::new(&value).file_name() {
                    tracing::debug!(var, shell = ?base, "falling back to environment");
                    return Ok(base.to_string_lossy().into_owned());
                }
            }
        }

        Err(ShellError::Undetected)
    }
}

fn walk_parents(sys: &System, current: Pid) -> Option<String> {
    let mut seen = HashSet::new();
    let mut pid = sys.process(current)?.parent()?;

    while seen.insert(pid) {
        let process = sys.process(pid)?;
        let mut name = process.name().to_string_lossy().into_owned();
        if name.is_empty() {
            if let Some(file) = process.exe().and_then(Path::file_name) {
                name = file.to_string_lossy().into_owned();
            }
        }
        tracing::trace!(%pid, %name, "inspecting parent process");

        if is_known_shell(&name) {
            return Some(name);
        }
        pid = process.parent()?;
    }
    None
}

/// Whether `name` (an executable name, possibly with `.exe`) is a shell.
pub fn is_known_shell(name: &str) -> bool {
    let stem = name.to_lowercase();
    let stem = stem.strip_suffix(".exe").unwrap_or(&stem);
    KNOWN_SHELLS
        .iter()
        .any(|shell| stem == *shell || stem.starts_with(&format!("{}-", shell)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_known_shell() {
        for name in ["bash", "zsh", "sh", "pwsh.exe", "powershell.exe", "cmd.exe", "CMD.EXE", "bash-5.2"] {
            assert!(is_known_shell(name), "{} should be a shell", name);
        }
        for name in ["cargo", "sshd", "argbind", "node.exe", ""] {
            assert!(!is_known_shell(name), "{} should not be a shell", name);
        }
    }
}
