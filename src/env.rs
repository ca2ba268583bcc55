use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Conventional process exit code: 0 for success, non-zero for failure.
pub type ExitCode = i32;

/// Mutable, interpreter-level view of the process environment.
///
/// This is deliberately plain state shared by the sequencer, the executor and
/// the built-ins: exported variables, the working directory commands run in,
/// the exit status of the most recently finished segment, and a flag the
/// interactive loop checks to know when to stop.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Variables exported to every spawned command (PATH, HOME, ...).
    pub vars: HashMap<String, String>,
    /// Working directory used for command execution and redirection paths.
    pub current_dir: PathBuf,
    /// Exit status of the last executed segment.
    pub last_status: ExitCode,
    /// Set by `exit` (or end-of-input) to end the session.
    pub should_exit: bool,
}

impl Environment {
    /// Capture the host process state: `std::env::vars()` and the current
    /// working directory.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            last_status: 0,
            should_exit: false,
        }
    }

    /// Look up a variable, falling back to the live process environment.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override an exported variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
