use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced at the boundary of one segment's execution.
///
/// Every variant is caught and reported by the sequencer; none of them aborts
/// the remaining segments of the line or ends the session. Operator
/// characters appearing inside what the user meant as a literal argument are
/// *not* detected — the segment is silently mis-split. That ambiguity is a
/// documented limitation of the grammar, not a runtime error.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The stage's program could not be started (not found or not permitted).
    #[error("{command}: {source}")]
    Spawn { command: String, source: io::Error },

    /// The source file of an input redirection is missing or unreadable.
    /// Raised before anything is spawned.
    #[error("{}: {source}", .path.display())]
    FileRead { path: PathBuf, source: io::Error },

    /// The target file of an output redirection could not be opened.
    #[error("{}: {source}", .path.display())]
    FileWrite { path: PathBuf, source: io::Error },

    /// A registered built-in action failed. The failure itself is opaque to
    /// the core; the built-in's name prefixes the report.
    #[error("{name}: {source:#}")]
    BuiltinAction {
        name: String,
        source: anyhow::Error,
    },

    /// A spawned process could not be driven to completion (wait or stream
    /// plumbing failed after a successful spawn).
    #[error("{command}: {source}")]
    RuntimeProcess { command: String, source: io::Error },
}

impl ShellError {
    /// Whether the report should carry the failing built-in's own prefix
    /// instead of the generic `Error:` one.
    pub fn is_builtin(&self) -> bool {
        matches!(self, ShellError::BuiltinAction { .. })
    }
}
