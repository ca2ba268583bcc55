use std::io::{self, Write};

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::builtin;
use crate::env::{Environment, ExitCode};
use crate::error::ShellError;
use crate::exec;
use crate::history::History;
use crate::plan::{self, ExecutionPlan, StageSpec};
use crate::registry::{Action, CommandRegistry};

/// Bound on alias-to-alias expansion so cyclic definitions cannot hang the
/// session.
const MAX_ALIAS_EXPANSIONS: usize = 16;

/// The interpreter: owns the environment, the command registry and the
/// history, and drives line execution.
///
/// Example
/// ```
/// use seqsh::Interpreter;
/// let mut sh = Interpreter::default();
/// sh.run_line("echo hello; echo world");
/// ```
pub struct Interpreter {
    pub(crate) env: Environment,
    pub(crate) registry: CommandRegistry,
    pub(crate) history: History,
}

impl Interpreter {
    /// Create an interpreter with an explicit registry and history. Tests use
    /// this to inject isolated registries.
    pub fn new(registry: CommandRegistry, history: History) -> Self {
        Self {
            env: Environment::new(),
            registry,
            history,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Run one raw input line: record it in history, split it on every
    /// literal `;`, and execute each non-empty segment in order.
    ///
    /// Errors are reported per segment and never abort the remaining
    /// segments or the session. The only early stop is `exit`.
    pub fn run_line(&mut self, line: &str) {
        if !line.trim().is_empty() {
            self.history.push(line);
        }

        for segment in line.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            match self.run_segment(segment) {
                Ok(status) => self.env.last_status = status,
                Err(err) => {
                    self.env.last_status = 1;
                    if err.is_builtin() {
                        eprintln!("{err}");
                    } else {
                        eprintln!("Error: {err}");
                    }
                }
            }
            if self.env.should_exit {
                break;
            }
        }
    }

    fn run_segment(&mut self, segment: &str) -> Result<ExitCode, ShellError> {
        let plan = plan::build(segment);
        log::debug!("segment {segment:?} -> {plan:?}");
        match plan {
            ExecutionPlan::Empty => Ok(self.env.last_status),
            // Only single-stage, operator-free segments consult the
            // registry; pipeline and redirected stages are always external.
            ExecutionPlan::Command(stage) => {
                let mut stdout = io::stdout();
                self.dispatch(stage, &mut stdout)
            }
            other => exec::run(&other, &self.env),
        }
    }

    /// Resolve a plain stage through the registry: invoke a native action,
    /// expand aliases (bounded) and re-resolve, or fall through to external
    /// process execution when the name is not registered.
    fn dispatch(
        &mut self,
        mut stage: StageSpec,
        stdout: &mut dyn Write,
    ) -> Result<ExitCode, ShellError> {
        let mut depth = 0;
        loop {
            match self.registry.lookup(&stage.command) {
                Some(Action::Native(action)) => {
                    return action
                        .invoke(&stage.args, stdout, self)
                        .map_err(|source| ShellError::BuiltinAction {
                            name: stage.command.clone(),
                            source,
                        });
                }
                Some(Action::Alias(words)) => {
                    depth += 1;
                    if depth > MAX_ALIAS_EXPANSIONS {
                        return Err(builtin_failure(
                            &stage.command,
                            format!("alias expansion exceeded {MAX_ALIAS_EXPANSIONS} levels"),
                        ));
                    }
                    let mut expanded = words;
                    expanded.extend(std::mem::take(&mut stage.args));
                    match StageSpec::from_words(expanded) {
                        Some(next) => stage = next,
                        None => {
                            return Err(builtin_failure(&stage.command, "alias has an empty body"));
                        }
                    }
                }
                None => return exec::run_command(&stage, &self.env),
            }
        }
    }

    /// The interactive prompt loop. Ctrl-C cancels the current line and
    /// redraws the prompt; end-of-input persists history and ends the
    /// session with success, same as `exit`.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        let mut editor = DefaultEditor::new()?;
        for entry in self.history.entries() {
            let _ = editor.add_history_entry(entry);
        }

        while !self.env.should_exit {
            match editor.readline("seqsh> ") {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(line.as_str());
                    }
                    self.run_line(&line);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => self.env.should_exit = true,
                Err(err) => {
                    eprintln!("Error: {err}");
                    self.env.should_exit = true;
                }
            }
        }

        self.persist_history();
        Ok(())
    }

    /// Write history to its backing file, if one is configured.
    pub fn persist_history(&self) {
        self.history.save();
    }
}

fn builtin_failure(name: &str, message: impl Into<String>) -> ShellError {
    ShellError::BuiltinAction {
        name: name.to_string(),
        source: anyhow::anyhow!(message.into()),
    }
}

impl Default for Interpreter {
    /// An interpreter with the default built-ins (`cd`, `pwd`, `echo`,
    /// `exit`, `alias`, `unalias`, `history`) and an unpersisted history.
    fn default() -> Self {
        Self::new(builtin::default_registry(), History::new(1000, None))
    }
}
