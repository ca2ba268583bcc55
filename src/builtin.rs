//! Default in-process commands.
//!
//! Each built-in parses its arguments with an [`argh`]-derived struct and is
//! installed into a [`CommandRegistry`] behind a small generic adapter. The
//! interpreter only ever sees the registry's uniform [`NativeAction`]
//! interface; what a built-in does with its arguments is its own business.

use std::io::Write;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use argh::{EarlyExit, FromArgs};

use crate::env::ExitCode;
use crate::interpreter::Interpreter;
use crate::registry::{Action, CommandRegistry, NativeAction};

/// Built-in commands known at compile time.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name, e.g. "cd" or "alias".
    fn name() -> &'static str;

    /// Execute with parsed arguments. Shell conventions apply to the return
    /// value: 0 for success, non-zero for failure.
    fn execute(self, stdout: &mut dyn Write, shell: &mut Interpreter) -> Result<ExitCode>;
}

/// Adapter from a `BuiltinCommand` type to the registry's action interface.
struct Builtin<T> {
    _phantom: PhantomData<T>,
}

impl<T> Default for Builtin<T> {
    fn default() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: BuiltinCommand> NativeAction for Builtin<T> {
    fn invoke(
        &self,
        args: &[String],
        stdout: &mut dyn Write,
        shell: &mut Interpreter,
    ) -> Result<ExitCode> {
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        match T::from_args(&[T::name()], &argv) {
            Ok(cmd) => cmd.execute(stdout, shell),
            // `--help` and usage errors both surface through EarlyExit.
            Err(EarlyExit { output, status }) => {
                writeln!(stdout, "{output}")?;
                Ok(if status.is_err() { 1 } else { 0 })
            }
        }
    }
}

fn install<T: BuiltinCommand + 'static>(registry: &mut CommandRegistry) {
    registry.register(T::name(), Action::Native(Rc::new(Builtin::<T>::default())));
}

/// The registry the binary starts with: `cd`, `pwd`, `echo`, `exit`,
/// `alias`, `unalias`, `history`.
pub fn default_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    install::<Cd>(&mut registry);
    install::<Pwd>(&mut registry);
    install::<Echo>(&mut registry);
    install::<Exit>(&mut registry);
    install::<Alias>(&mut registry);
    install::<Unalias>(&mut registry);
    install::<ShowHistory>(&mut registry);
    registry
}

#[derive(FromArgs)]
/// Print the current working directory.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, stdout: &mut dyn Write, shell: &mut Interpreter) -> Result<ExitCode> {
        writeln!(stdout, "{}", shell.env.current_dir.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory. Without a target, changes to $HOME.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to, absolute or relative to the current one
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, shell: &mut Interpreter) -> Result<ExitCode> {
        let target = match &self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => match shell.env.get_var("HOME") {
                Some(home) => PathBuf::from(home),
                None => bail!("no target and HOME not set"),
            },
        };

        let new_dir = if target.is_absolute() {
            target
        } else {
            shell.env.current_dir.join(target)
        };

        let canonical = std::fs::canonicalize(&new_dir)
            .with_context(|| format!("can't resolve {}", new_dir.display()))?;
        std::env::set_current_dir(&canonical)
            .with_context(|| format!("can't chdir to {}", canonical.display()))?;
        shell.env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Write the arguments to standard output, separated by spaces.
pub struct Echo {
    #[argh(switch, short = 'n')]
    /// do not output the trailing newline
    pub no_newline: bool,

    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(self, stdout: &mut dyn Write, _shell: &mut Interpreter) -> Result<ExitCode> {
        let joined = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{joined}")?;
        } else {
            writeln!(stdout, "{joined}")?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Persist history and end the session with a success status.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored; kept so `exit 0` and friends don't error
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, shell: &mut Interpreter) -> Result<ExitCode> {
        shell.history.save();
        shell.env.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Define a command alias (`alias name=command args...`) or list the
/// existing ones.
pub struct Alias {
    #[argh(positional, greedy)]
    /// a definition of the form name=command [args...]; lists aliases when
    /// omitted
    pub definition: Vec<String>,
}

impl BuiltinCommand for Alias {
    fn name() -> &'static str {
        "alias"
    }

    fn execute(self, stdout: &mut dyn Write, shell: &mut Interpreter) -> Result<ExitCode> {
        let Some(first) = self.definition.first() else {
            for (name, words) in shell.registry.aliases() {
                writeln!(stdout, "alias {name}={}", words.join(" "))?;
            }
            return Ok(0);
        };

        match first.split_once('=') {
            Some((name, head)) => {
                let mut words: Vec<String> = Vec::new();
                if !head.is_empty() {
                    words.push(head.to_string());
                }
                words.extend(self.definition[1..].iter().cloned());
                if name.is_empty() || words.is_empty() {
                    bail!("malformed definition: {first}");
                }
                shell.registry.register(name, Action::Alias(words));
                Ok(0)
            }
            None => match shell.registry.lookup(first) {
                Some(Action::Alias(words)) => {
                    writeln!(stdout, "alias {first}={}", words.join(" "))?;
                    Ok(0)
                }
                _ => bail!("{first}: not found"),
            },
        }
    }
}

#[derive(FromArgs)]
/// Remove a previously defined alias.
pub struct Unalias {
    #[argh(positional)]
    /// name of the alias to remove
    pub name: String,
}

impl BuiltinCommand for Unalias {
    fn name() -> &'static str {
        "unalias"
    }

    fn execute(self, _stdout: &mut dyn Write, shell: &mut Interpreter) -> Result<ExitCode> {
        match shell.registry.lookup(&self.name) {
            Some(Action::Alias(_)) => {
                shell.registry.remove(&self.name);
                Ok(0)
            }
            _ => bail!("{}: not found", self.name),
        }
    }
}

#[derive(FromArgs)]
/// Print the in-memory command history, oldest first.
pub struct ShowHistory {}

impl BuiltinCommand for ShowHistory {
    fn name() -> &'static str {
        "history"
    }

    fn execute(self, stdout: &mut dyn Write, shell: &mut Interpreter) -> Result<ExitCode> {
        for (i, entry) in shell.history.entries().enumerate() {
            writeln!(stdout, "{:5}  {entry}", i + 1)?;
        }
        Ok(0)
    }
}
