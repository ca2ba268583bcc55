use std::path::PathBuf;

use anyhow::Result;
use argh::FromArgs;

use seqsh::history::History;
use seqsh::{Interpreter, builtin};

#[derive(FromArgs)]
/// A line-oriented command interpreter with pipes, redirections and aliases.
struct Args {
    #[argh(option, short = 'c')]
    /// execute a single line and exit instead of starting the prompt
    command: Option<String>,

    #[argh(option)]
    /// file used to load and persist command history
    history_file: Option<PathBuf>,

    #[argh(option, default = "1000")]
    /// maximum number of history entries kept in memory
    history_max: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args: Args = argh::from_env();

    let history = History::new(args.history_max, args.history_file);
    let mut shell = Interpreter::new(builtin::default_registry(), history);

    match args.command {
        Some(line) => {
            shell.run_line(&line);
            shell.persist_history();
        }
        None => shell.repl()?,
    }
    Ok(())
}
