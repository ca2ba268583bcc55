//! The process graph executor: spawning external processes and wiring their
//! standard streams for plain commands, redirections and pipelines.
//!
//! Every child spawned for a segment is waited on before control returns to
//! the sequencer, so two segments separated by `;` complete strictly in
//! order. Errors are returned to the caller; nothing here ends the session.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};

use crate::env::{Environment, ExitCode};
use crate::error::ShellError;
use crate::plan::{ExecutionPlan, RedirectMode, StageSpec};

/// Execute one non-builtin plan to completion.
pub fn run(plan: &ExecutionPlan, env: &Environment) -> Result<ExitCode, ShellError> {
    match plan {
        ExecutionPlan::Empty => Ok(0),
        ExecutionPlan::Command(stage) => run_command(stage, env),
        ExecutionPlan::Pipeline(stages) => run_pipeline(stages, env),
        ExecutionPlan::RedirectInput { stage, source } => {
            run_with_input(stage, Path::new(source), env)
        }
        ExecutionPlan::RedirectOutput {
            stage,
            target,
            mode,
        } => run_with_output(stage, Path::new(target), *mode, env),
    }
}

/// Spawn a single external command with inherited standard streams.
pub fn run_command(stage: &StageSpec, env: &Environment) -> Result<ExitCode, ShellError> {
    let mut child = command_for(stage, env)?
        .spawn()
        .map_err(|source| spawn_error(stage, source))?;
    wait_on(stage, &mut child)
}

/// `cmd < file`: the whole source file is read before anything is spawned;
/// a missing or unreadable file aborts the segment with no process started.
pub fn run_with_input(
    stage: &StageSpec,
    source: &Path,
    env: &Environment,
) -> Result<ExitCode, ShellError> {
    let contents = std::fs::read(source).map_err(|source_err| ShellError::FileRead {
        path: source.to_path_buf(),
        source: source_err,
    })?;

    let mut child = command_for(stage, env)?
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|source| spawn_error(stage, source))?;

    // Write the file contents, then drop the handle so the child sees EOF.
    // A child that exits without draining its stdin is not an error.
    let write_result = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(&contents),
        None => Ok(()),
    };

    let code = wait_on(stage, &mut child)?;
    match write_result {
        Err(err) if err.kind() != io::ErrorKind::BrokenPipe => Err(ShellError::RuntimeProcess {
            command: stage.command.clone(),
            source: err,
        }),
        _ => Ok(code),
    }
}

/// `cmd > file` / `cmd >> file`: stdout goes straight to the file handle,
/// stderr still reaches the terminal. The handle is owned by this call and
/// the child; it is closed on every exit path.
pub fn run_with_output(
    stage: &StageSpec,
    target: &Path,
    mode: RedirectMode,
    env: &Environment,
) -> Result<ExitCode, ShellError> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(mode == RedirectMode::Truncate)
        .append(mode == RedirectMode::Append)
        .open(target)
        .map_err(|source| ShellError::FileWrite {
            path: target.to_path_buf(),
            source,
        })?;

    let mut child = command_for(stage, env)?
        .stdout(Stdio::from(file))
        .spawn()
        .map_err(|source| spawn_error(stage, source))?;
    wait_on(stage, &mut child)
}

/// Spawn every stage, stage N's stdout piped into stage N+1's stdin. Only the
/// last stage's stdout reaches the terminal; every stage's stderr is
/// inherited and interleaves freely. A spawn failure mid-chain is reported
/// but does not cancel stages already running; the stage after a failed one
/// reads empty input. All children are waited on before returning.
pub fn run_pipeline(stages: &[StageSpec], env: &Environment) -> Result<ExitCode, ShellError> {
    let last = stages.len().saturating_sub(1);
    let mut children: Vec<(String, Child)> = Vec::new();
    let mut first_failure: Option<ShellError> = None;
    let mut carried: Option<ChildStdout> = None;

    for (i, stage) in stages.iter().enumerate() {
        let mut cmd = match command_for(stage, env) {
            Ok(cmd) => cmd,
            Err(err) => {
                note_failure(&mut first_failure, err);
                carried = None;
                continue;
            }
        };

        match carried.take() {
            Some(upstream) => cmd.stdin(Stdio::from(upstream)),
            None if i == 0 => cmd.stdin(Stdio::inherit()),
            None => cmd.stdin(Stdio::null()),
        };
        if i != last {
            cmd.stdout(Stdio::piped());
        }

        match cmd.spawn() {
            Ok(mut child) => {
                carried = child.stdout.take();
                children.push((stage.command.clone(), child));
            }
            Err(source) => {
                note_failure(&mut first_failure, spawn_error(stage, source));
            }
        }
    }

    let mut last_code = 0;
    for (name, mut child) in children {
        match child.wait() {
            Ok(status) => last_code = status_code(status),
            Err(source) => note_failure(
                &mut first_failure,
                ShellError::RuntimeProcess {
                    command: name,
                    source,
                },
            ),
        }
    }

    match first_failure {
        Some(err) => Err(err),
        None => Ok(last_code),
    }
}

/// First failure of a segment is returned to the sequencer; later ones in the
/// same chain are only logged.
fn note_failure(slot: &mut Option<ShellError>, err: ShellError) {
    if slot.is_none() {
        *slot = Some(err);
    } else {
        log::warn!("additional pipeline failure: {err}");
    }
}

/// Resolve the stage's program and prepare a `Command` carrying the
/// interpreter's exported variables and working directory.
fn command_for(stage: &StageSpec, env: &Environment) -> Result<Command, ShellError> {
    let search_paths = env.get_var("PATH").unwrap_or_default();
    let program = find_command_path(OsStr::new(&search_paths), Path::new(&stage.command))
        .ok_or_else(|| ShellError::Spawn {
            command: stage.command.clone(),
            source: io::Error::new(io::ErrorKind::NotFound, "command not found"),
        })?;

    let mut cmd = Command::new(program.as_ref());
    cmd.args(&stage.args)
        .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(&env.current_dir);
    Ok(cmd)
}

fn spawn_error(stage: &StageSpec, source: io::Error) -> ShellError {
    ShellError::Spawn {
        command: stage.command.clone(),
        source,
    }
}

fn wait_on(stage: &StageSpec, child: &mut Child) -> Result<ExitCode, ShellError> {
    let status = child.wait().map_err(|source| ShellError::RuntimeProcess {
        command: stage.command.clone(),
        source,
    })?;
    Ok(status_code(status))
}

fn status_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(code) => code,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_status: ExitStatus) -> ExitCode {
    -1
}

/// Resolve a command name the way a typical shell would.
///
/// - Absolute path: returned if it exists.
/// - `./`-prefixed or multi-component relative path: returned if it exists.
/// - Single component: searched through each directory of `search_paths`.
/// - Empty name: never resolves.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return existing(path).map(Cow::Borrowed);
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir && path.exists() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        (Some(name), None) => find_in_path(search_paths, name.as_os_str()).map(Cow::Owned),
        _ => existing(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(search_paths) {
        let candidate = dir.join(cmd);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

fn existing(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn stage(command: &str, args: &[&str]) -> StageSpec {
        StageSpec {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("seqsh_exec_{}_{tag}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    #[cfg(unix)]
    fn resolves_absolute_and_path_lookup() {
        let sh = Path::new("/bin/sh");
        assert_eq!(
            find_command_path(OsStr::new("/bin"), sh).as_deref(),
            Some(sh)
        );
        let via_path = find_command_path(OsStr::new("/bin"), Path::new("sh"))
            .expect("sh should be found in /bin");
        assert!(via_path.starts_with("/bin"));
        assert!(find_command_path(OsStr::new("/bin"), Path::new("")).is_none());
        assert!(find_command_path(OsStr::new("/bin"), Path::new("no-such-cmd-xyz")).is_none());
    }

    #[test]
    #[cfg(unix)]
    fn plain_command_exit_codes() {
        let env = Environment::new();
        assert_eq!(run_command(&stage("true", &[]), &env).unwrap(), 0);
        assert_ne!(run_command(&stage("false", &[]), &env).unwrap(), 0);
    }

    #[test]
    #[cfg(unix)]
    fn signal_termination_maps_to_128_plus_signal() {
        let env = Environment::new();
        // The child terminates itself with SIGTERM (15).
        let code = run_command(&stage("sh", &["-c", "kill -TERM $$"]), &env).unwrap();
        assert_eq!(code, 128 + 15);
    }

    #[test]
    fn unknown_command_is_a_spawn_error() {
        let env = Environment::new();
        let err = run_command(&stage("definitely-not-a-command-xyz", &[]), &env).unwrap_err();
        match err {
            ShellError::Spawn { command, .. } => {
                assert_eq!(command, "definitely-not-a-command-xyz")
            }
            other => panic!("expected Spawn error, got {other}"),
        }
    }

    #[test]
    #[cfg(unix)]
    fn truncate_then_append() {
        let env = Environment::new();
        let dir = temp_dir("redir_out");
        let out = dir.join("out.txt");

        run_with_output(&stage("echo", &["hi"]), &out, RedirectMode::Truncate, &env).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "hi\n");

        run_with_output(&stage("echo", &["hi"]), &out, RedirectMode::Append, &env).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "hi\nhi\n");

        // Truncate mode overwrites a pre-existing file.
        run_with_output(&stage("echo", &["bye"]), &out, RedirectMode::Truncate, &env).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "bye\n");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    #[cfg(unix)]
    fn input_redirection_feeds_file_contents() {
        let env = Environment::new();
        let dir = temp_dir("redir_in");
        let source = dir.join("in.txt");
        let sink = dir.join("copied.txt");
        fs::write(&source, "from the file\n").unwrap();

        // `cat` inside sh writes what it read on stdin into the sink file,
        // which lets the test observe what the child was fed.
        let copier = stage("sh", &["-c", &format!("cat > {}", sink.display())]);
        let code = run_with_input(&copier, &source, &env).unwrap();
        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(&sink).unwrap(), "from the file\n");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_input_file_spawns_nothing() {
        let env = Environment::new();
        let missing = std::env::temp_dir().join("seqsh_no_such_input_file_xyz");
        let err = run_with_input(&stage("cat", &[]), &missing, &env).unwrap_err();
        match err {
            ShellError::FileRead { path, .. } => assert_eq!(path, missing),
            other => panic!("expected FileRead error, got {other}"),
        }
    }

    #[test]
    #[cfg(unix)]
    fn pipeline_chains_stdout_to_stdin() {
        let env = Environment::new();
        let dir = temp_dir("pipeline");
        let out = dir.join("out.txt");

        let stages = vec![
            stage("printf", &["b\\na\\n"]),
            stage("sort", &[]),
            stage("sh", &["-c", &format!("cat > {}", out.display())]),
        ];
        let code = run_pipeline(&stages, &env).unwrap();
        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "a\nb\n");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    #[cfg(unix)]
    fn pipeline_spawn_failure_does_not_cancel_the_rest() {
        let env = Environment::new();
        let dir = temp_dir("pipeline_fail");
        let out = dir.join("out.txt");

        let stages = vec![
            stage("echo", &["hello"]),
            stage("no-such-filter-xyz", &[]),
            stage("sh", &["-c", &format!("cat > {}", out.display())]),
        ];
        let err = run_pipeline(&stages, &env).unwrap_err();
        match err {
            ShellError::Spawn { command, .. } => assert_eq!(command, "no-such-filter-xyz"),
            other => panic!("expected Spawn error, got {other}"),
        }
        // The final stage still ran; it just read empty input.
        assert_eq!(fs::read_to_string(&out).unwrap(), "");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    #[cfg(unix)]
    fn commands_run_in_the_environment_cwd() {
        let mut env = Environment::new();
        let dir = temp_dir("cwd");
        env.current_dir = dir.clone();

        let code = run_command(&stage("sh", &["-c", "echo here > marker.txt"]), &env).unwrap();
        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(dir.join("marker.txt")).unwrap(), "here\n");

        let _ = fs::remove_dir_all(dir);
    }
}
