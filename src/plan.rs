//! Turning one segment into an execution plan.
//!
//! Detection order is first-match-wins, reproducing the precedence of the
//! system this interpreter reimplements: input redirection (`<`), then
//! pipelines (`|`), then append (`>>`), then truncate (`>`), then a plain
//! command. Operators never combine inside a segment; whichever wins, any
//! other operator token degrades to a literal word on its side of the split
//! (so `a | b < f` is an input redirection reading `f` into the command
//! `a`, with `|` and `b` as literal arguments, exactly as mis-split as the
//! original).

use crate::lexer::{self, Token};

/// One process to spawn: a command name and its arguments, produced by naive
/// whitespace splitting. No quoting or escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    pub command: String,
    pub args: Vec<String>,
}

impl StageSpec {
    /// Build a stage from ordered words; `None` when there are none.
    pub fn from_words(mut words: Vec<String>) -> Option<Self> {
        if words.is_empty() {
            return None;
        }
        let command = words.remove(0);
        Some(StageSpec {
            command,
            args: words,
        })
    }
}

/// How an output redirection opens its target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    Truncate,
    Append,
}

/// The shape of one segment's execution.
///
/// A segment is a pipe chain XOR a single redirection XOR a plain command,
/// never a combination. Building a plan has no side effects and no hidden
/// state: the same segment always yields a structurally equal plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionPlan {
    /// Nothing to execute (blank segment, or operators with no command).
    Empty,
    /// A single command with inherited standard streams.
    Command(StageSpec),
    /// Two or more stages, stage N's stdout feeding stage N+1's stdin.
    Pipeline(Vec<StageSpec>),
    /// A single command fed the full contents of `source` on stdin.
    RedirectInput { stage: StageSpec, source: String },
    /// A single command with stdout wired to `target`.
    RedirectOutput {
        stage: StageSpec,
        target: String,
        mode: RedirectMode,
    },
}

/// Build the execution plan for one trimmed segment.
pub fn build(segment: &str) -> ExecutionPlan {
    let tokens = lexer::scan(segment);

    if let Some(at) = position_of(&tokens, &Token::RedirectIn) {
        return match stage_from(&tokens[..at]) {
            Some(stage) => ExecutionPlan::RedirectInput {
                stage,
                source: path_from(&tokens[at + 1..]),
            },
            None => ExecutionPlan::Empty,
        };
    }

    if tokens.contains(&Token::Pipe) {
        let stages: Vec<StageSpec> = tokens
            .split(|token| *token == Token::Pipe)
            .filter_map(stage_from)
            .collect();
        // Even a single surviving stage stays a pipeline: the segment
        // contained an operator, so it must never reach the registry.
        return match stages.len() {
            0 => ExecutionPlan::Empty,
            _ => ExecutionPlan::Pipeline(stages),
        };
    }

    if let Some(at) = position_of(&tokens, &Token::RedirectAppend) {
        return output_redirect(&tokens, at, RedirectMode::Append);
    }

    if let Some(at) = position_of(&tokens, &Token::RedirectOut) {
        return output_redirect(&tokens, at, RedirectMode::Truncate);
    }

    match stage_from(&tokens) {
        Some(stage) => ExecutionPlan::Command(stage),
        None => ExecutionPlan::Empty,
    }
}

fn output_redirect(tokens: &[Token], at: usize, mode: RedirectMode) -> ExecutionPlan {
    match stage_from(&tokens[..at]) {
        Some(stage) => ExecutionPlan::RedirectOutput {
            stage,
            target: path_from(&tokens[at + 1..]),
            mode,
        },
        None => ExecutionPlan::Empty,
    }
}

fn position_of(tokens: &[Token], wanted: &Token) -> Option<usize> {
    tokens.iter().position(|token| token == wanted)
}

/// Everything on this side of the winning operator becomes argv, operators
/// included as their literal text.
fn stage_from(tokens: &[Token]) -> Option<StageSpec> {
    StageSpec::from_words(tokens.iter().map(|t| t.lexeme().to_string()).collect())
}

/// The redirection target: remaining lexemes rejoined. Usually a single word;
/// an empty result surfaces later as a file open error, not a parse error.
fn path_from(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(Token::lexeme)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(command: &str, args: &[&str]) -> StageSpec {
        StageSpec {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn plain_command_splits_on_whitespace() {
        let plan = build("grep -r pattern src");
        assert_eq!(
            plan,
            ExecutionPlan::Command(stage("grep", &["-r", "pattern", "src"]))
        );
    }

    #[test]
    fn blank_segment_is_empty() {
        assert_eq!(build(""), ExecutionPlan::Empty);
        assert_eq!(build("  "), ExecutionPlan::Empty);
        assert_eq!(build("|"), ExecutionPlan::Empty);
        assert_eq!(build("< notes.txt"), ExecutionPlan::Empty);
    }

    #[test]
    fn input_redirection() {
        let plan = build("cat < notes.txt");
        assert_eq!(
            plan,
            ExecutionPlan::RedirectInput {
                stage: stage("cat", &[]),
                source: "notes.txt".to_string(),
            }
        );
    }

    #[test]
    fn input_redirection_wins_over_pipe() {
        // Inherited precedence: the `<` check runs first, so the pipe ends up
        // inside the source path, mis-split exactly like the original.
        let plan = build("cat < notes.txt | wc");
        assert_eq!(
            plan,
            ExecutionPlan::RedirectInput {
                stage: stage("cat", &[]),
                source: "notes.txt | wc".to_string(),
            }
        );
    }

    #[test]
    fn pipeline_in_declared_order() {
        let plan = build("cmd1 | cmd2 -x | cmd3");
        assert_eq!(
            plan,
            ExecutionPlan::Pipeline(vec![
                stage("cmd1", &[]),
                stage("cmd2", &["-x"]),
                stage("cmd3", &[]),
            ])
        );
    }

    #[test]
    fn empty_pipeline_stages_are_dropped() {
        let plan = build("cmd1 | | cmd2");
        assert_eq!(
            plan,
            ExecutionPlan::Pipeline(vec![stage("cmd1", &[]), stage("cmd2", &[])])
        );
    }

    #[test]
    fn single_stage_with_pipe_is_still_a_pipeline() {
        // The operator disqualifies the segment from builtin dispatch, so
        // the plan must not collapse to a plain command.
        assert_eq!(
            build("cmd1 |"),
            ExecutionPlan::Pipeline(vec![stage("cmd1", &[])])
        );
        assert_eq!(
            build("| cmd1 -x"),
            ExecutionPlan::Pipeline(vec![stage("cmd1", &["-x"])])
        );
    }

    #[test]
    fn output_redirect_inside_pipeline_degrades_to_word() {
        let plan = build("a > f | b");
        assert_eq!(
            plan,
            ExecutionPlan::Pipeline(vec![stage("a", &[">", "f"]), stage("b", &[])])
        );
    }

    #[test]
    fn truncate_redirection() {
        let plan = build("echo hi > out.txt");
        assert_eq!(
            plan,
            ExecutionPlan::RedirectOutput {
                stage: stage("echo", &["hi"]),
                target: "out.txt".to_string(),
                mode: RedirectMode::Truncate,
            }
        );
    }

    #[test]
    fn append_redirection() {
        let plan = build("echo hi >> out.txt");
        assert_eq!(
            plan,
            ExecutionPlan::RedirectOutput {
                stage: stage("echo", &["hi"]),
                target: "out.txt".to_string(),
                mode: RedirectMode::Append,
            }
        );
    }

    #[test]
    fn append_beats_truncate() {
        let plan = build("a > b >> c");
        assert_eq!(
            plan,
            ExecutionPlan::RedirectOutput {
                stage: stage("a", &[">", "b"]),
                target: "c".to_string(),
                mode: RedirectMode::Append,
            }
        );
    }

    #[test]
    fn missing_redirect_target_is_kept_empty() {
        // Surfaces as a file error at execution time, not a parse error.
        let plan = build("echo hi >");
        assert_eq!(
            plan,
            ExecutionPlan::RedirectOutput {
                stage: stage("echo", &["hi"]),
                target: String::new(),
                mode: RedirectMode::Truncate,
            }
        );
    }

    #[test]
    fn building_twice_is_idempotent() {
        for segment in [
            "ls -l",
            "cat < in.txt",
            "a | b | c",
            "echo x >> log",
            "",
        ] {
            assert_eq!(build(segment), build(segment));
        }
    }
}
