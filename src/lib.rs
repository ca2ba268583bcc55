//! A small line-oriented command interpreter.
//!
//! One input line is split on `;` into segments; each segment is either a
//! plain command, a pipeline (`|`), or a command with a single input (`<`) or
//! output (`>`, `>>`) redirection. Plain commands are first offered to a
//! [`CommandRegistry`](registry::CommandRegistry) of in-process actions and
//! aliases; everything else is spawned as external OS processes with their
//! standard streams wired together.
//!
//! The grammar is deliberately naive: there is no quoting, no escaping, and
//! operators never combine inside one segment. See [`plan::build`] for the
//! exact detection rules.
//!
//! The main entry point is [`Interpreter`], which owns the environment, the
//! registry and the command history, and drives the interactive loop.

pub mod builtin;
pub mod env;
pub mod error;
pub mod exec;
pub mod history;
mod interpreter;
pub mod lexer;
pub mod plan;
pub mod registry;

pub use interpreter::Interpreter;
