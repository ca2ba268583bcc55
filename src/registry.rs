//! The command registry: the mapping consulted before spawning anything.
//!
//! Registries are explicit values, never ambient state. The interpreter owns
//! one, tests can build isolated ones, and built-ins like `alias` mutate the
//! one they were invoked from. Mutations are visible to the very next lookup.

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use crate::env::ExitCode;
use crate::interpreter::Interpreter;

/// An in-process command implementation.
///
/// Actions receive the stage's arguments, a writer for their normal output,
/// and mutable access to the interpreter (environment, history, and the
/// registry itself, so actions may register new entries at runtime).
pub trait NativeAction {
    fn invoke(
        &self,
        args: &[String],
        stdout: &mut dyn Write,
        shell: &mut Interpreter,
    ) -> anyhow::Result<ExitCode>;
}

/// A registered command: either a native in-process action or an alias that
/// expands to another command line's words.
#[derive(Clone)]
pub enum Action {
    Native(Rc<dyn NativeAction>),
    Alias(Vec<String>),
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Native(_) => f.write_str("Native(..)"),
            Action::Alias(words) => f.debug_tuple("Alias").field(words).finish(),
        }
    }
}

/// Name-to-action mapping with ordinary mutable-map semantics.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    entries: HashMap<String, Action>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an entry.
    pub fn register(&mut self, name: impl Into<String>, action: Action) {
        self.entries.insert(name.into(), action);
    }

    /// Look up a name. Returns a clone of the action so invoking it never
    /// holds a borrow of the registry (actions may mutate it).
    pub fn lookup(&self, name: &str) -> Option<Action> {
        self.entries.get(name).cloned()
    }

    /// Remove an entry, returning it if present.
    pub fn remove(&mut self, name: &str) -> Option<Action> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All registered aliases, sorted by name.
    pub fn aliases(&self) -> Vec<(String, Vec<String>)> {
        let mut out: Vec<(String, Vec<String>)> = self
            .entries
            .iter()
            .filter_map(|(name, action)| match action {
                Action::Alias(words) => Some((name.clone(), words.clone())),
                Action::Native(_) => None,
            })
            .collect();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias(words: &[&str]) -> Action {
        Action::Alias(words.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn lookup_after_register() {
        let mut registry = CommandRegistry::new();
        assert!(registry.lookup("ll").is_none());

        registry.register("ll", alias(&["ls", "-l"]));
        match registry.lookup("ll") {
            Some(Action::Alias(words)) => assert_eq!(words, vec!["ls", "-l"]),
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn register_replaces_existing_entry() {
        let mut registry = CommandRegistry::new();
        registry.register("g", alias(&["grep"]));
        registry.register("g", alias(&["grep", "-i"]));
        match registry.lookup("g") {
            Some(Action::Alias(words)) => assert_eq!(words, vec!["grep", "-i"]),
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn remove_unregisters() {
        let mut registry = CommandRegistry::new();
        registry.register("ll", alias(&["ls", "-l"]));
        assert!(registry.remove("ll").is_some());
        assert!(!registry.contains("ll"));
        assert!(registry.remove("ll").is_none());
    }

    #[test]
    fn registries_are_isolated() {
        let mut first = CommandRegistry::new();
        let second = CommandRegistry::new();
        first.register("ll", alias(&["ls", "-l"]));
        assert!(first.contains("ll"));
        assert!(!second.contains("ll"));
    }

    #[test]
    fn aliases_listing_is_sorted() {
        let mut registry = CommandRegistry::new();
        registry.register("zz", alias(&["cat"]));
        registry.register("aa", alias(&["ls"]));
        let names: Vec<String> = registry.aliases().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["aa", "zz"]);
    }
}
