use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// In-memory list of raw input lines, capped at a configurable maximum.
///
/// The sequencer records every non-empty line exactly once, *before* it is
/// split into segments. When the cap is reached the oldest entry is dropped.
/// Persistence is plain text, one entry per line, written on `exit` and on
/// end-of-input.
#[derive(Debug)]
pub struct History {
    entries: VecDeque<String>,
    max: usize,
    path: Option<PathBuf>,
}

impl History {
    /// Create a history capped at `max` entries, optionally backed by a file.
    /// If the file exists its newest `max` lines are loaded.
    pub fn new(max: usize, path: Option<PathBuf>) -> Self {
        let mut history = Self {
            entries: VecDeque::new(),
            max,
            path,
        };
        history.load();
        history
    }

    /// Append one raw input line, dropping the oldest entry at capacity.
    pub fn push(&mut self, line: &str) {
        if self.max == 0 {
            return;
        }
        while self.entries.len() >= self.max {
            self.entries.pop_front();
        }
        self.entries.push_back(line.to_string());
    }

    /// Entries in insertion order, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn load(&mut self) {
        let Some(path) = &self.path else { return };
        match fs::read_to_string(path) {
            Ok(contents) => {
                for line in contents.lines() {
                    if !line.is_empty() {
                        self.push(line);
                    }
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => log::warn!("could not load history from {}: {err}", path.display()),
        }
    }

    /// Persist all entries to the backing file, if one is configured.
    /// Failures are logged, never fatal.
    pub fn save(&self) {
        let Some(path) = &self.path else { return };
        let result = fs::File::create(path).and_then(|mut file| {
            for entry in &self.entries {
                writeln!(file, "{entry}")?;
            }
            Ok(())
        });
        if let Err(err) = result {
            log::warn!("could not persist history to {}: {err}", path.display());
        }
    }
}
