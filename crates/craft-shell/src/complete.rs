//! Tab completion driven by the registry.

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use crate::registry::{ArgKind, Registry};

impl Registry {
    /// Completion candidates for the word under the cursor.
    ///
    /// `line` is the input up to the cursor. Returns the byte offset where
    /// the word starts and the sorted candidates: subcommand names while
    /// the line is still naming a command, `--flag` names once the word
    /// starts with `-`.
    pub fn completions(&self, line: &str) -> (usize, Vec<String>) {
        let start = line
            .rfind(char::is_whitespace)
            .map_or(0, |i| i + line[i..].chars().next().map_or(1, char::len_utf8));
        let word = &line[start..];

        let mut id = Self::root();
        let mut naming = true;
        for token in line[..start].split_whitespace() {
            match self.child(id, token) {
                Some(child) if naming => id = child,
                _ => naming = false,
            }
        }

        let mut candidates: Vec<String> = if word.starts_with('-') {
            if id == Self::root() {
                Vec::new()
            } else {
                self.args(&self.handle(id))
                    .iter()
                    .filter(|a| a.kind() == ArgKind::Flag)
                    .map(|a| format!("--{}", a.name()))
                    .filter(|f| f.starts_with(word))
                    .collect()
            }
        } else if naming {
            self.child_ids(id)
                .iter()
                .map(|&c| self.node_name(c))
                .filter(|n| n.starts_with(word))
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };
        candidates.sort();
        (start, candidates)
    }
}

/// rustyline helper completing command names and flags.
#[derive(Debug, Clone)]
pub struct CommandCompleter {
    registry: Registry,
}

impl CommandCompleter {
    /// Complete against `registry`.
    pub const fn new(registry: Registry) -> Self {
        Self { registry }
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, names) = self.registry.completions(&line[..pos]);
        let pairs = names
            .into_iter()
            .map(|n| Pair {
                display: n.clone(),
                replacement: n,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}

impl Validator for CommandCompleter {}

impl Helper for CommandCompleter {}
