//! The read-eval-print loop.
//!
//! Each iteration renders the prompt from the live session, reads one
//! line, records it in history and hands it to the [`Dispatch`]
//! implementation. The loop ends only on [`Outcome::Terminate`] or when the
//! input source reports end of input. Every other failure is printed to the
//! error channel and the loop carries on.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Write};

use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tracing::{debug, warn};

use crate::complete::CommandCompleter;
use crate::history::HistoryFile;
use crate::outcome::Outcome;
use crate::registry::Registry;
use crate::session::Session;

/// One result from the input source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    /// A line of input.
    Line(String),
    /// The operator pressed ctrl-C; start a fresh prompt.
    Interrupted,
    /// No more input.
    Eof,
}

/// Where lines come from.
pub trait LineSource {
    /// Show `prompt` and read one line.
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadEvent>;

    /// Record an accepted line.
    fn add_history(&mut self, line: &str) -> io::Result<()>;
}

/// Command execution, as seen by the loop.
pub trait Dispatch {
    /// Failure type reported by [`Outcome::Failed`].
    type Error: fmt::Display;

    /// Session state used to render the prompt.
    fn session(&self) -> &Session;

    /// Handle one raw input line.
    fn dispatch(&mut self, line: &str) -> Outcome<Self::Error>;
}

/// Drive `shell` with lines from `source` until the sentinel is observed.
///
/// # Errors
///
/// Returns an error only if writing to `err_out` fails.
pub fn run<S, D, P, W>(source: &mut S, prompt: P, shell: &mut D, err_out: &mut W) -> io::Result<()>
where
    S: LineSource + ?Sized,
    D: Dispatch + ?Sized,
    P: Fn(&Session) -> String,
    W: Write + ?Sized,
{
    loop {
        let rendered = prompt(shell.session());
        let line = match source.read_line(&rendered) {
            Ok(ReadEvent::Line(line)) => line,
            Ok(ReadEvent::Interrupted) => continue,
            Ok(ReadEvent::Eof) => {
                debug!("end of input");
                return Ok(());
            }
            Err(e) => {
                writeln!(err_out, "Error - {e}.")?;
                continue;
            }
        };

        if let Err(e) = source.add_history(&line) {
            writeln!(err_out, "Error - could not record history: {e}.")?;
        }

        match shell.dispatch(&line) {
            Outcome::Continue => {}
            Outcome::Terminate => {
                debug!("terminate requested");
                return Ok(());
            }
            Outcome::Failed(e) => writeln!(err_out, "Error - {e}.")?,
        }
    }
}

/// The default prompt: `[<cluster>] > `.
pub fn cluster_prompt(session: &Session) -> String {
    format!("[{}] > ", session.current_cluster())
}

/// Interactive source backed by a rustyline editor.
pub struct EditorSource {
    editor: Editor<CommandCompleter, DefaultHistory>,
    history: Option<HistoryFile>,
}

impl EditorSource {
    /// Build an editor completing against `registry`, preloaded from `history`.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be initialised.
    pub fn new(registry: &Registry, history: Option<HistoryFile>) -> io::Result<Self> {
        let mut editor: Editor<CommandCompleter, DefaultHistory> =
            Editor::new().map_err(into_io)?;
        editor.set_helper(Some(CommandCompleter::new(registry.clone())));

        if let Some(file) = &history {
            match file.load() {
                Ok(entries) => {
                    debug!(count = entries.len(), path = %file.path().display(), "loaded history");
                    for entry in entries {
                        editor.add_history_entry(entry).map_err(into_io)?;
                    }
                }
                Err(e) => warn!(path = %file.path().display(), error = %e, "could not load history"),
            }
        }

        Ok(Self { editor, history })
    }
}

impl fmt::Debug for EditorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorSource")
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadEvent> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadEvent::Line(line)),
            Err(ReadlineError::Eof) => Ok(ReadEvent::Eof),
            Err(ReadlineError::Interrupted) => Ok(ReadEvent::Interrupted),
            Err(ReadlineError::Io(e)) if is_closed(&e) => {
                debug!(error = %e, "terminal closed");
                Ok(ReadEvent::Eof)
            }
            Err(e) => Err(into_io(e)),
        }
    }

    fn add_history(&mut self, line: &str) -> io::Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }
        self.editor.add_history_entry(line).map_err(into_io)?;
        if let Some(file) = &self.history {
            file.append(line)?;
        }
        Ok(())
    }
}

/// The terminal is gone, not just misbehaving.
fn is_closed(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe
    )
}

fn into_io(err: ReadlineError) -> io::Error {
    match err {
        ReadlineError::Io(e) => e,
        other => io::Error::other(other),
    }
}

/// Source that replays a fixed list of lines, then reports end of input.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    lines: VecDeque<String>,
    prompts: Vec<String>,
    history: Vec<String>,
}

impl ScriptedSource {
    /// Replay `lines` in order.
    pub fn new<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Every prompt rendered so far.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Every non-blank line recorded as history.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Lines not yet read.
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl LineSource for ScriptedSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadEvent> {
        self.prompts.push(prompt.to_string());
        Ok(self.lines.pop_front().map_or(ReadEvent::Eof, ReadEvent::Line))
    }

    fn add_history(&mut self, line: &str) -> io::Result<()> {
        if !line.trim().is_empty() {
            self.history.push(line.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Dispatcher that understands `quit`, `fail` and `use <name>`.
    struct Toy {
        session: Session,
        seen: Vec<String>,
    }

    impl Toy {
        fn new() -> Self {
            Self {
                session: Session::new("minecraft"),
                seen: Vec::new(),
            }
        }
    }

    impl Dispatch for Toy {
        type Error = String;

        fn session(&self) -> &Session {
            &self.session
        }

        fn dispatch(&mut self, line: &str) -> Outcome<String> {
            self.seen.push(line.to_string());
            let tokens: Vec<_> = line.split_whitespace().collect();
            match tokens.as_slice() {
                [] => Outcome::Continue,
                ["quit"] => Outcome::Terminate,
                ["fail"] => Outcome::Failed("it broke".into()),
                ["use", name] => {
                    self.session.set_current_cluster(name);
                    Outcome::Continue
                }
                _ => Outcome::Continue,
            }
        }
    }

    /// Fails `failures` times, then replays `lines`.
    struct Flaky {
        failures: usize,
        lines: ScriptedSource,
    }

    impl Flaky {
        fn new(failures: usize, lines: &[&str]) -> Self {
            Self {
                failures,
                lines: ScriptedSource::new(lines.iter().copied()),
            }
        }
    }

    impl LineSource for Flaky {
        fn read_line(&mut self, prompt: &str) -> io::Result<ReadEvent> {
            if self.failures == 0 {
                return self.lines.read_line(prompt);
            }
            self.failures -= 1;
            Err(io::Error::other("terminal hiccup"))
        }

        fn add_history(&mut self, _line: &str) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stops_on_terminate_and_leaves_rest_unread() {
        let mut source = ScriptedSource::new(["", "fail", "quit", "never"]);
        let mut shell = Toy::new();
        let mut err = Vec::new();

        run(&mut source, cluster_prompt, &mut shell, &mut err).expect("run");

        assert_eq!(shell.seen, ["", "fail", "quit"]);
        assert_eq!(source.remaining(), 1);
        assert_eq!(String::from_utf8(err).expect("utf8"), "Error - it broke.\n");
    }

    #[test]
    fn eof_ends_the_loop() {
        let mut source = ScriptedSource::new(["fail"]);
        let mut shell = Toy::new();
        let mut err = Vec::<u8>::new();

        run(&mut source, cluster_prompt, &mut shell, &mut err).expect("run");

        assert_eq!(shell.seen, ["fail"]);
    }

    #[test]
    fn prompt_is_rendered_fresh_each_iteration() {
        let mut source = ScriptedSource::new(["use prod", "quit"]);
        let mut shell = Toy::new();

        run(&mut source, cluster_prompt, &mut shell, &mut Vec::<u8>::new()).expect("run");

        assert_eq!(source.prompts(), ["[minecraft] > ", "[prod] > "]);
    }

    #[test]
    fn blank_lines_stay_out_of_history() {
        let mut source = ScriptedSource::new(["", "use prod", "  ", "quit"]);
        let mut shell = Toy::new();

        run(&mut source, cluster_prompt, &mut shell, &mut Vec::<u8>::new()).expect("run");

        assert_eq!(source.history(), ["use prod", "quit"]);
    }

    #[test]
    fn read_errors_are_reported_and_the_loop_continues() {
        let mut source = Flaky::new(2, &["quit"]);
        let mut shell = Toy::new();
        let mut err = Vec::new();

        run(&mut source, cluster_prompt, &mut shell, &mut err).expect("run");

        assert_eq!(shell.seen, ["quit"]);
        let err = String::from_utf8(err).expect("utf8");
        assert_eq!(err.matches("terminal hiccup").count(), 2);
    }

    #[test]
    fn lines_after_a_burst_of_read_errors_still_run() {
        let mut source = Flaky::new(50, &["use prod", "fail", "quit", "never"]);
        let mut shell = Toy::new();
        let mut err = Vec::new();

        run(&mut source, cluster_prompt, &mut shell, &mut err).expect("run");

        assert_eq!(shell.seen, ["use prod", "fail", "quit"]);
        assert_eq!(source.lines.remaining(), 1);
        let err = String::from_utf8(err).expect("utf8");
        assert_eq!(err.matches("terminal hiccup").count(), 50);
        assert!(err.ends_with("Error - it broke.\n"));
    }

    #[test]
    fn closed_terminal_counts_as_end_of_input() {
        assert!(is_closed(&io::Error::from(io::ErrorKind::UnexpectedEof)));
        assert!(is_closed(&io::Error::from(io::ErrorKind::BrokenPipe)));
        assert!(!is_closed(&io::Error::other("terminal hiccup")));
        assert!(!is_closed(&io::Error::from(io::ErrorKind::Interrupted)));
    }
}
