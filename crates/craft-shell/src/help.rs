//! Usage and help text rendered from the registry.

use std::fmt::Write as _;

use crate::error::ParseError;
use crate::registry::{CommandHandle, Registry};

impl Registry {
    /// One-line usage, e.g. `server start [--useFullURI] <user> ...`.
    pub fn usage(&self, handle: &CommandHandle) -> String {
        let mut usage = handle.full_path().to_string();
        for arg in self.args(handle) {
            usage.push(' ');
            usage.push_str(&arg.usage());
        }
        if self.children(handle).next().is_some() {
            usage.push_str(" <command>");
        }
        usage
    }

    /// Help for the command named by `path`, or for everything if `path`
    /// is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnrecognizedToken`] if `path` names no command.
    pub fn help(&self, path: &[&str]) -> Result<String, ParseError> {
        if path.is_empty() {
            return Ok(self.command_list(self.top_level().collect()));
        }

        let joined = path.join(" ");
        let handle = self.lookup(&joined).ok_or_else(|| ParseError::UnrecognizedToken {
            command: String::new(),
            token: joined.clone(),
        })?;

        let children: Vec<_> = self.children(&handle).collect();
        if !children.is_empty() {
            let mut out = format!("{}\n\n", self.about(&handle));
            out.push_str(&self.command_list(children));
            return Ok(out);
        }

        let mut out = format!("usage: {}\n\n{}\n", self.usage(&handle), self.about(&handle));
        let args = self.args(&handle);
        if !args.is_empty() {
            out.push('\n');
            let width = args.iter().map(|a| a.usage().len()).max().unwrap_or(0);
            for arg in args {
                let _ = writeln!(out, "  {:<width$}  {}", arg.usage(), arg.help());
            }
        }
        Ok(out)
    }

    /// Leaves under `roots`, one per line with their description.
    fn command_list(&self, roots: Vec<CommandHandle>) -> String {
        let mut leaves = Vec::new();
        let mut stack: Vec<CommandHandle> = roots.into_iter().rev().collect();
        while let Some(handle) = stack.pop() {
            let children: Vec<_> = self.children(&handle).collect();
            if children.is_empty() {
                leaves.push((self.usage(&handle), self.about(&handle).to_string()));
            } else {
                stack.extend(children.into_iter().rev());
            }
        }

        let width = leaves.iter().map(|(u, _)| u.len()).max().unwrap_or(0);
        let mut out = String::new();
        for (usage, about) in leaves {
            let _ = writeln!(out, "  {usage:<width$}  {about}");
        }
        out
    }
}
