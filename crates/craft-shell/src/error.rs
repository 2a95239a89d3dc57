//! Error types for the dispatch engine.

use thiserror::Error;

/// Errors raised while building the command registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A command with this name already exists under the parent.
    #[error("duplicate command '{name}' under '{parent}'")]
    DuplicateCommand {
        /// Full path of the parent (empty for the root).
        parent: String,
        /// The repeated command name.
        name: String,
    },

    /// Two argument specs of one command share a name.
    #[error("command '{command}' declares argument '{arg}' twice")]
    DuplicateArgument {
        /// Full path of the command.
        command: String,
        /// The repeated argument name.
        arg: String,
    },

    /// The parent path does not name a registered command.
    #[error("unknown parent command '{0}'")]
    UnknownParent(String),

    /// Command and argument names must be a single non-empty token.
    #[error("invalid name '{0}'")]
    InvalidName(String),

    /// A required positional argument follows an optional one.
    #[error("command '{command}': required argument '{arg}' follows an optional one")]
    RequiredAfterOptional {
        /// Full path of the command.
        command: String,
        /// The misplaced argument.
        arg: String,
    },
}

/// Errors raised while parsing an input line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A required argument was not supplied.
    #[error("required argument '{arg}' not provided for '{command}'")]
    MissingArgument {
        /// Full path of the command.
        command: String,
        /// Name of the missing argument.
        arg: String,
    },

    /// A token matched no command, flag or positional slot.
    #[error("unexpected '{token}'")]
    UnrecognizedToken {
        /// Full path of the command reached so far (empty at the root).
        command: String,
        /// The offending token.
        token: String,
    },

    /// A value could not be converted to the argument's type.
    #[error("invalid value '{value}' for '{arg}': expected {expected}")]
    TypeMismatch {
        /// Name of the argument.
        arg: String,
        /// The typed value.
        value: String,
        /// Human-readable name of the expected type.
        expected: &'static str,
    },

    /// A command group was typed without one of its subcommands.
    #[error("'{command}' expects a subcommand: {}", expected.join(", "))]
    IncompleteCommand {
        /// Full path of the command group.
        command: String,
        /// Names of the available subcommands.
        expected: Vec<String>,
    },
}

/// The cluster inventory could not answer an existence query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cluster lookup failed: {0}")]
pub struct LookupError(pub String);

impl LookupError {
    /// Create a lookup error from any displayable cause.
    pub fn new(cause: impl std::fmt::Display) -> Self {
        Self(cause.to_string())
    }
}
