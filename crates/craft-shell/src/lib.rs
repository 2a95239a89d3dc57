//! # craft-shell
//!
//! Interactive command-dispatch engine for the craft fleet shell.
//!
//! Provides:
//! - A declarative command [`registry`] with typed positional and flag arguments
//! - A line [`parser`] that resolves input against the registry
//! - Per-process [`session`] state (current cluster, verbosity)
//! - The [`cluster`] switch hook that validates cluster arguments
//! - The [`repl`] loop and its persisted [`history`]
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  line   ┌────────┐  ParsedCommand  ┌───────┐  Outcome  ┌──────┐
//! │ LineSource├───────►│ parser ├────────────────►│ hooks ├──────────►│ repl │
//! └──────────┘         └────────┘                 └───────┘           └──────┘
//! ```
//!
//! Command handlers live outside this crate; they implement [`Dispatch`]
//! and return an [`Outcome`]. The loop only stops on [`Outcome::Terminate`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cluster;
pub mod complete;
pub mod error;
pub mod help;
pub mod history;
pub mod outcome;
pub mod parser;
pub mod registry;
pub mod repl;
pub mod session;

pub use cluster::{ClusterCache, ClusterDirectory, ClusterSource, SwitchOutcome, apply_hooks, switch_cluster};
pub use error::{LookupError, ParseError, RegistryError};
pub use outcome::Outcome;
pub use parser::{BoundArgs, HookInvocation, ParsedCommand, Value};
pub use registry::{ArgKind, ArgSpec, CommandHandle, CommandSpec, Hook, Registry, ValueType};
pub use repl::{Dispatch, LineSource, ReadEvent};
pub use session::{LogLevel, LogLevelSink, Session};
