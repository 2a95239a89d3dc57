//! # craft-cli
//!
//! Interactive shell for operating game-server fleets.
//!
//! Provides commands for:
//! - Switching between and inspecting clusters
//! - Launching, restarting and terminating game servers
//! - Running proxies and managing their DNS records
//! - Listing archived world snapshots
//!
//! # Architecture
//!
//! Lines are parsed and hooked by the `craft-shell` engine, turned into a
//! typed [`commands::Action`] and executed against a [`fleet::Fleet`]. The
//! fleet is either a remote API ([`fleet::HttpFleet`]) or an in-memory
//! stand-in ([`fleet::MemoryFleet`]).
//!
//! ```text
//! ┌──────────┐   line    ┌─────────────┐  Action  ┌─────────┐   REST   ┌───────────┐
//! │ rustyline│──────────►│ craft-shell │─────────►│  Shell  │─────────►│ fleet API │
//! └──────────┘           └─────────────┘          └─────────┘          └───────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod fleet;
pub mod logging;
pub mod output;
pub mod shell;
pub mod table;

pub use cli::{Cli, Commands};
pub use config::{FleetConfig, ShellConfig};
pub use error::{CliError, FleetError};
pub use fleet::{Fleet, HttpFleet, MemoryFleet};
pub use shell::Shell;
