//! Shell state and line dispatch.
//!
//! [`Shell`] owns everything a session needs: the command registry, the
//! session context, the cluster-name cache, the fleet and the output
//! writer. Each line is parsed, its cluster hooks are applied, and the
//! resulting [`Action`] is executed. Nothing here stops the loop except
//! `exit`/`quit`.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use craft_shell::{
    ClusterCache, Dispatch, LogLevel, LogLevelSink, Outcome, ParsedCommand, Registry, Session,
    SwitchOutcome, apply_hooks,
};
use tracing::{debug, warn};

use crate::commands::{
    Action, ArchiveCommand, ClusterCommand, EnvCommand, ProxyCommand, ServerCommand, session,
};
use crate::config::ShellConfig;
use crate::error::CliError;
use crate::fleet::{Fleet, InventoryNames};
use crate::output::{Message, TableDisplay};
use crate::table::command_table;

/// One interactive session.
pub struct Shell<W> {
    registry: Registry,
    session: Session,
    cache: ClusterCache,
    fleet: Arc<dyn Fleet>,
    log_sinks: Vec<Arc<dyn LogLevelSink>>,
    out: W,
}

impl<W: Write> Shell<W> {
    /// Build a shell from `config`, starting in `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the command table is malformed.
    pub fn new(
        config: &ShellConfig,
        session: Session,
        fleet: Arc<dyn Fleet>,
        out: W,
    ) -> Result<Self, CliError> {
        let registry = Registry::from_specs(command_table(config))?;
        let ttl = Duration::from_secs(config.fleet.cluster_cache_ttl_secs);
        Ok(Self {
            registry,
            session,
            cache: ClusterCache::new(ttl),
            fleet,
            log_sinks: Vec::new(),
            out,
        })
    }

    /// Also push log-level changes to `sink`.
    #[must_use]
    pub fn with_log_sink(mut self, sink: Arc<dyn LogLevelSink>) -> Self {
        self.log_sinks.push(sink);
        self
    }

    /// The command table.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Where command output goes.
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Mutable access to the output writer.
    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }

    /// Push the session's effective level to the fleet and every sink.
    pub fn sync_log_level(&self) -> LogLevel {
        let mut sinks: Vec<&dyn LogLevelSink> = vec![self.fleet.as_log_sink()];
        for sink in &self.log_sinks {
            sinks.push(sink.as_ref());
        }
        self.session.propagate_level(&sinks)
    }

    /// Run cluster hooks and print a warning for every failed switch. The
    /// command runs afterwards whatever happens here.
    fn run_hooks(&mut self, parsed: &ParsedCommand) -> Vec<SwitchOutcome> {
        let names = InventoryNames(self.fleet.as_ref());
        let outcomes = apply_hooks(parsed, &mut self.session, &mut self.cache.with_source(&names));
        for outcome in &outcomes {
            if !outcome.is_failure() {
                debug!(%outcome, "cluster hook");
                continue;
            }
            if let Err(e) = Message::warn(outcome.to_string()).write_table(&mut self.out) {
                warn!(error = %e, %outcome, "could not report cluster hook");
            }
        }
        outcomes
    }

    fn perform(&mut self, action: &Action, switches: &[SwitchOutcome]) -> Result<(), CliError> {
        let fleet = self.fleet.as_ref();
        match action {
            Action::Help { path } => session::help(&self.registry, path, &mut self.out),
            Action::ToggleDebug => {
                let on = self.session.toggle_debug();
                self.sync_log_level();
                session::report_toggle("Debug", on, &mut self.out)
            }
            Action::ToggleVerbose => {
                let on = self.session.toggle_verbose();
                self.sync_log_level();
                session::report_toggle("Verbose", on, &mut self.out)
            }
            Action::Use { cluster } => session::confirm_use(switches, cluster, &mut self.out),
            Action::Quit => session::exit_report(fleet, &self.session, &mut self.out),
            Action::Cluster(action) => {
                ClusterCommand::new(fleet, self.session.current_cluster())
                    .execute(&mut self.out, action)
            }
            Action::Env(action) => EnvCommand::new(fleet).execute(&mut self.out, action),
            Action::Proxy(action) => ProxyCommand::new(fleet).execute(&mut self.out, action),
            Action::Server(action) => ServerCommand::new(fleet).execute(&mut self.out, action),
            Action::Archive(action) => ArchiveCommand::new(fleet).execute(&mut self.out, action),
        }
    }

    fn handle(&mut self, line: &str) -> Result<Option<(Action, Vec<SwitchOutcome>)>, CliError> {
        let Some(parsed) = self.registry.parse(line)? else {
            return Ok(None);
        };
        let switches = self.run_hooks(&parsed);
        let action = Action::from_parsed(&parsed, self.session.current_cluster())?;
        debug!(command = parsed.full_path(), "dispatching");
        Ok(Some((action, switches)))
    }
}

impl<W: Write> Dispatch for Shell<W> {
    type Error = CliError;

    fn session(&self) -> &Session {
        &self.session
    }

    fn dispatch(&mut self, line: &str) -> Outcome<CliError> {
        let (action, switches) = match self.handle(line) {
            Ok(Some(handled)) => handled,
            Ok(None) => return Outcome::Continue,
            Err(e) => return Outcome::Failed(e),
        };

        let result = self.perform(&action, &switches);
        if action == Action::Quit {
            if let Err(e) = result {
                warn!(error = %e, "exit report failed");
            }
            return Outcome::Terminate;
        }
        if let Err(e) = self.out.flush() {
            warn!(error = %e, "could not flush output");
        }
        result.into()
    }
}
