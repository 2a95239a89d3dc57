//! Session commands: help, the verbosity toggles, `use` and the exit report.

use std::io::Write;

use chrono::Local;
use craft_shell::{Registry, Session, SwitchOutcome};
use tracing::warn;

use crate::error::CliError;
use crate::fleet::Fleet;
use crate::output::{ClusterList, Message, Role, TableDisplay, paint};

/// Print help for `path`, or the full command list.
///
/// # Errors
///
/// Returns an error if `path` names no command or writing fails.
pub fn help<W: Write>(registry: &Registry, path: &[String], writer: &mut W) -> Result<(), CliError> {
    let path: Vec<&str> = path.iter().map(String::as_str).collect();
    let text = registry.help(&path)?;
    if path.is_empty() {
        writeln!(writer, "{}", paint(Role::Title, "Commands:"))?;
    }
    write!(writer, "{text}")?;
    Ok(())
}

/// Report a toggle's new state.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn report_toggle<W: Write>(name: &str, on: bool, writer: &mut W) -> Result<(), CliError> {
    let state = if on { "on" } else { "off" };
    Message::info(format!("{name} is {state}.")).write_table(writer)
}

/// Confirm a `use` whose cluster check passed. A failed check has already
/// been reported by the cluster hook.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn confirm_use<W: Write>(
    outcomes: &[SwitchOutcome],
    typed: &str,
    writer: &mut W,
) -> Result<(), CliError> {
    let confirmed = outcomes.iter().any(|outcome| match outcome {
        SwitchOutcome::Switched { to, .. } => to == typed,
        SwitchOutcome::AlreadyCurrent(cluster) => cluster == typed,
        SwitchOutcome::NotFound(_) | SwitchOutcome::LookupFailed { .. } => false,
    });
    if confirmed {
        Message::success(format!("Current cluster is {typed}.")).write_table(writer)?;
    }
    Ok(())
}

/// Print the exit report: a timestamp and the cluster table.
///
/// A fleet failure is printed in place of the table. Only write errors are
/// returned.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn exit_report<W: Write>(fleet: &dyn Fleet, session: &Session, writer: &mut W) -> Result<(), CliError> {
    let stamp = Local::now().to_rfc2822();
    writeln!(writer, "{}", paint(Role::Title, &format!("Session ended {stamp}")))?;
    match fleet.list_clusters() {
        Ok(clusters) => ClusterList {
            clusters: &clusters,
            current: session.current_cluster(),
        }
        .write_table(writer),
        Err(e) => {
            warn!(error = %e, "exit report could not list clusters");
            Message {
                text: format!("could not get cluster data: {e}"),
                role: Role::Fail,
            }
            .write_table(writer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShellConfig;
    use crate::fleet::MemoryFleet;
    use crate::output::set_color;
    use crate::table::command_table;

    fn text(buf: Vec<u8>) -> String {
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn full_help_lists_commands() {
        set_color(false);
        let registry =
            Registry::from_specs(command_table(&ShellConfig::default())).expect("valid table");
        let mut out = Vec::new();
        help(&registry, &[], &mut out).expect("help");
        let out = text(out);
        assert!(out.starts_with("Commands:"));
        assert!(out.contains("server start [--useFullURI] <user> <server-name> <snapshot>"));
        assert!(out.contains("archive list <user> [<bucket=\"craft-config-test\">]"));
    }

    #[test]
    fn help_for_unknown_command_fails() {
        let registry =
            Registry::from_specs(command_table(&ShellConfig::default())).expect("valid table");
        let err = help(&registry, &["launch".to_string()], &mut Vec::new()).unwrap_err();
        assert!(matches!(err, CliError::Parse(_)));
    }

    #[test]
    fn toggle_report_wording() {
        set_color(false);
        let mut out = Vec::new();
        report_toggle("Debug", true, &mut out).expect("write");
        report_toggle("Verbose", false, &mut out).expect("write");
        assert_eq!(text(out), "Debug is on.\nVerbose is off.\n");
    }

    #[test]
    fn use_is_silent_when_switch_did_not_happen() {
        let mut out = Vec::new();
        confirm_use(&[SwitchOutcome::NotFound("bogus".into())], "bogus", &mut out)
            .expect("write");
        assert!(out.is_empty());
    }

    #[test]
    fn use_is_silent_when_lookup_failed_on_current_cluster() {
        let failed = SwitchOutcome::LookupFailed {
            cluster: "minecraft".into(),
            error: craft_shell::LookupError::new("fleet unavailable"),
        };
        let mut out = Vec::new();
        confirm_use(&[failed], "minecraft", &mut out).expect("write");
        assert!(out.is_empty());
    }

    #[test]
    fn use_confirms_switch_and_already_current() {
        set_color(false);
        let mut out = Vec::new();
        confirm_use(
            &[SwitchOutcome::Switched {
                from: "minecraft".into(),
                to: "prod".into(),
            }],
            "prod",
            &mut out,
        )
        .expect("write");
        confirm_use(&[SwitchOutcome::AlreadyCurrent("prod".into())], "prod", &mut out)
            .expect("write");
        assert_eq!(text(out), "Current cluster is prod.\nCurrent cluster is prod.\n");
    }

    #[test]
    fn exit_report_lists_clusters() {
        set_color(false);
        let fleet = MemoryFleet::new("craft.test").with_cluster("minecraft", 1);
        let mut out = Vec::new();
        exit_report(&fleet, &Session::new("minecraft"), &mut out).expect("report");
        let out = text(out);
        assert!(out.starts_with("Session ended "));
        assert!(out.contains("minecraft"));
    }

    #[test]
    fn exit_report_survives_fleet_failure() {
        set_color(false);
        let fleet = MemoryFleet::new("craft.test").with_cluster("minecraft", 1);
        fleet.set_unavailable(true);
        let mut out = Vec::new();
        exit_report(&fleet, &Session::new("minecraft"), &mut out).expect("report");
        assert!(text(out).contains("Error: could not get cluster data: transport error"));
    }
}
