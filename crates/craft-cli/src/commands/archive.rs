//! Snapshot archive command implementation.

use std::io::Write;

use crate::error::CliError;
use crate::fleet::Fleet;
use crate::output::{ArchiveList, TableDisplay};

/// `archive` subcommands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveAction {
    /// Snapshots owned by a user.
    List {
        /// Owner.
        user: String,
        /// Bucket to look in.
        bucket: String,
    },
}

/// Archive command executor.
pub struct ArchiveCommand<'a> {
    fleet: &'a dyn Fleet,
}

impl<'a> ArchiveCommand<'a> {
    /// Create an archive command.
    pub fn new(fleet: &'a dyn Fleet) -> Self {
        Self { fleet }
    }

    /// Execute an archive subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the fleet call or writing fails.
    pub fn execute<W: Write>(&self, writer: &mut W, action: &ArchiveAction) -> Result<(), CliError> {
        match action {
            ArchiveAction::List { user, bucket } => {
                let archives = self.fleet.list_archives(user, bucket)?;
                ArchiveList {
                    user,
                    archives: &archives,
                }
                .write_table(writer)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::MemoryFleet;
    use crate::output::set_color;

    fn list(fleet: &MemoryFleet, user: &str) -> String {
        set_color(false);
        let mut out = Vec::new();
        ArchiveCommand::new(fleet)
            .execute(
                &mut out,
                &ArchiveAction::List {
                    user: user.into(),
                    bucket: "craft-config-test".into(),
                },
            )
            .expect("list");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn lists_archives_with_sizes() {
        let fleet = MemoryFleet::new("craft.test").with_archive(
            "steve",
            "backup-1",
            "craft-config-test",
            3 * 1024 * 1024,
        );
        let out = list(&fleet, "steve");
        assert!(out.contains("backup-1"));
        assert!(out.contains("3.0 MiB"));
        assert!(out.contains("steve/backup-1.tar.gz"));
    }

    #[test]
    fn empty_listing_names_the_user() {
        let fleet = MemoryFleet::new("craft.test");
        assert_eq!(list(&fleet, "alex"), "No archives for alex\n");
    }
}
