//! Output formatting for shell commands.
//!
//! Everything a command prints goes through [`TableDisplay`] so that
//! handlers stay free of layout code. Colour is applied per [`Role`] and can
//! be switched off globally with [`set_color`].

use std::fmt::Display;
use std::io::Write;

use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};

use crate::error::CliError;
use crate::fleet::{
    Archive, ClusterDetail, ClusterSummary, DnsRecord, EnvVar, ProxyTask, ServerTask,
};

/// Enable or disable colour for everything printed afterwards.
pub fn set_color(enabled: bool) {
    colored::control::set_override(enabled);
}

/// What a piece of output means, which decides its colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Headings.
    Title,
    /// Neutral information.
    Info,
    /// A command did what was asked.
    Success,
    /// Something the operator should notice.
    Warn,
    /// Something failed.
    Fail,
}

/// Colour `text` for `role`.
pub fn paint(role: Role, text: &str) -> ColoredString {
    match role {
        Role::Title => text.bold(),
        Role::Info => text.cyan(),
        Role::Success => text.green(),
        Role::Warn => text.yellow(),
        Role::Fail => text.red().bold(),
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value in human-readable form.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Padded columns. Widths are measured before colour is applied.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<(Vec<String>, Option<Role>)>,
}

impl Table {
    /// A table with the given column headers.
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a plain row.
    pub fn row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows
            .push((cells.into_iter().map(Into::into).collect(), None));
    }

    /// Append a row printed in `role`'s colour.
    pub fn row_as<I, S>(&mut self, role: Role, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows
            .push((cells.into_iter().map(Into::into).collect(), Some(role)));
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for (cells, _) in &self.rows {
            for (i, cell) in cells.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }

    fn line(cells: &[String], widths: &[usize]) -> String {
        let mut line = String::new();
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                line.push_str("  ");
            }
            if i + 1 == cells.len() {
                line.push_str(cell);
            } else {
                let width = widths.get(i).copied().unwrap_or(0);
                line.push_str(&format!("{cell:<width$}"));
            }
        }
        line
    }
}

impl TableDisplay for Table {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let widths = self.widths();
        writeln!(writer, "{}", paint(Role::Title, &Self::line(&self.headers, &widths)))?;
        for (cells, role) in &self.rows {
            let line = Self::line(cells, &widths);
            match role {
                Some(role) => writeln!(writer, "{}", paint(*role, &line))?,
                None => writeln!(writer, "{line}")?,
            }
        }
        Ok(())
    }
}

/// Simple one-line message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message text.
    pub text: String,
    /// How to show it.
    pub role: Role,
}

impl Message {
    /// A success message.
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role: Role::Success,
        }
    }

    /// An informational message.
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role: Role::Info,
        }
    }

    /// A warning.
    pub fn warn(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role: Role::Warn,
        }
    }
}

impl TableDisplay for Message {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let line = match self.role {
            Role::Warn => format!("Warning: {}", self.text),
            Role::Fail => format!("Error: {}", self.text),
            _ => self.text.clone(),
        };
        writeln!(writer, "{}", paint(self.role, &line))?;
        Ok(())
    }
}

/// `cluster list`: every cluster, the current one marked with `*`.
#[derive(Debug, Clone)]
pub struct ClusterList<'a> {
    /// Clusters to show.
    pub clusters: &'a [ClusterSummary],
    /// The session's current cluster.
    pub current: &'a str,
}

impl TableDisplay for ClusterList<'_> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.clusters.is_empty() {
            writeln!(writer, "No clusters")?;
            return Ok(());
        }
        let mut table = Table::new(["", "NAME", "STATUS", "INSTANCES", "PENDING", "RUNNING"]);
        for cluster in self.clusters {
            let marker = if cluster.name == self.current { "*" } else { "" };
            let cells = [
                marker.to_string(),
                cluster.name.clone(),
                cluster.status.clone(),
                cluster.registered_instances.to_string(),
                cluster.pending_tasks.to_string(),
                cluster.running_tasks.to_string(),
            ];
            if cluster.registered_instances > 0 {
                table.row_as(Role::Success, cells);
            } else {
                table.row(cells);
            }
        }
        table.write_table(writer)
    }
}

impl TableDisplay for ClusterDetail {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let s = &self.summary;
        writeln!(writer, "{}", paint(Role::Title, &format!("Cluster {}", s.name)))?;
        kv(writer, "Status", &s.status)?;
        kv(writer, "Instances", s.registered_instances)?;
        kv(writer, "Pending tasks", s.pending_tasks)?;
        kv(writer, "Running tasks", s.running_tasks)?;
        if self.instances.is_empty() {
            return Ok(());
        }
        writeln!(writer)?;
        let mut table = Table::new(["INSTANCE", "STATUS", "PUBLIC IP", "TASKS"]);
        for instance in &self.instances {
            table.row([
                instance.id.clone(),
                instance.status.clone(),
                instance.public_ip.clone().unwrap_or_else(|| "-".to_string()),
                instance.running_tasks.to_string(),
            ]);
        }
        table.write_table(writer)
    }
}

/// `server list`.
#[derive(Debug, Clone)]
pub struct ServerList<'a> {
    /// Cluster the servers were listed from.
    pub cluster: &'a str,
    /// Servers to show.
    pub servers: &'a [ServerTask],
}

impl TableDisplay for ServerList<'_> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.servers.is_empty() {
            writeln!(writer, "No servers in cluster {}", self.cluster)?;
            return Ok(());
        }
        let mut table = Table::new(["NAME", "USER", "STATUS", "ADDRESS"]);
        for server in self.servers {
            table.row([
                server.name.clone(),
                server.user.clone(),
                server.status.clone(),
                or_dash(server.address.as_deref()),
            ]);
        }
        table.write_table(writer)
    }
}

/// `server status`: servers with task, uptime and proxies.
#[derive(Debug, Clone)]
pub struct ServerStatus<'a> {
    /// Cluster the servers were listed from.
    pub cluster: &'a str,
    /// Servers to show.
    pub servers: &'a [ServerTask],
    /// Reference time for uptime.
    pub now: DateTime<Utc>,
}

impl TableDisplay for ServerStatus<'_> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.servers.is_empty() {
            writeln!(writer, "No servers in cluster {}", self.cluster)?;
            return Ok(());
        }
        let mut table = Table::new(["NAME", "TASK", "STATUS", "UPTIME", "SNAPSHOT", "PROXIES"]);
        for server in self.servers {
            table.row([
                server.name.clone(),
                server.task_id.clone(),
                server.status.clone(),
                server
                    .started_at
                    .map_or_else(|| "-".to_string(), |at| uptime(self.now, at)),
                or_dash(server.snapshot.as_deref()),
                if server.proxies.is_empty() {
                    "-".to_string()
                } else {
                    server.proxies.join(",")
                },
            ]);
        }
        table.write_table(writer)
    }
}

impl TableDisplay for ServerTask {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{}", paint(Role::Title, &format!("Server {}", self.name)))?;
        kv(writer, "User", &self.user)?;
        kv(writer, "Cluster", &self.cluster)?;
        kv(writer, "Status", &self.status)?;
        kv(writer, "Task", &self.task_id)?;
        kv(writer, "Task definition", &self.task_definition)?;
        kv(writer, "Address", or_dash(self.address.as_deref()))?;
        kv(writer, "Snapshot", or_dash(self.snapshot.as_deref()))?;
        kv(
            writer,
            "Started",
            self.started_at
                .map_or_else(|| "-".to_string(), |at| at.to_rfc2822()),
        )?;
        if !self.proxies.is_empty() {
            kv(writer, "Proxies", self.proxies.join(", "))?;
        }
        Ok(())
    }
}

/// `env list`.
#[derive(Debug, Clone)]
pub struct EnvList<'a> {
    /// Server the variables belong to.
    pub server: &'a str,
    /// Variables to show.
    pub vars: &'a [EnvVar],
}

impl TableDisplay for EnvList<'_> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.vars.is_empty() {
            writeln!(writer, "No environment for server {}", self.server)?;
            return Ok(());
        }
        let mut table = Table::new(["NAME", "VALUE"]);
        for var in self.vars {
            table.row([var.name.clone(), var.value.clone()]);
        }
        table.write_table(writer)
    }
}

/// `proxy list`.
#[derive(Debug, Clone)]
pub struct ProxyList<'a> {
    /// Cluster the proxies were listed from.
    pub cluster: &'a str,
    /// Proxies to show.
    pub proxies: &'a [ProxyTask],
}

impl TableDisplay for ProxyList<'_> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.proxies.is_empty() {
            writeln!(writer, "No proxies in cluster {}", self.cluster)?;
            return Ok(());
        }
        let mut table = Table::new(["NAME", "STATUS", "ADDRESS", "DNS", "SERVERS"]);
        for proxy in self.proxies {
            table.row([
                proxy.name.clone(),
                proxy.status.clone(),
                or_dash(proxy.address.as_deref()),
                or_dash(proxy.dns_name.as_deref()),
                proxy.servers.len().to_string(),
            ]);
        }
        table.write_table(writer)
    }
}

/// `dns`.
#[derive(Debug, Clone)]
pub struct DnsList<'a>(pub &'a [DnsRecord]);

impl TableDisplay for DnsList<'_> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.0.is_empty() {
            writeln!(writer, "No DNS records")?;
            return Ok(());
        }
        let mut table = Table::new(["NAME", "TYPE", "TTL", "VALUE"]);
        for record in self.0 {
            table.row([
                record.name.clone(),
                record.kind.clone(),
                record.ttl.to_string(),
                record.value.clone(),
            ]);
        }
        table.write_table(writer)
    }
}

/// `archive list`.
#[derive(Debug, Clone)]
pub struct ArchiveList<'a> {
    /// Owner the archives were listed for.
    pub user: &'a str,
    /// Archives to show.
    pub archives: &'a [Archive],
}

impl TableDisplay for ArchiveList<'_> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.archives.is_empty() {
            writeln!(writer, "No archives for {}", self.user)?;
            return Ok(());
        }
        let mut table = Table::new(["NAME", "SIZE", "MODIFIED", "KEY"]);
        for archive in self.archives {
            table.row([
                archive.name.clone(),
                human_size(archive.size_bytes),
                archive.last_modified.format("%Y-%m-%d %H:%M").to_string(),
                archive.key.clone(),
            ]);
        }
        table.write_table(writer)
    }
}

fn kv<W: Write>(writer: &mut W, key: &str, value: impl Display) -> Result<(), CliError> {
    writeln!(writer, "  {:<16} {value}", format!("{key}:"))?;
    Ok(())
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

/// `1d 2h`, `3h 4m` or `5m`.
pub fn uptime(now: DateTime<Utc>, since: DateTime<Utc>) -> String {
    let minutes = (now - since).num_minutes().max(0);
    let (days, hours, mins) = (minutes / 1440, (minutes / 60) % 24, minutes % 60);
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}

/// Bytes in the largest unit that keeps the value at or above 1.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut unit = 0;
    let mut whole = bytes;
    let mut rest = 0;
    while whole >= 1024 && unit + 1 < UNITS.len() {
        rest = whole % 1024;
        whole /= 1024;
        unit += 1;
    }
    if unit == 0 {
        format!("{whole} B")
    } else {
        format!("{whole}.{} {}", rest * 10 / 1024, UNITS[unit])
    }
}
