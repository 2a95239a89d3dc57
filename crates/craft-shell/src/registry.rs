//! Command registry.
//!
//! The registry is a tree of named commands. Each command carries typed
//! argument specs; a command with children is a group (`server`,
//! `cluster`) whose leaves are dispatched by their full token path
//! (`"server launch"`).
//!
//! Tables are usually written declaratively as nested [`CommandSpec`]s and
//! turned into a [`Registry`] once at startup with [`Registry::from_specs`].
//! The registry is never mutated after that.

use tracing::trace;

use crate::error::RegistryError;

/// Whether an argument is bound by position or by `--name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Bound from bare tokens in declaration order.
    Positional,
    /// Bound from `--name value`, `--name=value` or, for booleans, `--name`.
    Flag,
}

/// Type an argument's value is converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Any token.
    String,
    /// `true`/`false` (also `yes`/`no`, `1`/`0`).
    Bool,
}

impl ValueType {
    /// Name used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "boolean",
        }
    }
}

/// Side effect run after an explicitly typed value has been bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Validate the value as a cluster name and make it the current cluster.
    SwitchCluster,
}

/// Declaration of one argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    name: String,
    help: String,
    kind: ArgKind,
    value_type: ValueType,
    required: bool,
    default: Option<String>,
    hook: Option<Hook>,
}

impl ArgSpec {
    /// An optional positional string argument.
    pub fn positional(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind: ArgKind::Positional,
            value_type: ValueType::String,
            required: false,
            default: None,
            hook: None,
        }
    }

    /// A boolean flag, `false` unless given.
    pub fn flag(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind: ArgKind::Flag,
            value_type: ValueType::Bool,
            required: false,
            default: Some("false".into()),
            hook: None,
        }
    }

    /// A flag that takes a string value.
    pub fn string_flag(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            kind: ArgKind::Flag,
            ..Self::positional(name, help)
        }
    }

    /// Mark the argument as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value bound when the argument is not typed.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Attach a side-effect hook.
    #[must_use]
    pub fn hook(mut self, hook: Hook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Argument name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Help text.
    pub fn help(&self) -> &str {
        &self.help
    }

    /// Positional or flag.
    pub const fn kind(&self) -> ArgKind {
        self.kind
    }

    /// Value type.
    pub const fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Whether the argument must be typed.
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Default value, if any.
    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Attached hook, if any.
    pub const fn hook_kind(&self) -> Option<Hook> {
        self.hook
    }

    /// Usage fragment, e.g. `<user>`, `[<cluster>]` or `[--useFullURI]`.
    pub fn usage(&self) -> String {
        let core = match (self.kind, self.value_type) {
            (ArgKind::Flag, ValueType::Bool) => format!("--{}", self.name),
            (ArgKind::Flag, ValueType::String) => format!("--{}=<{}>", self.name, self.name),
            (ArgKind::Positional, _) => match &self.default {
                Some(d) => format!("<{}=\"{d}\">", self.name),
                None => format!("<{}>", self.name),
            },
        };
        if self.required {
            core
        } else {
            format!("[{core}]")
        }
    }
}

/// Declarative description of a command and its subcommands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    name: String,
    about: String,
    args: Vec<ArgSpec>,
    subcommands: Vec<CommandSpec>,
}

impl CommandSpec {
    /// A command with no arguments.
    pub fn new(name: impl Into<String>, about: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            about: about.into(),
            args: Vec::new(),
            subcommands: Vec::new(),
        }
    }

    /// Add an argument.
    #[must_use]
    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }

    /// Add a subcommand.
    #[must_use]
    pub fn subcommand(mut self, sub: Self) -> Self {
        self.subcommands.push(sub);
        self
    }
}

/// Stable reference to a registered command.
///
/// A handle is resolved by its full path when used with a registry other
/// than the one that issued it. Handles no registry knows resolve to nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandHandle {
    id: usize,
    path: String,
}

impl CommandHandle {
    /// Space-joined token path; the unique dispatch key.
    pub fn full_path(&self) -> &str {
        &self.path
    }

    pub(crate) const fn id(&self) -> usize {
        self.id
    }
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    about: String,
    parent: Option<usize>,
    children: Vec<usize>,
    args: Vec<ArgSpec>,
    path: String,
}

/// The command tree.
#[derive(Debug, Clone)]
pub struct Registry {
    nodes: Vec<Node>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

const ROOT: usize = 0;

impl Registry {
    /// An empty registry holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: String::new(),
                about: String::new(),
                parent: None,
                children: Vec::new(),
                args: Vec::new(),
                path: String::new(),
            }],
        }
    }

    /// Build a registry from a declarative table.
    ///
    /// # Errors
    ///
    /// Fails on the first registration error in the table.
    pub fn from_specs(specs: impl IntoIterator<Item = CommandSpec>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for spec in specs {
            registry.register_spec("", spec)?;
        }
        Ok(registry)
    }

    fn register_spec(&mut self, parent: &str, spec: CommandSpec) -> Result<(), RegistryError> {
        let handle = self.register(parent, &spec.name, &spec.about, spec.args)?;
        let path = handle.path;
        for sub in spec.subcommands {
            self.register_spec(&path, sub)?;
        }
        Ok(())
    }

    /// Register `name` under `parent_path` (empty for a top-level command).
    ///
    /// # Errors
    ///
    /// Returns an error if the parent is unknown, the name is taken or
    /// invalid, or the argument list is malformed.
    pub fn register(
        &mut self,
        parent_path: &str,
        name: &str,
        about: &str,
        args: Vec<ArgSpec>,
    ) -> Result<CommandHandle, RegistryError> {
        let parent = self
            .find(parent_path)
            .ok_or_else(|| RegistryError::UnknownParent(parent_path.to_string()))?;

        if !is_token(name) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        if self.child(parent, name).is_some() {
            return Err(RegistryError::DuplicateCommand {
                parent: self.nodes[parent].path.clone(),
                name: name.to_string(),
            });
        }

        let path = if self.nodes[parent].path.is_empty() {
            name.to_string()
        } else {
            format!("{} {name}", self.nodes[parent].path)
        };
        validate_args(&path, &args)?;

        let id = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_string(),
            about: about.to_string(),
            parent: Some(parent),
            children: Vec::new(),
            args,
            path: path.clone(),
        });
        self.nodes[parent].children.push(id);
        trace!(command = %path, "registered command");

        Ok(CommandHandle { id, path })
    }

    /// Look up a command by its full path.
    pub fn lookup(&self, path: &str) -> Option<CommandHandle> {
        self.find(path)
            .filter(|&id| id != ROOT)
            .map(|id| self.handle(id))
    }

    /// Every registered command, in registration order.
    pub fn commands(&self) -> impl Iterator<Item = CommandHandle> + '_ {
        (1..self.nodes.len()).map(|id| self.handle(id))
    }

    /// Top-level commands, in registration order.
    pub fn top_level(&self) -> impl Iterator<Item = CommandHandle> + '_ {
        self.nodes[ROOT].children.iter().map(|&id| self.handle(id))
    }

    /// Direct subcommands of `handle`.
    pub fn children(&self, handle: &CommandHandle) -> impl Iterator<Item = CommandHandle> + '_ {
        self.node(handle)
            .into_iter()
            .flat_map(|node| node.children.iter())
            .map(|&id| self.handle(id))
    }

    /// Parent of `handle`, `None` for top-level commands.
    pub fn parent(&self, handle: &CommandHandle) -> Option<CommandHandle> {
        self.node(handle)?
            .parent
            .filter(|&id| id != ROOT)
            .map(|id| self.handle(id))
    }

    /// Last path segment of `handle`; empty for an unknown handle.
    pub fn name(&self, handle: &CommandHandle) -> &str {
        self.node(handle).map_or("", |node| node.name.as_str())
    }

    /// Description of `handle`; empty for an unknown handle.
    pub fn about(&self, handle: &CommandHandle) -> &str {
        self.node(handle).map_or("", |node| node.about.as_str())
    }

    /// Argument specs of `handle`, in declaration order.
    pub fn args(&self, handle: &CommandHandle) -> &[ArgSpec] {
        self.node(handle).map_or(&[], |node| node.args.as_slice())
    }

    /// The node `handle` names: by id when the path agrees, else by path.
    fn node(&self, handle: &CommandHandle) -> Option<&Node> {
        match self.nodes.get(handle.id()) {
            Some(node) if handle.id() != ROOT && node.path == handle.path => Some(node),
            _ => self
                .find(&handle.path)
                .filter(|&id| id != ROOT)
                .map(|id| &self.nodes[id]),
        }
    }

    pub(crate) fn child_ids(&self, id: usize) -> &[usize] {
        &self.nodes[id].children
    }

    pub(crate) fn child(&self, id: usize, name: &str) -> Option<usize> {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].name == name)
    }

    pub(crate) fn handle(&self, id: usize) -> CommandHandle {
        CommandHandle {
            id,
            path: self.nodes[id].path.clone(),
        }
    }

    pub(crate) fn node_name(&self, id: usize) -> &str {
        &self.nodes[id].name
    }

    pub(crate) const fn root() -> usize {
        ROOT
    }

    fn find(&self, path: &str) -> Option<usize> {
        path.split_whitespace()
            .try_fold(ROOT, |id, segment| self.child(id, segment))
    }
}

fn is_token(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('-') && !name.contains(char::is_whitespace)
}

fn validate_args(command: &str, args: &[ArgSpec]) -> Result<(), RegistryError> {
    let mut seen_optional = false;
    for (i, arg) in args.iter().enumerate() {
        if !is_token(&arg.name) {
            return Err(RegistryError::InvalidName(arg.name.clone()));
        }
        if args[..i].iter().any(|a| a.name == arg.name) {
            return Err(RegistryError::DuplicateArgument {
                command: command.to_string(),
                arg: arg.name.clone(),
            });
        }
        if arg.kind == ArgKind::Positional {
            if arg.required && seen_optional {
                return Err(RegistryError::RequiredAfterOptional {
                    command: command.to_string(),
                    arg: arg.name.clone(),
                });
            }
            seen_optional |= !arg.required;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Registry {
        Registry::from_specs([
            CommandSpec::new("quit", "exit the program."),
            CommandSpec::new("server", "server commands.")
                .subcommand(
                    CommandSpec::new("launch", "launch a server.")
                        .arg(ArgSpec::positional("user", "owner").required())
                        .arg(ArgSpec::positional("cluster", "cluster").hook(Hook::SwitchCluster)),
                )
                .subcommand(CommandSpec::new("list", "list servers.")),
        ])
        .expect("valid table")
    }

    #[test]
    fn from_specs_registers_nested_paths() {
        let registry = sample();
        let paths: Vec<_> = registry
            .commands()
            .map(|h| h.full_path().to_string())
            .collect();
        assert_eq!(paths, ["quit", "server", "server launch", "server list"]);
    }

    #[test]
    fn lookup_by_full_path() {
        let registry = sample();
        let handle = registry.lookup("server launch").expect("registered");
        assert_eq!(handle.full_path(), "server launch");
        assert_eq!(registry.about(&handle), "launch a server.");
        assert_eq!(registry.args(&handle).len(), 2);
        assert!(registry.lookup("server stop").is_none());
        assert!(registry.lookup("").is_none());
    }

    #[test]
    fn parent_and_children() {
        let registry = sample();
        let server = registry.lookup("server").expect("group");
        let names: Vec<_> = registry
            .children(&server)
            .map(|h| registry.name(&h).to_string())
            .collect();
        assert_eq!(names, ["launch", "list"]);

        let launch = registry.lookup("server launch").expect("leaf");
        assert_eq!(registry.parent(&launch), Some(server));
        assert_eq!(registry.parent(&registry.lookup("quit").expect("top")), None);
    }

    #[test]
    fn handle_from_another_registry_resolves_by_path() {
        let other = Registry::from_specs([
            CommandSpec::new("server", "server commands.")
                .subcommand(CommandSpec::new("list", "list servers.")),
        ])
        .expect("valid table");
        let foreign = other.lookup("server list").expect("leaf");

        let registry = sample();
        assert_eq!(registry.about(&foreign), "list servers.");
        assert_eq!(registry.name(&foreign), "list");
        assert_eq!(
            registry.parent(&foreign).map(|h| h.full_path().to_string()),
            Some("server".to_string())
        );
    }

    #[test]
    fn unknown_handle_resolves_to_nothing() {
        let other = Registry::from_specs([
            CommandSpec::new("a", "a.").subcommand(
                CommandSpec::new("b", "b.").subcommand(
                    CommandSpec::new("c", "c.")
                        .subcommand(CommandSpec::new("d", "d.").subcommand(CommandSpec::new("e", "e."))),
                ),
            ),
        ])
        .expect("valid table");
        let registry = sample();

        for handle in other.commands() {
            assert_eq!(registry.name(&handle), "");
            assert_eq!(registry.about(&handle), "");
            assert!(registry.args(&handle).is_empty());
            assert_eq!(registry.children(&handle).count(), 0);
            assert_eq!(registry.parent(&handle), None);
        }
    }

    #[test]
    fn duplicate_command_rejected() {
        let mut registry = sample();
        let err = registry
            .register("server", "list", "again", Vec::new())
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateCommand {
                parent: "server".into(),
                name: "list".into()
            }
        );
    }

    #[test]
    fn same_name_under_different_parents_is_fine() {
        let mut registry = sample();
        registry
            .register("", "cluster", "cluster commands.", Vec::new())
            .expect("cluster group");
        let handle = registry
            .register("cluster", "list", "list clusters.", Vec::new())
            .expect("no clash with server list");
        assert_eq!(handle.full_path(), "cluster list");
    }

    #[test]
    fn unknown_parent_rejected() {
        let mut registry = sample();
        let err = registry
            .register("proxy", "list", "list proxies.", Vec::new())
            .unwrap_err();
        assert_eq!(err, RegistryError::UnknownParent("proxy".into()));
    }

    #[test]
    fn duplicate_argument_rejected() {
        let err = Registry::from_specs([CommandSpec::new("use", "switch.")
            .arg(ArgSpec::positional("cluster", "a"))
            .arg(ArgSpec::string_flag("cluster", "b"))])
        .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateArgument { ref arg, .. } if arg == "cluster"));
    }

    #[test]
    fn required_after_optional_rejected() {
        let err = Registry::from_specs([CommandSpec::new("env", "env.")
            .arg(ArgSpec::positional("cluster", "a"))
            .arg(ArgSpec::positional("server", "b").required())])
        .unwrap_err();
        assert!(matches!(err, RegistryError::RequiredAfterOptional { .. }));
    }

    #[test]
    fn invalid_names_rejected() {
        let mut registry = Registry::new();
        assert!(matches!(
            registry.register("", "two words", "x", Vec::new()),
            Err(RegistryError::InvalidName(_))
        ));
        assert!(matches!(
            registry.register("", "--flag", "x", Vec::new()),
            Err(RegistryError::InvalidName(_))
        ));
    }

    #[test]
    fn usage_fragments() {
        assert_eq!(ArgSpec::positional("user", "").required().usage(), "<user>");
        assert_eq!(ArgSpec::positional("cluster", "").usage(), "[<cluster>]");
        assert_eq!(
            ArgSpec::positional("bucket", "").default_value("craft-config-test").usage(),
            "[<bucket=\"craft-config-test\">]"
        );
        assert_eq!(ArgSpec::flag("useFullURI", "").usage(), "[--useFullURI]");
        assert_eq!(ArgSpec::string_flag("region", "").usage(), "[--region=<region>]");
    }
}
