//! Line parser.
//!
//! Resolves a raw input line against a [`Registry`]:
//!
//! 1. Split the line on whitespace. No tokens means "nothing to do".
//! 2. Walk the command tree, consuming tokens that name a child command.
//! 3. Bind the remaining tokens: `--flags` in any order, everything else to
//!    positional arguments in declaration order.
//! 4. Fill defaults, check required arguments and collect the hooks of the
//!    values the operator typed.
//!
//! Parsing never runs hooks itself; see [`crate::cluster::apply_hooks`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::trace;

use crate::error::ParseError;
use crate::registry::{ArgKind, ArgSpec, CommandHandle, Hook, Registry, ValueType};

/// A bound argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A string value.
    Str(String),
    /// A boolean value.
    Bool(bool),
}

impl Value {
    /// The string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Bool(_) => None,
        }
    }

    /// The boolean payload, if this is a boolean.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Str(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Values bound for one invocation, keyed by argument name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundArgs {
    values: BTreeMap<String, Value>,
    explicit: BTreeSet<String>,
}

impl BoundArgs {
    /// The value bound to `name`, typed or defaulted.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// The string bound to `name`.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// The boolean bound to `name`; unbound flags read as `false`.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Whether the operator typed `name` (as opposed to it being defaulted).
    pub fn is_explicit(&self, name: &str) -> bool {
        self.explicit.contains(name)
    }

    /// Number of bound values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All bound values, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn bind(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
        self.explicit.insert(name.to_string());
    }

    fn bind_default(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

/// A hook to run for one typed value.
#[derive(Debug, Clone, Copy)]
pub struct HookInvocation<'a> {
    /// The hook attached to the argument.
    pub hook: Hook,
    /// Argument name.
    pub arg: &'a str,
    /// The value the operator typed.
    pub value: &'a Value,
    /// Every value bound by this parse.
    pub bound: &'a BoundArgs,
}

/// A resolved command plus its bound arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    handle: CommandHandle,
    args: BoundArgs,
    hooks: Vec<(Hook, String)>,
}

impl ParsedCommand {
    /// The resolved command.
    pub fn handle(&self) -> &CommandHandle {
        &self.handle
    }

    /// Shorthand for `handle().full_path()`.
    pub fn full_path(&self) -> &str {
        self.handle.full_path()
    }

    /// Bound argument values.
    pub fn args(&self) -> &BoundArgs {
        &self.args
    }

    /// Hooks to run, in argument declaration order.
    pub fn hook_invocations(&self) -> impl Iterator<Item = HookInvocation<'_>> {
        self.hooks.iter().filter_map(|(hook, arg)| {
            self.args.get(arg).map(|value| HookInvocation {
                hook: *hook,
                arg,
                value,
                bound: &self.args,
            })
        })
    }
}

/// Split a raw line into tokens, dropping trailing line terminators.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.trim_end_matches(['\r', '\n']).split_whitespace().collect()
}

impl Registry {
    /// Parse one input line.
    ///
    /// Returns `Ok(None)` for a blank line.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when the line does not match the table.
    pub fn parse(&self, line: &str) -> Result<Option<ParsedCommand>, ParseError> {
        let tokens = tokenize(line);
        let Some(first) = tokens.first() else {
            return Ok(None);
        };

        let mut id = Self::root();
        let mut consumed = 0;
        while let Some(child) = tokens.get(consumed).and_then(|t| self.child(id, t)) {
            id = child;
            consumed += 1;
        }
        if id == Self::root() {
            return Err(ParseError::UnrecognizedToken {
                command: String::new(),
                token: (*first).to_string(),
            });
        }

        let handle = self.handle(id);
        let rest = &tokens[consumed..];
        let specs = self.args(&handle);
        let command = handle.full_path();

        if specs.is_empty() && !self.child_ids(id).is_empty() {
            return Err(match rest.first() {
                Some(token) => ParseError::UnrecognizedToken {
                    command: command.to_string(),
                    token: (*token).to_string(),
                },
                None => ParseError::IncompleteCommand {
                    command: command.to_string(),
                    expected: self
                        .child_ids(id)
                        .iter()
                        .map(|&c| self.node_name(c).to_string())
                        .collect(),
                },
            });
        }

        let args = bind(command, specs, rest)?;
        let hooks = specs
            .iter()
            .filter(|spec| args.is_explicit(spec.name()))
            .filter_map(|spec| spec.hook_kind().map(|h| (h, spec.name().to_string())))
            .collect();

        trace!(command, bound = args.len(), "parsed line");
        Ok(Some(ParsedCommand {
            handle,
            args,
            hooks,
        }))
    }
}

fn bind(command: &str, specs: &[ArgSpec], tokens: &[&str]) -> Result<BoundArgs, ParseError> {
    let mut bound = BoundArgs::default();
    let mut positionals = specs.iter().filter(|a| a.kind() == ArgKind::Positional);
    let mut flags_done = false;
    let mut iter = tokens.iter();

    while let Some(&token) = iter.next() {
        if !flags_done && token == "--" {
            flags_done = true;
            continue;
        }

        if let Some(body) = token.strip_prefix("--").filter(|b| !flags_done && !b.is_empty()) {
            let (name, inline) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (body, None),
            };
            let unrecognized = || ParseError::UnrecognizedToken {
                command: command.to_string(),
                token: token.to_string(),
            };
            let (spec, negated) = find_flag(specs, name).ok_or_else(unrecognized)?;

            let value = match (spec.value_type(), negated, inline) {
                (ValueType::Bool, true, None) => Value::Bool(false),
                (ValueType::Bool, true, Some(_)) => return Err(unrecognized()),
                (ValueType::Bool, false, None) => Value::Bool(true),
                (_, _, Some(raw)) => convert(spec, raw)?,
                (ValueType::String, _, None) => {
                    let raw = iter.next().ok_or_else(|| ParseError::MissingArgument {
                        command: command.to_string(),
                        arg: spec.name().to_string(),
                    })?;
                    convert(spec, raw)?
                }
            };
            bound.bind(spec.name(), value);
            continue;
        }

        let spec = positionals
            .next()
            .ok_or_else(|| ParseError::UnrecognizedToken {
                command: command.to_string(),
                token: token.to_string(),
            })?;
        bound.bind(spec.name(), convert(spec, token)?);
    }

    for spec in specs {
        if bound.contains(spec.name()) {
            continue;
        }
        if let Some(default) = spec.default() {
            bound.bind_default(spec.name(), convert(spec, default)?);
        } else if spec.is_required() {
            return Err(ParseError::MissingArgument {
                command: command.to_string(),
                arg: spec.name().to_string(),
            });
        }
    }

    Ok(bound)
}

fn find_flag<'a>(specs: &'a [ArgSpec], name: &str) -> Option<(&'a ArgSpec, bool)> {
    let flags = || specs.iter().filter(|a| a.kind() == ArgKind::Flag);
    flags()
        .find(|a| a.name() == name)
        .map(|a| (a, false))
        .or_else(|| {
            let positive = name.strip_prefix("no-")?;
            flags()
                .find(|a| a.name() == positive && a.value_type() == ValueType::Bool)
                .map(|a| (a, true))
        })
}

fn convert(spec: &ArgSpec, raw: &str) -> Result<Value, ParseError> {
    match spec.value_type() {
        ValueType::String => Ok(Value::Str(raw.to_string())),
        ValueType::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(ParseError::TypeMismatch {
                arg: spec.name().to_string(),
                value: raw.to_string(),
                expected: ValueType::Bool.name(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::registry::CommandSpec;

    fn registry() -> Registry {
        Registry::from_specs([
            CommandSpec::new("quit", "exit."),
            CommandSpec::new("use", "switch cluster.").arg(
                ArgSpec::positional("cluster", "cluster")
                    .required()
                    .hook(Hook::SwitchCluster),
            ),
            CommandSpec::new("server", "server commands.")
                .subcommand(
                    CommandSpec::new("start", "start from snapshot.")
                        .arg(ArgSpec::flag("useFullURI", "full URI"))
                        .arg(ArgSpec::positional("user", "user").required())
                        .arg(ArgSpec::positional("server-name", "name").required())
                        .arg(ArgSpec::positional("snapshot", "snapshot").required())
                        .arg(ArgSpec::positional("cluster", "cluster").hook(Hook::SwitchCluster))
                        .arg(ArgSpec::positional("ecs-task", "task").default_value("minecraft-ecs")),
                )
                .subcommand(
                    CommandSpec::new("list", "list.")
                        .arg(ArgSpec::positional("cluster", "cluster").hook(Hook::SwitchCluster)),
                ),
            CommandSpec::new("archive", "archives.").subcommand(
                CommandSpec::new("list", "list archives.")
                    .arg(ArgSpec::positional("user", "user").required())
                    .arg(ArgSpec::string_flag("region", "region"))
                    .arg(ArgSpec::positional("bucket", "bucket").default_value("craft-config-test")),
            ),
        ])
        .expect("valid table")
    }

    fn parse(line: &str) -> ParsedCommand {
        registry()
            .parse(line)
            .expect("parses")
            .expect("not blank")
    }

    #[test_case(""; "empty")]
    #[test_case("   "; "spaces")]
    #[test_case("\n"; "newline")]
    #[test_case(" \t \r\n"; "mixed whitespace")]
    fn blank_lines_are_noops(line: &str) {
        assert_eq!(registry().parse(line), Ok(None));
    }

    #[test_case("quit", "quit"; "bare command")]
    #[test_case("quit\n", "quit"; "trailing newline")]
    #[test_case("use prod", "use"; "top level with arg")]
    #[test_case("server list", "server list"; "subcommand")]
    #[test_case("server list prod", "server list"; "subcommand with arg")]
    #[test_case("archive list jdr", "archive list"; "sibling group same leaf name")]
    #[test_case("server start jdr world snap", "server start"; "three positionals")]
    fn resolves_full_path(line: &str, path: &str) {
        assert_eq!(parse(line).full_path(), path);
    }

    #[test]
    fn positionals_bind_in_order_with_defaults() {
        let parsed = parse("server start jdr world snap-1");
        let args = parsed.args();
        assert_eq!(args.str("user"), Some("jdr"));
        assert_eq!(args.str("server-name"), Some("world"));
        assert_eq!(args.str("snapshot"), Some("snap-1"));
        assert_eq!(args.str("cluster"), None);
        assert_eq!(args.str("ecs-task"), Some("minecraft-ecs"));
        assert!(!args.is_explicit("ecs-task"));
        assert!(!args.flag("useFullURI"));
    }

    #[test_case("server start --useFullURI jdr world s3://b/k", true; "leading flag")]
    #[test_case("server start jdr world s3://b/k --useFullURI", true; "trailing flag")]
    #[test_case("server start jdr --useFullURI=true world s3://b/k", true; "inline true")]
    #[test_case("server start jdr world s3://b/k --useFullURI=no", false; "inline no")]
    #[test_case("server start jdr world s3://b/k --no-useFullURI", false; "negated")]
    fn bool_flags_anywhere(line: &str, expected: bool) {
        let parsed = parse(line);
        assert_eq!(parsed.args().flag("useFullURI"), expected);
        assert_eq!(parsed.args().str("snapshot"), Some("s3://b/k"));
    }

    #[test]
    fn string_flag_takes_next_token_or_inline_value() {
        let parsed = parse("archive list jdr --region us-west-2");
        assert_eq!(parsed.args().str("region"), Some("us-west-2"));
        assert_eq!(parsed.args().str("bucket"), Some("craft-config-test"));

        let parsed = parse("archive list --region=eu-west-1 jdr other-bucket");
        assert_eq!(parsed.args().str("region"), Some("eu-west-1"));
        assert_eq!(parsed.args().str("bucket"), Some("other-bucket"));
        assert!(parsed.args().is_explicit("bucket"));
    }

    #[test]
    fn double_dash_ends_flags() {
        let parsed = parse("server start jdr -- --weird snap");
        assert_eq!(parsed.args().str("server-name"), Some("--weird"));
        assert_eq!(parsed.args().str("snapshot"), Some("snap"));
    }

    #[test]
    fn missing_required_names_first_missing() {
        let err = registry().parse("server start jdr").unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingArgument {
                command: "server start".into(),
                arg: "server-name".into()
            }
        );
    }

    #[test]
    fn string_flag_without_value_is_missing() {
        let err = registry().parse("archive list jdr --region").unwrap_err();
        assert!(matches!(err, ParseError::MissingArgument { ref arg, .. } if arg == "region"));
    }

    #[test_case("server list prod extra", "extra"; "excess positional")]
    #[test_case("server list --verbose", "--verbose"; "unknown flag")]
    #[test_case("launch now", "launch"; "unknown command")]
    #[test_case("server stop", "stop"; "unknown subcommand")]
    #[test_case("server start jdr w s --no-useFullURI=true", "--no-useFullURI=true"; "negated with value")]
    fn unrecognized_tokens(line: &str, token: &str) {
        let err = registry().parse(line).unwrap_err();
        assert!(
            matches!(err, ParseError::UnrecognizedToken { token: ref t, .. } if t == token),
            "got {err:?}"
        );
    }

    #[test]
    fn type_mismatch_on_bad_bool() {
        let err = registry()
            .parse("server start jdr w s --useFullURI=maybe")
            .unwrap_err();
        assert_eq!(
            err,
            ParseError::TypeMismatch {
                arg: "useFullURI".into(),
                value: "maybe".into(),
                expected: "boolean"
            }
        );
    }

    #[test]
    fn group_without_subcommand_is_incomplete() {
        let err = registry().parse("server").unwrap_err();
        assert_eq!(
            err,
            ParseError::IncompleteCommand {
                command: "server".into(),
                expected: vec!["start".into(), "list".into()]
            }
        );
    }

    #[test]
    fn hooks_fire_only_for_typed_values() {
        let parsed = parse("server list");
        assert_eq!(parsed.hook_invocations().count(), 0);

        let parsed = parse("server list prod");
        let hooks: Vec<_> = parsed.hook_invocations().collect();
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].hook, Hook::SwitchCluster);
        assert_eq!(hooks[0].arg, "cluster");
        assert_eq!(hooks[0].value, &Value::Str("prod".into()));
        assert_eq!(hooks[0].bound.str("cluster"), Some("prod"));
    }

    #[test]
    fn hook_invocation_sees_all_bound_values() {
        let parsed = parse("server start jdr world snap prod");
        let hook = parsed.hook_invocations().next().expect("cluster hook");
        assert_eq!(hook.bound.str("user"), Some("jdr"));
        assert_eq!(hook.bound.str("ecs-task"), Some("minecraft-ecs"));
    }
}
