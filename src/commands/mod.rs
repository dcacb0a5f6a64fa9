// src/commands/mod.rs

//! # Commands
//!
//! A command is one step inside a task, a function definition or a task-group phase. It is
//! either a call to a project-defined function (`func`) or an invocation of one built-in
//! operation (`command`). Both forms serialize without a discriminator; the identifying key
//! tells them apart when a document is read back.
//!
//! Built-in operations are described by typed parameter structs in [`builtins`], each
//! implementing [`BuiltIn`]. Their supporting value types and closed enums live in
//! [`params`].

use crate::core::presence::{is_absent, null_as_default};
use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Declares a closed set of wire strings as a Rust enum.
///
/// Generates `ALL`, `as_str`, `Display`, `FromStr` (rejecting unknown spellings with
/// [`CommandError::InvalidValue`]) and string-based serde impls.
macro_rules! closed_set {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident as $field:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every member of the set, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The spelling used in documents.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::commands::CommandError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|member| member.as_str() == s)
                    .ok_or_else(|| $crate::commands::CommandError::InvalidValue {
                        field: $field.to_string(),
                        value: s.to_string(),
                        expected: $name::ALL
                            .iter()
                            .map(|member| member.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }

        $crate::always_present!($name);
    };
}

pub mod builtins;
pub mod params;

pub use builtins::validate_command;

/// Errors raised while building or validating commands.
#[derive(Error, Debug)]
pub enum CommandError {
    /// A string is not a member of the closed set accepted for a field.
    #[error("Invalid value '{value}' for '{field}'. Expected one of: {expected}")]
    InvalidValue {
        /// The field or enum being parsed.
        field: String,
        /// The rejected input.
        value: String,
        /// The accepted spellings, comma separated.
        expected: String,
    },
    /// The parameters of a built-in operation violate one of its preconditions.
    #[error("Invalid parameters for '{operation}': {reason}")]
    InvalidParams {
        /// The operation whose parameters were rejected.
        operation: Operation,
        /// What is wrong with them.
        reason: String,
    },
    /// Parameters could not be converted into a document tree.
    #[error("Failed to encode command parameters: {0}")]
    Encode(#[from] serde_yaml::Error),
}

closed_set! {
    /// The fixed set of built-in operations the CI service understands.
    pub enum Operation as "command" {
        ArchiveTargzExtract => "archive.targz_extract",
        ArchiveTargzPack => "archive.targz_pack",
        ArchiveAutoExtract => "archive.auto_extract",
        ArchiveZipExtract => "archive.zip_extract",
        ArchiveZipPack => "archive.zip_pack",
        AttachArtifacts => "attach.artifacts",
        AttachResults => "attach.results",
        AttachXunitResults => "attach.xunit_results",
        ExpansionsUpdate => "expansions.update",
        ExpansionsWrite => "expansions.write",
        GenerateTasks => "generate.tasks",
        GitGetProject => "git.get_project",
        GotestParseFiles => "gotest.parse_files",
        GotestParseJson => "gotest.parse_json",
        HostCreate => "host.create",
        HostList => "host.list",
        JsonSend => "json.send",
        KeyValInc => "keyval.inc",
        ManifestLoad => "manifest.load",
        PerfSend => "perf.send",
        S3Get => "s3.get",
        S3Put => "s3.put",
        S3Copy => "s3Copy.copy",
        ShellExec => "shell.exec",
        SubprocessExec => "subprocess.exec",
        SubprocessScripting => "subprocess.scripting",
        TimeoutUpdate => "timeout.update",
    }
}

closed_set! {
    /// How a failure of a command is classified by the CI service.
    pub enum CommandType as "type" {
        /// The failure is the fault of the code under test.
        Test => "test",
        /// The failure is an infrastructure problem.
        System => "system",
        /// The failure happened while preparing the task.
        Setup => "setup",
    }
}

// --- Command ---

/// One step of a task, function or task-group phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Command {
    /// A call to a function declared in the project's `functions` table.
    Function(FunctionCall),
    /// An invocation of a built-in operation.
    BuiltIn(BuiltInCommand),
}

impl Command {
    /// Shorthand for a function call without variables.
    pub fn func(name: impl Into<String>) -> Self {
        Command::Function(FunctionCall::new(name))
    }

    /// Runs the precondition checks of the built-in operation, if any.
    ///
    /// Function calls are always accepted; references to undeclared functions are left to
    /// the CI service.
    pub fn validate(&self) -> Result<(), CommandError> {
        match self {
            Command::Function(_) => Ok(()),
            Command::BuiltIn(builtin) => validate_command(builtin),
        }
    }
}

impl From<FunctionCall> for Command {
    fn from(call: FunctionCall) -> Self {
        Command::Function(call)
    }
}

impl From<BuiltInCommand> for Command {
    fn from(builtin: BuiltInCommand) -> Self {
        Command::BuiltIn(builtin)
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let Some(map) = value.as_mapping() else {
            return Err(de::Error::custom(
                "a command must be a mapping with a `func` or `command` key",
            ));
        };

        if map.contains_key("func") {
            FunctionCall::deserialize(value)
                .map(Command::Function)
                .map_err(de::Error::custom)
        } else if map.contains_key("command") {
            BuiltInCommand::deserialize(value)
                .map(Command::BuiltIn)
                .map_err(de::Error::custom)
        } else {
            Err(de::Error::custom(
                "a command needs either a `func` or a `command` key",
            ))
        }
    }
}

// --- Function calls ---

/// A call to a named function, optionally binding variables for the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function in the project's `functions` table.
    pub func: String,
    /// Expansions visible to the function body for this call only.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub vars: IndexMap<String, Value>,
    /// Overrides the idle timeout for the commands of the function.
    #[serde(default, skip_serializing_if = "is_absent")]
    pub timeout_secs: Option<u64>,
}

impl FunctionCall {
    /// Creates a call to `func` with no variables.
    pub fn new(func: impl Into<String>) -> Self {
        Self {
            func: func.into(),
            vars: IndexMap::new(),
            timeout_secs: None,
        }
    }

    /// Binds one variable. Later bindings of the same key replace earlier ones.
    pub fn var(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Sets the idle timeout of the call.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

// --- Built-in invocations ---

/// A rendered invocation of a built-in operation.
///
/// Usually produced by [`BuiltIn::command`] from a typed parameter struct; it can also be
/// assembled by hand with [`BuiltInCommand::new`] and [`BuiltInCommand::param`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltInCommand {
    /// The operation to run.
    pub command: Operation,
    /// Flat parameter mapping. Entries with a null value are never stored.
    #[serde(
        default,
        deserialize_with = "deserialize_params",
        skip_serializing_if = "is_absent"
    )]
    pub params: Mapping,
    /// Failure classification, overriding the project default.
    #[serde(rename = "type", default, skip_serializing_if = "is_absent")]
    pub command_type: Option<CommandType>,
    /// Parameters given as an inline YAML document instead of a mapping.
    #[serde(default, skip_serializing_if = "is_absent")]
    pub params_yaml: Option<String>,
}

impl BuiltInCommand {
    /// Creates an invocation of `operation` with no parameters.
    pub fn new(operation: Operation) -> Self {
        Self {
            command: operation,
            params: Mapping::new(),
            command_type: None,
            params_yaml: None,
        }
    }

    /// Sets one parameter. A null value removes the parameter instead.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = Value::String(key.into());
        let value = value.into();
        if value.is_null() {
            self.params = std::mem::take(&mut self.params)
                .into_iter()
                .filter(|(existing, _)| *existing != key)
                .collect();
        } else {
            self.params.insert(key, value);
        }
        self
    }

    /// Sets the failure classification.
    pub fn with_type(mut self, command_type: CommandType) -> Self {
        self.command_type = Some(command_type);
        self
    }
}

fn strip_nulls(params: Mapping) -> Mapping {
    params
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .collect()
}

fn deserialize_params<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Mapping, D::Error> {
    let params: Option<Mapping> = Option::deserialize(deserializer)?;
    Ok(params.map(strip_nulls).unwrap_or_default())
}

// --- Typed built-ins ---

/// A typed parameter set for one built-in operation.
///
/// Implementors serialize to the operation's flat parameter mapping; optional parameters
/// that are unset are skipped by their `skip_serializing_if`, and any remaining nulls are
/// stripped when the command is produced.
pub trait BuiltIn: Serialize {
    /// The operation these parameters belong to.
    fn operation(&self) -> Operation;

    /// Checks the cross-field preconditions of the operation.
    fn validate(&self) -> Result<(), CommandError> {
        Ok(())
    }

    /// Encodes the parameters as a mapping, without null entries.
    fn params(&self) -> Result<Mapping, CommandError> {
        match serde_yaml::to_value(self)? {
            Value::Mapping(map) => Ok(strip_nulls(map)),
            Value::Null => Ok(Mapping::new()),
            other => Err(CommandError::InvalidParams {
                operation: self.operation(),
                reason: format!("parameters must encode to a mapping, got {:?}", other),
            }),
        }
    }

    /// Validates the parameters and produces the command.
    fn command(&self) -> Result<Command, CommandError> {
        self.validate()?;
        Ok(Command::BuiltIn(BuiltInCommand {
            command: self.operation(),
            params: self.params()?,
            command_type: None,
            params_yaml: None,
        }))
    }

    /// Like [`BuiltIn::command`], with an explicit failure classification.
    fn command_with_type(&self, command_type: CommandType) -> Result<Command, CommandError> {
        let mut command = self.command()?;
        if let Command::BuiltIn(builtin) = &mut command {
            builtin.command_type = Some(command_type);
        }
        Ok(command)
    }
}
