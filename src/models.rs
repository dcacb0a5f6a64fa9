// src/models.rs

//! # Project Model
//!
//! The typed entity graph of a CI configuration: a [`Project`] owning its tasks, task
//! groups, build variants and functions. Each entity's `Serialize` derive is its field
//! table; field order here is the key order of the rendered document.
//!
//! Optional fields are skipped through the shared presence predicate, so an unset field
//! never renders as `null` while an explicit `false` always renders. Collections that are
//! logically sets (dependencies, variant task references, display tasks) are emitted in
//! canonical order.

use crate::commands::{Command, CommandError, CommandType};
use crate::core::canonical::{CanonicalKey, canonical_cmp_all, serialize_canonical};
use crate::core::loader::{self, LoadError};
use crate::core::presence::{Presence, is_absent, null_as_default, scalars_as_strings};
use indexmap::IndexMap;
use log::debug;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Errors raised by [`Project::validate`] and [`Project::from_file`].
#[derive(Error, Debug)]
pub enum ModelError {
    /// Two entities of the same kind share a name.
    #[error("Duplicate {kind} name '{name}'")]
    DuplicateName {
        /// `task`, `task group` or `build variant`.
        kind: &'static str,
        /// The repeated name.
        name: String,
    },
    /// A built-in command inside the project has invalid parameters.
    #[error("Invalid command in {location}: {source}")]
    InvalidCommand {
        /// Where the command sits, e.g. `task 'compile' command 2`.
        location: String,
        /// The underlying validation failure.
        #[source]
        source: CommandError,
    },
    /// The project document could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),
}

// --- Shared value types ---

/// The distros a task runs on: one name or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunOn {
    /// A single distro.
    Single(String),
    /// Several distros, in preference order.
    Many(Vec<String>),
}

impl Presence for RunOn {
    fn is_absent(&self) -> bool {
        matches!(self, RunOn::Many(distros) if distros.is_empty())
    }
}

impl From<&str> for RunOn {
    fn from(distro: &str) -> Self {
        RunOn::Single(distro.to_string())
    }
}

impl From<Vec<String>> for RunOn {
    fn from(distros: Vec<String>) -> Self {
        RunOn::Many(distros)
    }
}

/// The body of a function: one command or a list of commands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FunctionDefinition {
    /// Several commands run in order.
    Many(Vec<Command>),
    /// A single command.
    Single(Command),
}

impl FunctionDefinition {
    /// The commands of the body, in order.
    pub fn commands(&self) -> &[Command] {
        match self {
            FunctionDefinition::Many(commands) => commands,
            FunctionDefinition::Single(command) => std::slice::from_ref(command),
        }
    }
}

// Decoded by shape: a bad command inside a body reports its own error and position.
impl<'de> Deserialize<'de> for FunctionDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Sequence(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    Command::deserialize(item)
                        .map_err(|err| de::Error::custom(format!("command {}: {}", index, err)))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(FunctionDefinition::Many),
            value @ Value::Mapping(_) => Command::deserialize(value)
                .map(FunctionDefinition::Single)
                .map_err(de::Error::custom),
            _ => Err(de::Error::custom(
                "a function body must be a command or a list of commands",
            )),
        }
    }
}

impl From<Command> for FunctionDefinition {
    fn from(command: Command) -> Self {
        FunctionDefinition::Single(command)
    }
}

impl From<Vec<Command>> for FunctionDefinition {
    fn from(commands: Vec<Command>) -> Self {
        FunctionDefinition::Many(commands)
    }
}

// --- Tasks ---

/// A task that must succeed before the owning task runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDependency {
    /// Name of the task depended on.
    pub name: String,
    /// Variant the dependency runs on; the dependent's own variant when unset.
    #[serde(default, skip_serializing_if = "is_absent")]
    pub variant: Option<String>,
}

impl TaskDependency {
    /// Depends on `name` in the same variant.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variant: None,
        }
    }

    /// Depends on `name` as it runs in `variant`.
    pub fn on_variant(name: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variant: Some(variant.into()),
        }
    }
}

impl CanonicalKey for TaskDependency {
    fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.variant.cmp(&other.variant))
    }
}

/// A reference from a build variant to a task or task group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub name: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub distros: Vec<String>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub activate: Option<bool>,
}

impl TaskRef {
    /// Refers to `name` with no distro override.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl CanonicalKey for TaskRef {
    fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.distros.cmp(&other.distros))
            .then_with(|| self.activate.cmp(&other.activate))
    }
}

/// A named unit of work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub commands: Vec<Command>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        serialize_with = "serialize_canonical",
        skip_serializing_if = "is_absent"
    )]
    pub depends_on: Vec<TaskDependency>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub exec_timeout_secs: Option<u64>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub patchable: Option<bool>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub stepback: Option<bool>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub run_on: Option<RunOn>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub disable: Option<bool>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub batchtime: Option<u64>,
}

impl Task {
    /// Creates an empty task called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a command.
    pub fn command(mut self, command: impl Into<Command>) -> Self {
        self.commands.push(command.into());
        self
    }

    /// Adds a dependency.
    pub fn depends_on(mut self, dependency: TaskDependency) -> Self {
        self.depends_on.push(dependency);
        self
    }

    /// Adds a tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// A reference to this task for a build variant.
    pub fn task_ref(&self, distros: Vec<String>) -> TaskRef {
        TaskRef {
            name: self.name.clone(),
            distros,
            activate: None,
        }
    }
}

// --- Task groups ---

/// Tasks that share hosts and host-lifecycle commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskGroup {
    pub name: String,
    /// Member task names, in the order they run on a host.
    #[serde(deserialize_with = "null_as_default")]
    pub tasks: Vec<String>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub max_hosts: Option<i64>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub share_processes: Option<bool>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub setup_group_can_fail_task: Option<bool>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub setup_group_timeout_secs: Option<u64>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub setup_group: Vec<Command>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub teardown_group_timeout_secs: Option<u64>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub teardown_group: Vec<Command>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub setup_task_can_fail_task: Option<bool>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub setup_task_timeout_secs: Option<u64>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub setup_task: Vec<Command>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub teardown_task_can_fail_task: Option<bool>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub teardown_task_timeout_secs: Option<u64>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub teardown_task: Vec<Command>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub timeout: Vec<Command>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub tags: Vec<String>,
}

impl TaskGroup {
    /// Groups `tasks` under `name`.
    pub fn new(name: impl Into<String>, tasks: Vec<String>) -> Self {
        Self {
            name: name.into(),
            tasks,
            ..Self::default()
        }
    }

    /// A reference to this group for a build variant.
    pub fn task_ref(&self, distros: Vec<String>) -> TaskRef {
        TaskRef {
            name: self.name.clone(),
            distros,
            activate: None,
        }
    }
}

// --- Build variants ---

/// A presentation-only grouping of execution tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayTask {
    pub name: String,
    #[serde(
        deserialize_with = "null_as_default",
        serialize_with = "serialize_canonical"
    )]
    pub execution_tasks: Vec<String>,
}

impl DisplayTask {
    /// Groups `execution_tasks` under `name`.
    pub fn new(name: impl Into<String>, execution_tasks: Vec<String>) -> Self {
        Self {
            name: name.into(),
            execution_tasks,
        }
    }
}

impl CanonicalKey for DisplayTask {
    fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| canonical_cmp_all(&self.execution_tasks, &other.execution_tasks))
    }
}

/// A named execution environment and the tasks that run in it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildVariant {
    pub name: String,
    #[serde(
        deserialize_with = "null_as_default",
        serialize_with = "serialize_canonical"
    )]
    pub tasks: Vec<TaskRef>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub display_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub run_on: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        serialize_with = "serialize_canonical",
        skip_serializing_if = "is_absent"
    )]
    pub display_tasks: Vec<DisplayTask>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub batchtime: Option<u64>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub cron: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalars_as_strings",
        skip_serializing_if = "is_absent"
    )]
    pub expansions: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub stepback: Option<bool>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub modules: Vec<String>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub activate: Option<bool>,
}

impl BuildVariant {
    /// Creates a variant with no tasks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the name shown in the CI service's UI.
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Adds a task or task-group reference.
    pub fn task(mut self, task: TaskRef) -> Self {
        self.tasks.push(task);
        self
    }

    /// Adds a display task.
    pub fn display_task(mut self, display_task: DisplayTask) -> Self {
        self.display_tasks.push(display_task);
        self
    }

    /// Sets one expansion.
    pub fn expansion(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.expansions.insert(key.into(), value.into());
        self
    }
}

// --- Project-level declarations ---

/// A repository checked out next to the project by `git.get_project`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub repo: String,
    pub branch: String,
    pub prefix: String,
}

impl Module {
    /// The repository name in `repo`, without owner, host or `.git` suffix.
    ///
    /// Accepts scp-style (`git@github.com:org/name.git`), URL and local path forms.
    pub fn repository_name(&self) -> &str {
        let trimmed = self.repo.trim_end_matches('/');
        let last = trimmed
            .rsplit(['/', ':'])
            .next()
            .unwrap_or(trimmed);
        last.strip_suffix(".git").unwrap_or(last)
    }
}

/// A value users may override when starting a patch build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub key: String,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub value: Option<String>,
    pub description: String,
}

// --- Project ---

/// The root of a configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub buildvariants: Vec<BuildVariant>,
    pub tasks: Vec<Task>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub functions: IndexMap<String, FunctionDefinition>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub task_groups: Vec<TaskGroup>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub pre: Vec<Command>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub post: Vec<Command>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub timeout: Vec<Command>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub modules: Vec<Module>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub stepback: Option<bool>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub pre_error_fails_task: Option<bool>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub oom_tracker: Option<bool>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub exec_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub batchtime: Option<u64>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub command_type: Option<CommandType>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub ignore: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_absent"
    )]
    pub parameters: Vec<Parameter>,
}

impl Project {
    /// Creates a project with no tasks or variants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task.
    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Adds a task group.
    pub fn task_group(mut self, group: TaskGroup) -> Self {
        self.task_groups.push(group);
        self
    }

    /// Adds a build variant.
    pub fn variant(mut self, variant: BuildVariant) -> Self {
        self.buildvariants.push(variant);
        self
    }

    /// Declares a function. Redeclaring a name replaces the earlier body.
    pub fn function(mut self, name: impl Into<String>, body: impl Into<FunctionDefinition>) -> Self {
        self.functions.insert(name.into(), body.into());
        self
    }

    /// Reads and parses the project document at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        Ok(loader::load_project(path.as_ref())?)
    }

    /// Checks name uniqueness and the parameters of every built-in command.
    ///
    /// References between entities (task names in variants, function names in calls) are
    /// not checked.
    pub fn validate(&self) -> Result<(), ModelError> {
        ensure_unique("task", self.tasks.iter().map(|t| t.name.as_str()))?;
        ensure_unique("task group", self.task_groups.iter().map(|g| g.name.as_str()))?;
        ensure_unique("build variant", self.buildvariants.iter().map(|v| v.name.as_str()))?;

        for (scope, commands) in self.command_lists() {
            for (index, command) in commands.iter().enumerate() {
                command.validate().map_err(|source| ModelError::InvalidCommand {
                    location: format!("{} command {}", scope, index),
                    source,
                })?;
            }
        }

        debug!(
            "Validated project: {} tasks, {} task groups, {} variants, {} functions",
            self.tasks.len(),
            self.task_groups.len(),
            self.buildvariants.len(),
            self.functions.len()
        );
        Ok(())
    }

    /// Every command list in the project, labelled with where it lives.
    fn command_lists(&self) -> Vec<(String, &[Command])> {
        let mut lists: Vec<(String, &[Command])> = vec![
            ("pre".to_string(), self.pre.as_slice()),
            ("post".to_string(), self.post.as_slice()),
            ("timeout".to_string(), self.timeout.as_slice()),
        ];
        for (name, body) in &self.functions {
            lists.push((format!("function '{}'", name), body.commands()));
        }
        for task in &self.tasks {
            lists.push((format!("task '{}'", task.name), task.commands.as_slice()));
        }
        for group in &self.task_groups {
            for (phase, commands) in [
                ("setup_group", &group.setup_group),
                ("teardown_group", &group.teardown_group),
                ("setup_task", &group.setup_task),
                ("teardown_task", &group.teardown_task),
                ("timeout", &group.timeout),
            ] {
                lists.push((
                    format!("task group '{}' {}", group.name, phase),
                    commands.as_slice(),
                ));
            }
        }
        lists
    }
}

fn ensure_unique<'a>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), ModelError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ModelError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

crate::always_present!(FunctionDefinition, Module, Parameter);
