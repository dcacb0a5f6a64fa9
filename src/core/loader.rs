// src/core/loader.rs

//! # Project Loader
//!
//! The read path: document text (from a file or a string) is decoded and rebuilt into a
//! typed [`Project`]. Three failure modes are kept apart so callers can tell a missing file
//! from malformed text and from well-formed text that does not fit the schema.
//!
//! Unknown keys are ignored, so documents carrying fields this model does not know about
//! still load. Collections written as `null` load as empty.

use crate::constants::JSON_EXTENSION;
use crate::models::Project;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a project document.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The document could not be read from storage.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// The path that was being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The text is not a well-formed document.
    #[error("Failed to decode document: {0}")]
    Decode(String),
    /// The document is well formed but does not describe a valid project. The message
    /// names the offending field and where it sits.
    #[error("Document does not match the project schema: {0}")]
    Schema(String),
}

/// Reads the project at `path`. Files ending in `.json` are read as JSON, anything else as
/// YAML.
pub fn load_project(path: &Path) -> Result<Project, LoadError> {
    debug!("Loading project from {:?}", path);
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(JSON_EXTENSION));

    if is_json {
        parse_project_json(&text)
    } else {
        parse_project_yaml(&text)
    }
}

/// Parses a project from YAML text.
pub fn parse_project_yaml(text: &str) -> Result<Project, LoadError> {
    match serde_yaml::from_str::<Project>(text) {
        Ok(project) => {
            log_loaded(&project);
            Ok(project)
        }
        // Decoding into the generic tree tells syntax errors from schema mismatches.
        Err(err) => match serde_yaml::from_str::<serde_yaml::Value>(text) {
            Ok(_) => Err(LoadError::Schema(err.to_string())),
            Err(_) => Err(LoadError::Decode(err.to_string())),
        },
    }
}

/// Parses a project from JSON text.
pub fn parse_project_json(text: &str) -> Result<Project, LoadError> {
    match serde_json::from_str::<Project>(text) {
        Ok(project) => {
            log_loaded(&project);
            Ok(project)
        }
        Err(err) if err.is_syntax() || err.is_eof() => Err(LoadError::Decode(err.to_string())),
        Err(err) => Err(LoadError::Schema(
            path_qualified_schema_error(text).unwrap_or_else(|| err.to_string()),
        )),
    }
}

/// serde_json reports only a line and column. JSON text is also valid YAML, and the YAML
/// reader names the entity path of a schema error, so a failed JSON decode is re-read
/// through it to recover that path.
fn path_qualified_schema_error(text: &str) -> Option<String> {
    serde_yaml::from_str::<Project>(text)
        .err()
        .map(|err| err.to_string())
}

fn log_loaded(project: &Project) {
    debug!(
        "Loaded project: {} tasks, {} task groups, {} variants",
        project.tasks.len(),
        project.task_groups.len(),
        project.buildvariants.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Command, Operation};
    use crate::core::service::ShrubService;
    use crate::commands::BuiltIn;
    use crate::commands::CommandType;
    use crate::commands::builtins::{GitGetProject, S3Put, ShellExec, SubprocessExec};
    use crate::models::{BuildVariant, DisplayTask, Task, TaskDependency, TaskGroup, TaskRef};
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parses_minimal_project() {
        let project = parse_project_yaml("buildvariants: []\ntasks:\n  - name: compile\n").unwrap();
        assert_eq!(project.tasks.len(), 1);
        assert_eq!(project.tasks[0].name, "compile");
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let project = parse_project_yaml(
            "buildvariants: []\ntasks:\n  - name: t\n    allowed_requesters: [patch]\nloggers: {}\n",
        )
        .unwrap();
        assert_eq!(project.tasks[0].name, "t");
    }

    #[test]
    fn test_null_collections_load_as_empty() {
        let project =
            parse_project_yaml("buildvariants: []\ntasks:\n  - name: t\n    depends_on:\n    commands:\n")
                .unwrap();
        assert!(project.tasks[0].depends_on.is_empty());
        assert!(project.tasks[0].commands.is_empty());
    }

    #[test]
    fn test_missing_required_field_names_the_path() {
        let err = parse_project_yaml("buildvariants: []\ntasks:\n  - name: a\n  - commands: []\n")
            .unwrap_err();
        match err {
            LoadError::Schema(message) => {
                assert!(message.contains("tasks[1]"), "message: {}", message);
                assert!(message.contains("missing field `name`"), "message: {}", message);
            }
            other => panic!("expected a schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_top_level_field_is_schema_error() {
        let err = parse_project_yaml("tasks: []\n").unwrap_err();
        assert!(matches!(err, LoadError::Schema(ref m) if m.contains("buildvariants")));
    }

    #[test]
    fn test_wrong_shape_is_schema_error() {
        let err = parse_project_yaml("buildvariants: []\ntasks:\n  - name: t\n    exec_timeout_secs: soon\n")
            .unwrap_err();
        assert!(matches!(err, LoadError::Schema(_)));
    }

    #[test]
    fn test_unknown_operation_is_schema_error() {
        let err = parse_project_yaml(
            "buildvariants: []\ntasks:\n  - name: t\n    commands:\n      - command: shell.run\n",
        )
        .unwrap_err();
        match err {
            LoadError::Schema(message) => assert!(message.contains("shell.run")),
            other => panic!("expected a schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_json_schema_error_names_the_path() {
        let err = parse_project_json(r#"{"buildvariants": [], "tasks": [{"name": "a"}, {"commands": []}]}"#)
            .unwrap_err();
        match err {
            LoadError::Schema(message) => {
                assert!(message.contains("tasks[1]"), "message: {}", message);
                assert!(message.contains("missing field `name`"), "message: {}", message);
            }
            other => panic!("expected a schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_function_body_names_the_command() {
        let err = parse_project_yaml(
            "buildvariants: []\ntasks: []\nfunctions:\n  setup:\n    - func: ok\n    - params: {}\n",
        )
        .unwrap_err();
        match err {
            LoadError::Schema(message) => {
                assert!(message.contains("functions.setup"), "message: {}", message);
                assert!(message.contains("command 1"), "message: {}", message);
                assert!(message.contains("`func` or a `command` key"), "message: {}", message);
            }
            other => panic!("expected a schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_function_bodies_load_in_both_shapes() {
        let project = parse_project_yaml(
            "buildvariants: []\ntasks: []\nfunctions:\n  one:\n    func: inner\n  many:\n    - func: a\n    - command: shell.exec\n      params:\n        script: make\n",
        )
        .unwrap();
        assert_eq!(project.functions["one"].commands().len(), 1);
        assert_eq!(project.functions["many"].commands().len(), 2);
        assert!(project.validate().is_ok());
    }

    #[test]
    fn test_env_with_non_string_scalars_validates() {
        let project = parse_project_yaml(
            "buildvariants: []\ntasks:\n  - name: t\n    commands:\n      - command: shell.exec\n        params:\n          script: make\n          env:\n            fizz: true\n            buzz: 1\n",
        )
        .unwrap();
        assert!(project.validate().is_ok());
    }

    #[test]
    fn test_negative_max_hosts_loads() {
        let project = parse_project_yaml(
            "buildvariants: []\ntasks: []\ntask_groups:\n  - name: g\n    tasks: [a]\n    max_hosts: -1\n",
        )
        .unwrap();
        assert_eq!(project.task_groups[0].max_hosts, Some(-1));
    }

    #[test]
    fn test_malformed_text_is_decode_error() {
        let err = parse_project_yaml("tasks: [unclosed\n").unwrap_err();
        assert!(matches!(err, LoadError::Decode(_)));

        let err = parse_project_json("{\"tasks\": [").unwrap_err();
        assert!(matches!(err, LoadError::Decode(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_project(Path::new("/definitely/not/here.yml")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_load_from_yaml_and_json_files() {
        // --- Setup ---
        let mut yaml_file = NamedTempFile::with_suffix(".yml").unwrap();
        write!(yaml_file, "buildvariants: []\ntasks:\n  - name: from-yaml\n").unwrap();
        let mut json_file = NamedTempFile::with_suffix(".json").unwrap();
        write!(json_file, "{{\"buildvariants\": [], \"tasks\": [{{\"name\": \"from-json\"}}]}}").unwrap();

        // --- Execute ---
        let from_yaml = load_project(yaml_file.path()).unwrap();
        let from_json = load_project(json_file.path()).unwrap();

        // --- Assert ---
        assert_eq!(from_yaml.tasks[0].name, "from-yaml");
        assert_eq!(from_json.tasks[0].name, "from-json");
    }

    #[test]
    fn test_commands_are_read_back_typed() {
        let project = parse_project_yaml(include_str!("../../tests/data/lint.yml")).unwrap();
        let group = &project.task_groups[0];
        assert_eq!(group.max_hosts, Some(5));
        match &group.setup_group[0] {
            Command::BuiltIn(builtin) => assert_eq!(builtin.command, Operation::GitGetProject),
            other => panic!("expected git.get_project, got {:?}", other),
        }
        assert!(project.validate().is_ok());
    }

    /// Builds a project of realistic size with every set-backed collection populated.
    fn large_project(n_tasks: usize, n_variants: usize) -> crate::models::Project {
        let tasks: Vec<Task> = (0..n_tasks)
            .map(|i| {
                let mut task = Task::new(format!("task_{:04}", i))
                    .command(Command::func("do setup"))
                    .command(ShellExec::new(format!("echo {}\nmake check\n", i)).command().unwrap())
                    .command(
                        crate::commands::FunctionCall::new("run tests")
                            .var("suite", format!("suite_{}", i % 7))
                            .var("timeout_secs", "1800"),
                    );
                if i > 0 {
                    task = task.depends_on(TaskDependency::new(format!("task_{:04}", i - 1)));
                }
                if i % 3 == 0 {
                    task = task.depends_on(TaskDependency::on_variant("compile", "linux"));
                }
                task.tag(format!("group_{}", i % 5))
            })
            .collect();

        let variants: Vec<BuildVariant> = (0..n_variants)
            .map(|v| {
                let members: Vec<String> = tasks
                    .iter()
                    .skip(v)
                    .step_by(n_variants)
                    .map(|t| t.name.clone())
                    .collect();
                let mut variant = BuildVariant::new(format!("variant_{:02}", v))
                    .display_name(format!("Variant {}", v))
                    .expansion("platform", format!("p{}", v));
                for name in members.iter().rev() {
                    variant = variant.task(TaskRef::new(name.clone()));
                }
                variant.display_task(DisplayTask::new(format!("all_{:02}", v), members))
            })
            .collect();

        let groups: Vec<TaskGroup> = (0..n_variants)
            .map(|g| {
                let members = (0..3).map(|k| format!("task_{:04}", g * 3 + k)).collect();
                TaskGroup {
                    max_hosts: Some(if g % 2 == 0 { -1 } else { 2 }),
                    setup_group: vec![
                        GitGetProject::new("src").command_with_type(CommandType::System).unwrap(),
                        Command::func("fetch artifacts"),
                    ],
                    teardown_task: vec![ShellExec::new("rm -rf build\n").command().unwrap()],
                    ..TaskGroup::new(format!("group_{:02}", g), members)
                }
            })
            .collect();

        let project = tasks.into_iter().fold(crate::models::Project::new(), |p, t| p.task(t));
        let project = groups.into_iter().fold(project, |p, g| p.task_group(g));
        variants
            .into_iter()
            .fold(project, |p, v| p.variant(v))
            .function("do setup", ShellExec::new("set -o errexit\n  ./setup.sh\n\n").command().unwrap())
            .function(
                "run tests",
                vec![
                    S3Put::new("logs/${task_id}.tgz", "ci-logs", "private", "application/x-gzip")
                        .credentials("${aws_key}", "${aws_secret}")
                        .local_file("logs.tgz")
                        .command()
                        .unwrap(),
                    SubprocessExec::binary("resmoke", vec!["--suites=${suite}".into()])
                        .command()
                        .unwrap(),
                    Command::func("report"),
                ],
            )
    }

    #[test]
    fn test_round_trip_on_large_corpus() {
        // --- Setup ---
        let service = ShrubService::new();
        let project = large_project(300, 20);

        // --- Execute ---
        let first = service.generate_yaml(&project).unwrap();
        let reparsed = parse_project_yaml(&first).unwrap();
        let second = service.generate_yaml(&reparsed).unwrap();

        // --- Assert ---
        let first_tree: serde_yaml::Value = serde_yaml::from_str(&first).unwrap();
        let second_tree: serde_yaml::Value = serde_yaml::from_str(&second).unwrap();
        assert_eq!(first_tree, second_tree);
        assert_eq!(first, second);
        assert_eq!(reparsed.tasks.len(), 300);
        assert_eq!(reparsed.buildvariants.len(), 20);
        assert_eq!(reparsed.task_groups.len(), 20);
        assert_eq!(reparsed.functions.len(), 2);
        assert!(first.contains("script: |\n"));
        assert!(first.contains("script: |+\n"));
        assert!(reparsed.validate().is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let service = ShrubService::new();
        let project = large_project(40, 4);
        let json = service.generate_json(&project).unwrap();
        let reparsed = parse_project_json(&json).unwrap();
        assert_eq!(service.generate_json(&reparsed).unwrap(), json);
    }
}
