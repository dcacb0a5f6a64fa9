// src/lib.rs

//! # shrub
//!
//! A typed model of a CI project configuration (tasks, task groups, build variants,
//! functions and built-in commands) that renders to a stable, human-friendly YAML or JSON
//! document and reads such documents back.
//!
//! ```no_run
//! use shrub::core::service::ShrubService;
//! use shrub::models::{BuildVariant, Project, Task, TaskDependency};
//!
//! let compile = Task::new("compile");
//! let test = Task::new("test").depends_on(TaskDependency::new("compile"));
//! let variant = BuildVariant::new("linux-64")
//!     .task(compile.task_ref(Vec::new()))
//!     .task(test.task_ref(Vec::new()));
//! let project = Project::new().task(compile).task(test).variant(variant);
//!
//! let yaml = ShrubService::new().generate_yaml(&project)?;
//! # Ok::<(), shrub::core::service::RenderError>(())
//! ```

pub mod cli;
pub mod commands;
pub mod constants;
pub mod core;
pub mod models;
