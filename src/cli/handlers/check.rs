// src/cli/handlers/check.rs

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;

use crate::{
    cli::{args::CheckArgs, handlers::commons},
    models::Project,
};

/// The main handler for the `check` command.
/// Loads and validates a project file, then prints what it contains.
pub fn handle(args: Vec<String>) -> Result<()> {
    let check_args = CheckArgs::try_parse_from(&args)?;
    let project = commons::load_project(&check_args.file)?;
    project
        .validate()
        .with_context(|| format!("'{}' is not valid", check_args.file.display()))?;

    println!("\n{} {}", "OK".green().bold(), check_args.file.display());
    for (label, count) in summarize(&project) {
        println!("  {:<18} {}", format!("{}:", label).blue(), count);
    }
    Ok(())
}

/// Entity counts shown after a successful check.
pub fn summarize(project: &Project) -> Vec<(&'static str, usize)> {
    let commands = project.tasks.iter().map(|t| t.commands.len()).sum();
    vec![
        ("Build variants", project.buildvariants.len()),
        ("Tasks", project.tasks.len()),
        ("Task groups", project.task_groups.len()),
        ("Functions", project.functions.len()),
        ("Task commands", commands),
        ("Modules", project.modules.len()),
    ]
}
