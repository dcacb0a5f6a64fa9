// src/bin/shrub.rs

use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;
use shrub::cli::{Cli, handlers};

// --- Command Definition and Registry ---

/// A CLI action, its aliases, and the handler that receives the remaining arguments.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>) -> Result<()>,
}

/// Every action the binary understands.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "check",
        aliases: &["validate"],
        handler: handlers::check::handle,
    },
    CommandDefinition {
        name: "render",
        aliases: &["fmt"],
        handler: handlers::render::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()) {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Routes the parsed arguments to the matching handler.
fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let Some(action) = cli.action else {
        let names: Vec<&str> = COMMAND_REGISTRY.iter().map(|cmd| cmd.name).collect();
        println!("Usage: shrub <{}> <FILE> [options]", names.join("|"));
        return Ok(());
    };

    match find_command(&action) {
        Some(command) => (command.handler)(cli.args),
        None => Err(anyhow!(
            "Unknown action '{}'. Available actions: {}",
            action,
            COMMAND_REGISTRY
                .iter()
                .map(|cmd| cmd.name)
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}
