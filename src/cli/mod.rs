// src/cli/mod.rs

use clap::Parser;

pub mod args;
pub mod handlers;

/// shrub: build, check and canonically re-render CI project configuration files.
///
/// Usage:
///   - `shrub render <FILE> [--format yaml|json] [--indent N] [--flow-tag-count N]`
///   - `shrub check <FILE>`
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// The action to run (`render`, `check`, or one of their aliases).
    pub action: Option<String>,

    /// Everything after the action, handed unparsed to the action's handler.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_and_trailing_args_are_split() {
        let cli = Cli::try_parse_from(["shrub", "render", "project.yml", "--format", "json"]).unwrap();
        assert_eq!(cli.action.as_deref(), Some("render"));
        assert_eq!(cli.args, vec!["project.yml", "--format", "json"]);
    }

    #[test]
    fn test_no_action() {
        let cli = Cli::try_parse_from(["shrub"]).unwrap();
        assert!(cli.action.is_none());
        assert!(cli.args.is_empty());
    }
}
