// src/cli/handlers/render.rs

use anyhow::Result;
use clap::Parser;

use crate::{
    cli::{
        args::{OutputFormat, RenderArgs},
        handlers::commons,
    },
    core::service::ShrubService,
};

/// The main handler for the `render` command.
/// Prints the project file in canonical form on stdout.
pub fn handle(args: Vec<String>) -> Result<()> {
    let render_args = RenderArgs::try_parse_from(&args)?;
    print!("{}", render(&render_args)?);
    Ok(())
}

/// Loads the file named by `args` and renders it with the requested format and options.
pub fn render(args: &RenderArgs) -> Result<String> {
    let project = commons::load_project(&args.file)?;
    let service = ShrubService::with_options(args.format_options());

    let text = match args.format {
        OutputFormat::Yaml => service.generate_yaml(&project)?,
        OutputFormat::Json if args.pretty => service.generate_json_pretty(&project)? + "\n",
        OutputFormat::Json => service.generate_json(&project)? + "\n",
    };
    Ok(text)
}
