// src/cli/handlers/commons.rs

// Shared by the handlers that read a project file.

use anyhow::{Context, Result};
use std::path::Path;

use crate::{core::loader, models::Project};

/// Loads the project at `path`, naming the file in any error.
pub fn load_project(path: &Path) -> Result<Project> {
    log::debug!("Handler loading {:?}", path);
    loader::load_project(path)
        .with_context(|| format!("Could not load project file '{}'", path.display()))
}
