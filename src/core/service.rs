// src/core/service.rs

//! # Shrub Service
//!
//! The render entry point. Any serializable model (a whole [`Project`](crate::models::Project)
//! or a single entity) is serialized to a generic tree, annotated by the
//! [`Formatter`], and written by the [`Emitter`]. JSON output skips the formatter, since
//! JSON has no layout choices worth preserving.

use super::emitter::Emitter;
use super::formatter::{FormatOptions, Formatter};
use log::debug;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while rendering a model to text.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The model could not be converted to a YAML tree.
    #[error("Failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// The model could not be converted to JSON.
    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Renders models to YAML or JSON.
#[derive(Debug)]
pub struct ShrubService {
    options: FormatOptions,
    formatter: Formatter,
    emitter: Emitter,
}

impl Default for ShrubService {
    fn default() -> Self {
        Self::with_options(FormatOptions::default())
    }
}

impl ShrubService {
    /// A service with the default formatting rules and options.
    pub fn new() -> Self {
        Self::default()
    }

    /// A service with the default rules configured by `options`.
    pub fn with_options(options: FormatOptions) -> Self {
        Self::with_formatter(options, Formatter::new(&options))
    }

    /// A service with a caller-assembled rule set.
    pub fn with_formatter(options: FormatOptions, formatter: Formatter) -> Self {
        Self {
            options,
            formatter,
            emitter: Emitter::new(options.indent),
        }
    }

    /// The options the service was built with.
    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    /// Renders `model` as a YAML document.
    pub fn generate_yaml<T: Serialize>(&self, model: &T) -> Result<String, RenderError> {
        let tree = serde_yaml::to_value(model)?;
        let styled = self.formatter.annotate(&tree);
        let text = self.emitter.emit(&styled);
        debug!("Rendered YAML document ({} bytes)", text.len());
        Ok(text)
    }

    /// Renders `model` as compact JSON.
    pub fn generate_json<T: Serialize>(&self, model: &T) -> Result<String, RenderError> {
        let text = serde_json::to_string(model)?;
        debug!("Rendered JSON document ({} bytes)", text.len());
        Ok(text)
    }

    /// Renders `model` as indented JSON.
    pub fn generate_json_pretty<T: Serialize>(&self, model: &T) -> Result<String, RenderError> {
        let text = serde_json::to_string_pretty(model)?;
        debug!("Rendered pretty JSON document ({} bytes)", text.len());
        Ok(text)
    }
}
