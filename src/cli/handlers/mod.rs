// src/cli/handlers/mod.rs

// One module per CLI action.

pub mod check;
pub mod commons;
pub mod render;
