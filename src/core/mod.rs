// src/core/mod.rs

pub mod canonical;
pub mod emitter;
pub mod formatter;
pub mod loader;
pub mod presence;
pub mod scalar;
pub mod service;
