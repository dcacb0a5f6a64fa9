// src/constants.rs

/// Spaces per nesting level in rendered YAML.
pub const DEFAULT_INDENT: usize = 2;

/// Smallest indentation the emitter accepts; block sequence items need room for `- `.
pub const MIN_INDENT: usize = 2;

/// Largest indentation the emitter accepts.
pub const MAX_INDENT: usize = 9;

/// A `tags` list with at most this many entries is rendered on one line.
pub const FLOW_TAG_COUNT: usize = 3;

/// File extension that selects the JSON reader instead of the YAML reader.
pub const JSON_EXTENSION: &str = "json";
