// src/core/emitter.rs

//! # YAML Emitter
//!
//! Writes a styled [`Node`] tree as YAML text. The emitter knows nothing about the domain:
//! every layout decision comes from the hints attached by the formatter, plus the few
//! constraints YAML itself imposes (nothing inside a flow collection can be block styled,
//! and literal blocks need an explicit indentation indicator when their first line starts
//! with a space).
//!
//! Layout:
//! * block sequences are indented one level under their parent key;
//! * the first key of a mapping inside a sequence shares the `- ` line;
//! * flow mappings carry a space inside each brace, `{ key: value }`;
//! * empty collections are written `[]` and `{}`;
//! * lines are never wrapped and no document markers are written.

use super::formatter::{CollectionStyle, Node, ScalarStyle};
use super::scalar::{self, Chomping};
use crate::constants::{DEFAULT_INDENT, MAX_INDENT, MIN_INDENT};

/// Width of the `- ` sequence entry indicator.
const SEQ_INDICATOR_WIDTH: usize = 2;

/// Hint-driven YAML writer.
#[derive(Debug, Clone, Copy)]
pub struct Emitter {
    indent: usize,
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new(DEFAULT_INDENT)
    }
}

impl Emitter {
    /// Creates an emitter; `indent` is clamped to the supported range.
    pub fn new(indent: usize) -> Self {
        Self {
            indent: indent.clamp(MIN_INDENT, MAX_INDENT),
        }
    }

    /// Writes `root` as a complete document ending with a newline.
    pub fn emit(&self, root: &Node) -> String {
        let mut out = String::new();
        match root {
            Node::Map { entries, style: CollectionStyle::Block } if !entries.is_empty() => {
                self.block_map(&mut out, entries, 0, false);
            }
            Node::Seq { items, style: CollectionStyle::Block } if !items.is_empty() => {
                self.block_seq(&mut out, items, 0, false);
            }
            other => {
                out.push_str(&self.inline(other, false));
                out.push('\n');
            }
        }
        out
    }

    // --- Block layout ---

    /// Writes mapping entries with keys at column `indent`. With `first_inline`, the first
    /// key continues the current line (after `- `).
    fn block_map(&self, out: &mut String, entries: &[(Node, Node)], indent: usize, first_inline: bool) {
        for (position, (key, value)) in entries.iter().enumerate() {
            if position > 0 || !first_inline {
                push_indent(out, indent);
            }
            out.push_str(&self.inline(key, false));
            out.push(':');
            self.value_after_key(out, value, indent);
        }
    }

    /// Writes sequence items with their `-` at column `indent`.
    fn block_seq(&self, out: &mut String, items: &[Node], indent: usize, first_inline: bool) {
        let content = indent + SEQ_INDICATOR_WIDTH;
        for (position, item) in items.iter().enumerate() {
            if position > 0 || !first_inline {
                push_indent(out, indent);
            }
            out.push('-');
            match item {
                Node::Map { entries, style: CollectionStyle::Block } if !entries.is_empty() => {
                    out.push(' ');
                    self.block_map(out, entries, content, true);
                }
                Node::Seq { items, style: CollectionStyle::Block } if !items.is_empty() => {
                    out.push(' ');
                    self.block_seq(out, items, content, true);
                }
                Node::Str { value, style: ScalarStyle::Literal }
                    if !scalar::needs_indentation_indicator(value) =>
                {
                    self.literal(out, value, content, None);
                }
                other => {
                    out.push(' ');
                    out.push_str(&self.inline(other, false));
                    out.push('\n');
                }
            }
        }
    }

    /// Writes what follows `key:` for a mapping whose keys sit at column `indent`.
    fn value_after_key(&self, out: &mut String, value: &Node, indent: usize) {
        let child = indent + self.indent;
        match value {
            Node::Map { entries, style: CollectionStyle::Block } if !entries.is_empty() => {
                out.push('\n');
                self.block_map(out, entries, child, false);
            }
            Node::Seq { items, style: CollectionStyle::Block } if !items.is_empty() => {
                out.push('\n');
                self.block_seq(out, items, child, false);
            }
            Node::Str { value, style: ScalarStyle::Literal } => {
                let indicator = scalar::needs_indentation_indicator(value).then_some(self.indent);
                self.literal(out, value, child, indicator);
            }
            other => {
                out.push(' ');
                out.push_str(&self.inline(other, false));
                out.push('\n');
            }
        }
    }

    /// Writes ` |<indicator><chomping>` and the content lines at column `indent`.
    fn literal(&self, out: &mut String, value: &str, indent: usize, indicator: Option<usize>) {
        let chomping = Chomping::for_value(value);
        out.push_str(" |");
        if let Some(width) = indicator {
            out.push_str(&width.to_string());
        }
        out.push_str(chomping.indicator());
        out.push('\n');

        let body = match chomping {
            Chomping::Strip => value,
            Chomping::Clip | Chomping::Keep => value.strip_suffix('\n').unwrap_or(value),
        };
        for line in body.split('\n') {
            if !line.is_empty() {
                push_indent(out, indent);
                out.push_str(line);
            }
            out.push('\n');
        }
    }

    // --- Flow layout ---

    /// Single-line rendering of `node`. Inside flow collections every descendant is flow.
    fn inline(&self, node: &Node, in_flow: bool) -> String {
        match node {
            Node::Null => "null".to_string(),
            Node::Bool(b) => b.to_string(),
            Node::Number(n) => n.clone(),
            Node::Str { value, .. } => scalar::quote_if_needed(value, in_flow),
            Node::Seq { items, .. } if items.is_empty() => "[]".to_string(),
            Node::Seq { items, .. } => {
                let parts: Vec<String> = items.iter().map(|item| self.inline(item, true)).collect();
                format!("[{}]", parts.join(", "))
            }
            Node::Map { entries, .. } if entries.is_empty() => "{}".to_string(),
            Node::Map { entries, .. } => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", self.inline(k, true), self.inline(v, true)))
                    .collect();
                format!("{{ {} }}", parts.join(", "))
            }
        }
    }
}

fn push_indent(out: &mut String, width: usize) {
    out.extend(std::iter::repeat_n(' ', width));
}
