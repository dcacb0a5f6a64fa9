// src/core/formatter.rs

//! # Document Formatter
//!
//! Decides the cosmetic shape of a rendered document without touching its content. The
//! generic tree produced by serializing the model is walked once, and every node receives
//! a style hint from the first [`FormatRule`] that has an opinion about it. The resulting
//! [`Node`] tree is what the [`Emitter`](super::emitter::Emitter) writes.
//!
//! The default rule set:
//!
//! * [`MultilineLiteral`]: strings with line breaks become literal blocks (`|`, `|-`, `|+`).
//! * [`KeyValueFlow`]: `{key, value}` pairs are written on one line.
//! * [`ShortTagsFlow`]: short `tags` lists are written on one line.
//! * [`SingleDependencyFlow`]: a `depends_on` list with one entry is written on one line.

use crate::constants::{DEFAULT_INDENT, FLOW_TAG_COUNT};
use crate::core::scalar;
use log::{trace, warn};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fmt;

// --- Options ---

/// Tunable formatting parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    /// Spaces per nesting level.
    pub indent: usize,
    /// Largest `tags` list written on a single line.
    pub flow_tag_count: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent: DEFAULT_INDENT,
            flow_tag_count: FLOW_TAG_COUNT,
        }
    }
}

// --- Styled tree ---

/// Layout of a sequence or mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionStyle {
    /// One entry per line, indented under the parent.
    #[default]
    Block,
    /// All entries on one line: `[a, b]` or `{ k: v }`.
    Flow,
}

/// Layout of a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalarStyle {
    /// Plain when safe, double-quoted otherwise.
    #[default]
    Auto,
    /// A literal block scalar. Falls back to `Auto` inside flow collections.
    Literal,
}

/// A document tree annotated with style hints.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `null`.
    Null,
    /// `true` or `false`.
    Bool(bool),
    /// A number, already in its textual form.
    Number(String),
    /// A string and how to write it.
    Str {
        /// The unescaped text.
        value: String,
        /// The style picked by the rules.
        style: ScalarStyle,
    },
    /// A sequence.
    Seq {
        /// Entries, in document order.
        items: Vec<Node>,
        /// Block or flow layout.
        style: CollectionStyle,
    },
    /// A mapping.
    Map {
        /// Key/value pairs, in document order.
        entries: Vec<(Node, Node)>,
        /// Block or flow layout.
        style: CollectionStyle,
    },
}

// --- Rules ---

/// One formatting policy. Every hook defaults to "no opinion".
///
/// `key` is the mapping key the value sits under, when there is one.
pub trait FormatRule: fmt::Debug {
    /// Short name used in trace output.
    fn name(&self) -> &'static str;

    /// Layout for the sequence `items`.
    fn sequence_style(&self, _key: Option<&str>, _items: &[Value]) -> Option<CollectionStyle> {
        None
    }

    /// Layout for the mapping `map`.
    fn mapping_style(&self, _key: Option<&str>, _map: &Mapping) -> Option<CollectionStyle> {
        None
    }

    /// Style for the string `value`.
    fn scalar_style(&self, _key: Option<&str>, _value: &str) -> Option<ScalarStyle> {
        None
    }
}

/// Strings with an embedded line break are written as literal blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultilineLiteral;

impl FormatRule for MultilineLiteral {
    fn name(&self) -> &'static str {
        "multiline-literal"
    }

    fn scalar_style(&self, _key: Option<&str>, value: &str) -> Option<ScalarStyle> {
        scalar::is_literal_candidate(value).then_some(ScalarStyle::Literal)
    }
}

/// A mapping whose keys are exactly `key` and `value` is written on one line.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValueFlow;

impl FormatRule for KeyValueFlow {
    fn name(&self) -> &'static str {
        "key-value-flow"
    }

    fn mapping_style(&self, _key: Option<&str>, map: &Mapping) -> Option<CollectionStyle> {
        let is_pair = map.len() == 2 && map.contains_key("key") && map.contains_key("value");
        is_pair.then_some(CollectionStyle::Flow)
    }
}

/// A `tags` list of scalars with at most `max_items` entries is written on one line.
#[derive(Debug, Clone, Copy)]
pub struct ShortTagsFlow {
    pub max_items: usize,
}

impl Default for ShortTagsFlow {
    fn default() -> Self {
        Self {
            max_items: FLOW_TAG_COUNT,
        }
    }
}

impl FormatRule for ShortTagsFlow {
    fn name(&self) -> &'static str {
        "short-tags-flow"
    }

    fn sequence_style(&self, key: Option<&str>, items: &[Value]) -> Option<CollectionStyle> {
        let short = key == Some("tags")
            && items.len() <= self.max_items
            && items.iter().all(|item| !item.is_sequence() && !item.is_mapping());
        short.then_some(CollectionStyle::Flow)
    }
}

/// A `depends_on` list with a single entry is written on one line.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleDependencyFlow;

impl FormatRule for SingleDependencyFlow {
    fn name(&self) -> &'static str {
        "single-dependency-flow"
    }

    fn sequence_style(&self, key: Option<&str>, items: &[Value]) -> Option<CollectionStyle> {
        (key == Some("depends_on") && items.len() == 1).then_some(CollectionStyle::Flow)
    }
}

// --- Formatter ---

/// An ordered list of rules; the first rule with an opinion on a node wins.
#[derive(Debug)]
pub struct Formatter {
    rules: Vec<Box<dyn FormatRule>>,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(&FormatOptions::default())
    }
}

impl Formatter {
    /// The default rule set, configured by `options`.
    pub fn new(options: &FormatOptions) -> Self {
        Self {
            rules: vec![
                Box::new(MultilineLiteral),
                Box::new(KeyValueFlow),
                Box::new(ShortTagsFlow {
                    max_items: options.flow_tag_count,
                }),
                Box::new(SingleDependencyFlow),
            ],
        }
    }

    /// A formatter without rules: every collection is block, every string automatic.
    pub fn plain() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule after the existing ones.
    pub fn with_rule(mut self, rule: Box<dyn FormatRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Names of the active rules, in priority order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Annotates a document tree with style hints.
    pub fn annotate(&self, value: &Value) -> Node {
        self.annotate_under(None, value)
    }

    fn annotate_under(&self, key: Option<&str>, value: &Value) -> Node {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(*b),
            Value::Number(n) => Node::Number(n.to_string()),
            Value::String(s) => Node::Str {
                value: s.clone(),
                style: self.pick(key, |rule| rule.scalar_style(key, s)),
            },
            Value::Sequence(items) => Node::Seq {
                items: items
                    .iter()
                    .map(|item| self.annotate_under(None, item))
                    .collect(),
                style: self.pick(key, |rule| rule.sequence_style(key, items)),
            },
            Value::Mapping(map) => Node::Map {
                entries: map
                    .iter()
                    .map(|(k, v)| (self.annotate_under(None, k), self.annotate_under(k.as_str(), v)))
                    .collect(),
                style: self.pick(key, |rule| rule.mapping_style(key, map)),
            },
            Value::Tagged(tagged) => {
                warn!("Dropping YAML tag '{}' while formatting", tagged.tag);
                self.annotate_under(key, &tagged.value)
            }
        }
    }

    fn pick<T: Default>(&self, key: Option<&str>, hook: impl Fn(&dyn FormatRule) -> Option<T>) -> T {
        for rule in &self.rules {
            if let Some(style) = hook(rule.as_ref()) {
                trace!("Rule '{}' styled value under {:?}", rule.name(), key);
                return style;
            }
        }
        T::default()
    }
}
